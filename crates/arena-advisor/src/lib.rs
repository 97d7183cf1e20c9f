use arena_data::GameData;
use arena_state::{Action, DetectedCard, Point, Scene};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Frame width the drop points are laid out for.
const ARENA_WIDTH: u32 = 720;

/// Where a card gets dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    DefendLeft,
    DefendRight,
    DefendMiddle,
    Attack,
}

impl Placement {
    pub fn point(&self) -> Point {
        match self {
            Placement::DefendLeft => Point::new(200, 900),
            Placement::DefendRight => Point::new(520, 900),
            Placement::DefendMiddle => Point::new(360, 800),
            Placement::Attack => Point::new(360, 500),
        }
    }

    /// Defend the lane the threat at `x` is coming down.
    pub fn defending(x: u32) -> Self {
        if x < ARENA_WIDTH / 3 {
            Placement::DefendLeft
        } else if x > ARENA_WIDTH * 2 / 3 {
            Placement::DefendRight
        } else {
            Placement::DefendMiddle
        }
    }
}

/// Rule-based card picker: cheapest affordable card, placed against the
/// first visible enemy or pushed down the middle.
pub struct StrategyEngine {
    data: GameData,
}

impl StrategyEngine {
    pub fn new(data: GameData) -> Self {
        Self { data }
    }

    pub fn decide(&self, scene: &Scene) -> Action {
        if scene.cards_in_hand.is_empty() {
            debug!("No cards in hand");
            return Action::DoNothing;
        }

        let Some(card) = self.cheapest_playable(scene) else {
            debug!(
                "Nothing affordable with {:.1} elixir in {:?}",
                scene.current_elixir,
                scene.card_names()
            );
            return Action::DoNothing;
        };

        let placement = match scene.opponent_units.first() {
            Some(enemy) => {
                info!("Enemy '{}' at {}; defending", enemy.name, enemy.position);
                Placement::defending(enemy.position.x)
            }
            None => Placement::Attack,
        };

        let props = self.data.properties(&card.name);
        info!(
            "Playing '{}' ({} elixir, {}) at {:?}",
            card.name, props.elixir_cost, props.card_type, placement
        );
        Action::PlayCard {
            card: card.name.clone(),
            position: placement.point(),
        }
    }

    fn cheapest_playable<'a>(&self, scene: &'a Scene) -> Option<&'a DetectedCard> {
        let mut playable: Vec<(u32, &DetectedCard)> = scene
            .cards_in_hand
            .iter()
            .map(|c| (self.data.elixir_cost(&c.name), c))
            .filter(|(cost, _)| *cost as f64 <= scene.current_elixir)
            .collect();
        playable.sort_by_key(|(cost, _)| *cost);
        playable.first().map(|(_, c)| *c)
    }
}
