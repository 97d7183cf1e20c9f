use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Pixel coordinate in full-frame space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Coarse game-flow phase. Derived from a single frame, never from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Initializing,
    OnMenu,
    InBattle,
    PostGame,
    Stopped,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GamePhase::Initializing => "initializing",
            GamePhase::OnMenu => "on-menu",
            GamePhase::InBattle => "in-battle",
            GamePhase::PostGame => "post-game",
            GamePhase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Placeholder elixir cost reported for every detected card
pub const PLACEHOLDER_CARD_ELIXIR: u32 = 3;
/// Placeholder health reported for every detected enemy unit
pub const PLACEHOLDER_UNIT_HEALTH: u32 = 100;
/// Placeholder type tag for cards and units
pub const PLACEHOLDER_KIND: &str = "unit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCard {
    pub name: String,
    pub position: Point,
    /// Not read from the frame.
    pub elixir_cost: u32,
    /// Not read from the frame.
    pub card_type: String,
}

impl DetectedCard {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Self {
            name: name.into(),
            position,
            elixir_cost: PLACEHOLDER_CARD_ELIXIR,
            card_type: PLACEHOLDER_KIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEnemyUnit {
    pub name: String,
    pub position: Point,
    /// Not read from the frame.
    pub health: u32,
    /// Not read from the frame.
    pub unit_type: String,
}

impl DetectedEnemyUnit {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Self {
            name: name.into(),
            position,
            health: PLACEHOLDER_UNIT_HEALTH,
            unit_type: PLACEHOLDER_KIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerHealth {
    pub king: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for TowerHealth {
    fn default() -> Self {
        Self {
            king: 3000,
            left: 2000,
            right: 2000,
        }
    }
}

/// Structured snapshot of one analysis call.
///
/// Only `cards_in_hand` and `opponent_units` come from the frame. The numeric
/// globals are fixed placeholders until elixir/tower/timer readouts exist, and
/// `player_units` is always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub cards_in_hand: Vec<DetectedCard>,
    pub opponent_units: Vec<DetectedEnemyUnit>,
    pub player_units: Vec<DetectedEnemyUnit>,
    pub current_elixir: f64,
    pub player_tower_health: TowerHealth,
    pub opponent_tower_health: TowerHealth,
    pub game_time_seconds: u32,
}

impl Scene {
    pub fn new(cards_in_hand: Vec<DetectedCard>, opponent_units: Vec<DetectedEnemyUnit>) -> Self {
        Self {
            cards_in_hand,
            opponent_units,
            ..Self::default()
        }
    }

    pub fn card_names(&self) -> Vec<&str> {
        self.cards_in_hand.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            cards_in_hand: Vec::new(),
            opponent_units: Vec::new(),
            player_units: Vec::new(),
            current_elixir: 10.0,
            player_tower_health: TowerHealth::default(),
            opponent_tower_health: TowerHealth::default(),
            game_time_seconds: 60,
        }
    }
}

/// What the bot should do next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum Action {
    /// Drag `card` from the hand and drop it at `position`.
    PlayCard { card: String, position: Point },
    Tap { position: Point },
    Wait { duration: Duration },
    DoNothing,
}

impl Action {
    pub fn is_noop(&self) -> bool {
        matches!(self, Action::DoNothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_placeholders() {
        let scene = Scene::new(vec![DetectedCard::new("Knight", Point::new(10, 20))], vec![]);
        assert_eq!(scene.current_elixir, 10.0);
        assert_eq!(scene.game_time_seconds, 60);
        assert_eq!(scene.opponent_tower_health.king, 3000);
        assert_eq!(scene.cards_in_hand[0].elixir_cost, 3);
        assert_eq!(scene.cards_in_hand[0].card_type, "unit");
        assert!(scene.player_units.is_empty());
        assert_eq!(scene.card_names(), vec!["Knight"]);
    }

    #[test]
    fn test_action_json_tag() {
        let action = Action::PlayCard {
            card: "Archers".into(),
            position: Point::new(360, 500),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action_type"], "play_card");
        assert_eq!(json["position"]["x"], 360);

        let none = serde_json::to_value(Action::DoNothing).unwrap();
        assert_eq!(none["action_type"], "do_nothing");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(GamePhase::InBattle.to_string(), "in-battle");
        assert_eq!(GamePhase::default(), GamePhase::Initializing);
    }
}
