use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cost reported for cards missing from the table. Higher than any real
/// elixir pool, so unknown cards are never considered playable.
pub const UNKNOWN_ELIXIR_COST: u32 = 99;

/// Static properties of a playable card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub name: String,
    pub elixir_cost: u32,
    #[serde(rename = "type")]
    pub card_type: String,
    pub target: String,
}

impl CardData {
    fn new(name: &str, elixir_cost: u32, card_type: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            elixir_cost,
            card_type: card_type.to_string(),
            target: target.to_string(),
        }
    }

    pub fn unknown(name: &str) -> Self {
        Self::new(name, UNKNOWN_ELIXIR_COST, "unknown", "unknown")
    }
}

/// Raw cards.json file format
#[derive(Debug, Deserialize)]
struct CardsFile {
    #[allow(dead_code)]
    version: Option<String>,
    cards: Vec<CardData>,
}

/// Card property registry, keyed by lowercase card name
#[derive(Debug, Clone, Default)]
pub struct GameData {
    pub cards: HashMap<String, CardData>,
}

impl GameData {
    /// Built-in table used when no cards.json is available
    pub fn builtin() -> Self {
        let mut data = Self::default();
        for card in [
            CardData::new("Knight", 3, "tank", "ground"),
            CardData::new("Archers", 3, "ranged", "ground_air"),
            CardData::new("Fireball", 4, "spell", "area"),
            CardData::new("Mini Pekka", 4, "damage", "ground"),
            CardData::new("Barbarians", 5, "swarm", "ground"),
            CardData::new("Giant", 5, "tank", "buildings"),
            CardData::new("Musketeer", 4, "ranged", "ground_air"),
            CardData::new("Spear Goblins", 2, "swarm", "ground_air"),
            CardData::new("Tombstone", 3, "building", "spawner"),
            CardData::new("Valkyrie", 4, "splash", "ground"),
            CardData::new("Wizard", 5, "splash_ranged", "ground_air"),
        ] {
            data.insert(card);
        }
        data
    }

    /// Load card data from `data_dir/cards.json`, layered over the built-in
    /// table. A missing file is not an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut data = Self::builtin();

        let cards_path = data_dir.join("cards.json");
        if cards_path.exists() {
            let content =
                std::fs::read_to_string(&cards_path).context("Failed to read cards.json")?;
            let file: CardsFile =
                serde_json::from_str(&content).context("Failed to parse cards.json")?;

            let count = file.cards.len();
            for card in file.cards {
                data.insert(card);
            }

            tracing::info!("Loaded {} cards from {}", count, cards_path.display());
        } else {
            tracing::warn!(
                "No cards.json found at {}. Using {} built-in cards",
                cards_path.display(),
                data.cards.len()
            );
        }

        Ok(data)
    }

    pub fn insert(&mut self, card: CardData) {
        self.cards.insert(card.name.to_lowercase(), card);
    }

    pub fn get(&self, name: &str) -> Option<&CardData> {
        self.cards.get(&name.to_lowercase())
    }

    /// Properties for `name`, or the unknown-card fallback
    pub fn properties(&self, name: &str) -> CardData {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| CardData::unknown(name))
    }

    pub fn elixir_cost(&self, name: &str) -> u32 {
        self.get(name)
            .map(|c| c.elixir_cost)
            .unwrap_or(UNKNOWN_ELIXIR_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent() {
        let data = GameData::load(Path::new("/nonexistent")).unwrap();
        assert_eq!(data.elixir_cost("Knight"), 3);
        assert_eq!(data.elixir_cost("spear goblins"), 2);
    }

    #[test]
    fn test_unknown_card() {
        let data = GameData::builtin();
        let props = data.properties("Goblin Barrel");
        assert_eq!(props.elixir_cost, UNKNOWN_ELIXIR_COST);
        assert_eq!(props.card_type, "unknown");
    }

    #[test]
    fn test_load_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cards.json"),
            r#"{
                "version": "1",
                "cards": [
                    {"name": "Knight", "elixir_cost": 2, "type": "tank", "target": "ground"},
                    {"name": "Hog Rider", "elixir_cost": 4, "type": "damage", "target": "buildings"}
                ]
            }"#,
        )
        .unwrap();

        let data = GameData::load(dir.path()).unwrap();
        assert_eq!(data.elixir_cost("Knight"), 2);
        assert_eq!(data.elixir_cost("Hog Rider"), 4);
        assert_eq!(data.elixir_cost("Wizard"), 5);
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cards.json"), "{ not json").unwrap();
        assert!(GameData::load(dir.path()).is_err());
    }
}
