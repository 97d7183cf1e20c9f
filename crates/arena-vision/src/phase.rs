use crate::matcher::SearchImage;
use crate::templates::{ui, TemplateStore};
use arena_state::GamePhase;
use image::GrayImage;
use tracing::{info, warn};

/// Ordered classification rules. The first UI element found decides the
/// phase, so a frame showing both the battle indicator and the play button
/// counts as in-battle.
pub const PHASE_RULES: [(&str, GamePhase); 4] = [
    (ui::BATTLE_INDICATOR, GamePhase::InBattle),
    (ui::PLAY_BUTTON, GamePhase::OnMenu),
    (ui::OK_BUTTON, GamePhase::PostGame),
    (ui::HOME_BUTTON, GamePhase::OnMenu),
];

/// Phase reported when no UI element is recognised: no menu or post-game
/// chrome means we are still in a battle.
pub const FALLBACK_PHASE: GamePhase = GamePhase::InBattle;

/// Classify a preprocessed frame. Rules whose template is not loaded are
/// skipped.
pub fn classify_phase(gray: &GrayImage, templates: &TemplateStore, threshold: f64) -> GamePhase {
    let search = SearchImage::new(gray);
    for (name, phase) in PHASE_RULES {
        let Some(template) = templates.ui(name) else {
            continue;
        };
        if let Some(pos) = search.find(template, threshold) {
            info!("Detected '{}' at {}. Phase: {}", name, pos, phase);
            return phase;
        }
    }

    warn!(
        "Could not determine game phase from UI templates. Defaulting to {}",
        FALLBACK_PHASE
    );
    FALLBACK_PHASE
}
