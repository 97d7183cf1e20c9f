//! Vision pipeline configuration

use crate::layout::{self, Roi};
use crate::preprocess::DEFAULT_BLUR_SIGMA;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum correlation for each kind of lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Phase-classification UI elements
    pub ui: f64,
    /// Cards inside the hand region
    pub card: f64,
    /// Enemy units inside the enemy field
    pub enemy_unit: f64,
    /// Whole-frame card lookup for drag gestures
    pub locate: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            ui: 0.7,
            card: 0.85,
            enemy_unit: 0.85,
            locate: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub hand_roi: Roi,
    pub battlefield_roi: Roi,
    /// Pixels the enemy field extends past the battlefield midline
    pub enemy_field_overlap: u32,
    pub thresholds: MatchThresholds,
    /// Gaussian sigma applied after grayscale conversion; 0 disables the blur
    pub blur_sigma: f32,
    /// Write annotated ROI snapshots on every analysis
    pub debug_visualizations: bool,
    pub debug_output_dir: PathBuf,
    /// TrueType font for detection labels; system fonts are tried when unset
    pub debug_font: Option<PathBuf>,
}

impl VisionConfig {
    pub fn enemy_field_roi(&self) -> Roi {
        layout::enemy_field_roi(self.battlefield_roi, self.enemy_field_overlap)
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            hand_roi: layout::HAND_ROI,
            battlefield_roi: layout::BATTLEFIELD_ROI,
            enemy_field_overlap: layout::ENEMY_FIELD_OVERLAP,
            thresholds: MatchThresholds::default(),
            blur_sigma: DEFAULT_BLUR_SIGMA,
            debug_visualizations: false,
            debug_output_dir: "debug_vision_output".into(),
            debug_font: None,
        }
    }
}
