use crate::config::VisionConfig;
use crate::debug::DebugSnapshots;
use crate::matcher::find;
use crate::phase::classify_phase;
use crate::preprocess::preprocess;
use crate::scene::detect_in_roi;
use crate::templates::{normalize_name, TemplateKind, TemplateStore};
use crate::VisionError;
use arena_state::{DetectedCard, DetectedEnemyUnit, GamePhase, Point, Scene};
use image::{DynamicImage, GenericImageView, GrayImage};
use std::path::Path;
use tracing::{debug, info, warn};

/// Phase classification, scene analysis and on-demand card lookup over a
/// shared template store.
///
/// The preprocessed copy of the most recent frame passed to [`classify`] or
/// [`analyze`] is kept so [`locate`] can search it without a new capture.
///
/// [`classify`]: VisionSystem::classify
/// [`analyze`]: VisionSystem::analyze
/// [`locate`]: VisionSystem::locate
pub struct VisionSystem {
    templates: TemplateStore,
    config: VisionConfig,
    latest_frame: Option<GrayImage>,
    snapshots: Option<DebugSnapshots>,
}

impl VisionSystem {
    pub fn new(templates: TemplateStore, config: VisionConfig) -> Self {
        let snapshots = config.debug_visualizations.then(|| {
            DebugSnapshots::new(&config.debug_output_dir, config.debug_font.as_deref())
        });

        info!(
            "Vision system ready: {} card, {} UI, {} enemy unit templates",
            templates.len(TemplateKind::Card),
            templates.len(TemplateKind::UiElement),
            templates.len(TemplateKind::EnemyUnit),
        );

        Self {
            templates,
            config,
            latest_frame: None,
            snapshots,
        }
    }

    /// Load templates from `templates_dir` and build the system.
    pub fn load(templates_dir: &Path, config: VisionConfig) -> Self {
        Self::new(TemplateStore::load(templates_dir), config)
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Preprocessed copy of the last classified or analyzed frame
    pub fn latest_frame(&self) -> Option<&GrayImage> {
        self.latest_frame.as_ref()
    }

    /// Determine the game phase shown in `frame`.
    pub fn classify(&mut self, frame: &DynamicImage) -> Result<GamePhase, VisionError> {
        let gray = preprocess(frame, self.config.blur_sigma)?;
        let phase = classify_phase(&gray, &self.templates, self.config.thresholds.ui);
        self.latest_frame = Some(gray);
        Ok(phase)
    }

    /// Detect cards in the hand and enemy units on the enemy field.
    ///
    /// Does not check the phase; callers analyze only in-battle frames.
    pub fn analyze(&mut self, frame: &DynamicImage) -> Result<Scene, VisionError> {
        let gray = preprocess(frame, self.config.blur_sigma)?;
        Ok(self.analyze_gray(frame, gray))
    }

    /// Analyze `frame` right after [`classify`] saw it, reusing the
    /// preprocessed copy kept from that call.
    ///
    /// Falls back to a full [`analyze`] when nothing was classified yet or
    /// the kept copy has different dimensions.
    ///
    /// [`classify`]: VisionSystem::classify
    /// [`analyze`]: VisionSystem::analyze
    pub fn analyze_classified(&mut self, frame: &DynamicImage) -> Result<Scene, VisionError> {
        match self.latest_frame.take() {
            Some(gray) if gray.dimensions() == frame.dimensions() => {
                Ok(self.analyze_gray(frame, gray))
            }
            _ => self.analyze(frame),
        }
    }

    fn analyze_gray(&mut self, frame: &DynamicImage, gray: GrayImage) -> Scene {
        let thresholds = self.config.thresholds;

        let hand_roi = self.config.hand_roi;
        let cards = detect_in_roi(
            &gray,
            hand_roi,
            self.templates.iter(TemplateKind::Card),
            thresholds.card,
        );

        let enemy_roi = self.config.enemy_field_roi();
        let units = detect_in_roi(
            &gray,
            enemy_roi,
            self.templates.iter(TemplateKind::EnemyUnit),
            thresholds.enemy_unit,
        );

        if let Some(snapshots) = &self.snapshots {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            snapshots.save_hand(frame, hand_roi, &cards, timestamp);
            snapshots.save_enemy_field(frame, enemy_roi, &units, timestamp);
        }

        for unit in &units {
            info!("Detected enemy unit '{}' at {}", unit.name, unit.position);
        }

        let scene = Scene::new(
            cards
                .into_iter()
                .map(|d| DetectedCard::new(d.name, d.position))
                .collect(),
            units
                .into_iter()
                .map(|d| DetectedEnemyUnit::new(d.name, d.position))
                .collect(),
        );
        info!("Cards in hand: {:?}", scene.card_names());

        self.latest_frame = Some(gray);
        scene
    }

    /// Find a card anywhere on the latest frame, for use as a drag start point.
    ///
    /// `card_name` is normalized first, so "mini_pekka" finds "Mini Pekka".
    pub fn locate(&self, card_name: &str) -> Option<Point> {
        self.locate_in(TemplateKind::Card, card_name, self.config.thresholds.locate)
    }

    /// Find a UI element (e.g. the play button) on the latest frame.
    pub fn locate_ui(&self, name: &str) -> Option<Point> {
        self.locate_in(TemplateKind::UiElement, name, self.config.thresholds.ui)
    }

    fn locate_in(&self, kind: TemplateKind, name: &str, threshold: f64) -> Option<Point> {
        let Some(frame) = &self.latest_frame else {
            warn!("No frame captured yet; cannot locate '{}'", name);
            return None;
        };

        let key = match kind {
            TemplateKind::UiElement => name.to_string(),
            _ => normalize_name(name),
        };
        let Some(template) = self.templates.get(kind, &key) else {
            warn!("No {:?} template loaded for '{}'", kind, name);
            return None;
        };

        let found = find(frame, template, threshold);
        match found {
            Some(pos) => info!("Found '{}' at {} (threshold {})", key, pos, threshold),
            None => debug!("'{}' not on screen (threshold {})", key, threshold),
        }
        found
    }
}
