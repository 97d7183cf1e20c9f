use arena_advisor::StrategyEngine;
use arena_capture::{FrameSource, InputDevice};
use arena_state::{Action, GamePhase};
use arena_vision::templates::ui;
use arena_vision::VisionSystem;
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::executor::ActionExecutor;

/// Capture → classify → act, one frame per tick.
pub struct BotLoop<S, D> {
    source: S,
    vision: VisionSystem,
    strategy: StrategyEngine,
    executor: ActionExecutor<D>,
    phase: GamePhase,
    auto_navigate: bool,
    tick_interval: Duration,
}

impl<S: FrameSource, D: InputDevice> BotLoop<S, D> {
    pub fn new(
        source: S,
        vision: VisionSystem,
        strategy: StrategyEngine,
        executor: ActionExecutor<D>,
    ) -> Self {
        Self {
            source,
            vision,
            strategy,
            executor,
            phase: GamePhase::Initializing,
            auto_navigate: true,
            tick_interval: Duration::from_millis(1000),
        }
    }

    pub fn with_auto_navigate(mut self, enabled: bool) -> Self {
        self.auto_navigate = enabled;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn executor(&self) -> &ActionExecutor<D> {
        &self.executor
    }

    /// Tick until `stop` is set, `max_ticks` have run, or the phase becomes
    /// stopped. Returns the number of ticks run.
    pub fn run(&mut self, stop: &AtomicBool, max_ticks: Option<u64>) -> u64 {
        info!(
            "Bot loop started on {} (tick {:?})",
            self.source.describe(),
            self.tick_interval
        );

        let mut ticks = 0u64;
        loop {
            if stop.load(Ordering::Relaxed) {
                info!("Bot loop stopping (stop signal received)");
                break;
            }
            if max_ticks.is_some_and(|max| ticks >= max) {
                info!("Bot loop stopping after {} ticks", ticks);
                break;
            }
            if self.phase == GamePhase::Stopped {
                break;
            }

            let tick_start = Instant::now();
            self.tick();
            ticks += 1;

            let elapsed = tick_start.elapsed();
            if elapsed < self.tick_interval {
                std::thread::sleep(self.tick_interval - elapsed);
            }
        }

        self.phase = GamePhase::Stopped;
        info!("Bot loop stopped");
        ticks
    }

    /// One capture and the reaction to it.
    pub fn tick(&mut self) {
        if self.phase == GamePhase::Stopped {
            return;
        }

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Capture failed: {:#}. Skipping tick", e);
                return;
            }
        };

        let phase = match self.vision.classify(&frame) {
            Ok(phase) => phase,
            Err(e) => {
                warn!("Unusable frame: {}. Skipping tick", e);
                return;
            }
        };
        if phase != self.phase {
            info!("Phase: {} -> {}", self.phase, phase);
            self.phase = phase;
        }

        match phase {
            GamePhase::Initializing => debug!("Waiting for the game to start"),
            GamePhase::OnMenu => {
                if self.auto_navigate {
                    self.tap_ui(ui::PLAY_BUTTON);
                }
            }
            GamePhase::InBattle => self.play(&frame),
            GamePhase::PostGame => {
                if self.auto_navigate && !self.tap_ui(ui::OK_BUTTON) {
                    self.tap_ui(ui::HOME_BUTTON);
                }
            }
            GamePhase::Stopped => {}
        }
    }

    fn play(&mut self, frame: &DynamicImage) {
        let scene = match self.vision.analyze_classified(frame) {
            Ok(scene) => scene,
            Err(e) => {
                warn!("Scene analysis failed: {}", e);
                return;
            }
        };

        let action = self.strategy.decide(&scene);
        let vision = &self.vision;
        if let Err(e) = self.executor.execute(&action, |card| vision.locate(card)) {
            error!("Action {:?} failed: {:#}", action, e);
        }
    }

    /// Tap a UI element if it is on the latest frame.
    fn tap_ui(&mut self, name: &str) -> bool {
        let Some(position) = self.vision.locate_ui(name) else {
            debug!("'{}' not visible", name);
            return false;
        };
        match self.executor.execute(&Action::Tap { position }, |_| None) {
            Ok(_) => true,
            Err(e) => {
                error!("Tapping '{}' failed: {:#}", name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::RecordingDevice;
    use arena_data::GameData;
    use arena_state::Point;
    use arena_vision::{preprocess, Template, TemplateKind, TemplateStore, VisionConfig};
    use image::{Rgb, RgbImage};

    /// Serves the same frame forever, or fails every capture.
    struct StillSource(Option<DynamicImage>);

    impl FrameSource for StillSource {
        fn capture(&mut self) -> anyhow::Result<DynamicImage> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("no device"))
        }

        fn describe(&self) -> String {
            "still frame".to_string()
        }
    }

    fn patch(w: u32, h: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = ((x / 3 + seed) * 53 + (y / 3) * 97 + (x / 3) * (y / 3) * 29) % 200 + 40;
            Rgb([v as u8, 255 - v as u8, (v / 3) as u8])
        })
    }

    /// Frame with `patch` pasted at (x, y), and the matching template as the
    /// vision system will see it.
    fn scene_with(
        (fw, fh): (u32, u32),
        (x, y): (u32, u32),
        (w, h): (u32, u32),
        name: &str,
        kind: TemplateKind,
    ) -> (DynamicImage, Template) {
        let mut frame = RgbImage::new(fw, fh);
        image::imageops::replace(&mut frame, &patch(w, h, 11), x as i64, y as i64);
        let frame = DynamicImage::ImageRgb8(frame);
        let gray = preprocess(&frame, VisionConfig::default().blur_sigma).unwrap();
        let crop = image::imageops::crop_imm(&gray, x, y, w, h).to_image();
        (frame, Template::new(name, kind, crop))
    }

    fn bot(frame: Option<DynamicImage>, store: TemplateStore) -> BotLoop<StillSource, RecordingDevice> {
        BotLoop::new(
            StillSource(frame),
            VisionSystem::new(store, VisionConfig::default()),
            StrategyEngine::new(GameData::builtin()),
            ActionExecutor::new(RecordingDevice::default(), Duration::from_millis(500)),
        )
        .with_tick_interval(Duration::ZERO)
    }

    #[test]
    fn test_menu_taps_play() {
        let (frame, play) = scene_with((160, 120), (70, 40), (30, 18), ui::PLAY_BUTTON, TemplateKind::UiElement);
        let mut store = TemplateStore::new();
        store.insert(play);

        let mut bot = bot(Some(frame), store);
        bot.tick();
        assert_eq!(bot.phase(), GamePhase::OnMenu);
        assert_eq!(bot.executor().device().taps, vec![Point::new(85, 49)]);
    }

    #[test]
    fn test_menu_without_navigation() {
        let (frame, play) = scene_with((160, 120), (70, 40), (30, 18), ui::PLAY_BUTTON, TemplateKind::UiElement);
        let mut store = TemplateStore::new();
        store.insert(play);

        let mut bot = bot(Some(frame), store).with_auto_navigate(false);
        bot.tick();
        assert_eq!(bot.phase(), GamePhase::OnMenu);
        assert!(bot.executor().device().taps.is_empty());
    }

    #[test]
    fn test_post_game_taps_ok() {
        let (frame, ok) = scene_with((160, 120), (20, 90), (24, 16), ui::OK_BUTTON, TemplateKind::UiElement);
        let mut store = TemplateStore::new();
        store.insert(ok);

        let mut bot = bot(Some(frame), store);
        bot.tick();
        assert_eq!(bot.phase(), GamePhase::PostGame);
        assert_eq!(bot.executor().device().taps, vec![Point::new(32, 98)]);
    }

    #[test]
    fn test_battle_plays_card_from_hand() {
        let (frame, knight) = scene_with((720, 1280), (200, 1100), (40, 48), "Knight", TemplateKind::Card);
        let mut store = TemplateStore::new();
        store.insert(knight);

        let mut bot = bot(Some(frame), store);
        bot.tick();
        assert_eq!(bot.phase(), GamePhase::InBattle);
        assert_eq!(
            bot.executor().device().swipes,
            vec![(Point::new(220, 1124), Point::new(360, 500), Duration::from_millis(500))]
        );
    }

    #[test]
    fn test_capture_failure_skips_tick() {
        let mut bot = bot(None, TemplateStore::new());
        bot.tick();
        assert_eq!(bot.phase(), GamePhase::Initializing);
        assert!(bot.executor().device().taps.is_empty());
    }

    #[test]
    fn test_run_honours_tick_limit_and_stop() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let mut limited = bot(Some(frame.clone()), TemplateStore::new());
        let stop = AtomicBool::new(false);
        assert_eq!(limited.run(&stop, Some(3)), 3);
        assert_eq!(limited.phase(), GamePhase::Stopped);

        let mut stopped = bot(Some(frame), TemplateStore::new());
        stop.store(true, Ordering::Relaxed);
        assert_eq!(stopped.run(&stop, None), 0);
    }
}
