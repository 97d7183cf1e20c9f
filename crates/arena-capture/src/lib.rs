pub mod adb;
pub mod replay;

pub use adb::AdbDevice;
pub use replay::ReplaySource;

use anyhow::Result;
use arena_state::Point;
use image::DynamicImage;
use std::time::Duration;
use tracing::info;

/// Anything that can hand over the current screen as a color frame.
pub trait FrameSource {
    fn capture(&mut self) -> Result<DynamicImage>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Touch input on the device screen, in frame pixel coordinates.
pub trait InputDevice {
    fn tap(&mut self, at: Point) -> Result<()>;

    /// Press at `from`, drag to `to` over `duration`, release.
    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()>;
}

/// Input sink that only logs, for replays and dry runs.
#[derive(Debug, Default)]
pub struct DryRunInput {
    taps: usize,
    swipes: usize,
}

impl DryRunInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn taps(&self) -> usize {
        self.taps
    }

    pub fn swipes(&self) -> usize {
        self.swipes
    }
}

impl InputDevice for DryRunInput {
    fn tap(&mut self, at: Point) -> Result<()> {
        self.taps += 1;
        info!("[dry run] tap at {}", at);
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        self.swipes += 1;
        info!("[dry run] swipe {} -> {} over {:?}", from, to, duration);
        Ok(())
    }
}
