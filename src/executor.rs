use anyhow::Result;
use arena_capture::InputDevice;
use arena_state::{Action, Point};
use std::time::Duration;
use tracing::{error, info};

/// Result of running one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The card to play could not be found on screen.
    Skipped,
}

/// Turns decided actions into device input.
pub struct ActionExecutor<D> {
    device: D,
    swipe_duration: Duration,
}

impl<D: InputDevice> ActionExecutor<D> {
    pub fn new(device: D, swipe_duration: Duration) -> Self {
        Self {
            device,
            swipe_duration,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Run `action`. `locate` resolves a card name to its on-screen grip point.
    pub fn execute<F>(&mut self, action: &Action, locate: F) -> Result<Outcome>
    where
        F: FnOnce(&str) -> Option<Point>,
    {
        match action {
            Action::PlayCard { card, position } => {
                let Some(grip) = locate(card) else {
                    error!("Could not find '{}' on screen; skipping play", card);
                    return Ok(Outcome::Skipped);
                };
                info!("Dragging '{}' from {} to {}", card, grip, position);
                self.device.swipe(grip, *position, self.swipe_duration)?;
            }
            Action::Tap { position } => {
                info!("Tapping {}", position);
                self.device.tap(*position)?;
            }
            Action::Wait { duration } => {
                info!("Waiting {:?}", duration);
                std::thread::sleep(*duration);
            }
            Action::DoNothing => info!("Holding"),
        }
        Ok(Outcome::Done)
    }
}
