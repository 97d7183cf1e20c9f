use crate::FrameSource;
use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Serves saved screenshots from a directory in file-name order, wrapping
/// around at the end.
#[derive(Debug)]
pub struct ReplaySource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    next: usize,
}

impl ReplaySource {
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read replay directory {}", dir.display()))?;

        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.as_str()));
            if path.is_file() && is_image {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            bail!("No screenshots found in {}", dir.display());
        }
        info!("Replaying {} frames from {}", frames.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            frames,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self) -> Result<DynamicImage> {
        let path = &self.frames[self.next];
        self.next = (self.next + 1) % self.frames.len();
        debug!("Replaying {}", path.display());
        image::open(path).with_context(|| format!("Failed to open {}", path.display()))
    }

    fn describe(&self) -> String {
        format!("replay of {}", self.dir.display())
    }
}
