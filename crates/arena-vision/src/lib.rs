pub mod config;
pub mod debug;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod phase;
pub mod preprocess;
pub mod scene;
pub mod system;
pub mod templates;

pub use config::{MatchThresholds, VisionConfig};
pub use error::VisionError;
pub use layout::Roi;
pub use matcher::{best_match, find, MatchScore, SearchImage};
pub use phase::classify_phase;
pub use preprocess::{preprocess, to_grayscale};
pub use scene::{detect_in_roi, Detection};
pub use system::VisionSystem;
pub use templates::{normalize_name, Template, TemplateKind, TemplateStore};
