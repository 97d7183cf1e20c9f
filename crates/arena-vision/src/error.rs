/// Errors surfaced by the vision pipeline.
///
/// "Nothing detected" is never an error: absent templates, empty regions and
/// sub-threshold matches all come back as `None` or empty collections.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },
}

impl VisionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        VisionError::InvalidImage {
            reason: reason.into(),
        }
    }
}
