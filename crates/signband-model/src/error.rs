use thiserror::Error;

/// Errors raised while decoding record batches from data acquisition.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to parse record batch: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("record at batch position {position} has an empty id")]
    EmptyId { position: usize },
}

/// Errors raised while loading or validating a [`crate::SceneConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse scene config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} range is inverted ({min} > {max})")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} gives {lines} grid lines (at most {max})")]
    TooManyGridLines {
        field: &'static str,
        lines: u64,
        max: usize,
    },

    #[error("camera near plane ({near}) must be closer than far plane ({far})")]
    DepthRange { near: f32, far: f32 },
}
