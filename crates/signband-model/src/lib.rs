//! CPU-side model for the signband renderer.
//!
//! This crate owns everything that can be computed without a GPU:
//! - the record sequence delivered by data acquisition
//! - per-instance placement, orientation and picking keys
//! - orbit animation state and camera math
//!
//! The engine crate consumes [`InstanceAttributes`] and uploads them verbatim.

pub mod camera;
pub mod config;
pub mod error;
pub mod instance;
pub mod orbit;
pub mod picking;
pub mod record;
pub mod viewport;

pub use camera::Camera;
pub use config::{
    AnimationConfig, BandConfig, CameraConfig, GridConfig, SceneConfig, Span, StyleConfig, MAX_GRID_LINES,
};
pub use error::{ConfigError, RecordError};
pub use instance::{InstanceAttributes, InstanceBuilder, InstanceRecord, InstanceSet};
pub use orbit::{AnimationLoop, LoopState};
pub use picking::{FramebufferOrigin, PickHit, PickingColor, MAX_PICKABLE_INSTANCES};
pub use record::{InputRecord, RecordId, RecordMetadata, RecordSequence};
pub use viewport::ViewportSize;
