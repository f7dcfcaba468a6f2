//! GPU rendering subsystem.
//!
//! Each renderer owns its GPU resources (pipelines, buffers) and records into
//! a pass opened by [`SignScene`]. World units follow the band: the ring lies
//! in the y/z plane and turns about +X.

mod common;
mod ctx;
pub mod decor;
pub mod geometry;
pub mod instanced;
pub mod picking;
pub mod scene;

pub use ctx::{RenderCtx, RenderTarget};
pub use scene::SignScene;
