//! Window, GPU and rendering layer for signband.
//!
//! [`window::Runtime`] drives a host [`core::App`] once per display refresh.
//! [`render::SignScene`] owns the band's GPU state: instanced signs and
//! arrows, the grid and target marker, and the offscreen picking target.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod window;

mod error;

pub use error::SceneError;
