//! winit event loop and the single application window.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
