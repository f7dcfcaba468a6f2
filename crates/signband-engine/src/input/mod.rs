//! Pointer and keyboard input.
//!
//! The runtime turns winit window events into [`InputEvent`]s and folds them
//! into an [`InputState`] (what is held and where the pointer is) and an
//! [`InputFrame`] (what changed since the last redraw). Hosts never see winit
//! input types.

mod state;
mod types;
pub(crate) mod winit_events;

pub use state::{InputFrame, InputState};
pub use types::{InputEvent, Key, KeyState};
