use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyState};

/// Held keys and the last known pointer position.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,
    /// Logical pixels; `None` while the pointer is outside the window.
    pub pointer: Option<(f32, f32)>,
    pub keys_down: HashSet<Key>,
}

/// Changes since the previous redraw. Cleared by the runtime after each frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub keys_pressed: HashSet<Key>,
    /// The pointer moved, entered or left.
    pub pointer_changed: bool,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.pointer_changed = false;
    }

    #[inline]
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}

impl InputState {
    pub fn apply(&mut self, frame: &mut InputFrame, event: InputEvent) {
        match event {
            InputEvent::Key { key, state: KeyState::Pressed } => {
                // Auto-repeat shows up as a press while held and is not a new press.
                if self.keys_down.insert(key) {
                    frame.keys_pressed.insert(key);
                }
            }
            InputEvent::Key { key, state: KeyState::Released } => {
                self.keys_down.remove(&key);
            }
            InputEvent::PointerMoved { x, y } => {
                self.pointer = Some((x, y));
                frame.pointer_changed = true;
            }
            InputEvent::PointerLeft => {
                self.pointer = None;
                frame.pointer_changed = true;
            }
            InputEvent::Focused(focused) => {
                self.focused = focused;
                if !focused {
                    // No release events arrive while unfocused.
                    self.keys_down.clear();
                }
            }
        }
    }

    #[inline]
    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}
