//! winit → [`InputEvent`] translation.

use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::{InputEvent, Key, KeyState};

/// Returns `None` for window events that carry no input.
pub(crate) fn translate(scale_factor: f64, event: &WindowEvent) -> Option<InputEvent> {
    let translated = match event {
        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = logical_pointer(scale_factor, *position);
            InputEvent::PointerMoved { x, y }
        }
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,
        WindowEvent::Focused(focused) => InputEvent::Focused(*focused),
        WindowEvent::KeyboardInput { event, .. } => InputEvent::Key {
            key: key_from_physical(event.physical_key),
            state: match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            },
        },
        _ => return None,
    };
    Some(translated)
}

fn logical_pointer(scale_factor: f64, position: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = position.to_logical::<f64>(scale_factor);
    (logical.x as f32, logical.y as f32)
}

fn key_from_physical(key: PhysicalKey) -> Key {
    let PhysicalKey::Code(code) = key else {
        return Key::Other;
    };
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        _ => Key::Other,
    }
}
