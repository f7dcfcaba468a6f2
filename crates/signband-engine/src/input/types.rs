/// Keys the host can bind. Everything else arrives as `Other`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
    Other,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Input event in window terms. Pointer coordinates are logical pixels with
/// the origin at the top-left of the client area.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    Key { key: Key, state: KeyState },
    PointerMoved { x: f32, y: f32 },
    PointerLeft,
    Focused(bool),
}
