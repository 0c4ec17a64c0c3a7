/// Keyboard key, by physical position (US layout names).
///
/// The movement cluster is named; every other key keeps its platform code in
/// `Other`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    Escape,
    Other(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Platform-agnostic input events emitted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        state: KeyState,
        /// True when event is a key-repeat.
        repeat: bool,
    },

    /// Absolute cursor position in physical pixels, origin at the top-left corner.
    CursorMoved { x: f64, y: f64 },

    /// Window focus change.
    Focused(bool),
}
