use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyState};

/// Current input state for a single window.
///
/// Holds "is down" information and the last cursor position, and filters the raw
/// event stream down to real transitions.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Last cursor position in physical pixels.
    pub cursor: Option<(f64, f64)>,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,
}

impl InputState {
    /// Applies `ev` and reports whether it changed anything.
    ///
    /// Key repeats and presses of already-held keys are not changes. On focus loss
    /// every held key is dropped, so no key stays stuck when focus changes mid-press.
    pub fn apply_event(&mut self, ev: &InputEvent) -> bool {
        match ev {
            InputEvent::Key { repeat: true, .. } => false,
            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => self.keys_down.insert(*key),
                KeyState::Released => self.keys_down.remove(key),
            },
            InputEvent::CursorMoved { x, y } => {
                let changed = self.cursor != Some((*x, *y));
                self.cursor = Some((*x, *y));
                changed
            }
            InputEvent::Focused(f) => {
                // Dropping held keys is a change even when no focus gain was seen.
                let mut changed = self.focused != *f;
                self.focused = *f;
                if !*f {
                    changed |= !self.keys_down.is_empty();
                    self.keys_down.clear();
                }
                changed
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, repeat }
    }

    #[test]
    fn repeats_are_not_transitions() {
        let mut state = InputState::default();
        assert!(state.apply_event(&key(Key::W, KeyState::Pressed, false)));
        assert!(!state.apply_event(&key(Key::W, KeyState::Pressed, true)));
        assert!(!state.apply_event(&key(Key::W, KeyState::Pressed, false)));
        assert!(state.key_down(Key::W));
    }

    #[test]
    fn release_of_unheld_key_is_ignored() {
        let mut state = InputState::default();
        assert!(!state.apply_event(&key(Key::S, KeyState::Released, false)));
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        state.apply_event(&InputEvent::Focused(true));
        state.apply_event(&key(Key::A, KeyState::Pressed, false));
        assert!(state.apply_event(&InputEvent::Focused(false)));
        assert!(!state.key_down(Key::A));
    }

    #[test]
    fn focus_loss_without_prior_gain_still_drops_keys() {
        let mut state = InputState::default();
        state.apply_event(&key(Key::W, KeyState::Pressed, false));
        assert!(state.apply_event(&InputEvent::Focused(false)));
        assert!(!state.key_down(Key::W));
        assert!(!state.apply_event(&InputEvent::Focused(false)));
    }

    #[test]
    fn cursor_position_is_tracked() {
        let mut state = InputState::default();
        assert!(state.apply_event(&InputEvent::CursorMoved { x: 1.0, y: 2.0 }));
        assert!(!state.apply_event(&InputEvent::CursorMoved { x: 1.0, y: 2.0 }));
        assert_eq!(state.cursor, Some((1.0, 2.0)));
    }
}
