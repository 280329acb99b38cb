//! Keyboard state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every tick the key
//!   is physically down. Horizontal movement reads this.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only until the
//!   main loop calls `end_frame()`, which it does only after at least one fixed
//!   simulation tick has consumed them. A jump press that lands on a frame with
//!   zero ticks is therefore kept for the next frame instead of being lost.
//!
//! OS key repeat arrives as repeated key-down events for a key that is already
//! held. Those never produce a new edge.

use std::collections::HashSet;

/// Gameplay keys. Engine shortcuts (quit, overlay) are handled by the window
/// layer and never reach the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Drop every held key, e.g. when the window loses focus and key-up
    /// events will never arrive.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Up);
        assert!(input.is_held(Key::Up));
        assert!(input.is_just_pressed(Key::Up));
    }

    #[test]
    fn test_key_up_clears_held_sets_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_up(Key::Left);
        assert!(!input.is_held(Key::Left));
        assert!(input.is_just_released(Key::Left));
    }

    #[test]
    fn test_key_repeat_does_not_create_new_edge() {
        let mut input = InputState::new();
        input.key_down(Key::Up);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Up));

        // OS auto-repeat while the key stays down.
        input.key_down(Key::Up);
        input.key_down(Key::Up);
        assert!(input.is_held(Key::Up));
        assert!(!input.is_just_pressed(Key::Up));
    }

    #[test]
    fn test_key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Right);
        assert!(!input.is_just_released(Key::Right));
        assert!(!input.is_held(Key::Right));
    }

    #[test]
    fn test_end_frame_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Up);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Left));
        assert!(!input.is_just_pressed(Key::Up));
        assert!(input.is_held(Key::Left));
        assert!(input.is_held(Key::Up));
    }

    #[test]
    fn test_end_frame_clears_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_up(Key::Right);
        assert!(input.is_just_released(Key::Right));
        input.end_frame();
        assert!(!input.is_just_released(Key::Right));
    }

    #[test]
    fn test_left_and_right_are_independent() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Right);
        assert!(input.is_held(Key::Left));
        assert!(input.is_held(Key::Right));

        input.key_up(Key::Left);
        assert!(!input.is_held(Key::Left));
        assert!(input.is_held(Key::Right));
        assert!(!input.is_just_released(Key::Right));
    }

    #[test]
    fn test_release_all_releases_every_held_key() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Up);
        input.end_frame();

        input.release_all();
        assert!(!input.is_held(Key::Left));
        assert!(!input.is_held(Key::Up));
        assert!(input.is_just_released(Key::Left));
        assert!(input.is_just_released(Key::Up));
    }

    #[test]
    fn test_default_state_is_empty() {
        let input = InputState::new();
        for key in [Key::Left, Key::Right, Key::Up] {
            assert!(!input.is_held(key));
            assert!(!input.is_just_pressed(key));
            assert!(!input.is_just_released(key));
        }
    }
}
