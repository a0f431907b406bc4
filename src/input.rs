//! Window input, collected per frame.
//!
//! [`Input`] turns raw winit events into the experience's controls: key
//! presses become [`Action`]s, a left-button drag orbits the camera and the
//! wheel zooms.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Something a key press asks the experience to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Reveal,
    Hide,
    /// Regenerate the energy fields. Debug builds of the scene only.
    ResetFields,
}

impl Action {
    pub fn for_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyR => Some(Action::Reveal),
            KeyCode::KeyH => Some(Action::Hide),
            KeyCode::KeyF => Some(Action::ResetFields),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: Vec<KeyCode>,
    dragging: bool,
    mouse_position: Option<Vec2>,
    /// Drag distance this frame, in pixels.
    drag_delta: Vec2,
    /// Positive scrolls up/forward.
    scroll_delta: f32,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions requested since the last [`Input::begin_frame`], in order.
    pub fn actions(&self) -> Vec<Action> {
        self.keys_pressed
            .iter()
            .filter_map(|&key| Action::for_key(key))
            .collect()
    }

    pub fn drag_delta(&self) -> Vec2 {
        self.drag_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.drag_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }
            _ => {}
        }
    }

    // Held keys do not repeat
    fn press(&mut self, key: KeyCode) {
        if self.keys_held.insert(key) {
            self.keys_pressed.push(key);
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        if let (true, Some(last)) = (self.dragging, self.mouse_position) {
            self.drag_delta += position - last;
        }
        self.mouse_position = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_maps_to_action_once() {
        let mut input = Input::new();
        input.press(KeyCode::KeyR);
        input.press(KeyCode::KeyR);
        input.press(KeyCode::KeyQ);
        input.press(KeyCode::KeyF);
        assert_eq!(input.actions(), vec![Action::Reveal, Action::ResetFields]);

        input.begin_frame();
        assert!(input.actions().is_empty());
    }

    #[test]
    fn test_drag_accumulates_only_while_pressed() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(10.0, 10.0));
        input.move_cursor(Vec2::new(20.0, 10.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.dragging = true;
        input.move_cursor(Vec2::new(25.0, 12.0));
        input.move_cursor(Vec2::new(30.0, 14.0));
        assert_eq!(input.drag_delta(), Vec2::new(10.0, 4.0));
    }
}
