//! # Input Manager
//!
//! Translates window input into the DOM-shaped events the worker's proxy
//! registry consumes. The manager tracks what winit reports incrementally
//! (cursor position, modifier keys, active touches) so each forwarded event
//! carries the full state the orbit controller expects.
//!
//! Coordinates are forwarded in physical pixels; the `size` event the host
//! sends on resize uses the same unit.

use std::collections::BTreeMap;

use winit::{
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
};

use crate::engine_state::proxy::events::{KeyData, PointerData, TouchData, TouchPoint, WheelData};
use crate::engine_state::proxy::ProxyEventData;

/// Pixels scrolled per wheel line, as browsers report line deltas.
const PIXELS_PER_LINE: f32 = 40.0;

/// Pointer id used for the mouse.
const MOUSE_POINTER_ID: i64 = 1;

/// Keys forwarded as `keydown`, with their DOM key codes.
const ARROW_KEYS: [(KeyCode, u32); 4] = [
    (KeyCode::ArrowLeft, 37),
    (KeyCode::ArrowUp, 38),
    (KeyCode::ArrowRight, 39),
    (KeyCode::ArrowDown, 40),
];

/// Tracks input state and produces proxy events.
#[derive(Debug, Default)]
pub struct InputManager {
    /// Last cursor position
    cursor: (f32, f32),
    /// Current modifier keys
    modifiers: ModifiersState,
    /// Active touches by id
    touches: BTreeMap<u64, (f32, f32)>,
}

impl InputManager {
    /// Creates a manager with no buttons, keys or touches down.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes a window event.
    ///
    /// # Arguments
    /// * `event` - The window event to process
    ///
    /// # Returns
    /// The proxy event to forward, if the event is one the worker consumes
    pub fn intake_input(&mut self, event: &WindowEvent) -> Option<ProxyEventData> {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                Some(ProxyEventData::PointerMove(self.pointer(-1)))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let data = self.pointer(button_index(*button));
                Some(match state {
                    ElementState::Pressed => ProxyEventData::PointerDown(data),
                    ElementState::Released => ProxyEventData::PointerUp(data),
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (delta_x, delta_y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (-x * PIXELS_PER_LINE, -y * PIXELS_PER_LINE),
                    MouseScrollDelta::PixelDelta(position) => (-position.x as f32, -position.y as f32),
                };
                Some(ProxyEventData::Wheel(WheelData { delta_x, delta_y }))
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => ARROW_KEYS
                .iter()
                .find(|(code, _)| code == key)
                .map(|(_, key_code)| {
                    ProxyEventData::KeyDown(KeyData {
                        ctrl_key: self.modifiers.control_key(),
                        meta_key: self.modifiers.super_key(),
                        shift_key: self.modifiers.shift_key(),
                        key_code: *key_code,
                    })
                }),
            WindowEvent::Touch(touch) => Some(self.intake_touch(touch)),
            _ => None,
        }
    }

    /// Forgets held modifiers and touches, e.g. when the window loses focus.
    pub fn reset_inputs(&mut self) {
        self.modifiers = ModifiersState::empty();
        self.touches.clear();
    }

    fn pointer(&self, button: i32) -> PointerData {
        let (x, y) = self.cursor;
        PointerData {
            ctrl_key: self.modifiers.control_key(),
            meta_key: self.modifiers.super_key(),
            shift_key: self.modifiers.shift_key(),
            button,
            pointer_type: String::from("mouse"),
            client_x: x,
            client_y: y,
            pointer_id: MOUSE_POINTER_ID,
            page_x: x,
            page_y: y,
        }
    }

    fn intake_touch(&mut self, touch: &Touch) -> ProxyEventData {
        let location = (touch.location.x as f32, touch.location.y as f32);
        match touch.phase {
            TouchPhase::Started => {
                self.touches.insert(touch.id, location);
                ProxyEventData::TouchStart(self.touch_data())
            }
            TouchPhase::Moved => {
                self.touches.insert(touch.id, location);
                ProxyEventData::TouchMove(self.touch_data())
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&touch.id);
                ProxyEventData::TouchEnd(self.touch_data())
            }
        }
    }

    fn touch_data(&self) -> TouchData {
        TouchData {
            touches: self
                .touches
                .values()
                .map(|&(x, y)| TouchPoint {
                    page_x: x,
                    page_y: y,
                    client_x: x,
                    client_y: y,
                })
                .collect(),
        }
    }
}

/// DOM `button` index of a mouse button.
fn button_index(button: MouseButton) -> i32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(index) => index as i32,
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, TouchPhase};

    use super::*;

    fn device() -> DeviceId {
        // SAFETY: the id is only compared, never passed back to the platform.
        unsafe { DeviceId::dummy() }
    }

    fn touch(id: u64, phase: TouchPhase, x: f64, y: f64) -> WindowEvent {
        WindowEvent::Touch(Touch {
            device_id: device(),
            phase,
            location: PhysicalPosition::new(x, y),
            force: None,
            id,
        })
    }

    #[test]
    fn mouse_buttons_carry_cursor_and_dom_button() {
        let mut input = InputManager::new();
        input.intake_input(&WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(12.0, 34.0),
        });
        let event = input.intake_input(&WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button: MouseButton::Right,
        });
        match event {
            Some(ProxyEventData::PointerDown(data)) => {
                assert_eq!(data.button, 2);
                assert_eq!((data.client_x, data.client_y), (12.0, 34.0));
                assert_eq!(data.pointer_type, "mouse");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wheel_lines_become_dom_pixels() {
        let mut input = InputManager::new();
        let event = input.intake_input(&WindowEvent::MouseWheel {
            device_id: device(),
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: TouchPhase::Moved,
        });
        assert_eq!(
            event,
            Some(ProxyEventData::Wheel(WheelData { delta_x: 0.0, delta_y: -40.0 }))
        );
    }

    #[test]
    fn touches_track_the_active_set() {
        let mut input = InputManager::new();
        input.intake_input(&touch(1, TouchPhase::Started, 0.0, 0.0));
        let two = input.intake_input(&touch(2, TouchPhase::Started, 10.0, 0.0));
        assert!(matches!(two, Some(ProxyEventData::TouchStart(ref data)) if data.touches.len() == 2));
        let ended = input.intake_input(&touch(1, TouchPhase::Ended, 0.0, 0.0));
        assert!(matches!(ended, Some(ProxyEventData::TouchEnd(ref data)) if data.touches.len() == 1));
    }
}
