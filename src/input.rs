use glam::IVec2;
use winit::event::{ElementState, MouseButton, WindowEvent};

use crate::view::ViewState;

/// Angle units (1/16 degree) per pixel of pointer motion.
pub const DRAG_SENSITIVITY: i32 = 8;

/// Pointer buttons the controller distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            _ => PointerButton::Other,
        }
    }
}

/// Drag tracking state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Pointer position at the previous press or move.
        last: IVec2,
    },
}

/// Maps pointer drags onto the view's rotation.
///
/// Primary-button drags rotate about X (vertical motion) and Y (horizontal motion);
/// secondary-button drags rotate about X and Z. Every release while dragging notifies
/// the `clicked` observers, including a press-release with no motion in between.
///
/// A release that arrives while idle (its press happened outside the window, or
/// was already consumed) notifies nobody: `clicked` always pairs with a press.
pub struct InputController {
    state: DragState,
    cursor: IVec2,
    primary_down: bool,
    secondary_down: bool,
    other_down: bool,
    clicked: Vec<Box<dyn FnMut()>>,
}

impl Default for InputController {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
            cursor: IVec2::ZERO,
            primary_down: false,
            secondary_down: false,
            other_down: false,
            clicked: Vec::new(),
        }
    }
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Registers an observer for the `clicked` notification.
    pub fn on_clicked(&mut self, observer: impl FnMut() + 'static) {
        self.clicked.push(Box::new(observer));
    }

    /// Routes a winit window event. Positions are truncated to whole pixels.
    pub fn handle_event(&mut self, event: &WindowEvent, view: &mut ViewState) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let pos = IVec2::new(position.x as i32, position.y as i32);
                self.pointer_moved(pos, view);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pos = self.cursor;
                match state {
                    ElementState::Pressed => self.pointer_pressed(pos, (*button).into()),
                    ElementState::Released => {
                        self.pointer_released(pos, (*button).into());
                    }
                }
            }
            _ => {}
        }
    }

    pub fn pointer_pressed(&mut self, pos: IVec2, button: PointerButton) {
        self.cursor = pos;
        self.set_button(button, true);
        self.state = DragState::Dragging { last: pos };
    }

    pub fn pointer_moved(&mut self, pos: IVec2, view: &mut ViewState) {
        self.cursor = pos;

        let DragState::Dragging { last } = self.state else {
            return;
        };

        let delta = pos - last;
        let rotation = *view.rotation();

        if self.primary_down {
            view.set_x_rotation(rotation.x_rot().wrapping_add(DRAG_SENSITIVITY * delta.y));
            view.set_y_rotation(rotation.y_rot().wrapping_add(DRAG_SENSITIVITY * delta.x));
        } else if self.secondary_down {
            view.set_x_rotation(rotation.x_rot().wrapping_add(DRAG_SENSITIVITY * delta.y));
            view.set_z_rotation(rotation.z_rot().wrapping_add(DRAG_SENSITIVITY * delta.x));
        }

        self.state = DragState::Dragging { last: pos };
    }

    /// Returns `true` if `clicked` was emitted.
    pub fn pointer_released(&mut self, pos: IVec2, button: PointerButton) -> bool {
        self.cursor = pos;
        self.set_button(button, false);

        if self.state == DragState::Idle {
            return false;
        }

        if !(self.primary_down || self.secondary_down || self.other_down) {
            self.state = DragState::Idle;
        }

        for observer in &mut self.clicked {
            observer();
        }
        true
    }

    fn set_button(&mut self, button: PointerButton, down: bool) {
        match button {
            PointerButton::Primary => self.primary_down = down,
            PointerButton::Secondary => self.secondary_down = down,
            PointerButton::Other => self.other_down = down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::normalize_angle;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn primary_drag_rotates_x_and_y() {
        let mut input = InputController::new();
        let mut view = ViewState::new();

        input.pointer_pressed(IVec2::new(100, 100), PointerButton::Primary);
        input.pointer_moved(IVec2::new(110, 105), &mut view);

        assert_eq!(view.rotation().x_rot(), normalize_angle(40));
        assert_eq!(view.rotation().y_rot(), normalize_angle(80));
        assert_eq!(view.rotation().z_rot(), 0);
        assert!(view.is_dirty());
    }

    #[test]
    fn secondary_drag_rotates_x_and_z() {
        let mut input = InputController::new();
        let mut view = ViewState::new();

        input.pointer_pressed(IVec2::new(0, 0), PointerButton::Secondary);
        input.pointer_moved(IVec2::new(-3, 2), &mut view);

        assert_eq!(view.rotation().x_rot(), 16);
        assert_eq!(view.rotation().y_rot(), 0);
        assert_eq!(view.rotation().z_rot(), normalize_angle(-24));
    }

    #[test]
    fn deltas_are_relative_to_last_move() {
        let mut input = InputController::new();
        let mut view = ViewState::new();

        input.pointer_pressed(IVec2::new(0, 0), PointerButton::Primary);
        input.pointer_moved(IVec2::new(1, 0), &mut view);
        input.pointer_moved(IVec2::new(3, 0), &mut view);

        assert_eq!(view.rotation().y_rot(), 24);
        assert_eq!(input.state(), DragState::Dragging { last: IVec2::new(3, 0) });
    }

    #[test]
    fn other_button_only_tracks_position() {
        let mut input = InputController::new();
        let mut view = ViewState::new();

        input.pointer_pressed(IVec2::new(0, 0), PointerButton::Other);
        input.pointer_moved(IVec2::new(50, 50), &mut view);

        assert_eq!(*view.rotation(), Default::default());
        assert!(!view.is_dirty());
        assert_eq!(input.state(), DragState::Dragging { last: IVec2::new(50, 50) });
    }

    #[test]
    fn motion_while_idle_is_ignored() {
        let mut input = InputController::new();
        let mut view = ViewState::new();

        input.pointer_moved(IVec2::new(20, 20), &mut view);
        assert_eq!(input.state(), DragState::Idle);
        assert!(!view.is_dirty());
    }

    #[test]
    fn zero_motion_release_still_clicks_once() {
        let clicks = Rc::new(Cell::new(0));
        let mut input = InputController::new();
        let counter = Rc::clone(&clicks);
        input.on_clicked(move || counter.set(counter.get() + 1));

        input.pointer_pressed(IVec2::new(10, 10), PointerButton::Primary);
        assert!(input.pointer_released(IVec2::new(10, 10), PointerButton::Primary));

        assert_eq!(clicks.get(), 1);
        assert_eq!(input.state(), DragState::Idle);
    }

    #[test]
    fn release_without_press_does_not_click() {
        let mut input = InputController::new();
        assert!(!input.pointer_released(IVec2::ZERO, PointerButton::Primary));
    }
}
