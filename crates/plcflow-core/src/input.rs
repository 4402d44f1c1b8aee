//! Pointer and keyboard events fed to the canvas.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Whether the modifiers ask to extend the current selection.
    pub fn extends_selection(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Pointer event in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
}

impl PointerEvent {
    /// Primary-button press without modifiers.
    pub fn press(position: Point) -> Self {
        PointerEvent::Down {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    /// Primary-button release.
    pub fn release(position: Point) -> Self {
        PointerEvent::Up {
            position,
            button: MouseButton::Left,
        }
    }

    pub fn moved(position: Point) -> Self {
        PointerEvent::Move { position }
    }

    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. } | PointerEvent::Up { position, .. } | PointerEvent::Move { position } => {
                position
            }
        }
    }
}

/// Editing commands bound to keys by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCommand {
    /// Abort the wire being drawn.
    Escape,
    /// Delete selected wires and blocks.
    Delete,
    Copy,
    Paste,
    SelectAll,
}

impl KeyCommand {
    /// Map a key name plus modifiers to a command, as a desktop shell would.
    pub fn from_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        let command = modifiers.ctrl || modifiers.meta;
        match key {
            "Escape" => Some(KeyCommand::Escape),
            "Delete" | "Backspace" => Some(KeyCommand::Delete),
            "c" | "C" if command => Some(KeyCommand::Copy),
            "v" | "V" if command => Some(KeyCommand::Paste),
            "a" | "A" if command => Some(KeyCommand::SelectAll),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        assert_eq!(KeyCommand::from_key("Escape", Modifiers::default()), Some(KeyCommand::Escape));
        assert_eq!(KeyCommand::from_key("Backspace", Modifiers::default()), Some(KeyCommand::Delete));
        assert_eq!(KeyCommand::from_key("c", ctrl), Some(KeyCommand::Copy));
        assert_eq!(KeyCommand::from_key("c", Modifiers::default()), None);
        assert_eq!(KeyCommand::from_key("A", ctrl), Some(KeyCommand::SelectAll));
    }

    #[test]
    fn test_pointer_position() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(PointerEvent::press(p).position(), p);
        assert_eq!(PointerEvent::release(p).position(), p);
        assert_eq!(PointerEvent::moved(p).position(), p);
    }
}
