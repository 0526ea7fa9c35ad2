//! Input module for mdretro-core.
//!
//! Responsibilities:
//! - Map the emulated control pad's buttons onto the frontend's joypad layout.
//! - Name those buttons for the frontend's input configuration screen.
//!
//! The layout follows the physical pad: the A/B/C row sits on the
//! frontend's Y/B/A face buttons and X/Y/Z on L/X/R.

use crate::abi::Button;

/// Frontend joypad buttons. Discriminants are the libretro `DEVICE_ID_JOYPAD_*` ids.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum JoypadButton {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
}

/// Number of pads exposed to the frontend.
pub const PLAYERS: u32 = 2;

/// Convert an emulated pad button into the frontend joypad button it is bound to.
pub fn map_button(button: Button) -> JoypadButton {
    match button {
        Button::Up => JoypadButton::Up,
        Button::Down => JoypadButton::Down,
        Button::Left => JoypadButton::Left,
        Button::Right => JoypadButton::Right,
        Button::A => JoypadButton::Y,
        Button::B => JoypadButton::B,
        Button::C => JoypadButton::A,
        Button::X => JoypadButton::L,
        Button::Y => JoypadButton::X,
        Button::Z => JoypadButton::R,
        Button::Start => JoypadButton::Start,
        Button::Mode => JoypadButton::Select,
    }
}

/// Display names for every bound button, in pad order.
pub const DESCRIPTORS: [(Button, &str); 12] = [
    (Button::Up, "Up"),
    (Button::Down, "Down"),
    (Button::Left, "Left"),
    (Button::Right, "Right"),
    (Button::A, "A"),
    (Button::B, "B"),
    (Button::C, "C"),
    (Button::X, "X"),
    (Button::Y, "Y"),
    (Button::Z, "Z"),
    (Button::Start, "Start"),
    (Button::Mode, "Mode"),
];
