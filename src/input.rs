//! Controller ports and [`Joypad`] shift registers.
//!
//! <https://www.nesdev.org/wiki/Standard_controller>

use crate::common::{Reset, ResetKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[must_use]
#[error("failed to parse `Player`")]
pub struct ParsePlayerError;

/// Controller port.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum Player {
    #[default]
    One,
    Two,
}

impl TryFrom<usize> for Player {
    type Error = ParsePlayerError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::One),
            1 => Ok(Self::Two),
            _ => Err(ParsePlayerError),
        }
    }
}

/// A single controller button.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoypadBtn {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

bitflags! {
    /// Button state bitmap in shift-register read order.
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[must_use]
    pub struct JoypadBtnState: u8 {
        const A = 0x01;
        const B = 0x02;
        const SELECT = 0x04;
        const START = 0x08;
        const UP = 0x10;
        const DOWN = 0x20;
        const LEFT = 0x40;
        const RIGHT = 0x80;
    }
}

impl From<JoypadBtn> for JoypadBtnState {
    fn from(button: JoypadBtn) -> Self {
        match button {
            JoypadBtn::A => Self::A,
            JoypadBtn::B => Self::B,
            JoypadBtn::Select => Self::SELECT,
            JoypadBtn::Start => Self::START,
            JoypadBtn::Up => Self::UP,
            JoypadBtn::Down => Self::DOWN,
            JoypadBtn::Left => Self::LEFT,
            JoypadBtn::Right => Self::RIGHT,
        }
    }
}

/// A standard NES controller: an 8-button bitmap latched into a shift
/// register by the strobe, then read back one bit per read.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Joypad {
    pub buttons: JoypadBtnState,
    pub index: u8,
    pub strobe: bool,
}

impl Joypad {
    pub const fn new() -> Self {
        Self {
            buttons: JoypadBtnState::empty(),
            index: 0,
            strobe: false,
        }
    }

    pub fn set_button(&mut self, button: JoypadBtn, pressed: bool) {
        self.buttons.set(button.into(), pressed);
    }

    #[must_use]
    pub const fn button(&self, button: JoypadBtnState) -> bool {
        self.buttons.contains(button)
    }

    /// $4016 write. Strobe high continuously reloads the shift register.
    pub fn write(&mut self, val: u8) {
        self.strobe = val & 0x01 == 0x01;
        if self.strobe {
            self.index = 0;
        }
    }

    /// Shift out one button bit. Reads past the 8th return 1.
    pub fn read(&mut self) -> u8 {
        let val = self.peek();
        if self.index < 8 && !self.strobe {
            self.index += 1;
        }
        val
    }

    /// Non-mutating version of `read`.
    #[must_use]
    pub fn peek(&self) -> u8 {
        if self.index < 8 {
            u8::from(self.buttons.bits() & (1 << self.index) != 0)
        } else {
            0x01
        }
    }

    pub fn clear(&mut self) {
        self.buttons = JoypadBtnState::empty();
    }
}

impl Reset for Joypad {
    fn reset(&mut self, _kind: ResetKind) {
        *self = Self::new();
    }
}

/// The two controller ports behind $4016/$4017.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Input {
    pub joypads: [Joypad; 2],
}

impl Input {
    pub const fn new() -> Self {
        Self {
            joypads: [Joypad::new(), Joypad::new()],
        }
    }

    pub const fn joypad(&self, player: Player) -> &Joypad {
        &self.joypads[player as usize]
    }

    pub const fn joypad_mut(&mut self, player: Player) -> &mut Joypad {
        &mut self.joypads[player as usize]
    }

    /// $4016/$4017 read: D0 carries the button bit, D6 reflects open bus.
    pub fn read(&mut self, player: Player) -> u8 {
        self.joypads[player as usize].read() | 0x40
    }

    #[must_use]
    pub fn peek(&self, player: Player) -> u8 {
        self.joypads[player as usize].peek() | 0x40
    }

    /// $4016 write strobes both controllers.
    pub fn write(&mut self, val: u8) {
        for pad in &mut self.joypads {
            pad.write(val);
        }
    }

    pub fn clear(&mut self) {
        for pad in &mut self.joypads {
            pad.clear();
        }
    }
}

impl Reset for Input {
    fn reset(&mut self, kind: ResetKind) {
        for pad in &mut self.joypads {
            pad.reset(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strobe_latches_and_reads_shift() {
        let mut joypad = Joypad::new();
        joypad.set_button(JoypadBtn::A, true);
        joypad.set_button(JoypadBtn::Start, true);

        joypad.write(0x01); // strobe high
        assert_eq!(joypad.read() & 0x01, 1, "A repeats while strobed");
        assert_eq!(joypad.read() & 0x01, 1);

        joypad.write(0x00); // strobe low, begin shifting
        let expected = [1, 0, 0, 1, 0, 0, 0, 0]; // A, B, Select, Start, ...
        for (i, expected) in expected.iter().enumerate() {
            assert_eq!(joypad.read() & 0x01, *expected, "button bit {i}");
        }
        assert_eq!(joypad.read() & 0x01, 1, "9th read returns 1");
        assert_eq!(joypad.read() & 0x01, 1, "later reads return 1");
    }
}
