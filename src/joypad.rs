use crate::SubSystem;
use crate::constants::REG_JOYP;

bitflags! {
    /// Host-side button mask. The upper nibble carries the directional pad,
    /// the lower nibble the action buttons; this is also the bit layout the
    /// host API speaks.
    #[derive(Copy, Clone, PartialEq, Debug, Default)]
    pub struct Buttons: u8 {
        const DOWN   = 0b1000_0000;
        const UP     = 0b0100_0000;
        const LEFT   = 0b0010_0000;
        const RIGHT  = 0b0001_0000;
        const START  = 0b0000_1000;
        const SELECT = 0b0000_0100;
        const B      = 0b0000_0010;
        const A      = 0b0000_0001;
    }
}

/// Represents the Joypad matrix at register 0xFF00.
/// The program selects a button row by writing the two select bits, then
/// reads the row back from bits 0-3. Rather unconventionally for the Game
/// Boy, a pressed button reads as 0, not 1.
///
/// The host mutates the button mask asynchronously; the matrix itself is
/// refreshed from the mask at the start of every CPU step.
#[derive(Copy, Clone, Debug, Default)]
pub struct Joypad {
    buttons: Buttons,
}

impl Joypad {
    #[inline]
    pub fn press(&mut self, button: Buttons) {
        self.buttons.insert(button);
    }

    #[inline]
    pub fn release(&mut self, button: Buttons) {
        self.buttons.remove(button);
    }

    /// Mirrors the selected half of the (inverted) button mask into the low
    /// nibble of the register. With neither row selected the register is
    /// forced to 0xFF once it reads exactly 0x03.
    pub fn refresh<T: SubSystem>(&self, bus: &mut T) {
        let joyp = bus.read_io(REG_JOYP);
        let released = !self.buttons.bits();
        if joyp & 0b0010_0000 != 0 {
            bus.write_io(REG_JOYP, (joyp & 0xF0) | (released >> 4));
        } else if joyp & 0b0001_0000 != 0 {
            bus.write_io(REG_JOYP, (joyp & 0xF0) | (released & 0x0F));
        } else if joyp == 0x03 {
            bus.write_io(REG_JOYP, 0xFF);
        }
    }
}
