//! Emulator core for the original monochrome handheld (DMG). The four
//! hardware units advance in lockstep: every `Emulator::step` lets the CPU
//! retire one instruction, then feeds the returned machine-cycle count to
//! the PPU and the timer. ROM loading, input devices, display scaling and
//! test-harness drivers are left to the embedding frontend, which talks to
//! the core through `Emulator`, the bus and the published framebuffer.

#[macro_use]
extern crate bitflags;

use crate::bus::{InterruptRegister, MainBus};
use crate::cartridge::Cartridge;
use crate::constants::*;
use crate::cpu::CPU;
use crate::joypad::Buttons;
use crate::ppu::PPU;
use crate::ppu::buffer::FrameBuffer;
use crate::timer::Timer;
use std::io;
use thiserror::Error;

pub mod bus;
pub mod cartridge;
pub mod constants;
pub mod cpu;
pub mod joypad;
pub mod ppu;
#[cfg(test)]
pub mod tests;
pub mod timer;
mod utils;

pub const SCREEN_WIDTH: u8 = 160;
pub const SCREEN_HEIGHT: u8 = 144;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Byte 0x147 of the image names a bank controller this core does not
    /// implement. Construction recovers by falling back to "no MBC", so this
    /// is only ever surfaced as a warning.
    #[error("unsupported cartridge type {code:#04x}")]
    UnsupportedCartridge { code: u8 },

    #[error("cartridge image of {len} bytes is smaller than the 32 KiB minimum")]
    ImageTooSmall { len: usize },

    /// One of the documented-illegal opcodes was fetched. Real hardware
    /// locks up; the core aborts the step instead.
    #[error("unrecognized opcode {opcode:#04x} (CB-prefixed: {prefixed})")]
    UnknownOpcode { opcode: u8, prefixed: bool },

    #[error("failed to read cartridge image")]
    Io(#[from] io::Error),
}

/// This trait defines a common interface for all subsystems of the emulator.
/// Everything a processing unit does to the outside world goes through these
/// two methods; the helpers address the I/O register page and the interrupt
/// flag without every caller repeating the arithmetic.
pub trait SubSystem {
    /// Writes a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Reads a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Reads the I/O register at `0xFF00 + reg`.
    #[inline]
    fn read_io(&mut self, reg: u8) -> u8 {
        self.read(IO_BEGIN | u16::from(reg))
    }

    /// Writes the I/O register at `0xFF00 + reg`.
    #[inline]
    fn write_io(&mut self, reg: u8, value: u8) {
        self.write(IO_BEGIN | u16::from(reg), value)
    }

    /// Raises the given interrupt request bits in IF.
    #[inline]
    fn request_interrupt(&mut self, irq: InterruptRegister) {
        let flags = self.read(INTERRUPT_FLAG);
        self.write(INTERRUPT_FLAG, flags | irq.bits());
    }
}

/// Holds the four hardware units and drives them in lockstep.
pub struct Emulator {
    pub cpu: CPU,
    pub ppu: PPU,
    pub timer: Timer,
    pub bus: MainBus,
}

impl Emulator {
    /// Builds an emulator in post-boot state: CPU registers and the I/O page
    /// hold the values the internal boot ROM leaves behind, and execution
    /// starts at the cartridge entry point 0x0100.
    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        let mut bus = MainBus::with_cartridge(cartridge);
        for (reg, value) in POST_BOOT_IO {
            bus.write_io(reg, value);
        }
        bus.write(INTERRUPT_ENABLE, 0x00);

        let mut cpu = CPU::default();
        cpu.r.set_af(0x01B0);
        cpu.r.set_bc(0x0013);
        cpu.r.set_de(0x00D8);
        cpu.r.set_hl(0x014D);
        cpu.sp = 0xFFFE;
        cpu.pc = 0x0100;

        Self {
            cpu,
            ppu: PPU::default(),
            timer: Timer::default(),
            bus,
        }
    }

    /// One driver iteration: the CPU services at most one interrupt and
    /// retires at most one instruction, then the PPU and the timer advance
    /// by the same number of machine cycles. Returns that cycle count.
    ///
    /// Interrupts raised by the PPU or the timer during this iteration are
    /// observed by the CPU on the next one.
    pub fn step(&mut self) -> CoreResult<u8> {
        let cycles = self.cpu.step(&mut self.bus)?;
        self.ppu.step(&mut self.bus, cycles, true);
        self.timer.step(&mut self.bus, cycles);
        Ok(cycles)
    }

    /// Marks a host button as held down. The new state is sampled at the
    /// start of the next CPU step.
    #[inline]
    pub fn button_on(&mut self, button: Buttons) {
        self.cpu.joypad.press(button);
    }

    /// Marks a host button as released.
    #[inline]
    pub fn button_off(&mut self, button: Buttons) {
        self.cpu.joypad.release(button);
    }

    /// The most recently published frame. Stable between VBlank entries;
    /// hosts should read it between driver iterations.
    #[inline]
    pub fn framebuffer(&self) -> &FrameBuffer {
        self.ppu.framebuffer()
    }
}
