use crate::SubSystem;
use crate::cartridge::Cartridge;
use crate::constants::*;

bitflags! {
    /// Represents interrupt registers IE at 0xFFFF and IF at 0xFF0F.
    #[derive(Copy, Clone, PartialEq, Debug, Default)]
    pub struct InterruptRegister: u8 {
        const VBLANK = 0b00000001; // V-Blank Interrupt
        const STAT   = 0b00000010; // LCD STAT Interrupt
        const TIMER  = 0b00000100; // Timer Overflow Interrupt
        const SERIAL = 0b00001000; // Serial Transfer Completion Interrupt
        const JOYPAD = 0b00010000; // Joypad Input Interrupt
    }
}

/// The CPU-visible address space, all processing units access memory
/// through it.
///
/// The space is held as one flat 64 KiB array; the cartridge only intercepts
/// it in two places. Reads from the switchable area resolve against the
/// image through the bank latches, and writes below 0x8000 move those
/// latches without ever touching the array, so the ROM area stays exactly
/// as it was seeded.
pub struct MainBus {
    pub cartridge: Cartridge,
    mem: Box<[u8; 0x10000]>,
}

impl MainBus {
    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        let mut mem: Box<[u8; 0x10000]> = vec![0u8; 0x10000].try_into().unwrap();
        // Seed the fixed ROM window. For images without a controller the
        // whole program is served from the array.
        let rom = cartridge.rom();
        let len = rom.len().min(2 * ROM_BANK_SIZE);
        mem[..len].copy_from_slice(&rom[..len]);
        Self { cartridge, mem }
    }

    /// Performs the synchronous OAM-DMA transfer: 160 bytes starting at
    /// `value << 8` are copied into OAM. CPU stalls are not modelled and the
    /// transfer itself consumes no cycles.
    fn oam_dma_transfer(&mut self, value: u8) {
        let source = u16::from(value) << 8;
        for offset in 0..OAM_SIZE as u16 {
            let byte = self.read(source.wrapping_add(offset));
            self.mem[usize::from(OAM_BEGIN + offset)] = byte;
        }
    }
}

impl SubSystem for MainBus {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            // ROM is immutable; these writes drive the bank controller.
            ROM_LOW_BANK_BEGIN..=ROM_HIGH_BANK_END => self.cartridge.write(address, value),
            _ => {
                if address == IO_BEGIN + u16::from(REG_OAM_DMA) {
                    self.oam_dma_transfer(value);
                }
                self.mem[usize::from(address)] = value;
            }
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            ROM_HIGH_BANK_BEGIN..=ROM_HIGH_BANK_END => self
                .cartridge
                .read_high_bank(address)
                .unwrap_or(self.mem[usize::from(address)]),
            _ => self.mem[usize::from(address)],
        }
    }
}
