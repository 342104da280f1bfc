use crate::constants::*;
use crate::{CoreError, CoreResult};
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::{fmt, fs};

/// This area of memory contains the cartridge title.
const CARTRIDGE_TITLE_BEGIN: u16 = 0x0134;
const CARTRIDGE_TITLE_END: u16 = 0x0142;

/// This address contains the cartridge type and what kind of hardware is present.
/// See https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
const CARTRIDGE_TYPE: u16 = 0x0147;

/// These bytes contain a 16-bit (big-endian) checksum computed as the sum of
/// all the bytes of the cartridge ROM (except these two checksum bytes).
const CARTRIDGE_GLOBAL_CHECKSUM1: u16 = 0x014E;
const CARTRIDGE_GLOBAL_CHECKSUM2: u16 = 0x014F;

/// The smallest valid image: two fixed 16 KiB banks.
const MIN_IMAGE_SIZE: usize = 2 * ROM_BANK_SIZE;

/// Before external RAM can be read or written it must be enabled by writing
/// 0x0A to anywhere in this address space. This core accepts the latch but
/// does not act on it; cartridge RAM stays reachable through the bus array.
const RAM_ENABLE_BEGIN: u16 = 0x0000;
const RAM_ENABLE_END: u16 = 0x1FFF;

/// Selects the ROM bank mapped into 0x4000-0x7FFF. Banks 0x00, 0x20, 0x40
/// and 0x60 select the following bank instead, so they are unreachable
/// through this register. This is the classic MBC1 quirk.
const ROM_BANK_NUMBER_BEGIN: u16 = 0x2000;
const ROM_BANK_NUMBER_END: u16 = 0x3FFF;

/// Secondary 2-bit banking register. Depending on the banking mode it either
/// contributes bits 5-6 of the ROM bank number or replaces its low 2 bits.
const UPPER_BANK_NUMBER_BEGIN: u16 = 0x4000;
const UPPER_BANK_NUMBER_END: u16 = 0x5FFF;

/// Selects how the secondary banking register is interpreted.
const BANKING_MODE_SELECT_BEGIN: u16 = 0x6000;
const BANKING_MODE_SELECT_END: u16 = 0x7FFF;

/// The memory bank controller soldered onto the cartridge.
/// MBC1 and MBC3 share one bank-select protocol in this core; MBC3's RTC
/// registers are not exposed. MBC2/5/6/7 are recognised in the header but
/// not implemented.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum MbcKind {
    NoMbc,
    Mbc1,
    Mbc3,
}

impl TryFrom<u8> for MbcKind {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x00 => MbcKind::NoMbc,
            0x01..=0x03 => MbcKind::Mbc1,
            0x0F..=0x13 => MbcKind::Mbc3,
            // 0x05/0x06 would be MBC2, 0x19..=0x1E MBC5; neither is wired up.
            _ => return Err(CoreError::UnsupportedCartridge { code: value }),
        };
        Ok(kind)
    }
}

impl fmt::Display for MbcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MbcKind::NoMbc => "NoMBC",
            MbcKind::Mbc1 => "MBC1",
            MbcKind::Mbc3 => "MBC3",
        };
        write!(f, "{name}")
    }
}

/// Parsed cartridge header information.
#[derive(Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub kind: MbcKind,
}

impl CartridgeHeader {
    fn parse(buf: &[u8]) -> CoreResult<Self> {
        let kind = match MbcKind::try_from(buf[CARTRIDGE_TYPE as usize]) {
            Ok(kind) => kind,
            Err(err) => {
                // Unknown controllers fall back to a plain 32 KiB mapping.
                // Code that relies on banking is on its own from here.
                warn!("{err}, continuing without a bank controller");
                MbcKind::NoMbc
            }
        };
        Ok(Self {
            title: Self::parse_title(buf),
            kind,
        })
    }

    /// Returns the printable cartridge title from the header.
    fn parse_title(buf: &[u8]) -> String {
        let title = buf[CARTRIDGE_TITLE_BEGIN as usize..=CARTRIDGE_TITLE_END as usize]
            .iter()
            .filter_map(|b| b.is_ascii_alphanumeric().then_some(char::from(*b)))
            .collect::<String>();
        match title.is_empty() {
            true => "Unnamed".to_string(),
            false => title,
        }
    }
}

impl fmt::Display for CartridgeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.kind)
    }
}

/// A read-only cartridge image together with the bank-controller latches.
///
/// The image itself is never written; writes into 0x0000-0x7FFF only move
/// the latches below.
#[derive(Clone)]
pub struct Cartridge {
    pub header: CartridgeHeader,
    rom: Arc<[u8]>,
    rom_bank: usize,
    rom_mode: u8,
}

impl TryFrom<Arc<[u8]>> for Cartridge {
    type Error = CoreError;

    fn try_from(rom: Arc<[u8]>) -> Result<Self, Self::Error> {
        if rom.len() < MIN_IMAGE_SIZE {
            return Err(CoreError::ImageTooSmall { len: rom.len() });
        }
        if let Err(msg) = verify_checksum(rom.as_ref()) {
            warn!("{msg}");
        }
        let header = CartridgeHeader::parse(rom.as_ref())?;
        debug!("identified cartridge: {header}");
        Ok(Self {
            header,
            rom,
            rom_bank: 1,
            rom_mode: 0,
        })
    }
}

impl TryFrom<&Path> for Cartridge {
    type Error = CoreError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let rom = fs::read(path)?;
        Cartridge::try_from(Arc::from(rom.into_boxed_slice()))
    }
}

impl fmt::Display for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)
    }
}

impl Cartridge {
    /// The raw image, used by the bus to seed the fixed ROM area.
    #[inline]
    pub(crate) fn rom(&self) -> &[u8] {
        &self.rom
    }

    /// Whether a bank controller is present at all.
    #[inline]
    pub fn has_controller(&self) -> bool {
        self.header.kind != MbcKind::NoMbc
    }

    /// The currently selected switchable bank.
    #[inline]
    pub fn rom_bank(&self) -> usize {
        self.rom_bank
    }

    /// Resolves a read from the switchable area (0x4000-0x7FFF) against the
    /// image. Returns `None` when no controller is mapped in, in which case
    /// the bus serves the read from its own array.
    pub fn read_high_bank(&self, address: u16) -> Option<u8> {
        if !self.has_controller() || self.rom_bank == 0 {
            return None;
        }
        let offset = self.rom_bank * ROM_BANK_SIZE + usize::from(address & 0x3FFF);
        Some(self.rom[offset % self.rom.len()])
    }

    /// Handles a write into cartridge address space. Only the controller
    /// latches move; the image is immutable.
    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            RAM_ENABLE_BEGIN..=RAM_ENABLE_END => {}
            ROM_BANK_NUMBER_BEGIN..=ROM_BANK_NUMBER_END => {
                let mut bank = usize::from(value);
                if let 0x00 | 0x20 | 0x40 | 0x60 = bank {
                    bank += 1;
                }
                self.rom_bank = bank;
            }
            UPPER_BANK_NUMBER_BEGIN..=UPPER_BANK_NUMBER_END => {
                let bits = usize::from(value & 0b11);
                match self.rom_mode {
                    0 => self.rom_bank |= bits << 5,
                    _ => self.rom_bank = (self.rom_bank & !0b11) | bits,
                }
            }
            BANKING_MODE_SELECT_BEGIN..=BANKING_MODE_SELECT_END => {
                self.rom_mode = u8::from(value > 0);
            }
            _ => unreachable!("cartridge write outside ROM area: {address:#06x}"),
        }
    }
}

/// Validates the global checksum of the given image.
/// A mismatch is common with homebrew and patched ROMs, so the caller only
/// warns about it.
fn verify_checksum(buf: &[u8]) -> Result<(), String> {
    let byte1 = buf[CARTRIDGE_GLOBAL_CHECKSUM1 as usize];
    let byte2 = buf[CARTRIDGE_GLOBAL_CHECKSUM2 as usize];
    let checksum = u16::from(byte1) << 8 | u16::from(byte2);
    let calculated = calculate_global_checksum(buf);

    match checksum == calculated {
        true => Ok(()),
        false => Err(format!(
            "global checksum mismatch, expected {calculated:#06x} got {checksum:#06x}"
        )),
    }
}

/// Sums all bytes of the image except the two checksum bytes themselves.
fn calculate_global_checksum(buf: &[u8]) -> u16 {
    buf.iter()
        .enumerate()
        .fold(0u16, |sum, (address, &byte)| match address as u16 {
            CARTRIDGE_GLOBAL_CHECKSUM1 | CARTRIDGE_GLOBAL_CHECKSUM2 => sum,
            _ => sum.wrapping_add(u16::from(byte)),
        })
}
