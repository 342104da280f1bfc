bitflags! {
    /// Represents LCDC at 0xFF40
    #[derive(Copy, Clone, PartialEq, Debug)]
    pub struct LCDControl: u8 {
        const BG_EN    = 0b00000001; // BG Enable
        const OBJ_EN   = 0b00000010; // OBJ Enable
        const OBJ_SIZE = 0b00000100; // OBJ Size
        const BG_MAP   = 0b00001000; // BG Tile Map Address
        const TILE_SEL = 0b00010000; // BG & Window Tile Data
        const WIN_EN   = 0b00100000; // Window Enable
        const WIN_MAP  = 0b01000000; // Window Tile Map Address
        const LCD_EN   = 0b10000000; // LCD Display Enable
    }

    /// Represents STAT at 0xFF41. The interrupt-source enables use the
    /// canonical bit assignment.
    #[derive(Copy, Clone, PartialEq, Debug)]
    pub struct LCDState: u8 {
        const LCD_MODE1   = 0b00000001; // LCD Mode
        const LCD_MODE2   = 0b00000010; // LCD Mode
        const LYC_STAT    = 0b00000100; // LYC == LY Flag
        const H_BLANK_INT = 0b00001000; // Mode 0 H-Blank Interrupt
        const V_BLANK_INT = 0b00010000; // Mode 1 V-Blank Interrupt
        const OAM_INT     = 0b00100000; // Mode 2 OAM Interrupt
        const LY_INT      = 0b01000000; // LYC Interrupt
    }
}

impl LCDControl {
    /// Base address of the background tile map.
    #[inline]
    pub fn bg_tile_map(&self) -> u16 {
        match self.contains(LCDControl::BG_MAP) {
            true => 0x9C00,
            false => 0x9800,
        }
    }

    /// Base address of the window tile map.
    #[inline]
    pub fn window_tile_map(&self) -> u16 {
        match self.contains(LCDControl::WIN_MAP) {
            true => 0x9C00,
            false => 0x9800,
        }
    }

    /// Sprite height in pixels, 8 or 16 per OBJ_SIZE.
    #[inline]
    pub fn sprite_height(&self) -> u8 {
        match self.contains(LCDControl::OBJ_SIZE) {
            true => 16,
            false => 8,
        }
    }
}

impl LCDState {
    /// Returns the `LCDMode` encoded in the low two bits of STAT.
    #[inline]
    pub fn get_lcd_mode(&self) -> LCDMode {
        LCDMode::from(self.bits() & 0b11)
    }

    /// Sets the low two bits of STAT to the given `LCDMode`.
    #[inline]
    pub fn set_lcd_mode(&mut self, mode: LCDMode) {
        *self = LCDState::from_bits_truncate((self.bits() & 0b1111_1100) | u8::from(mode));
    }
}

/// The scanline machine state, mirrored into the low two bits of STAT.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum LCDMode {
    HBlank,        // 0b00
    VBlank,        // 0b01
    OAMSearch,     // 0b10
    PixelTransfer, // 0b11
}

impl From<LCDMode> for u8 {
    #[inline]
    fn from(value: LCDMode) -> u8 {
        match value {
            LCDMode::HBlank => 0b00,
            LCDMode::VBlank => 0b01,
            LCDMode::OAMSearch => 0b10,
            LCDMode::PixelTransfer => 0b11,
        }
    }
}

impl From<u8> for LCDMode {
    #[inline]
    fn from(value: u8) -> Self {
        match value {
            0b00 => LCDMode::HBlank,
            0b01 => LCDMode::VBlank,
            0b10 => LCDMode::OAMSearch,
            0b11 => LCDMode::PixelTransfer,
            _ => unimplemented!(),
        }
    }
}
