pub mod buffer;
pub mod misc;
pub mod registers;
mod sprite;
#[cfg(test)]
mod tests;

use crate::bus::InterruptRegister;
use crate::constants::*;
use crate::ppu::buffer::FrameBuffer;
use crate::ppu::misc::{Palette, Pixel, Shade};
use crate::ppu::registers::{LCDControl, LCDMode, LCDState};
use crate::ppu::sprite::{Sprite, SpriteAttributes, SpriteLine};
use crate::utils::bit_at;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH, SubSystem};

/// Machine cycles spent scanning OAM at the start of a visible line.
const OAM_SEARCH_CYCLES: u32 = 20;

/// Machine cycles spent pushing pixels; the line is rendered when they end.
const PIXEL_TRANSFER_CYCLES: u32 = 63;

/// A complete scanline, visible or not, lasts 114 machine cycles; HBlank
/// fills whatever OAM search and pixel transfer left of that.
const SCANLINE_CYCLES: u32 = 114;
const HBLANK_CYCLES: u32 = SCANLINE_CYCLES - OAM_SEARCH_CYCLES - PIXEL_TRANSFER_CYCLES;

/// The last scanline; VBlank covers lines 144 through 153.
const SCANLINE_MAX: u8 = 153;

/// Pixel Processing Unit: a four-state scanline machine fed with the machine
/// cycles the CPU retires. All LCD registers live on the bus; the struct
/// keeps only the machine state, the per-line sprite selection and the two
/// pixel planes.
pub struct PPU {
    state: LCDMode,
    state_ticks: u32,
    scanline_sprites: SpriteLine,
    backbuffer: FrameBuffer,
    framebuffer: FrameBuffer,
}

impl Default for PPU {
    fn default() -> Self {
        Self {
            state: LCDMode::OAMSearch,
            state_ticks: 0,
            scanline_sprites: SpriteLine::default(),
            backbuffer: FrameBuffer::default(),
            framebuffer: FrameBuffer::default(),
        }
    }
}

impl PPU {
    /// The published frame: display shade bytes, stable between VBlank
    /// entries.
    #[inline]
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// Advances the scanline machine by the given number of machine cycles.
    /// `render` controls whether pixel transfer actually rasterises into the
    /// backbuffer; the machine timing is the same either way.
    pub fn step<T: SubSystem>(&mut self, bus: &mut T, cycles: u8, render: bool) {
        let lcdc = LCDControl::from_bits_truncate(bus.read_io(REG_LCDC));
        if !lcdc.contains(LCDControl::LCD_EN) {
            // Screen is off: hold the machine in OAM search at line 0 with
            // the STAT mode bits cleared.
            self.state = LCDMode::OAMSearch;
            self.state_ticks = 0;
            let stat = bus.read_io(REG_STAT);
            bus.write_io(REG_STAT, stat & 0b1111_1100);
            bus.write_io(REG_LY, 0);
            return;
        }

        self.update_lyc_flag(bus);

        self.state_ticks += u32::from(cycles);
        loop {
            match self.state {
                LCDMode::OAMSearch if self.state_ticks >= OAM_SEARCH_CYCLES => {
                    self.state_ticks -= OAM_SEARCH_CYCLES;
                    self.select_sprites(bus);
                    self.switch_mode(LCDMode::PixelTransfer, bus);
                }
                LCDMode::PixelTransfer if self.state_ticks >= PIXEL_TRANSFER_CYCLES => {
                    self.state_ticks -= PIXEL_TRANSFER_CYCLES;
                    if render {
                        self.draw_line(bus);
                    }
                    self.switch_mode(LCDMode::HBlank, bus);
                }
                LCDMode::HBlank if self.state_ticks >= HBLANK_CYCLES => {
                    self.state_ticks -= HBLANK_CYCLES;
                    let line = bus.read_io(REG_LY).wrapping_add(1);
                    bus.write_io(REG_LY, line);
                    match line < SCREEN_HEIGHT {
                        true => self.switch_mode(LCDMode::OAMSearch, bus),
                        false => {
                            // First VBlank entry publishes the frame.
                            self.publish_frame();
                            self.switch_mode(LCDMode::VBlank, bus);
                        }
                    }
                }
                LCDMode::VBlank if self.state_ticks >= SCANLINE_CYCLES => {
                    self.state_ticks -= SCANLINE_CYCLES;
                    let line = bus.read_io(REG_LY).wrapping_add(1);
                    match line > SCANLINE_MAX {
                        true => {
                            bus.write_io(REG_LY, 0);
                            self.switch_mode(LCDMode::OAMSearch, bus);
                        }
                        false => bus.write_io(REG_LY, line),
                    }
                }
                _ => break,
            }
        }
    }

    /// Switches the LCD mode, mirrors it into STAT and raises the STAT
    /// interrupt when the matching source enable is set. VBlank additionally
    /// raises its own interrupt.
    fn switch_mode<T: SubSystem>(&mut self, mode: LCDMode, bus: &mut T) {
        self.state = mode;
        let mut stat = LCDState::from_bits_truncate(bus.read_io(REG_STAT));
        stat.set_lcd_mode(mode);
        bus.write_io(REG_STAT, stat.bits());

        let source = match mode {
            LCDMode::OAMSearch => LCDState::OAM_INT,
            LCDMode::HBlank => LCDState::H_BLANK_INT,
            LCDMode::VBlank => {
                bus.request_interrupt(InterruptRegister::VBLANK);
                LCDState::V_BLANK_INT
            }
            LCDMode::PixelTransfer => return,
        };
        if stat.contains(source) {
            bus.request_interrupt(InterruptRegister::STAT);
        }
    }

    /// Keeps the LYC-equal bit of STAT in sync with LY and raises the STAT
    /// interrupt on its rising edge when the LYC source is enabled.
    fn update_lyc_flag<T: SubSystem>(&mut self, bus: &mut T) {
        let matches = bus.read_io(REG_LY) == bus.read_io(REG_LYC);
        let mut stat = LCDState::from_bits_truncate(bus.read_io(REG_STAT));
        let was_matching = stat.contains(LCDState::LYC_STAT);
        stat.set(LCDState::LYC_STAT, matches);
        bus.write_io(REG_STAT, stat.bits());

        if matches && !was_matching && stat.contains(LCDState::LY_INT) {
            bus.request_interrupt(InterruptRegister::STAT);
        }
    }

    /// Scans all 40 OAM entries and selects the sprites covering the current
    /// line, with their tile-line bytes prefetched. The list keeps at most
    /// ten sprites, x ascending, OAM order breaking ties.
    fn select_sprites<T: SubSystem>(&mut self, bus: &mut T) {
        self.scanline_sprites.clear();
        let lcdc = LCDControl::from_bits_truncate(bus.read_io(REG_LCDC));
        let height = u16::from(lcdc.sprite_height());
        let line = u16::from(bus.read_io(REG_LY)) + 16;

        for index in 0..OAM_ENTRY_COUNT as u16 {
            let base = OAM_BEGIN + index * 4;
            let y = bus.read(base);
            let x = bus.read(base + 1);
            let mut tile = bus.read(base + 2);
            let attributes = SpriteAttributes::from_bits_truncate(bus.read(base + 3));

            if x == 0 || y >= 160 || x >= 168 {
                continue;
            }
            if line < u16::from(y) || line >= u16::from(y) + height {
                continue;
            }

            // Tall sprites span two tiles; bit 0 of the index is ignored.
            if height == 16 {
                tile &= 0xFE;
            }
            let mut row = line - u16::from(y);
            if attributes.contains(SpriteAttributes::Y_FLIP) {
                row = height - 1 - row;
            }
            let address = VRAM_BEGIN + u16::from(tile) * 16 + row * 2;
            self.scanline_sprites.push(Sprite {
                x,
                data_low: bus.read(address),
                data_high: bus.read(address + 1),
                attributes,
            });
        }
    }

    /// Samples one tile-map pixel. `base` is the map base address, `x`/`y`
    /// are pixel coordinates within the 256x256 map plane.
    fn sample_tile_map<T: SubSystem>(bus: &mut T, lcdc: LCDControl, base: u16, x: u8, y: u8) -> Pixel {
        let map_index = u16::from(y / 8) * 32 + u16::from(x / 8);
        let tile = bus.read(base + map_index);

        // TILE_SEL picks unsigned addressing from 0x8000 or signed from 0x9000.
        let tile_address = match lcdc.contains(LCDControl::TILE_SEL) {
            true => VRAM_BEGIN + u16::from(tile) * 16,
            false => (0x9000 + i32::from(tile as i8) * 16) as u16,
        };

        let line = u16::from(y % 8) * 2;
        let data_low = bus.read(tile_address + line);
        let data_high = bus.read(tile_address + line + 1);
        let bit = 7 - (x % 8);
        Pixel::from((u8::from(bit_at(data_high, bit)) << 1) | u8::from(bit_at(data_low, bit)))
    }

    /// Rasterises the current line into the backbuffer: window over
    /// background, then the first matching visible sprite per pixel.
    fn draw_line<T: SubSystem>(&mut self, bus: &mut T) {
        let lcdc = LCDControl::from_bits_truncate(bus.read_io(REG_LCDC));
        let ly = bus.read_io(REG_LY);
        let scy = bus.read_io(REG_SCY);
        let scx = bus.read_io(REG_SCX);
        let wy = bus.read_io(REG_WY);
        let wx = bus.read_io(REG_WX);
        let bg_palette = Palette::from(bus.read_io(REG_BGP));
        let obj_palette0 = Palette::from(bus.read_io(REG_OBP0));
        let obj_palette1 = Palette::from(bus.read_io(REG_OBP1));

        for x in 0..SCREEN_WIDTH {
            // The raw background pixel decides sprite priority; the
            // backbuffer receives the palette-resolved value.
            let mut raw = Pixel::Zero;
            let mut color = Pixel::Zero;

            if lcdc.contains(LCDControl::WIN_EN) && wx <= x + 7 && ly >= wy {
                let base = lcdc.window_tile_map();
                raw = Self::sample_tile_map(bus, lcdc, base, x + 7 - wx, ly - wy);
                color = bg_palette.colorize(raw);
            } else if lcdc.contains(LCDControl::BG_EN) {
                let base = lcdc.bg_tile_map();
                raw = Self::sample_tile_map(bus, lcdc, base, x.wrapping_add(scx), ly.wrapping_add(scy));
                color = bg_palette.colorize(raw);
            }

            if lcdc.contains(LCDControl::OBJ_EN) {
                for sprite in self.scanline_sprites.iter() {
                    // The sprite covers [x - 8, x) on screen.
                    let offset = x.wrapping_sub(sprite.x.wrapping_sub(8));
                    if offset >= 8 {
                        continue;
                    }
                    let bit = match sprite.attributes.contains(SpriteAttributes::X_FLIP) {
                        true => offset,
                        false => 7 - offset,
                    };
                    let value = (u8::from(bit_at(sprite.data_high, bit)) << 1)
                        | u8::from(bit_at(sprite.data_low, bit));
                    // Colour 0 is transparent.
                    if value == 0 {
                        continue;
                    }
                    // Behind-BG sprites only show through background colour 0.
                    if sprite.attributes.contains(SpriteAttributes::PRIORITY) && raw != Pixel::Zero {
                        continue;
                    }
                    let palette = match sprite.attributes.contains(SpriteAttributes::DMG_PALETTE) {
                        true => &obj_palette1,
                        false => &obj_palette0,
                    };
                    color = palette.colorize(Pixel::from(value));
                    break;
                }
            }

            self.backbuffer.set(x, ly, u8::from(color));
        }
    }

    /// Maps the backbuffer through the DMG shade table and publishes it as
    /// the visible frame.
    fn publish_frame(&mut self) {
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let pixel = Pixel::from(self.backbuffer.get(x, y));
                self.framebuffer.set(x, y, u8::from(Shade::from(pixel)));
            }
        }
    }
}
