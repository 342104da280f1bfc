use super::*;
use crate::tests::MockBus;

/// A PPU next to a bare bus with the LCD enabled and identity palettes.
fn setup() -> (PPU, MockBus) {
    let mut bus = MockBus::default();
    bus.write_io(REG_LCDC, 0x91);
    bus.write_io(REG_BGP, 0b1110_0100);
    bus.write_io(REG_OBP0, 0b1110_0100);
    bus.write_io(REG_OBP1, 0b1110_0100);
    (PPU::default(), bus)
}

fn current_mode(bus: &mut MockBus) -> LCDMode {
    LCDState::from_bits_truncate(bus.read_io(REG_STAT)).get_lcd_mode()
}

/// Fills one tile with a solid 2-bit colour.
fn fill_tile(bus: &mut MockBus, tile: u16, color: u8) {
    let low = if color & 0b01 != 0 { 0xFF } else { 0x00 };
    let high = if color & 0b10 != 0 { 0xFF } else { 0x00 };
    for line in 0..8 {
        bus.write(VRAM_BEGIN + tile * 16 + line * 2, low);
        bus.write(VRAM_BEGIN + tile * 16 + line * 2 + 1, high);
    }
}

#[test]
fn test_frame_cadence() {
    let (mut ppu, mut bus) = setup();

    let mut draws_before_vblank = 0;
    let mut in_vblank = false;
    for _ in 0..154 * 114 {
        let before = current_mode(&mut bus);
        ppu.step(&mut bus, 1, false);
        let after = current_mode(&mut bus);
        if before != after && after == LCDMode::PixelTransfer && !in_vblank {
            draws_before_vblank += 1;
        }
        if after == LCDMode::VBlank {
            in_vblank = true;
        }
    }

    assert_eq!(
        draws_before_vblank, 144,
        "one pixel transfer per visible line before VBlank"
    );
    assert_eq!(bus.read_io(REG_LY), 0, "LY wrapped after line 153");
    assert_eq!(current_mode(&mut bus), LCDMode::OAMSearch);
}

#[test]
fn test_line_timing() {
    let (mut ppu, mut bus) = setup();

    ppu.step(&mut bus, 19, false);
    assert_eq!(current_mode(&mut bus), LCDMode::OAMSearch);
    ppu.step(&mut bus, 1, false);
    assert_eq!(current_mode(&mut bus), LCDMode::PixelTransfer);
    ppu.step(&mut bus, 63, false);
    assert_eq!(current_mode(&mut bus), LCDMode::HBlank);
    ppu.step(&mut bus, 31, false);
    assert_eq!(current_mode(&mut bus), LCDMode::OAMSearch);
    assert_eq!(bus.read_io(REG_LY), 1);
}

#[test]
fn test_vblank_interrupt_and_publication() {
    let (mut ppu, mut bus) = setup();
    fill_tile(&mut bus, 0, 0b11);

    // Drive to the end of line 143; the backbuffer is rendered but nothing
    // is published yet.
    for _ in 0..144 {
        ppu.step(&mut bus, 114, true);
    }
    assert_eq!(current_mode(&mut bus), LCDMode::VBlank);
    assert_ne!(bus.read(INTERRUPT_FLAG) & InterruptRegister::VBLANK.bits(), 0);
    assert!(
        ppu.framebuffer().as_bytes().iter().all(|&b| b == 0x00),
        "solid colour 3 publishes as black"
    );
}

#[test]
fn test_framebuffer_stable_until_next_vblank() {
    let (mut ppu, mut bus) = setup();

    // First frame renders white (empty VRAM), publish at VBlank.
    for _ in 0..154 {
        ppu.step(&mut bus, 114, true);
    }
    assert!(ppu.framebuffer().as_bytes().iter().all(|&b| b == 0xFF));

    // Draw black into the second frame; the published plane holds the old
    // frame until VBlank comes around again.
    fill_tile(&mut bus, 0, 0b11);
    for _ in 0..100 {
        ppu.step(&mut bus, 114, true);
    }
    assert!(ppu.framebuffer().as_bytes().iter().all(|&b| b == 0xFF));
    for _ in 100..154 {
        ppu.step(&mut bus, 114, true);
    }
    assert!(ppu.framebuffer().as_bytes().iter().all(|&b| b == 0x00));
}

#[test]
fn test_lcd_disabled_parks_the_machine() {
    let (mut ppu, mut bus) = setup();
    ppu.step(&mut bus, 200, false);
    assert_ne!(bus.read_io(REG_LY), 0);

    bus.write_io(REG_LCDC, 0x00);
    ppu.step(&mut bus, 1, false);
    assert_eq!(bus.read_io(REG_LY), 0);
    assert_eq!(bus.read_io(REG_STAT) & 0b11, 0, "mode bits cleared");
    assert_eq!(current_mode(&mut bus), LCDMode::HBlank);

    // No progress while the LCD stays off.
    ppu.step(&mut bus, 250, false);
    assert_eq!(bus.read_io(REG_LY), 0);
}

#[test]
fn test_lyc_interrupt_edge() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LYC, 2);
    bus.write_io(REG_STAT, LCDState::LY_INT.bits());

    // Two full lines pass without a match.
    for _ in 0..2 {
        ppu.step(&mut bus, 114, false);
    }
    assert_eq!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);

    // LY reaches 2; the next step observes the rising edge.
    ppu.step(&mut bus, 1, false);
    assert_ne!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);
    assert_ne!(bus.read_io(REG_STAT) & LCDState::LYC_STAT.bits(), 0);

    // The request is level-triggered on the edge only.
    bus.write(INTERRUPT_FLAG, 0);
    ppu.step(&mut bus, 1, false);
    assert_eq!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);
}

#[test]
fn test_stat_mode_interrupts() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_STAT, LCDState::OAM_INT.bits());

    // Entering OAM search for line 1 raises the STAT interrupt.
    ppu.step(&mut bus, 114, false);
    assert_ne!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);

    // With only the HBlank source enabled it fires at HBlank entry.
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_STAT, LCDState::H_BLANK_INT.bits());
    ppu.step(&mut bus, 20, false);
    assert_eq!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);
    ppu.step(&mut bus, 63, false);
    assert_ne!(bus.read(INTERRUPT_FLAG) & InterruptRegister::STAT.bits(), 0);
}

#[test]
fn test_sprite_selection_limit_and_order() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x93); // sprites on, 8x8

    // Twelve sprites covering line 0, x descending.
    for index in 0..12u16 {
        let base = OAM_BEGIN + index * 4;
        bus.write(base, 16); // y: covers LY 0..8
        bus.write(base + 1, (120 - index * 8) as u8);
        bus.write(base + 2, 0);
        bus.write(base + 3, 0);
    }

    ppu.step(&mut bus, 20, false);
    assert_eq!(ppu.scanline_sprites.len(), SpriteLine::CAPACITY);
    let xs: Vec<u8> = ppu.scanline_sprites.iter().map(|s| s.x).collect();
    let mut sorted = xs.clone();
    sorted.sort_unstable();
    assert_eq!(xs, sorted, "selection is ordered by x ascending");
    assert_eq!(xs[0], 120 - 11 * 8, "smallest x survives the clamp");
}

#[test]
fn test_sprite_selection_excludes_offscreen() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x93);

    // x = 0, x >= 168 and wrong-line sprites are all skipped.
    let entries = [(16u8, 0u8), (16, 168), (40, 80), (16, 8)];
    for (index, (y, x)) in entries.iter().enumerate() {
        let base = OAM_BEGIN + index as u16 * 4;
        bus.write(base, *y);
        bus.write(base + 1, *x);
    }

    ppu.step(&mut bus, 20, false);
    assert_eq!(ppu.scanline_sprites.len(), 1);
    assert_eq!(ppu.scanline_sprites.iter().next().unwrap().x, 8);
}

#[test]
fn test_tall_sprites_cover_sixteen_lines() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x97); // sprites on, 8x16
    bus.write_io(REG_LY, 10);

    let base = OAM_BEGIN;
    bus.write(base, 16); // y: covers LY 0..16
    bus.write(base + 1, 8);
    bus.write(base + 2, 0x03); // bit 0 is dropped for tall sprites
    fill_tile(&mut bus, 0x02, 0b01);
    fill_tile(&mut bus, 0x03, 0b10);

    ppu.step(&mut bus, 20, false);
    assert_eq!(ppu.scanline_sprites.len(), 1);
    let sprite = ppu.scanline_sprites.iter().next().unwrap();
    // Line 10 of the sprite falls into the second tile (0x03).
    assert_eq!(sprite.data_low, 0x00);
    assert_eq!(sprite.data_high, 0xFF);
}

#[test]
fn test_sprite_over_background() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x93);

    // Background colour 1 everywhere, one sprite of colour 3 at the origin.
    fill_tile(&mut bus, 0, 0b01);
    fill_tile(&mut bus, 1, 0b11);
    let base = OAM_BEGIN;
    bus.write(base, 16);
    bus.write(base + 1, 8);
    bus.write(base + 2, 1);
    bus.write(base + 3, 0);

    // One full line: selection, transfer, render.
    ppu.step(&mut bus, 114, true);
    assert_eq!(ppu.backbuffer.get(0, 0), 0b11, "sprite wins");
    assert_eq!(ppu.backbuffer.get(8, 0), 0b01, "background beyond the sprite");
}

#[test]
fn test_behind_bg_sprite_only_shows_over_colour_zero() {
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x93);

    fill_tile(&mut bus, 0, 0b01);
    fill_tile(&mut bus, 1, 0b11);
    let base = OAM_BEGIN;
    bus.write(base, 16);
    bus.write(base + 1, 8);
    bus.write(base + 2, 1);
    bus.write(base + 3, SpriteAttributes::PRIORITY.bits());

    ppu.step(&mut bus, 114, true);
    assert_eq!(ppu.backbuffer.get(0, 0), 0b01, "background colour 1 wins");

    // Same sprite over background colour 0 shows through.
    let (mut ppu, mut bus) = setup();
    bus.write_io(REG_LCDC, 0x93);
    fill_tile(&mut bus, 1, 0b11);
    bus.write(base, 16);
    bus.write(base + 1, 8);
    bus.write(base + 2, 1);
    bus.write(base + 3, SpriteAttributes::PRIORITY.bits());
    ppu.step(&mut bus, 114, true);
    assert_eq!(ppu.backbuffer.get(0, 0), 0b11);
}

#[test]
fn test_window_overrides_background() {
    let (mut ppu, mut bus) = setup();
    // Window enabled, using the second tile map filled with tile 1.
    bus.write_io(REG_LCDC, 0x91 | 0b0110_0000);
    fill_tile(&mut bus, 0, 0b01);
    fill_tile(&mut bus, 1, 0b11);
    for offset in 0..32u16 {
        bus.write(0x9C00 + offset, 1);
    }
    // The window starts at screen x 80 on line 0.
    bus.write_io(REG_WY, 0);
    bus.write_io(REG_WX, 87);

    ppu.step(&mut bus, 114, true);
    assert_eq!(ppu.backbuffer.get(79, 0), 0b01, "background left of window");
    assert_eq!(ppu.backbuffer.get(80, 0), 0b11, "window from WX - 7 on");
}

#[test]
fn test_scx_scrolls_the_background() {
    let (mut ppu, mut bus) = setup();
    // Tile map column 1 uses the solid tile, the rest stays tile 0.
    fill_tile(&mut bus, 1, 0b11);
    bus.write(0x9800 + 1, 1);
    bus.write_io(REG_SCX, 4);

    ppu.step(&mut bus, 114, true);
    assert_eq!(ppu.backbuffer.get(0, 0), 0b00);
    assert_eq!(ppu.backbuffer.get(4, 0), 0b11, "tile 1 shifted left by SCX");
    assert_eq!(ppu.backbuffer.get(12, 0), 0b00);
}
