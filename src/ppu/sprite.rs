bitflags! {
    /// The OAM attribute byte of a sprite.
    #[derive(Copy, Clone, PartialEq, Debug, Default)]
    pub struct SpriteAttributes: u8 {
        const DMG_PALETTE = 0b0001_0000; // 0 = OBP0, 1 = OBP1
        const X_FLIP      = 0b0010_0000;
        const Y_FLIP      = 0b0100_0000;
        const PRIORITY    = 0b1000_0000; // 0 = above BG, 1 = behind BG colours 1-3
    }
}

/// One sprite selected for the current scanline: its on-screen x, the two
/// prefetched tile-line bytes for that line, and its attribute byte.
#[derive(Copy, Clone, Default, Debug)]
pub struct Sprite {
    pub x: u8,
    pub data_low: u8,
    pub data_high: u8,
    pub attributes: SpriteAttributes,
}

/// The per-line selection list: at most ten sprites, ordered by x ascending
/// with OAM order breaking ties. Insertion keeps the list sorted without
/// allocating; entries pushed past the capacity fall off the tail.
pub struct SpriteLine {
    entries: [Sprite; SpriteLine::CAPACITY],
    len: usize,
}

impl Default for SpriteLine {
    fn default() -> Self {
        Self {
            entries: [Sprite::default(); SpriteLine::CAPACITY],
            len: 0,
        }
    }
}

impl SpriteLine {
    /// The hardware draws at most ten sprites per scanline.
    pub const CAPACITY: usize = 10;

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Inserts in front of the first entry with a strictly greater x, which
    /// keeps equal-x sprites in the order they were pushed (OAM order).
    pub fn push(&mut self, sprite: Sprite) {
        let position = self.entries[..self.len]
            .iter()
            .position(|other| other.x > sprite.x)
            .unwrap_or(self.len);
        if position >= Self::CAPACITY {
            return;
        }
        let end = (self.len + 1).min(Self::CAPACITY);
        self.entries.copy_within(position..end - 1, position + 1);
        self.entries[position] = sprite;
        self.len = end;
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Sprite> {
        self.entries[..self.len].iter()
    }
}
