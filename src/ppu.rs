//! PPU (Picture Processing Unit) Emulator
//!
//! Implements the Ricoh 2C02 PPU used in the NES as a per-dot state machine.
//! Each call to [`Ppu::step`] handles one dot of the current scanline and then
//! advances the scan position.

use bitflags::bitflags;
use log::trace;

use crate::bus::{nametable_index, palette_index};
use crate::interrupt::{Interrupt, InterruptLine};
use crate::rom::Mapper;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

pub const DOTS_PER_LINE: u16 = 341;
pub const LAST_DOT: u16 = 340;
pub const POST_RENDER_LINE: u16 = 240;
pub const VBLANK_LINE: u16 = 241;
pub const PRE_RENDER_LINE: u16 = 261;

const SPRITE_COUNT: usize = 64;
const SPRITE_LIMIT: usize = 8;

bitflags! {
    /// $2000
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PpuCtrl: u8 {
        const NAMETABLE_LOW = 1 << 0;
        const NAMETABLE_HIGH = 1 << 1;
        const VRAM_INCREMENT = 1 << 2;
        const SPRITE_TABLE = 1 << 3;
        const BACKGROUND_TABLE = 1 << 4;
        const SPRITE_SIZE = 1 << 5;
        const SLAVE = 1 << 6;
        const NMI = 1 << 7;
    }
}

bitflags! {
    /// $2001
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PpuMask: u8 {
        const GREYSCALE = 1 << 0;
        const BACKGROUND_LEFT = 1 << 1;
        const SPRITE_LEFT = 1 << 2;
        const BACKGROUND = 1 << 3;
        const SPRITE = 1 << 4;
        const EMPHASIZE_RED = 1 << 5;
        const EMPHASIZE_GREEN = 1 << 6;
        const EMPHASIZE_BLUE = 1 << 7;
    }
}

bitflags! {
    /// $2002
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 1 << 5;
        const SPRITE_ZERO_HIT = 1 << 6;
        const VBLANK = 1 << 7;
    }
}

impl PpuCtrl {
    pub fn nametable_select(&self) -> u16 {
        (self.bits() & 0b11) as u16
    }

    pub fn vram_increment(&self) -> u16 {
        if self.contains(PpuCtrl::VRAM_INCREMENT) {
            32
        } else {
            1
        }
    }

    pub fn background_table(&self) -> u16 {
        if self.contains(PpuCtrl::BACKGROUND_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn sprite_table(&self) -> u16 {
        if self.contains(PpuCtrl::SPRITE_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn sprite_height(&self) -> i32 {
        if self.contains(PpuCtrl::SPRITE_SIZE) {
            16
        } else {
            8
        }
    }
}

/// Bitfield view of the 15-bit `v`/`t` scroll registers
///
/// ```text
/// yyy NN YYYYY XXXXX
/// ||| || ||||| +++++-- coarse X
/// ||| || +++++-------- coarse Y
/// ||| ++-------------- nametable select
/// +++----------------- fine Y
/// ```
pub trait VramAddress {
    fn coarse_x(self) -> u16;
    fn coarse_y(self) -> u16;
    fn fine_y(self) -> u16;
    fn nametable_select(self) -> u16;
    /// Address of the nametable byte for the current tile
    fn tile_address(self) -> u16;
    /// Address of the attribute byte covering the current tile
    fn attribute_address(self) -> u16;
}

impl VramAddress for u16 {
    fn coarse_x(self) -> u16 {
        self & 0x001F
    }

    fn coarse_y(self) -> u16 {
        (self >> 5) & 0x001F
    }

    fn fine_y(self) -> u16 {
        (self >> 12) & 0x0007
    }

    fn nametable_select(self) -> u16 {
        (self >> 10) & 0x0003
    }

    fn tile_address(self) -> u16 {
        0x2000 | (self & 0x0FFF)
    }

    fn attribute_address(self) -> u16 {
        0x23C0 | (self & 0x0C00) | ((self >> 4) & 0x38) | ((self >> 2) & 0x07)
    }
}

bitflags! {
    /// OAM byte 2
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpriteAttribute: u8 {
        const PALETTE_LOW = 1 << 0;
        const PALETTE_HIGH = 1 << 1;
        const BEHIND_BACKGROUND = 1 << 5;
        const FLIP_HORIZONTALLY = 1 << 6;
        const FLIP_VERTICALLY = 1 << 7;
    }
}

/// One sprite loaded from secondary OAM for the current scanline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    pub y: u8,
    pub tile_index: u8,
    pub attr: SpriteAttribute,
    pub x: u8,
}

impl Sprite {
    /// Empty secondary OAM slot
    pub const EMPTY: Sprite = Sprite {
        y: 0xFF,
        tile_index: 0xFF,
        attr: SpriteAttribute::from_bits_retain(0xFF),
        x: 0xFF,
    };

    pub fn is_valid(&self) -> bool {
        *self != Sprite::EMPTY
    }

    pub fn palette(&self) -> u16 {
        (self.attr.bits() & 0b11) as u16
    }

    /// Pattern row for `line`, or `None` if the sprite does not cover it
    pub fn row(&self, line: u16, height: i32) -> Option<u16> {
        let row = line as i32 - self.y as i32 - 1;
        if !(0..height).contains(&row) {
            return None;
        }
        let row = if self.attr.contains(SpriteAttribute::FLIP_VERTICALLY) {
            height - 1 - row
        } else {
            row
        };
        Some(row as u16)
    }

    /// Bit index into the pattern byte for screen column `x`
    pub fn col(&self, x: i32) -> u8 {
        let col = 7 - (x - self.x as i32);
        let col = if self.attr.contains(SpriteAttribute::FLIP_HORIZONTALLY) {
            7 - col
        } else {
            col
        };
        col as u8
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Sprite::EMPTY
    }
}

/// Pattern bytes fetched for the next tile
#[derive(Debug, Clone, Copy, Default)]
struct TilePattern {
    low: u8,
    high: u8,
}

/// Background shift registers
#[derive(Debug, Clone, Copy, Default)]
struct BackgroundTile {
    pattern_low: u16,
    pattern_high: u16,
    attribute_low: u8,
    attribute_high: u8,
    attribute_low_latch: bool,
    attribute_high_latch: bool,
}

impl BackgroundTile {
    /// (pattern, palette) at fine X
    fn pixel(&self, fine_x: u8) -> (u16, u16) {
        let pattern_x = 15 - fine_x as u16;
        let pattern = ((self.pattern_high >> pattern_x) & 1) << 1 | ((self.pattern_low >> pattern_x) & 1);

        let attribute_x = 7 - fine_x;
        let palette = ((self.attribute_high >> attribute_x) & 1) << 1
            | ((self.attribute_low >> attribute_x) & 1);

        (pattern, palette as u16)
    }

    fn shift(&mut self) {
        self.pattern_low <<= 1;
        self.pattern_high <<= 1;
        self.attribute_low = (self.attribute_low << 1) | self.attribute_low_latch as u8;
        self.attribute_high = (self.attribute_high << 1) | self.attribute_high_latch as u8;
    }

    fn reload(&mut self, next: TilePattern, attribute: u8) {
        self.pattern_low = (self.pattern_low & 0xFF00) | next.low as u16;
        self.pattern_high = (self.pattern_high & 0xFF00) | next.high as u16;
        self.attribute_low_latch = attribute & 0x01 != 0;
        self.attribute_high_latch = attribute & 0x02 != 0;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BackgroundPixel {
    enabled: bool,
    color: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct SpritePixel {
    enabled: bool,
    color: u8,
    behind_background: bool,
}

/// One scanline of ARGB pixels
#[derive(Debug, Clone)]
pub struct LineBuffer {
    pixels: [u32; WIDTH],
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [0; WIDTH],
        }
    }

    pub fn write(&mut self, x: usize, color: u32) {
        self.pixels[x] = color;
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The PPU emulator
#[derive(Debug, Clone)]
pub struct Ppu {
    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr: u8,

    /// Current VRAM address
    pub v: u16,
    /// Temporary VRAM address
    pub t: u16,
    pub fine_x: u8,
    pub write_toggle: bool,

    /// $2007 read buffer
    pub data: u8,
    /// Last value driven on the register bus
    pub internal_bus: u8,

    nametable: [u8; 0x1000],
    palette: [u8; 32],
    pub oam: [u8; 256],
    secondary_oam: [u8; 32],
    sprites: [Sprite; SPRITE_LIMIT],
    /// Sprite 0 landed in secondary OAM during evaluation
    sprite_zero_on_line: bool,
    /// Sprite 0 is among the sprites drawn on this line
    sprite_zero_loaded: bool,

    nametable_entry: u8,
    attribute_entry: u8,
    background_address: u16,
    next_pattern: TilePattern,
    tile: BackgroundTile,

    scanline: u16,
    dot: u16,
    frames: u64,

    line_buffer: LineBuffer,
    back_buffer: Vec<u32>,
    frame_buffer: Vec<u32>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            write_toggle: false,
            data: 0,
            internal_bus: 0,
            nametable: [0; 0x1000],
            palette: [0; 32],
            oam: [0; 256],
            secondary_oam: [0xFF; 32],
            sprites: [Sprite::EMPTY; SPRITE_LIMIT],
            sprite_zero_on_line: false,
            sprite_zero_loaded: false,
            nametable_entry: 0,
            attribute_entry: 0,
            background_address: 0,
            next_pattern: TilePattern::default(),
            tile: BackgroundTile::default(),
            scanline: 0,
            dot: 0,
            frames: 0,
            line_buffer: LineBuffer::new(),
            back_buffer: vec![0; WIDTH * HEIGHT],
            frame_buffer: vec![0; WIDTH * HEIGHT],
        }
    }

    /// Power-on clear of registers, memories and scan position
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr = 0;
        self.v = 0;
        self.t = 0;
        self.fine_x = 0;
        self.write_toggle = false;
        self.data = 0;
        self.internal_bus = 0;
        self.nametable.fill(0);
        self.palette.fill(0);
        self.oam.fill(0);
        self.scanline = 0;
        self.dot = 0;
        self.frames = 0;
        self.line_buffer.clear();
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Completed frames since reset
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Last completed 256x240 ARGB frame
    pub fn frame_buffer(&self) -> &[u32] {
        &self.frame_buffer
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask
            .intersects(PpuMask::BACKGROUND | PpuMask::SPRITE)
    }

    fn background_enabled_at(&self, x: i32) -> bool {
        self.mask.contains(PpuMask::BACKGROUND)
            && !(x < 8 && !self.mask.contains(PpuMask::BACKGROUND_LEFT))
    }

    fn sprite_enabled_at(&self, x: i32) -> bool {
        self.mask.contains(PpuMask::SPRITE) && !(x < 8 && !self.mask.contains(PpuMask::SPRITE_LEFT))
    }

    // MARK: memory

    pub fn read_memory(&mut self, mapper: &mut dyn Mapper, address: u16) -> u8 {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => mapper.read(address),
            0x2000..=0x3EFF => self.nametable[nametable_index(address, mapper.mirroring())],
            _ => {
                let value = self.palette[palette_index(address)];
                if self.mask.contains(PpuMask::GREYSCALE) {
                    value & 0x30
                } else {
                    value & 0x3F
                }
            }
        }
    }

    pub fn write_memory(&mut self, mapper: &mut dyn Mapper, address: u16, value: u8) {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => mapper.write(address, value),
            0x2000..=0x3EFF => {
                self.nametable[nametable_index(address, mapper.mirroring())] = value
            }
            _ => self.palette[palette_index(address)] = value,
        }
    }

    // MARK: registers

    /// CPU read of $2000-$2007 (already folded to the 8-byte window)
    pub fn read_register(&mut self, mapper: &mut dyn Mapper, address: u16) -> u8 {
        let result = match address & 0x0007 {
            2 => {
                let mut result = self.read_status() | (self.internal_bus & 0x1F);
                // reading on the same dot the flag is set suppresses it
                if self.scanline == VBLANK_LINE && self.dot < 2 {
                    result &= !PpuStatus::VBLANK.bits();
                }
                result
            }
            4 => {
                // https://www.nesdev.org/wiki/PPU_sprite_evaluation
                if self.scanline < POST_RENDER_LINE && (1..=64).contains(&self.dot) {
                    0xFF
                } else {
                    self.oam[self.oam_addr as usize]
                }
            }
            7 => {
                let result = if self.v & 0x3FFF <= 0x3EFF {
                    let buffered = self.data;
                    self.data = self.read_memory(mapper, self.v);
                    buffered
                } else {
                    self.read_memory(mapper, self.v)
                };
                self.increment_v();
                result
            }
            // write-only registers read back the bus latch
            _ => self.internal_bus,
        };

        self.internal_bus = result;
        result
    }

    /// CPU write of $2000-$2007
    pub fn write_register(&mut self, mapper: &mut dyn Mapper, address: u16, value: u8) {
        self.internal_bus = value;

        match address & 0x0007 {
            0 => self.write_ctrl(value),
            1 => self.mask = PpuMask::from_bits_retain(value),
            2 => {}
            3 => self.oam_addr = value,
            4 => self.write_oam(value),
            5 => self.write_scroll(value),
            6 => self.write_vram_address(value),
            7 => {
                self.write_memory(mapper, self.v, value);
                self.increment_v();
            }
            _ => unreachable!(),
        }
    }

    /// $2004 write, also the OAM DMA target
    pub fn write_oam(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn increment_v(&mut self) {
        self.v = self.v.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#$2000_write
    fn write_ctrl(&mut self, value: u8) {
        self.ctrl = PpuCtrl::from_bits_retain(value);
        // t: ...BA.. ........ = d: ......BA
        self.t = (self.t & !0b0001100_00000000) | (self.ctrl.nametable_select() << 10);
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#$2002_read
    fn read_status(&mut self) -> u8 {
        let status = self.status;
        self.status.remove(PpuStatus::VBLANK);
        self.write_toggle = false;
        status.bits()
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#$2005_first_write_(w_is_0)
    fn write_scroll(&mut self, d: u8) {
        if !self.write_toggle {
            // t: ....... ...HGFED = d: HGFED...
            // x:              CBA = d: .....CBA
            self.t = (self.t & !0b0000000_00011111) | ((d & 0b11111000) as u16 >> 3);
            self.fine_x = d & 0b111;
            self.write_toggle = true;
        } else {
            // t: CBA..HG FED..... = d: HGFEDCBA
            self.t = (self.t & !0b1110011_11100000)
                | (((d & 0b111) as u16) << 12)
                | (((d & 0b11111000) as u16) << 2);
            self.write_toggle = false;
        }
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#$2006_first_write_(w_is_0)
    fn write_vram_address(&mut self, d: u8) {
        if !self.write_toggle {
            // t: .FEDCBA ........ = d: ..FEDCBA
            // t: X...... ........ = 0
            self.t = (self.t & !0b0111111_00000000) | (((d & 0b111111) as u16) << 8);
            self.write_toggle = true;
        } else {
            // t: ....... HGFEDCBA = d: HGFEDCBA
            self.t = (self.t & !0b0000000_11111111) | d as u16;
            self.v = self.t;
            self.write_toggle = false;
        }
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#Coarse_X_increment
    fn increment_coarse_x(&mut self) {
        if self.v.coarse_x() == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v += 1;
        }
    }

    // https://www.nesdev.org/wiki/PPU_scrolling#Y_increment
    fn increment_y(&mut self) {
        if self.v.fine_y() < 7 {
            self.v += 0x1000;
            return;
        }

        self.v &= !0x7000;
        let mut y = self.v.coarse_y();
        if y == 29 {
            y = 0;
            self.v ^= 0x0800;
        } else if y == 31 {
            y = 0;
        } else {
            y += 1;
        }
        self.v = (self.v & !0x03E0) | (y << 5);
    }

    // v: ....F.. ...EDCBA = t: ....F.. ...EDCBA
    fn copy_x(&mut self) {
        self.v = (self.v & !0b100_00011111) | (self.t & 0b100_00011111);
    }

    // v: IHGF.ED CBA..... = t: IHGF.ED CBA.....
    fn copy_y(&mut self) {
        self.v = (self.v & !0b1111011_11100000) | (self.t & 0b1111011_11100000);
    }

    // MARK: stepping

    /// Advance one dot
    pub fn step(&mut self, mapper: &mut dyn Mapper, interrupts: &mut InterruptLine) {
        match self.scanline {
            PRE_RENDER_LINE => {
                self.render_pixel(mapper);
                if self.dot == 1 {
                    self.status.remove(
                        PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
                    );
                }
            }
            0..=239 => self.render_pixel(mapper),
            VBLANK_LINE if self.dot == 1 => {
                self.status.insert(PpuStatus::VBLANK);
                if self.ctrl.contains(PpuCtrl::NMI) {
                    interrupts.send(Interrupt::NMI);
                }
                trace!("vblank start, frame {}", self.frames);
            }
            _ => {}
        }

        self.advance();
    }

    fn advance(&mut self) {
        self.dot += 1;

        // odd frames drop the last dot of the pre-render line
        if self.scanline == PRE_RENDER_LINE
            && self.dot == LAST_DOT
            && self.frames % 2 == 1
            && self.rendering_enabled()
        {
            self.dot += 1;
        }

        if self.dot < DOTS_PER_LINE {
            return;
        }

        self.dot = 0;
        if (self.scanline as usize) < HEIGHT {
            let row = self.scanline as usize * WIDTH;
            self.back_buffer[row..row + WIDTH].copy_from_slice(self.line_buffer.pixels());
        }

        self.scanline += 1;
        if self.scanline > PRE_RENDER_LINE {
            self.scanline = 0;
            self.frames += 1;
            std::mem::swap(&mut self.back_buffer, &mut self.frame_buffer);
        }
    }

    fn render_pixel(&mut self, mapper: &mut dyn Mapper) {
        let x = self.dot as i32 - 2;

        let bg = self.background_pixel(mapper, x);
        let sprite = self.sprite_pixel(mapper, x, bg);

        if self.rendering_enabled() {
            self.fetch_background(mapper);
            self.fetch_sprite();
        }

        if self.scanline >= POST_RENDER_LINE || !(0..WIDTH as i32).contains(&x) {
            return;
        }

        let pixel = if self.rendering_enabled() {
            self.select_pixel(mapper, bg, sprite)
        } else {
            0
        };
        self.line_buffer
            .write(x as usize, NTSC_PALETTE[(pixel & 0x3F) as usize]);
    }

    fn select_pixel(&mut self, mapper: &mut dyn Mapper, bg: BackgroundPixel, sprite: SpritePixel) -> u8 {
        match (bg.enabled, sprite.enabled) {
            (false, false) => self.read_memory(mapper, 0x3F00),
            (false, true) => sprite.color,
            (true, false) => bg.color,
            (true, true) if sprite.behind_background => bg.color,
            (true, true) => sprite.color,
        }
    }

    fn background_pixel(&mut self, mapper: &mut dyn Mapper, x: i32) -> BackgroundPixel {
        let (pattern, palette) = self.tile.pixel(self.fine_x);

        if (1..=256).contains(&self.dot) || (321..=336).contains(&self.dot) {
            self.tile.shift();
        }

        if !self.background_enabled_at(x) {
            return BackgroundPixel::default();
        }
        BackgroundPixel {
            enabled: pattern != 0,
            color: self.read_memory(mapper, 0x3F00 + palette * 4 + pattern),
        }
    }

    fn fetch_background(&mut self, mapper: &mut dyn Mapper) {
        match self.dot {
            // no shifter reload on the first prefetch
            321 => self.background_address = self.v.tile_address(),
            1..=255 | 322..=336 => match self.dot % 8 {
                1 => {
                    self.background_address = self.v.tile_address();
                    self.tile.reload(self.next_pattern, self.attribute_entry);
                }
                2 => self.nametable_entry = self.read_memory(mapper, self.background_address),
                3 => self.background_address = self.v.attribute_address(),
                4 => {
                    let mut attribute = self.read_memory(mapper, self.background_address);
                    if self.v.coarse_x() & 0b10 != 0 {
                        attribute >>= 2;
                    }
                    if self.v.coarse_y() & 0b10 != 0 {
                        attribute >>= 4;
                    }
                    self.attribute_entry = attribute;
                }
                5 => {
                    let index = self.nametable_entry as u16 * 16;
                    self.background_address = self.ctrl.background_table() + index + self.v.fine_y();
                }
                6 => self.next_pattern.low = self.read_memory(mapper, self.background_address),
                7 => self.background_address += 8,
                0 => {
                    self.next_pattern.high = self.read_memory(mapper, self.background_address);
                    self.increment_coarse_x();
                }
                _ => unreachable!(),
            },
            256 => {
                self.next_pattern.high = self.read_memory(mapper, self.background_address);
                self.increment_y();
            }
            257 => {
                self.tile.reload(self.next_pattern, self.attribute_entry);
                self.copy_x();
            }
            280..=304 if self.scanline == PRE_RENDER_LINE => self.copy_y(),
            // unused nametable fetches
            337 | 339 => self.background_address = self.v.tile_address(),
            338 | 340 => self.nametable_entry = self.read_memory(mapper, self.background_address),
            _ => {}
        }
    }

    fn fetch_sprite(&mut self) {
        match self.dot {
            0 => self.evaluate_sprites(),
            257..=320 => {
                if self.dot == 257 {
                    self.sprite_zero_loaded = self.sprite_zero_on_line;
                }
                let i = (self.dot as usize - 257) / 8;
                let n = i * 4;
                self.sprites[i] = Sprite {
                    y: self.secondary_oam[n],
                    tile_index: self.secondary_oam[n + 1],
                    attr: SpriteAttribute::from_bits_retain(self.secondary_oam[n + 2]),
                    x: self.secondary_oam[n + 3],
                };
            }
            _ => {}
        }
    }

    /// Copy the sprites covering the next scanline into secondary OAM
    fn evaluate_sprites(&mut self) {
        self.secondary_oam.fill(0xFF);
        self.sprite_zero_on_line = false;

        let height = self.ctrl.sprite_height();
        let mut n = 0;

        for i in 0..SPRITE_COUNT {
            let first = i * 4;
            let row = self.scanline as i32 - self.oam[first] as i32;
            if !(0..height).contains(&row) {
                continue;
            }

            if n == SPRITE_LIMIT {
                self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                break;
            }
            if i == 0 {
                self.sprite_zero_on_line = true;
            }

            self.secondary_oam[n * 4..n * 4 + 4].copy_from_slice(&self.oam[first..first + 4]);
            n += 1;
        }
    }

    fn sprite_pixel(&mut self, mapper: &mut dyn Mapper, x: i32, bg: BackgroundPixel) -> SpritePixel {
        if self.scanline >= POST_RENDER_LINE || !self.sprite_enabled_at(x) {
            return SpritePixel::default();
        }

        let height = self.ctrl.sprite_height();

        for i in 0..SPRITE_LIMIT {
            let sprite = self.sprites[i];
            if !sprite.is_valid() {
                break;
            }
            let sprite_x = sprite.x as i32;
            if !(x - 7 <= sprite_x && sprite_x <= x) {
                continue;
            }
            let Some(mut row) = sprite.row(self.scanline, height) else {
                continue;
            };
            let col = sprite.col(x);

            let mut tile_index = sprite.tile_index as u16;
            let base = if height == 16 {
                let bank = (tile_index & 1) * 0x1000;
                tile_index &= 0xFE;
                if row > 7 {
                    tile_index += 1;
                    row -= 8;
                }
                bank
            } else {
                self.ctrl.sprite_table()
            };

            let address = base + tile_index * 16 + row;
            let low = self.read_memory(mapper, address);
            let high = self.read_memory(mapper, address + 8);

            let pixel = ((low >> col) & 1) | (((high >> col) & 1) << 1);
            if pixel == 0 {
                continue;
            }

            if i == 0
                && self.sprite_zero_loaded
                && self.rendering_enabled()
                && !self.status.contains(PpuStatus::SPRITE_ZERO_HIT)
                && sprite.x != 0xFF
                && x < 0xFF
                && bg.enabled
            {
                self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
            }

            return SpritePixel {
                enabled: true,
                color: self.read_memory(mapper, 0x3F10 + sprite.palette() * 4 + pixel as u16),
                behind_background: sprite.attr.contains(SpriteAttribute::BEHIND_BACKGROUND),
            };
        }

        SpritePixel::default()
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

/// 2C02 palette as 0xAARRGGBB
pub const NTSC_PALETTE: [u32; 64] = [
    0xFF7C7C7C, 0xFF0000FC, 0xFF0000BC, 0xFF4428BC, 0xFF940084, 0xFFA80020, 0xFFA81000, 0xFF881400,
    0xFF503000, 0xFF007800, 0xFF006800, 0xFF005800, 0xFF004058, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFBCBCBC, 0xFF0078F8, 0xFF0058F8, 0xFF6844FC, 0xFFD800CC, 0xFFE40058, 0xFFF83800, 0xFFE45C10,
    0xFFAC7C00, 0xFF00B800, 0xFF00A800, 0xFF00A844, 0xFF008888, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFF8F8F8, 0xFF3CBCFC, 0xFF6888FC, 0xFF9878F8, 0xFFF878F8, 0xFFF85898, 0xFFF87858, 0xFFFCA044,
    0xFFF8B800, 0xFFB8F818, 0xFF58D854, 0xFF58F898, 0xFF00E8D8, 0xFF787878, 0xFF000000, 0xFF000000,
    0xFFFCFCFC, 0xFFA4E4FC, 0xFFB8B8F8, 0xFFD8B8F8, 0xFFF8B8F8, 0xFFF8A4C0, 0xFFF0D0B0, 0xFFFCE0A8,
    0xFFF8D878, 0xFFD8F878, 0xFFB8F8B8, 0xFFB8F8D8, 0xFF00FCFC, 0xFFF8D8F8, 0xFF000000, 0xFF000000,
];
