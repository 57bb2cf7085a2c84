//! PPU tests for the NES emulator

use nes_emu::interrupt::{Interrupt, InterruptLine};
use nes_emu::ppu::{
    Ppu, PpuStatus, DOTS_PER_LINE, NTSC_PALETTE, PRE_RENDER_LINE, VBLANK_LINE, WIDTH,
};
use nes_emu::rom::{Mapper, Mirroring};

/// 8KB of CHR RAM with a fixed mirroring
struct ChrRam {
    chr: Vec<u8>,
    mirroring: Mirroring,
}

impl ChrRam {
    fn new(mirroring: Mirroring) -> Self {
        Self {
            chr: vec![0; 0x2000],
            mirroring,
        }
    }
}

impl Mapper for ChrRam {
    fn read(&mut self, address: u16) -> u8 {
        self.chr.get(address as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, address: u16, value: u8) {
        if let Some(byte) = self.chr.get_mut(address as usize) {
            *byte = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

fn set_address(ppu: &mut Ppu, mapper: &mut dyn Mapper, address: u16) {
    ppu.write_register(mapper, 0x2006, (address >> 8) as u8);
    ppu.write_register(mapper, 0x2006, address as u8);
}

fn run_dots(ppu: &mut Ppu, mapper: &mut dyn Mapper, interrupts: &mut InterruptLine, dots: u64) {
    for _ in 0..dots {
        ppu.step(mapper, interrupts);
    }
}

/// Step until the frame counter moves. Returns the dots the frame took.
fn run_frame(ppu: &mut Ppu, mapper: &mut dyn Mapper, interrupts: &mut InterruptLine) -> u64 {
    let frame = ppu.frames();
    let mut dots = 0;
    while ppu.frames() == frame {
        ppu.step(mapper, interrupts);
        dots += 1;
    }
    dots
}

#[test]
fn test_ppu_reset() {
    let mut ppu = Ppu::new();
    ppu.reset();

    assert_eq!(ppu.scanline(), 0);
    assert_eq!(ppu.dot(), 0);
    assert_eq!(ppu.frames(), 0);
}

#[test]
fn test_vram_round_trip() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);

    set_address(&mut ppu, &mut mapper, 0x2345);
    ppu.write_register(&mut mapper, 0x2007, 0x99);
    ppu.write_register(&mut mapper, 0x2007, 0x77);

    set_address(&mut ppu, &mut mapper, 0x2345);
    // first read returns the stale buffer
    ppu.read_register(&mut mapper, 0x2007);
    assert_eq!(ppu.read_register(&mut mapper, 0x2007), 0x99);
    assert_eq!(ppu.read_register(&mut mapper, 0x2007), 0x77);
}

#[test]
fn test_vram_increment_32() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Horizontal);

    ppu.write_register(&mut mapper, 0x2000, 0x04);
    set_address(&mut ppu, &mut mapper, 0x2000);
    ppu.write_register(&mut mapper, 0x2007, 0x01);
    ppu.write_register(&mut mapper, 0x2007, 0x02);
    assert_eq!(ppu.v, 0x2040);

    assert_eq!(ppu.read_memory(&mut mapper, 0x2020), 0x02);
}

#[test]
fn test_nametable_mirroring_through_registers() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);

    set_address(&mut ppu, &mut mapper, 0x2010);
    ppu.write_register(&mut mapper, 0x2007, 0xAB);
    assert_eq!(ppu.read_memory(&mut mapper, 0x2810), 0xAB);
    assert_eq!(ppu.read_memory(&mut mapper, 0x2410), 0x00);
}

#[test]
fn test_pattern_writes_reach_mapper() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);

    set_address(&mut ppu, &mut mapper, 0x0123);
    ppu.write_register(&mut mapper, 0x2007, 0x5A);
    assert_eq!(mapper.chr[0x0123], 0x5A);
}

#[test]
fn test_palette_reads_are_unbuffered() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);

    set_address(&mut ppu, &mut mapper, 0x3F10);
    ppu.write_register(&mut mapper, 0x2007, 0x2A);

    set_address(&mut ppu, &mut mapper, 0x3F00);
    assert_eq!(ppu.read_register(&mut mapper, 0x2007), 0x2A);

    // greyscale keeps only the luminance bits
    ppu.write_register(&mut mapper, 0x2001, 0x01);
    set_address(&mut ppu, &mut mapper, 0x3F00);
    assert_eq!(ppu.read_register(&mut mapper, 0x2007), 0x20);
}

#[test]
fn test_vblank_raises_nmi() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();
    ppu.write_register(&mut mapper, 0x2000, 0x80);

    run_dots(
        &mut ppu,
        &mut mapper,
        &mut interrupts,
        VBLANK_LINE as u64 * DOTS_PER_LINE as u64 + 2,
    );

    assert_eq!(ppu.scanline(), VBLANK_LINE);
    assert!(ppu.status.contains(PpuStatus::VBLANK));
    assert!(interrupts.is_set(Interrupt::NMI));

    let status = ppu.read_register(&mut mapper, 0x2002);
    assert_ne!(status & 0x80, 0);
    assert!(!ppu.status.contains(PpuStatus::VBLANK));
    assert!(!ppu.write_toggle);
}

#[test]
fn test_vblank_without_nmi_enable() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    run_dots(
        &mut ppu,
        &mut mapper,
        &mut interrupts,
        VBLANK_LINE as u64 * DOTS_PER_LINE as u64 + 2,
    );

    assert!(ppu.status.contains(PpuStatus::VBLANK));
    assert!(interrupts.is_empty());
}

#[test]
fn test_pre_render_clears_status() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    run_dots(
        &mut ppu,
        &mut mapper,
        &mut interrupts,
        PRE_RENDER_LINE as u64 * DOTS_PER_LINE as u64 + 2,
    );

    assert_eq!(ppu.scanline(), PRE_RENDER_LINE);
    assert!(!ppu.status.contains(PpuStatus::VBLANK));
}

#[test]
fn test_frame_completes_after_262_lines() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    run_dots(
        &mut ppu,
        &mut mapper,
        &mut interrupts,
        262 * DOTS_PER_LINE as u64,
    );

    assert_eq!(ppu.frames(), 1);
    assert_eq!(ppu.scanline(), 0);
    assert_eq!(ppu.dot(), 0);
    assert_eq!(ppu.frame_buffer().len(), 256 * 240);
}

#[test]
fn test_oam_address_auto_increment() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    // move out of the visible lines so $2004 reads are not masked
    run_dots(
        &mut ppu,
        &mut mapper,
        &mut interrupts,
        VBLANK_LINE as u64 * DOTS_PER_LINE as u64 + 10,
    );

    ppu.write_register(&mut mapper, 0x2003, 0x10);
    ppu.write_register(&mut mapper, 0x2004, 0xAA);
    ppu.write_register(&mut mapper, 0x2004, 0xBB);
    assert_eq!(ppu.oam[0x10], 0xAA);
    assert_eq!(ppu.oam[0x11], 0xBB);

    ppu.write_register(&mut mapper, 0x2003, 0x11);
    assert_eq!(ppu.read_register(&mut mapper, 0x2004), 0xBB);
}

#[test]
fn test_odd_frames_skip_a_dot_when_rendering() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();
    ppu.write_register(&mut mapper, 0x2001, 0x18);

    let frame = 262 * DOTS_PER_LINE as u64;
    assert_eq!(run_frame(&mut ppu, &mut mapper, &mut interrupts), frame);
    assert_eq!(run_frame(&mut ppu, &mut mapper, &mut interrupts), frame - 1);
    assert_eq!(run_frame(&mut ppu, &mut mapper, &mut interrupts), frame);
    assert_eq!(run_frame(&mut ppu, &mut mapper, &mut interrupts), frame - 1);
}

#[test]
fn test_no_dot_skip_with_rendering_off() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    for _ in 0..4 {
        assert_eq!(
            run_frame(&mut ppu, &mut mapper, &mut interrupts),
            262 * DOTS_PER_LINE as u64
        );
    }
}

#[test]
fn test_oam_data_reads_ff_while_clearing_secondary_oam() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();
    ppu.oam[0] = 0x12;

    run_dots(&mut ppu, &mut mapper, &mut interrupts, 10);
    assert_eq!((ppu.scanline(), ppu.dot()), (0, 10));
    assert_eq!(ppu.read_register(&mut mapper, 0x2004), 0xFF);

    // past dot 64 OAM is visible again
    run_dots(&mut ppu, &mut mapper, &mut interrupts, 60);
    assert_eq!(ppu.read_register(&mut mapper, 0x2004), 0x12);
}

#[test]
fn test_background_and_sprite_land_on_their_pixels() {
    let mut ppu = Ppu::new();
    let mut mapper = ChrRam::new(Mirroring::Vertical);
    let mut interrupts = InterruptLine::new();

    // tile 1 is solid color 1
    for row in 0..8 {
        ppu.write_memory(&mut mapper, 0x0010 + row, 0xFF);
    }
    // nametable column 1 of row 0
    ppu.write_memory(&mut mapper, 0x2001, 0x01);
    ppu.write_memory(&mut mapper, 0x3F00, 0x0F);
    ppu.write_memory(&mut mapper, 0x3F01, 0x30);
    ppu.write_memory(&mut mapper, 0x3F11, 0x16);
    ppu.oam[..4].copy_from_slice(&[50, 0x01, 0x00, 100]);
    ppu.write_register(&mut mapper, 0x2001, 0x1E);

    run_frame(&mut ppu, &mut mapper, &mut interrupts);
    run_frame(&mut ppu, &mut mapper, &mut interrupts);

    let pixel = |x: usize, y: usize| ppu.frame_buffer()[y * WIDTH + x];
    let backdrop = NTSC_PALETTE[0x0F];
    let tile = NTSC_PALETTE[0x30];
    let sprite = NTSC_PALETTE[0x16];

    for x in 8..16 {
        assert_eq!(pixel(x, 4), tile, "background x={}", x);
    }
    assert_eq!(pixel(7, 4), backdrop);
    assert_eq!(pixel(16, 4), backdrop);
    assert_eq!(pixel(9, 8), backdrop);

    // sprites are drawn one line below their OAM y
    for y in 51..59 {
        assert_eq!(pixel(100, y), sprite, "sprite y={}", y);
        assert_eq!(pixel(107, y), sprite, "sprite y={}", y);
    }
    assert_eq!(pixel(100, 50), backdrop);
    assert_eq!(pixel(100, 59), backdrop);
    assert_eq!(pixel(99, 51), backdrop);
    assert_eq!(pixel(108, 51), backdrop);
}
