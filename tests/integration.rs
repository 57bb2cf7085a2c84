//! Integration tests for the NES system

use nes_emu::config::Config;
use nes_emu::controller::Button;
use nes_emu::cpu::Status;
use nes_emu::rom::RomError;
use nes_emu::{Console, Error};

const PRG_SIZE: usize = 0x4000;
const CHR_SIZE: usize = 0x2000;

/// One 16KB PRG bank (visible at $8000 and $C000) and one CHR bank
struct Image {
    prg: Vec<u8>,
}

impl Image {
    fn new() -> Self {
        let mut image = Self {
            prg: vec![0xEA; PRG_SIZE],
        };
        image.vector(0xFFFC, 0x8000);
        image
    }

    fn load(&mut self, address: u16, code: &[u8]) -> &mut Self {
        let offset = (address as usize - 0x8000) % PRG_SIZE;
        self.prg[offset..offset + code.len()].copy_from_slice(code);
        self
    }

    fn vector(&mut self, vector: u16, target: u16) -> &mut Self {
        self.load(vector, &target.to_le_bytes())
    }

    fn build(&self, flags6: u8) -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, flags6, 0];
        data.resize(16, 0);
        data.extend_from_slice(&self.prg);
        data.resize(data.len() + CHR_SIZE, 0);
        data
    }
}

#[test]
fn test_nrom_boot_to_brk() {
    let mut image = Image::new();
    // SEI; LDA #$05; STA $4015; BRK
    image
        .load(0x8000, &[0x78, 0xA9, 0x05, 0x8D, 0x15, 0x40, 0x00])
        .vector(0xFFFE, 0x9000);

    let mut console = Console::new(Config::default());
    console.load_rom(&image.build(0)).unwrap();
    assert_eq!(console.cpu().registers().pc, 0x8000);

    for _ in 0..4 {
        console.step();
    }

    assert!(console.cpu().registers().p.contains(Status::I));
    assert_eq!(console.apu().channel_enable(), 0b0000_0101);
    let vector = u16::from_le_bytes([console.read_memory(0xFFFE), console.read_memory(0xFFFF)]);
    assert_eq!(console.cpu().registers().pc, vector);
}

#[test]
fn test_invalid_rom_is_rejected() {
    let mut data = Image::new().build(0);
    data[0] = 0;

    let mut console = Console::default();
    assert!(matches!(
        console.load_rom(&data),
        Err(Error::Rom(RomError::InvalidMagic))
    ));
}

#[test]
fn test_unsupported_mapper_is_rejected() {
    let data = Image::new().build(0x40);

    let mut console = Console::default();
    assert!(matches!(
        console.load_rom(&data),
        Err(Error::Rom(RomError::UnsupportedMapper(4)))
    ));
}

#[test]
fn test_config_error_converts() {
    fn parse(json: &str) -> Result<Config, Error> {
        Ok(Config::from_json(json)?)
    }

    assert!(matches!(parse("not json"), Err(Error::Config(_))));
    assert!(parse("{}").is_ok());
}

#[test]
fn test_vblank_nmi_runs_handler_each_frame() {
    let mut image = Image::new();
    // LDA #$40; STA $4017; LDA #$80; STA $2000; JMP $800A
    image
        .load(
            0x8000,
            &[0xA9, 0x40, 0x8D, 0x17, 0x40, 0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x0A, 0x80],
        )
        // INC $00; RTI
        .load(0x8100, &[0xE6, 0x00, 0x40])
        .vector(0xFFFA, 0x8100);

    let mut console = Console::default();
    console.load_rom(&image.build(0)).unwrap();

    console.run_frame();
    console.run_frame();
    console.run_frame();

    assert_eq!(console.frames(), 3);
    let count = console.read_memory(0x0000);
    assert!((2..=3).contains(&count), "NMI handler ran {} times", count);
}

#[test]
fn test_frame_produces_audio_and_video() {
    let mut console = Console::default();
    console.load_rom(&Image::new().build(0)).unwrap();

    let cycles = console.run_frame();
    // 262 lines of 341 dots at 3 dots per CPU cycle
    assert!((29_700..29_900).contains(&cycles), "frame took {} cycles", cycles);

    assert_eq!(console.frame_buffer().len(), 256 * 240);
    let samples = console.drain_samples();
    let expected = cycles / console.config().sample_interval();
    assert!(samples.len() as u64 + 1 >= expected);
    assert!(console.drain_samples().is_empty());
}

#[test]
fn test_controller_read_through_bus() {
    let mut console = Console::default();
    console.load_rom(&Image::new().build(0)).unwrap();

    if let Some(pad) = console.controller_mut(1) {
        pad.set_buttons(Button::A | Button::START);
    }

    console.write_memory(0x4016, 1);
    console.write_memory(0x4016, 0);
    let bits: Vec<u8> = (0..8).map(|_| console.read_memory(0x4016) & 1).collect();
    assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);

    // port 2 has nothing pressed
    assert_eq!(console.read_memory(0x4017) & 1, 0);
}

#[test]
fn test_wram_is_mirrored() {
    let mut console = Console::default();
    console.load_rom(&Image::new().build(0)).unwrap();

    console.write_memory(0x0123, 0x42);
    assert_eq!(console.read_memory(0x0923), 0x42);
    assert_eq!(console.read_memory(0x1923), 0x42);
}

#[test]
fn test_prg_ram_round_trip() {
    let mut console = Console::default();
    console.load_rom(&Image::new().build(0)).unwrap();

    console.write_memory(0x6000, 0x99);
    assert_eq!(console.read_memory(0x6000), 0x99);
}
