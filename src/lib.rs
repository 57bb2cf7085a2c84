//! NES emulator core
//!
//! Cycle-stepped emulation of the NES: the 2A03 CPU, the 2C02 PPU, the five
//! APU channels and the bus tying them together. The host drives a
//! [`Console`] and collects frames and audio samples from it.

#![forbid(unsafe_code)]

/// Pending interrupt lines shared by the chips
pub mod interrupt;
/// 6502 core: registers, interrupt service and instruction execution
pub mod cpu;
/// Opcode decode table
pub mod instruction;
/// PPU (Picture Processing Unit): registers, scanline renderer and palette
pub mod ppu;
/// APU (Audio Processing Unit): pulse, triangle, noise, DMC and mixer
pub mod apu;
/// iNES loading and cartridge mappers
pub mod rom;
/// Standard controller shift registers
pub mod controller;
/// Memory bus and CPU address map
pub mod bus;
/// Clock driver owning the whole machine
pub mod console;
/// Host-facing settings
pub mod config;

pub use apu::Apu;
pub use bus::{Bus, CpuBus};
pub use config::{Config, ConfigError};
pub use console::Console;
pub use controller::{Button, ControllerPorts, StandardController};
pub use cpu::{Cpu, Registers, Status};
pub use interrupt::{Interrupt, InterruptLine};
pub use ppu::{Ppu, HEIGHT, WIDTH};
pub use rom::{create_mapper, Mapper, Mirroring, Rom, RomError, RomHeader};

/// Errors surfaced to the host
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
