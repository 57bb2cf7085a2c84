//! Clock driver
//!
//! Owns every chip of the machine and interleaves them: one CPU step, then
//! three PPU dots and one APU cycle for every CPU cycle that step consumed.

use log::{debug, info};

use crate::apu::{Apu, DMC_STALL_CYCLES};
use crate::bus::{Bus, CpuBus};
use crate::config::Config;
use crate::controller::StandardController;
use crate::cpu::{self, Cpu};
use crate::interrupt::{Interrupt, InterruptLine};
use crate::ppu::Ppu;
use crate::rom::{create_mapper, Mapper, Rom};
use crate::Error;

/// PPU dots per CPU cycle (NTSC)
pub const PPU_DOTS_PER_CPU_CYCLE: u64 = 3;

/// Bytes copied by one OAM DMA transfer
pub const OAM_DMA_LENGTH: u16 = 256;

/// CPU cycles an OAM DMA halts the CPU for, plus one on odd cycles
pub const OAM_DMA_CYCLES: u64 = 513;

/// The whole machine
pub struct Console {
    cpu: Cpu,
    bus: Bus,
    ppu: Ppu,
    apu: Apu,
    interrupts: InterruptLine,
    config: Config,
    /// CPU cycles driven since power-on, stalls included
    cycles: u64,
    /// Stall cycles still owed to the PPU and APU
    stall: u64,
}

impl Console {
    pub fn new(config: Config) -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
            ppu: Ppu::new(),
            apu: Apu::new(&config),
            interrupts: InterruptLine::new(),
            config,
            cycles: 0,
            stall: 0,
        }
    }

    /// Parse an iNES image and power the machine on with it
    pub fn load_rom(&mut self, data: &[u8]) -> Result<(), Error> {
        let rom = Rom::load_from_data(data)?;
        let mapper = create_mapper(rom)?;
        self.insert_cartridge(mapper);
        Ok(())
    }

    /// Insert a cartridge and run the power-on sequence.
    ///
    /// RESET is serviced before returning, so the next `step` executes the
    /// first instruction at the reset vector.
    pub fn insert_cartridge(&mut self, mapper: Box<dyn Mapper>) {
        self.bus.insert_cartridge(mapper);
        self.power_on();
    }

    fn power_on(&mut self) {
        self.cpu.power_on();
        self.interrupts.clear(Interrupt::NMI | Interrupt::IRQ);
        self.bus.reset();
        self.ppu.reset();
        self.apu.reset();
        self.cycles = 0;
        self.stall = 0;

        self.interrupts.send(Interrupt::RESET);
        let cycles = self.step();
        info!(
            "power on: PC={:04X} after {} cycles",
            self.cpu.registers().pc,
            cycles
        );
    }

    /// Soft reset; serviced on the next `step`
    pub fn reset(&mut self) {
        debug!("soft reset requested");
        self.interrupts.send(Interrupt::RESET);
    }

    /// Run one CPU step and drive the PPU and APU for the cycles it took.
    ///
    /// Returns the CPU cycles consumed, DMA and DMC stalls included.
    pub fn step(&mut self) -> u64 {
        let mut cycles = {
            let mut view = CpuBus {
                bus: &mut self.bus,
                ppu: &mut self.ppu,
                apu: &mut self.apu,
                interrupts: &mut self.interrupts,
            };
            self.cpu.step(&mut view)
        };

        if let Some(page) = self.bus.oam_dma.take() {
            cycles += self.oam_dma(page, cycles);
        }

        cycles += std::mem::take(&mut self.stall);

        for _ in 0..cycles {
            for _ in 0..PPU_DOTS_PER_CPU_CYCLE {
                self.ppu.step(self.bus.mapper.as_mut(), &mut self.interrupts);
            }
            if self.apu.step(self.bus.mapper.as_mut(), &mut self.interrupts) {
                self.stall += DMC_STALL_CYCLES;
            }
        }

        self.cycles = self.cycles.wrapping_add(cycles);
        cycles
    }

    /// Copy a CPU page into OAM. Returns the cycles the CPU was halted for.
    fn oam_dma(&mut self, page: u8, elapsed: u64) -> u64 {
        let base = (page as u16) << 8;
        for offset in 0..OAM_DMA_LENGTH {
            let value = {
                let mut view = self.cpu_bus();
                cpu::Bus::read(&mut view, base | offset)
            };
            self.ppu.write_oam(value);
        }

        // the DMA waits one more cycle when it starts on an odd cycle
        let odd = self.cycles.wrapping_add(elapsed) % 2 == 1;
        debug!("OAM DMA from ${:04X}, odd={}", base, odd);
        OAM_DMA_CYCLES + odd as u64
    }

    /// Step until the PPU completes a frame. Returns the cycles it took.
    pub fn run_frame(&mut self) -> u64 {
        let frame = self.ppu.frames();
        let mut cycles = 0;
        while self.ppu.frames() == frame {
            cycles += self.step();
        }
        cycles
    }

    fn cpu_bus(&mut self) -> CpuBus<'_> {
        CpuBus {
            bus: &mut self.bus,
            ppu: &mut self.ppu,
            apu: &mut self.apu,
            interrupts: &mut self.interrupts,
        }
    }

    /// Last completed frame, 256x240 ARGB pixels
    pub fn frame_buffer(&self) -> &[u32] {
        self.ppu.frame_buffer()
    }

    /// Hand the accumulated audio samples to the host
    pub fn drain_samples(&mut self) -> Vec<f32> {
        self.apu.drain_samples()
    }

    /// Controller on port 1 or 2
    pub fn controller_mut(&mut self, port: u8) -> Option<&mut StandardController> {
        self.bus.controllers.port_mut(port)
    }

    /// Read a byte through the CPU address map, side effects included
    pub fn read_memory(&mut self, address: u16) -> u8 {
        let mut view = self.cpu_bus();
        cpu::Bus::read(&mut view, address)
    }

    /// Write a byte through the CPU address map
    pub fn write_memory(&mut self, address: u16, value: u8) {
        let mut view = self.cpu_bus();
        cpu::Bus::write(&mut view, address, value);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn interrupts(&self) -> &InterruptLine {
        &self.interrupts
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// CPU cycles since power-on
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Frames completed by the PPU
    pub fn frames(&self) -> u64 {
        self.ppu.frames()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
