//! Memory bus: work RAM, cartridge slot, controller ports and the CPU address map

use crate::apu::Apu;
use crate::controller::ControllerPorts;
use crate::cpu;
use crate::interrupt::InterruptLine;
use crate::ppu::Ppu;
use crate::rom::{Mapper, Mirroring, NoCartridge};

pub const WRAM_SIZE: usize = 0x0800;

/// Devices owned by the bus itself
pub struct Bus {
    pub wram: [u8; WRAM_SIZE],
    pub mapper: Box<dyn Mapper>,
    pub controllers: ControllerPorts,
    /// Page latched by a $4014 write, serviced by the clock driver
    pub oam_dma: Option<u8>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            mapper: Box::new(NoCartridge),
            controllers: ControllerPorts::new(),
            oam_dma: None,
        }
    }

    pub fn insert_cartridge(&mut self, mapper: Box<dyn Mapper>) {
        self.mapper = mapper;
    }

    pub fn reset(&mut self) {
        self.wram.fill(0);
        self.oam_dma = None;
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// The CPU's view of the machine for the duration of one step
pub struct CpuBus<'a> {
    pub bus: &'a mut Bus,
    pub ppu: &'a mut Ppu,
    pub apu: &'a mut Apu,
    pub interrupts: &'a mut InterruptLine,
}

impl cpu::Bus for CpuBus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x0000..=0x1FFF => self.bus.wram[address as usize % WRAM_SIZE],
            0x2000..=0x3FFF => self.ppu.read_register(self.bus.mapper.as_mut(), ppu_register(address)),
            0x4015 => self.apu.read(address, self.interrupts),
            0x4016 => self.bus.controllers.read1(),
            0x4017 => self.bus.controllers.read2(),
            0x4020..=0xFFFF => self.bus.mapper.read(address),
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.bus.wram[address as usize % WRAM_SIZE] = value,
            0x2000..=0x3FFF => {
                self.ppu
                    .write_register(self.bus.mapper.as_mut(), ppu_register(address), value)
            }
            0x4014 => self.bus.oam_dma = Some(value),
            0x4016 => self.bus.controllers.strobe_write(value),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(address, value, self.interrupts),
            0x4020..=0xFFFF => self.bus.mapper.write(address, value),
            _ => {}
        }
    }

    fn interrupts(&mut self) -> &mut InterruptLine {
        &mut *self.interrupts
    }
}

/// PPU registers repeat every 8 bytes
fn ppu_register(address: u16) -> u16 {
    0x2000 + address % 8
}

/// Fold a $2000-$3EFF PPU address into the nametable RAM
pub fn nametable_index(address: u16, mirroring: Mirroring) -> usize {
    let offset = (address & 0x0FFF) as usize;
    match mirroring {
        Mirroring::Vertical => offset % 0x0800,
        Mirroring::Horizontal => {
            if offset >= 0x0800 {
                0x0400 + offset % 0x0400
            } else {
                offset % 0x0400
            }
        }
        Mirroring::Other => offset,
    }
}

/// Fold a $3F00-$3FFF PPU address into the 32-byte palette RAM
///
/// https://www.nesdev.org/wiki/PPU_palettes#Memory_Map
pub fn palette_index(address: u16) -> usize {
    let index = (address % 32) as usize;
    if index >= 0x10 && index % 4 == 0 {
        index - 0x10
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::cpu::Bus as _;

    #[test]
    fn test_nametable_mirroring() {
        assert_eq!(nametable_index(0x2400, Mirroring::Vertical), 0x0400);
        assert_eq!(nametable_index(0x2800, Mirroring::Vertical), 0x0000);
        assert_eq!(nametable_index(0x2400, Mirroring::Horizontal), 0x0000);
        assert_eq!(nametable_index(0x2C10, Mirroring::Horizontal), 0x0410);
        assert_eq!(nametable_index(0x3C10, Mirroring::Other), 0x0C10);
    }

    #[test]
    fn test_palette_aliases() {
        assert_eq!(palette_index(0x3F10), 0x00);
        assert_eq!(palette_index(0x3F14), 0x04);
        assert_eq!(palette_index(0x3F11), 0x11);
        assert_eq!(palette_index(0x3F20), 0x00);
    }

    #[test]
    fn test_wram_mirrors_and_dma_latch() {
        let mut bus = Bus::new();
        let mut ppu = Ppu::new();
        let mut apu = Apu::new(&Config::default());
        let mut interrupts = InterruptLine::new();
        let mut view = CpuBus {
            bus: &mut bus,
            ppu: &mut ppu,
            apu: &mut apu,
            interrupts: &mut interrupts,
        };

        view.write(0x0001, 0xAB);
        assert_eq!(view.read(0x0801), 0xAB);
        assert_eq!(view.read(0x1801), 0xAB);

        view.write(0x4014, 0x02);
        assert_eq!(bus.oam_dma, Some(0x02));
    }
}
