//! NES ROM loading and the cartridge mapper interface

use log::{info, warn};
use thiserror::Error;

/// NES ROM header magic number
pub const NES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A]; // "NES\x1A"

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;
pub const PRG_RAM_SIZE: usize = 0x2000;

/// Errors raised while loading a cartridge image
#[derive(Debug, Error)]
pub enum RomError {
    #[error("invalid iNES header magic")]
    InvalidMagic,
    #[error("ROM image truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

/// Nametable mirroring modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    /// Four-screen or mapper-controlled layouts
    Other,
}

/// Cartridge hardware as seen by the CPU and PPU buses.
///
/// PPU pattern reads arrive at `$0000-$1FFF`, CPU reads at `$4020-$FFFF`.
pub trait Mapper {
    fn read(&mut self, address: u16) -> u8;
    fn write(&mut self, address: u16, value: u8);
    fn mirroring(&self) -> Mirroring;
}

/// NES ROM header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// in 16KB units
    pub prg_rom_size: usize,
    /// in 8KB units
    pub chr_rom_size: usize,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub has_battery_ram: bool,
    pub has_trainer: bool,
}

impl RomHeader {
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_SIZE {
            return Err(RomError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        if data[0..4] != NES_MAGIC {
            return Err(RomError::InvalidMagic);
        }

        let flags6 = data[6];
        let flags7 = data[7];

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::Other
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        // Mapper number is split across flags 6 and 7
        let mapper = (flags7 & 0xF0) | (flags6 >> 4);

        Ok(Self {
            prg_rom_size: data[4] as usize,
            chr_rom_size: data[5] as usize,
            mapper,
            mirroring,
            has_battery_ram: flags6 & 0x02 != 0,
            has_trainer: flags6 & 0x04 != 0,
        })
    }

    /// Total file size the header promises
    pub fn image_size(&self) -> usize {
        let trainer = if self.has_trainer { TRAINER_SIZE } else { 0 };
        HEADER_SIZE + trainer + self.prg_rom_size * PRG_BANK_SIZE + self.chr_rom_size * CHR_BANK_SIZE
    }
}

/// NES ROM data
#[derive(Debug, Clone)]
pub struct Rom {
    pub header: RomHeader,
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
}

impl Rom {
    /// Load ROM from iNES bytes
    pub fn load_from_data(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data)?;

        let expected = header.image_size();
        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let mut offset = HEADER_SIZE;
        if header.has_trainer {
            offset += TRAINER_SIZE;
        }

        let prg_size = header.prg_rom_size * PRG_BANK_SIZE;
        let prg_rom = data[offset..offset + prg_size].to_vec();
        offset += prg_size;

        let chr_size = header.chr_rom_size * CHR_BANK_SIZE;
        let chr_rom = data[offset..offset + chr_size].to_vec();

        Ok(Self {
            header,
            prg_rom,
            chr_rom,
        })
    }
}

/// Empty cartridge slot: open bus reads, writes dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCartridge;

impl Mapper for NoCartridge {
    fn read(&mut self, _address: u16) -> u8 {
        0
    }

    fn write(&mut self, _address: u16, _value: u8) {}

    fn mirroring(&self) -> Mirroring {
        Mirroring::Other
    }
}

/// Mapper factory
pub fn create_mapper(rom: Rom) -> Result<Box<dyn Mapper>, RomError> {
    info!(
        "cartridge: mapper {}, PRG {}x16KB, CHR {}x8KB, {:?} mirroring",
        rom.header.mapper, rom.header.prg_rom_size, rom.header.chr_rom_size, rom.header.mirroring
    );

    match rom.header.mapper {
        0 => Ok(Box::new(Nrom::new(rom))),
        other => Err(RomError::UnsupportedMapper(other)),
    }
}

/// Mapper 0: fixed 16/32KB PRG, fixed CHR ROM or 8KB CHR RAM
#[derive(Debug, Clone)]
pub struct Nrom {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(rom: Rom) -> Self {
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            rom.chr_rom
        };

        Self {
            prg_rom: rom.prg_rom,
            prg_ram: vec![0; PRG_RAM_SIZE],
            chr,
            chr_is_ram,
            mirroring: rom.header.mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x0000..=0x1FFF => self.chr[address as usize % self.chr.len()],
            0x6000..=0x7FFF => self.prg_ram[(address - 0x6000) as usize],
            0x8000..=0xFFFF if !self.prg_rom.is_empty() => {
                // 16KB images mirror into $C000
                self.prg_rom[(address - 0x8000) as usize % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF if self.chr_is_ram => {
                let len = self.chr.len();
                self.chr[address as usize % len] = value;
            }
            0x0000..=0x1FFF => warn!("write to CHR ROM ${:04X} ignored", address),
            0x6000..=0x7FFF => self.prg_ram[(address - 0x6000) as usize] = value,
            0x8000..=0xFFFF => warn!("write to PRG ROM ${:04X} ignored", address),
            _ => {}
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags6, 0];
        data.resize(HEADER_SIZE, 0);
        let body = prg_banks as usize * PRG_BANK_SIZE + chr_banks as usize * CHR_BANK_SIZE;
        data.extend((0..body).map(|i| (i & 0xFF) as u8));
        data
    }

    #[test]
    fn test_header_parse() {
        let header = RomHeader::parse(&image(2, 1, 0x01)).unwrap();
        assert_eq!(header.prg_rom_size, 2);
        assert_eq!(header.chr_rom_size, 1);
        assert_eq!(header.mapper, 0);
        assert_eq!(header.mirroring, Mirroring::Vertical);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = image(1, 1, 0);
        data[0] = b'X';
        assert!(matches!(
            Rom::load_from_data(&data),
            Err(RomError::InvalidMagic)
        ));
    }

    #[test]
    fn test_truncated_image() {
        let mut data = image(1, 1, 0);
        data.truncate(1000);
        assert!(matches!(
            Rom::load_from_data(&data),
            Err(RomError::Truncated { actual: 1000, .. })
        ));
    }

    #[test]
    fn test_unsupported_mapper() {
        let rom = Rom::load_from_data(&image(1, 1, 0x10)).unwrap();
        assert!(matches!(
            create_mapper(rom),
            Err(RomError::UnsupportedMapper(1))
        ));
    }

    #[test]
    fn test_nrom_prg_mirror() {
        let rom = Rom::load_from_data(&image(1, 1, 0)).unwrap();
        let mut mapper = Nrom::new(rom);
        assert_eq!(mapper.read(0x8005), mapper.read(0xC005));
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn test_nrom_chr_ram() {
        let rom = Rom::load_from_data(&image(1, 0, 0)).unwrap();
        let mut mapper = Nrom::new(rom);
        mapper.write(0x0123, 0x5A);
        assert_eq!(mapper.read(0x0123), 0x5A);
    }

    #[test]
    fn test_nrom_chr_rom_is_read_only() {
        let rom = Rom::load_from_data(&image(1, 1, 0)).unwrap();
        let mut mapper = Nrom::new(rom);
        let before = mapper.read(0x0010);
        mapper.write(0x0010, before.wrapping_add(1));
        assert_eq!(mapper.read(0x0010), before);
    }
}
