//! Cartridge header parsing and memory bank controllers.
//!
//! The bus owns all storage; a mapper only tracks its register state and
//! answers "which ROM bank is mapped" / "where do external-region accesses
//! go". Each controller type lives in its own submodule and the [`Mbc`]
//! enum dispatches over them.

mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;
mod rtc;

pub(crate) use mbc1::Mbc1;
pub(crate) use mbc2::Mbc2;
pub(crate) use mbc3::Mbc3;
pub(crate) use mbc5::Mbc5;
pub(crate) use rtc::Rtc;

use thiserror::Error;

/// Why a ROM image was rejected at load time.
///
/// `Corrupt` means the image itself is malformed; `Unsupported` means the
/// image is well formed but asks for hardware this core does not emulate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("corrupt ROM image: {0}")]
    Corrupt(&'static str),
    #[error("unsupported cartridge: {0}")]
    Unsupported(&'static str),
}

/// Mapper family selected by the cartridge-type header byte.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MbcKind {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

/// Decoded cartridge header fields the rest of the machine needs.
#[derive(Copy, Clone, Debug)]
pub struct Header {
    pub kind: MbcKind,
    pub rom_banks: u16,
    pub ram_banks: u8,
}

/// Map the cartridge-type byte at 0x0147 to a mapper family.
pub fn select_variant(code: u8) -> Result<MbcKind, LoadError> {
    match code {
        0x00 => Ok(MbcKind::None),
        0x01..=0x03 => Ok(MbcKind::Mbc1),
        0x05 | 0x06 => Ok(MbcKind::Mbc2),
        0x0F..=0x13 => Ok(MbcKind::Mbc3),
        0x19..=0x1E => Ok(MbcKind::Mbc5),
        0x08 | 0x09 => Err(LoadError::Unsupported("plain ROM + RAM cartridges")),
        0x0B..=0x0D => Err(LoadError::Unsupported("MMM01 mapper")),
        _ => Err(LoadError::Unsupported("unrecognized cartridge type byte")),
    }
}

/// Decode the ROM-size byte at 0x0148 into a bank count.
pub fn rom_bank_count(code: u8) -> Option<u16> {
    match code {
        0x00..=0x06 => Some(2 << code),
        0x52 => Some(72),
        0x53 => Some(80),
        0x54 => Some(96),
        _ => None,
    }
}

/// Decode the RAM-size byte at 0x0149 into a bank count.
pub fn ram_bank_count(code: u8) -> Option<u8> {
    match code {
        0x00 => Some(0),
        // Code 1 is a 2 KiB part; it still occupies a single bank slot.
        0x01 | 0x02 => Some(1),
        0x03 => Some(4),
        _ => None,
    }
}

/// Validate a ROM image and decode its header.
pub fn parse_header(rom: &[u8]) -> Result<Header, LoadError> {
    if rom.len() < 0x0150 {
        return Err(LoadError::Corrupt("image shorter than the cartridge header"));
    }

    let kind = select_variant(rom[0x0147])?;

    let rom_banks = rom_bank_count(rom[0x0148])
        .ok_or(LoadError::Corrupt("unknown ROM size code"))?;
    if rom.len() != rom_banks as usize * super::ROM_BANK_SIZE {
        return Err(LoadError::Corrupt("image length does not match the declared bank count"));
    }

    let ram_banks = ram_bank_count(rom[0x0149])
        .ok_or(LoadError::Corrupt("unknown RAM size code"))?;

    Ok(Header {
        kind,
        rom_banks,
        ram_banks,
    })
}

/// Where an access to the external region (0xA000..=0xBFFF) lands.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum ExtTarget {
    /// RAM gate closed: reads see open bus, writes are dropped.
    Disabled,
    /// External RAM, with the selected bank index.
    Ram(usize),
    /// A clock register (MBC3 only).
    Rtc(usize),
}

/// Mapper register state. Dispatch is a plain enum match, so adding a
/// controller means the compiler flags every site that needs a new arm.
pub(crate) enum Mbc {
    None,
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl Mbc {
    pub fn new(header: &Header) -> Mbc {
        match header.kind {
            MbcKind::None => Mbc::None,
            MbcKind::Mbc1 => Mbc::Mbc1(Mbc1::new(header.rom_banks, header.ram_banks)),
            MbcKind::Mbc2 => Mbc::Mbc2(Mbc2::new(header.rom_banks)),
            MbcKind::Mbc3 => Mbc::Mbc3(Mbc3::new(header.rom_banks, header.ram_banks)),
            MbcKind::Mbc5 => Mbc::Mbc5(Mbc5::new(header.rom_banks, header.ram_banks)),
        }
    }

    /// Bank currently mapped at the switchable ROM window (0x4000..=0x7FFF).
    pub fn rom_bank(&self) -> usize {
        match self {
            Mbc::None => 1,
            Mbc::Mbc1(m) => m.rom_bank(),
            Mbc::Mbc2(m) => m.rom_bank(),
            Mbc::Mbc3(m) => m.rom_bank(),
            Mbc::Mbc5(m) => m.rom_bank(),
        }
    }

    /// Routing decision for the external region.
    pub fn ext_target(&self) -> ExtTarget {
        match self {
            Mbc::None => ExtTarget::Disabled,
            Mbc::Mbc1(m) => m.ext_target(),
            Mbc::Mbc2(m) => m.ext_target(),
            Mbc::Mbc3(m) => m.ext_target(),
            Mbc::Mbc5(m) => m.ext_target(),
        }
    }

    /// A write anywhere in the ROM address range is a mapper register write.
    pub fn control_write(&mut self, addr: u16, value: u8) {
        match self {
            Mbc::None => {}
            Mbc::Mbc1(m) => m.control_write(addr, value),
            Mbc::Mbc2(m) => m.control_write(addr, value),
            Mbc::Mbc3(m) => m.control_write(addr, value),
            Mbc::Mbc5(m) => m.control_write(addr, value),
        }
    }

    /// Mask applied to the in-bank offset of external RAM accesses.
    pub fn ram_addr_mask(&self) -> u16 {
        match self {
            Mbc::Mbc2(_) => 0x01FF,
            _ => 0x1FFF,
        }
    }

    /// Bits forced high on external RAM reads (the MBC2 data bus is 4 bits
    /// wide, so the upper nibble always reads back set).
    pub fn ram_read_or(&self) -> u8 {
        match self {
            Mbc::Mbc2(_) => 0xF0,
            _ => 0x00,
        }
    }

    /// External RAM size in bytes implied by the header and mapper.
    pub fn ram_len(header: &Header) -> usize {
        match header.kind {
            // MBC2 carries 512 half-byte cells on the mapper die and
            // declares no RAM in the header.
            MbcKind::Mbc2 => 0x200,
            _ => header.ram_banks as usize * super::RAM_BANK_SIZE,
        }
    }

    pub fn rtc_read(&self, reg: usize) -> u8 {
        match self {
            Mbc::Mbc3(m) => m.rtc_read(reg),
            _ => 0xFF,
        }
    }

    pub fn rtc_write(&mut self, reg: usize, value: u8) {
        if let Mbc::Mbc3(m) = self {
            m.rtc_write(reg, value);
        }
    }
}
