//! System bus: total address-space dispatch plus ownership of every byte of
//! storage. The mapper decides routing; all memory lives here.

use super::cartridge::{ExtTarget, Header, Mbc};
use super::ppu::Ppu;
use super::{RAM_BANK_SIZE, ROM_BANK_SIZE};
use crate::cpu::Bus;

/// Value returned by reads that hit nothing.
const OPEN_BUS: u8 = 0xFF;

const VRAM_SIZE: usize = 0x2000;
const WRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;
const HRAM_SIZE: usize = 0x7F;

pub struct SystemBus {
    rom: Vec<u8>,
    header: Header,
    mbc: Mbc,
    pub(crate) ppu: Ppu,
    vram: Box<[u8; VRAM_SIZE]>,
    wram: Box<[u8; WRAM_SIZE]>,
    xram: Vec<u8>,
    oam: [u8; OAM_SIZE],
    io: [u8; 0x80],
    hram: [u8; HRAM_SIZE],
    pub(crate) if_reg: u8,
    ie_reg: u8,
}

impl SystemBus {
    pub fn new(rom: Vec<u8>, header: &Header) -> SystemBus {
        SystemBus {
            rom,
            header: *header,
            mbc: Mbc::new(header),
            ppu: Ppu::new(),
            vram: Box::new([0; VRAM_SIZE]),
            wram: Box::new([0; WRAM_SIZE]),
            xram: vec![0; Mbc::ram_len(header)],
            oam: [0; OAM_SIZE],
            io: [0; 0x80],
            hram: [0; HRAM_SIZE],
            if_reg: 0,
            ie_reg: 0,
        }
    }

    /// Return every region to its power-on state. The ROM image stays.
    pub fn reset(&mut self) {
        self.mbc = Mbc::new(&self.header);
        self.ppu = Ppu::new();
        self.vram.fill(0);
        self.wram.fill(0);
        self.xram.fill(0);
        self.oam.fill(0);
        self.io.fill(0);
        self.hram.fill(0);
        self.if_reg = 0;
        self.ie_reg = 0;
    }

    pub fn work_ram(&self) -> &[u8] {
        &self.wram[..]
    }

    pub fn video_ram(&self) -> &[u8] {
        &self.vram[..]
    }

    pub fn high_ram(&self) -> &[u8] {
        &self.hram
    }

    pub fn oam(&self) -> &[u8] {
        &self.oam
    }

    /// Raw external cartridge RAM, all banks back to back.
    pub fn external_ram(&self) -> &[u8] {
        &self.xram
    }

    fn ext_read(&self, addr: u16) -> u8 {
        match self.mbc.ext_target() {
            ExtTarget::Disabled => OPEN_BUS,
            ExtTarget::Ram(bank) => {
                let offset = (addr & self.mbc.ram_addr_mask()) as usize;
                let index = bank * RAM_BANK_SIZE + offset;
                match self.xram.get(index) {
                    Some(&byte) => byte | self.mbc.ram_read_or(),
                    None => OPEN_BUS,
                }
            }
            ExtTarget::Rtc(reg) => self.mbc.rtc_read(reg),
        }
    }

    fn ext_write(&mut self, addr: u16, value: u8) {
        match self.mbc.ext_target() {
            ExtTarget::Disabled => {}
            ExtTarget::Ram(bank) => {
                let offset = (addr & self.mbc.ram_addr_mask()) as usize;
                let index = bank * RAM_BANK_SIZE + offset;
                if let Some(byte) = self.xram.get_mut(index) {
                    *byte = value;
                }
            }
            ExtTarget::Rtc(reg) => self.mbc.rtc_write(reg, value),
        }
    }

    /// OAM DMA: copy 0xA0 bytes from `source << 8` into sprite memory.
    fn oam_dma(&mut self, source: u8) {
        let base = (source as u16) << 8;
        for i in 0..OAM_SIZE as u16 {
            self.oam[i as usize] = self.read8(base.wrapping_add(i));
        }
    }
}

impl Bus for SystemBus {
    fn read8(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom[addr as usize],
            0x4000..=0x7FFF => {
                let offset = self.mbc.rom_bank() * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom[offset]
            }
            0x8000..=0x9FFF => self.vram[addr as usize - 0x8000],
            0xA000..=0xBFFF => self.ext_read(addr),
            0xC000..=0xDFFF => self.wram[addr as usize - 0xC000],
            // Echo RAM mirrors work RAM.
            0xE000..=0xFDFF => self.wram[(addr as usize - 0xE000) & (WRAM_SIZE - 1)],
            0xFE00..=0xFE9F => self.oam[addr as usize - 0xFE00],
            0xFEA0..=0xFEFF => OPEN_BUS,
            0xFF0F => self.if_reg | 0xE0,
            0xFF46 => self.io[0x46],
            0xFF40..=0xFF4B => self.ppu.read_register(addr),
            0xFF00..=0xFF7F => self.io[addr as usize - 0xFF00],
            0xFF80..=0xFFFE => self.hram[addr as usize - 0xFF80],
            0xFFFF => self.ie_reg,
        }
    }

    fn write8(&mut self, addr: u16, value: u8) {
        match addr {
            // Writes into the ROM window are mapper register writes.
            0x0000..=0x7FFF => self.mbc.control_write(addr, value),
            0x8000..=0x9FFF => self.vram[addr as usize - 0x8000] = value,
            0xA000..=0xBFFF => self.ext_write(addr, value),
            0xC000..=0xDFFF => self.wram[addr as usize - 0xC000] = value,
            0xE000..=0xFDFF => self.wram[(addr as usize - 0xE000) & (WRAM_SIZE - 1)] = value,
            0xFE00..=0xFE9F => self.oam[addr as usize - 0xFE00] = value,
            0xFEA0..=0xFEFF => {}
            0xFF0F => self.if_reg = value & 0x1F,
            0xFF46 => {
                self.io[0x46] = value;
                self.oam_dma(value);
            }
            0xFF40..=0xFF4B => self.ppu.write_register(addr, value),
            0xFF00..=0xFF7F => self.io[addr as usize - 0xFF00] = value,
            0xFF80..=0xFFFE => self.hram[addr as usize - 0xFF80] = value,
            0xFFFF => self.ie_reg = value,
        }
    }

    fn tick(&mut self, cycles: u32) {
        self.ppu.step(cycles, &self.vram[..], &self.oam, &mut self.if_reg);
    }
}
