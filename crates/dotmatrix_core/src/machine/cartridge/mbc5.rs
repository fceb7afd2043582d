use super::ExtTarget;

/// MBC5 register state. A 9-bit ROM bank split across two registers; unlike
/// the earlier controllers, bank 0 is selectable here.
pub(crate) struct Mbc5 {
    ram_enabled: bool,
    bank_lo: u8,
    bank_hi: u8,
    ram_bank: u8,
    rom_banks: u16,
    ram_banks: u8,
}

impl Mbc5 {
    pub fn new(rom_banks: u16, ram_banks: u8) -> Mbc5 {
        Mbc5 {
            ram_enabled: false,
            bank_lo: 1,
            bank_hi: 0,
            ram_bank: 0,
            rom_banks,
            ram_banks,
        }
    }

    pub fn rom_bank(&self) -> usize {
        let bank = ((self.bank_hi as usize) << 8) | self.bank_lo as usize;
        bank % self.rom_banks as usize
    }

    pub fn ext_target(&self) -> ExtTarget {
        if !self.ram_enabled || self.ram_banks == 0 {
            return ExtTarget::Disabled;
        }
        ExtTarget::Ram(self.ram_bank as usize % self.ram_banks as usize)
    }

    pub fn control_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x2FFF => self.bank_lo = value,
            0x3000..=0x3FFF => self.bank_hi = value & 0x01,
            0x4000..=0x5FFF => self.ram_bank = value & 0x0F,
            _ => {}
        }
    }
}
