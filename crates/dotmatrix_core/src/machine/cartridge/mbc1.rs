use super::ExtTarget;

/// MBC1 register state. Two bank registers (5 + 2 bits) shared between ROM
/// and RAM banking depending on the mode flag.
pub(crate) struct Mbc1 {
    ram_enabled: bool,
    /// Lower 5 bits of the ROM bank; hardware never lets this be zero.
    bank_lo: u8,
    /// Upper 2 bits, meaning depends on `advanced_mode`.
    bank_hi: u8,
    advanced_mode: bool,
    rom_banks: u16,
    ram_banks: u8,
}

impl Mbc1 {
    pub fn new(rom_banks: u16, ram_banks: u8) -> Mbc1 {
        Mbc1 {
            ram_enabled: false,
            bank_lo: 1,
            bank_hi: 0,
            advanced_mode: false,
            rom_banks,
            ram_banks,
        }
    }

    pub fn rom_bank(&self) -> usize {
        let mut bank = self.bank_lo as usize;
        if !self.advanced_mode {
            bank |= (self.bank_hi as usize) << 5;
        }
        bank % self.rom_banks as usize
    }

    pub fn ext_target(&self) -> ExtTarget {
        if !self.ram_enabled || self.ram_banks == 0 {
            return ExtTarget::Disabled;
        }
        let bank = if self.advanced_mode {
            self.bank_hi as usize % self.ram_banks as usize
        } else {
            0
        };
        ExtTarget::Ram(bank)
    }

    pub fn control_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                let mut lo = value & 0x1F;
                // Writing zero selects bank 1; the comparison happens before
                // the upper bits are appended, so banks 0x20/0x40/0x60 are
                // unreachable on real MBC1 parts too.
                if lo == 0 {
                    lo = 1;
                }
                self.bank_lo = lo;
            }
            0x4000..=0x5FFF => self.bank_hi = value & 0x03,
            _ => self.advanced_mode = value & 0x01 != 0,
        }
    }
}
