use super::{ExtTarget, Rtc};

/// MBC3 register state: a 7-bit ROM bank, a RAM-or-clock selector, and the
/// embedded real-time clock.
pub(crate) struct Mbc3 {
    ram_enabled: bool,
    bank: u8,
    /// 0x00..=0x03 select a RAM bank, 0x08..=0x0C a clock register.
    selector: u8,
    rtc: Rtc,
    rom_banks: u16,
    ram_banks: u8,
}

impl Mbc3 {
    pub fn new(rom_banks: u16, ram_banks: u8) -> Mbc3 {
        Mbc3 {
            ram_enabled: false,
            bank: 1,
            selector: 0,
            rtc: Rtc::new(),
            rom_banks,
            ram_banks,
        }
    }

    pub fn rom_bank(&self) -> usize {
        self.bank as usize % self.rom_banks as usize
    }

    pub fn ext_target(&self) -> ExtTarget {
        if !self.ram_enabled {
            return ExtTarget::Disabled;
        }
        match self.selector {
            0x00..=0x03 if self.ram_banks > 0 => {
                ExtTarget::Ram(self.selector as usize % self.ram_banks as usize)
            }
            0x08..=0x0C => ExtTarget::Rtc((self.selector - 0x08) as usize),
            _ => ExtTarget::Disabled,
        }
    }

    pub fn control_write(&mut self, addr: u16, value: u8) {
        match addr {
            // The gate covers both RAM and the clock registers.
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                let mut bank = value & 0x7F;
                if bank == 0 {
                    bank = 1;
                }
                self.bank = bank;
            }
            0x4000..=0x5FFF => self.selector = value & 0x0F,
            _ => self.rtc.latch(value),
        }
    }

    pub fn rtc_read(&self, reg: usize) -> u8 {
        self.rtc.read(reg)
    }

    pub fn rtc_write(&mut self, reg: usize, value: u8) {
        self.rtc.write(reg, value);
    }
}
