use super::ExtTarget;

/// MBC2 register state. A single 4-bit ROM bank register; bit 8 of the
/// write address picks between the RAM gate and the bank register.
pub(crate) struct Mbc2 {
    ram_enabled: bool,
    bank: u8,
    rom_banks: u16,
}

impl Mbc2 {
    pub fn new(rom_banks: u16) -> Mbc2 {
        Mbc2 {
            ram_enabled: false,
            bank: 1,
            rom_banks,
        }
    }

    pub fn rom_bank(&self) -> usize {
        self.bank as usize % self.rom_banks as usize
    }

    pub fn ext_target(&self) -> ExtTarget {
        if self.ram_enabled {
            ExtTarget::Ram(0)
        } else {
            ExtTarget::Disabled
        }
    }

    pub fn control_write(&mut self, addr: u16, value: u8) {
        if addr > 0x3FFF {
            return;
        }
        // MBC2 decodes a single address line: bit 8 clear hits the RAM
        // gate, bit 8 set hits the bank register.
        if addr & 0x0100 == 0 {
            self.ram_enabled = value & 0x0F == 0x0A;
        } else {
            let mut bank = value & 0x0F;
            if bank == 0 {
                bank = 1;
            }
            self.bank = bank;
        }
    }
}
