use super::bus::SystemBus;
use super::cartridge::{self, LoadError, MbcKind};
use super::ppu::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::cpu::{Cpu, Registers};

/// T-cycles per displayed frame (154 lines of 456 cycles).
const CYCLES_PER_FRAME: u32 = 70_224;

/// Joypad request bit in the interrupt-flag register.
const INT_JOYPAD: u8 = 0x10;

/// The assembled machine: CPU plus bus. Owns no global state; several
/// consoles can run side by side.
pub struct Console {
    cpu: Cpu,
    bus: SystemBus,
}

fn build_bus(rom: Vec<u8>) -> Result<SystemBus, LoadError> {
    let header = cartridge::parse_header(&rom)?;
    log::info!(
        "loaded cartridge: mapper {:?}, {} ROM banks, {} RAM banks",
        header.kind,
        header.rom_banks,
        header.ram_banks
    );
    if header.kind == MbcKind::Mbc3 {
        log::debug!("cartridge may carry a real-time clock");
    }
    Ok(SystemBus::new(rom, &header))
}

impl Console {
    /// Validate a ROM image and build a machine around it.
    pub fn new(rom: Vec<u8>) -> Result<Console, LoadError> {
        Ok(Console {
            cpu: Cpu::new(),
            bus: build_bus(rom)?,
        })
    }

    /// Swap in a different cartridge and restart from power-on state.
    /// On a load error the running machine is left untouched.
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), LoadError> {
        self.bus = build_bus(rom)?;
        self.cpu.reset();
        Ok(())
    }

    /// Restart the current cartridge from power-on state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
    }

    /// Execute one instruction (or service one interrupt) and advance the
    /// rest of the machine by the same number of cycles. Returns the cycles
    /// consumed; 0 means the CPU has hard-locked.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.bus)
    }

    /// Run for roughly one frame's worth of cycles.
    pub fn step_frame(&mut self) {
        let mut spent: u32 = 0;
        while spent < CYCLES_PER_FRAME {
            let cycles = self.step();
            if cycles == 0 {
                break;
            }
            spent += cycles;
        }
    }

    /// True exactly once per completed frame.
    pub fn frame_ready(&mut self) -> bool {
        self.bus.ppu.take_frame_ready()
    }

    /// The most recently completed frame, one shade index (0..=3) per pixel.
    pub fn frame(&self) -> &[u8; FRAME_WIDTH * FRAME_HEIGHT] {
        self.bus.ppu.frame()
    }

    /// Host-side button press. Raises the joypad interrupt and wakes the
    /// CPU out of STOP or HALT.
    pub fn button_event(&mut self, pressed: bool) {
        if pressed {
            self.bus.if_reg |= INT_JOYPAD;
            self.cpu.wake();
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.cpu.regs
    }

    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    pub fn is_locked(&self) -> bool {
        self.cpu.is_locked()
    }

    pub fn work_ram(&self) -> &[u8] {
        self.bus.work_ram()
    }

    pub fn video_ram(&self) -> &[u8] {
        self.bus.video_ram()
    }

    pub fn high_ram(&self) -> &[u8] {
        self.bus.high_ram()
    }

    pub fn oam(&self) -> &[u8] {
        self.bus.oam()
    }

    pub fn external_ram(&self) -> &[u8] {
        self.bus.external_ram()
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }
}
