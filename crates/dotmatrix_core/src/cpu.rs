mod decode;
mod exec;

#[cfg(test)]
mod tests;

/// Registers for the DMG CPU (LR35902).
///
/// The core is Z80-like with an 8-bit ALU and a 16-bit address space. The
/// eight 8-bit registers pair into AF/BC/DE/HL; the pairing is big-endian
/// (high byte first) in every accessor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    #[inline]
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f & 0xF0])
    }

    #[inline]
    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        // Lower 4 bits of F are always zero.
        self.f = f & 0xF0;
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[inline]
    pub fn set_bc(&mut self, value: u16) {
        let [b, c] = value.to_be_bytes();
        self.b = b;
        self.c = c;
    }

    #[inline]
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[inline]
    pub fn set_de(&mut self, value: u16) {
        let [d, e] = value.to_be_bytes();
        self.d = d;
        self.e = e;
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    #[inline]
    pub fn set_hl(&mut self, value: u16) {
        let [h, l] = value.to_be_bytes();
        self.h = h;
        self.l = l;
    }
}

/// Flag bits in the F register.
///
/// Layout (bit index in the byte, from MSB to LSB):
/// - bit 7: Z (zero)
/// - bit 6: N (subtract)
/// - bit 5: H (half carry)
/// - bit 4: C (carry)
/// - bits 0-3 are always zero.
#[derive(Clone, Copy, Debug)]
pub enum Flag {
    Z = 7,
    N = 6,
    H = 5,
    C = 4,
}

impl Cpu {
    #[inline]
    pub fn get_flag(&self, flag: Flag) -> bool {
        let bit = flag as u8;
        (self.regs.f & (1 << bit)) != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let bit = flag as u8;
        if value {
            self.regs.f |= 1 << bit;
        } else {
            self.regs.f &= !(1 << bit);
        }
    }

    #[inline]
    pub(crate) fn clear_flags(&mut self) {
        self.regs.f = 0;
    }
}

/// Abstraction over the memory bus seen by the CPU.
///
/// The system bus implements this to route reads and writes by address
/// region; tests substitute a flat 64 KiB array. `tick` advances bus-side
/// peripherals (the PPU in particular) and is called exactly once per
/// completed instruction with that instruction's total T-cycle cost, so the
/// CPU and peripherals agree cycle-for-cycle on when state changes become
/// visible.
pub trait Bus {
    fn read8(&mut self, addr: u16) -> u8;
    fn write8(&mut self, addr: u16, value: u8);
    /// Advance bus-side peripherals by a given number of CPU cycles.
    ///
    /// Default implementation does nothing; system buses override this to
    /// drive the PPU and friends.
    fn tick(&mut self, _cycles: u32) {}
}

/// Interrupt vector base; vector for interrupt line `n` is `0x40 + n * 8`.
const INTERRUPT_VECTOR_BASE: u16 = 0x0040;
/// T-cycle cost of dispatching an interrupt.
const INTERRUPT_DISPATCH_CYCLES: u32 = 20;
/// T-cycle cost of an idle tick while halted or stopped.
const IDLE_TICK_CYCLES: u32 = 4;

/// DMG CPU core: fetch/decode/execute over a `Bus`.
///
/// Decoding is table-driven (see the `decode` module): each opcode maps to a
/// descriptor carrying the operation tag, the addressing mode of each
/// operand slot, and the instruction's fixed cycle costs. The `exec` module
/// resolves operands through shared helpers and applies one handler per
/// operation family.
#[derive(Clone, Debug)]
pub struct Cpu {
    pub regs: Registers,
    pub ime: bool,
    pub halted: bool,
    /// STOP low-power state. While stopped, the CPU ignores maskable
    /// interrupts and only resumes through `wake` (a button-press-equivalent
    /// event from the host).
    stopped: bool,
    halt_bug: bool,
    ime_enable_pending: bool,
    ime_enable_delay: bool,
    /// When true, the CPU has executed an invalid opcode that hard-locks
    /// the machine on real hardware. `step` returns 0 cycles until reset.
    locked: bool,
    /// Total T-cycles consumed since reset. Monotonically increasing; every
    /// bus-visible state change is ordered by this counter.
    pub cycles: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            ime: false,
            halted: false,
            stopped: false,
            halt_bug: false,
            ime_enable_pending: false,
            ime_enable_delay: false,
            locked: false,
            cycles: 0,
        };
        cpu.apply_dmg_boot_state();
        cpu
    }

    /// Reset the CPU to its power-on state.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.ime = false;
        self.halted = false;
        self.stopped = false;
        self.halt_bug = false;
        self.ime_enable_pending = false;
        self.ime_enable_delay = false;
        self.locked = false;
        self.cycles = 0;
        self.apply_dmg_boot_state();
    }

    /// Initialize registers to match the DMG boot ROM's state after it hands
    /// control to cartridge code at 0x0100.
    ///
    /// These values follow common emulator conventions and hardware tests as
    /// documented in Pan Docs.
    fn apply_dmg_boot_state(&mut self) {
        self.regs.a = 0x01;
        self.regs.f = 0xB0;
        self.regs.b = 0x00;
        self.regs.c = 0x13;
        self.regs.d = 0x00;
        self.regs.e = 0xD8;
        self.regs.h = 0x01;
        self.regs.l = 0x4D;
        self.regs.sp = 0xFFFE;
        self.regs.pc = 0x0100;
        self.ime = false;
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Wake the CPU from STOP (and HALT) in response to a host input event.
    ///
    /// This is the button-press-equivalent entry point; the input
    /// collaborator owns the actual key handling.
    pub fn wake(&mut self) {
        self.stopped = false;
        self.halted = false;
    }

    #[inline]
    pub(crate) fn fetch8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read8(self.regs.pc);
        if self.halt_bug {
            // HALT bug: the first opcode fetch after the bug does not
            // increment PC. We consume the bug here.
            self.halt_bug = false;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        value
    }

    #[inline]
    pub(crate) fn fetch16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    pub(crate) fn push_u16<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let lo = value as u8;
        let hi = (value >> 8) as u8;
        // Stack grows downward: memory[SP] = low, memory[SP+1] = high.
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write8(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write8(self.regs.sp, lo);
    }

    #[inline]
    pub(crate) fn pop_u16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read8(self.regs.sp) as u16;
        let hi = bus.read8(self.regs.sp.wrapping_add(1)) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(2);
        (hi << 8) | lo
    }

    /// Poll IF/IE and determine whether a maskable interrupt should be
    /// serviced in the current state.
    ///
    /// On success, returns the interrupt index (0-4, corresponding to
    /// VBlank/STAT/Timer/Serial/Joypad) together with the current IF value.
    /// A halted CPU with IME clear wakes when an interrupt becomes pending
    /// but does not service it.
    fn poll_pending_interrupt<B: Bus>(&mut self, bus: &mut B) -> Option<(u8, u8)> {
        let ie = bus.read8(0xFFFF);
        let iflags = bus.read8(0xFF0F);
        let pending = ie & iflags & 0x1F;
        if pending == 0 {
            return None;
        }

        if self.halted && !self.ime {
            self.halted = false;
            return None;
        }

        if !self.ime {
            return None;
        }

        // Lowest-numbered pending interrupt wins:
        // VBlank > LCD STAT > Timer > Serial > Joypad.
        let index = pending.trailing_zeros();
        if index >= 5 {
            return None;
        }
        Some((index as u8, iflags))
    }

    /// Service a pending maskable interrupt if IME allows it.
    ///
    /// Dispatch clears IME and the serviced IF bit, pushes PC, and jumps to
    /// the fixed vector for the chosen line. Returns `Some(cycles)` if an
    /// interrupt was taken, or `None` otherwise. Interrupts are only ever
    /// checked here, at instruction boundaries, never mid-instruction.
    fn handle_interrupts<B: Bus>(&mut self, bus: &mut B) -> Option<u32> {
        let (index, iflags) = self.poll_pending_interrupt(bus)?;

        self.ime = false;
        self.halted = false;
        bus.write8(0xFF0F, iflags & !(1 << index));

        let pc = self.regs.pc;
        self.push_u16(bus, pc);
        self.regs.pc = INTERRUPT_VECTOR_BASE + (index as u16) * 8;

        Some(INTERRUPT_DISPATCH_CYCLES)
    }

    /// Apply the delayed IME change requested by EI.
    ///
    /// EI takes effect after the instruction that follows it; this runs once
    /// per `step`, before the interrupt check.
    #[inline]
    fn apply_ime_delay(&mut self) {
        if self.ime_enable_delay {
            self.ime = true;
            self.ime_enable_delay = false;
        } else if self.ime_enable_pending {
            self.ime_enable_pending = false;
            self.ime_enable_delay = true;
        }
    }

    /// Execute a single instruction (or interrupt entry) and return the
    /// number of T-cycles consumed.
    ///
    /// The bus's `tick` is called exactly once with that count, so bus-side
    /// peripherals advance in lockstep with the CPU. A locked CPU returns 0;
    /// a halted or stopped CPU consumes a fixed idle tick without fetching.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.locked {
            return 0;
        }

        if self.stopped {
            // STOP ignores maskable interrupts entirely; only `wake` leaves
            // this state.
            bus.tick(IDLE_TICK_CYCLES);
            self.cycles += IDLE_TICK_CYCLES as u64;
            return IDLE_TICK_CYCLES;
        }

        self.apply_ime_delay();

        if let Some(cycles) = self.handle_interrupts(bus) {
            bus.tick(cycles);
            self.cycles += cycles as u64;
            return cycles;
        }

        if self.halted {
            bus.tick(IDLE_TICK_CYCLES);
            self.cycles += IDLE_TICK_CYCLES as u64;
            return IDLE_TICK_CYCLES;
        }

        let opcode = self.fetch8(bus);
        let cycles = self.exec(bus, opcode);
        bus.tick(cycles);
        self.cycles += cycles as u64;
        cycles
    }
}
