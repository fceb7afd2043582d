//! Operand resolution and operation handlers.
//!
//! `exec` looks up the decode-table descriptor for an opcode, resolves the
//! left/right operand slots through the shared `read_place*`/`write_place*`
//! helpers, and runs the one handler for that operation family. Cycle costs
//! come from the descriptor, never from the handler.

use super::decode::{self, CbOp, Cond, Instr, Op, Place, R16, R8};
use super::{Bus, Cpu, Flag};

impl Cpu {
    #[inline]
    fn read_r8(&self, r: R8) -> u8 {
        match r {
            R8::A => self.regs.a,
            R8::B => self.regs.b,
            R8::C => self.regs.c,
            R8::D => self.regs.d,
            R8::E => self.regs.e,
            R8::H => self.regs.h,
            R8::L => self.regs.l,
        }
    }

    #[inline]
    fn write_r8(&mut self, r: R8, value: u8) {
        match r {
            R8::A => self.regs.a = value,
            R8::B => self.regs.b = value,
            R8::C => self.regs.c = value,
            R8::D => self.regs.d = value,
            R8::E => self.regs.e = value,
            R8::H => self.regs.h = value,
            R8::L => self.regs.l = value,
        }
    }

    #[inline]
    fn read_r16(&self, rr: R16) -> u16 {
        match rr {
            R16::AF => self.regs.af(),
            R16::BC => self.regs.bc(),
            R16::DE => self.regs.de(),
            R16::HL => self.regs.hl(),
            R16::SP => self.regs.sp,
        }
    }

    #[inline]
    fn write_r16(&mut self, rr: R16, value: u16) {
        match rr {
            R16::AF => self.regs.set_af(value),
            R16::BC => self.regs.set_bc(value),
            R16::DE => self.regs.set_de(value),
            R16::HL => self.regs.set_hl(value),
            R16::SP => self.regs.sp = value,
        }
    }

    /// Resolve an 8-bit operand slot, fetching immediates and performing
    /// memory reads as the addressing mode requires.
    fn read_place8<B: Bus>(&mut self, bus: &mut B, place: Place) -> u8 {
        match place {
            Place::R8(r) => self.read_r8(r),
            Place::Imm8 => self.fetch8(bus),
            Place::Ind(rr) => {
                let addr = self.read_r16(rr);
                bus.read8(addr)
            }
            Place::IndImm16 => {
                let addr = self.fetch16(bus);
                bus.read8(addr)
            }
            Place::HighImm8 => {
                let addr = 0xFF00 | self.fetch8(bus) as u16;
                bus.read8(addr)
            }
            Place::HighC => bus.read8(0xFF00 | self.regs.c as u16),
            Place::IndHlInc => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_add(1));
                bus.read8(addr)
            }
            Place::IndHlDec => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_sub(1));
                bus.read8(addr)
            }
            Place::None | Place::R16(_) | Place::Imm16 => {
                unreachable!("not an 8-bit readable operand: {:?}", place)
            }
        }
    }

    /// Store into an 8-bit operand slot.
    fn write_place8<B: Bus>(&mut self, bus: &mut B, place: Place, value: u8) {
        match place {
            Place::R8(r) => self.write_r8(r, value),
            Place::Ind(rr) => {
                let addr = self.read_r16(rr);
                bus.write8(addr, value);
            }
            Place::IndImm16 => {
                let addr = self.fetch16(bus);
                bus.write8(addr, value);
            }
            Place::HighImm8 => {
                let addr = 0xFF00 | self.fetch8(bus) as u16;
                bus.write8(addr, value);
            }
            Place::HighC => bus.write8(0xFF00 | self.regs.c as u16, value),
            Place::IndHlInc => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_add(1));
                bus.write8(addr, value);
            }
            Place::IndHlDec => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_sub(1));
                bus.write8(addr, value);
            }
            Place::None | Place::Imm8 | Place::R16(_) | Place::Imm16 => {
                unreachable!("not an 8-bit writable operand: {:?}", place)
            }
        }
    }

    /// Resolve a 16-bit operand slot (register pair or immediate word).
    fn read_place16<B: Bus>(&mut self, bus: &mut B, place: Place) -> u16 {
        match place {
            Place::R16(rr) => self.read_r16(rr),
            Place::Imm16 => self.fetch16(bus),
            _ => unreachable!("not a 16-bit readable operand: {:?}", place),
        }
    }

    fn write_place16(&mut self, place: Place, value: u16) {
        match place {
            Place::R16(rr) => self.write_r16(rr, value),
            _ => unreachable!("not a 16-bit writable operand: {:?}", place),
        }
    }

    #[inline]
    fn cond_met(&self, cond: Cond) -> bool {
        match cond {
            Cond::Always => true,
            Cond::Nz => !self.get_flag(Flag::Z),
            Cond::Z => self.get_flag(Flag::Z),
            Cond::Nc => !self.get_flag(Flag::C),
            Cond::C => self.get_flag(Flag::C),
        }
    }

    /// Core 8-bit ADD/ADC operation on A.
    ///
    /// `use_carry` selects between ADD (false) and ADC (true).
    fn alu_add(&mut self, value: u8, use_carry: bool) {
        let a = self.regs.a;
        let carry_in = if use_carry && self.get_flag(Flag::C) {
            1u8
        } else {
            0
        };

        let half = (a & 0x0F) + (value & 0x0F) + carry_in;
        let full = (a as u16) + (value as u16) + (carry_in as u16);
        let result = full as u8;

        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, (half & 0x10) != 0);
        self.set_flag(Flag::C, full > 0xFF);
    }

    /// Core 8-bit SUB/SBC operation on A.
    fn alu_sub(&mut self, value: u8, use_carry: bool) {
        let a = self.regs.a;
        let carry_in = if use_carry && self.get_flag(Flag::C) {
            1i16
        } else {
            0
        };

        let half = (a & 0x0F) as i16 - (value & 0x0F) as i16 - carry_in;
        let full = a as i16 - value as i16 - carry_in;
        let result = full as u8;

        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, half < 0);
        self.set_flag(Flag::C, full < 0);
    }

    #[inline]
    fn alu_and(&mut self, value: u8) {
        let result = self.regs.a & value;
        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, true);
    }

    #[inline]
    fn alu_or(&mut self, value: u8) {
        let result = self.regs.a | value;
        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
    }

    #[inline]
    fn alu_xor(&mut self, value: u8) {
        let result = self.regs.a ^ value;
        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
    }

    /// Compare A with `value`, setting flags as if `A - value` was performed.
    /// A itself is not modified.
    #[inline]
    fn alu_cp(&mut self, value: u8) {
        let a = self.regs.a;
        let half = (a & 0x0F) as i16 - (value & 0x0F) as i16;
        let full = a as i16 - value as i16;
        let result = full as u8;

        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, half < 0);
        self.set_flag(Flag::C, full < 0);
    }

    /// Decimal adjust accumulator after BCD addition/subtraction.
    ///
    /// Uses C, H, N, and A to compute a correction value; updates A, Z, H, C
    /// and leaves N unchanged.
    fn alu_daa(&mut self) {
        let mut a = self.regs.a;
        let mut adjust: u8 = if self.get_flag(Flag::C) { 0x60 } else { 0x00 };
        if self.get_flag(Flag::H) {
            adjust |= 0x06;
        }

        if !self.get_flag(Flag::N) {
            // After an addition.
            if (a & 0x0F) > 0x09 {
                adjust |= 0x06;
            }
            if a > 0x99 {
                adjust |= 0x60;
            }
            a = a.wrapping_add(adjust);
        } else {
            // After a subtraction.
            a = a.wrapping_sub(adjust);
        }

        self.set_flag(Flag::C, adjust >= 0x60);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::Z, a == 0);
        self.regs.a = a;
    }

    /// 8-bit increment helper. Updates Z, N, H while leaving C unchanged.
    #[inline]
    fn alu_inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, (value & 0x0F) + 1 > 0x0F);
        result
    }

    /// 8-bit decrement helper. Updates Z, N, H while leaving C unchanged.
    #[inline]
    fn alu_dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, (value & 0x0F) == 0);
        result
    }

    /// 16-bit add helper for `ADD HL,rr`.
    ///
    /// Z is unaffected; N is cleared; H and C are updated based on the
    /// 16-bit addition.
    #[inline]
    fn alu_add16_hl(&mut self, value: u16) {
        let hl = self.regs.hl();
        let result = hl.wrapping_add(value);

        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
        self.set_flag(Flag::C, (hl as u32) + (value as u32) > 0xFFFF);

        self.regs.set_hl(result);
    }

    /// 16-bit add helper for instructions that add a signed 8-bit immediate
    /// to a 16-bit base (ADD SP, r8 and LD HL, SP+r8).
    ///
    /// Z is cleared; N is cleared; H and C are computed from the low byte.
    #[inline]
    fn alu_add16_signed(&mut self, base: u16, imm8: u8) -> u16 {
        let offset = imm8 as i8 as i16 as u16;
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::Z, false);
        self.set_flag(Flag::H, (base & 0x000F) + (offset & 0x000F) > 0x000F);
        self.set_flag(Flag::C, (base & 0x00FF) + (offset & 0x00FF) > 0x00FF);
        base.wrapping_add(offset)
    }

    /// Decode and execute a single opcode, returning its T-cycle cost.
    pub(crate) fn exec<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        let i = decode::decode(opcode);
        if i.op == Op::Prefix {
            let cb = self.fetch8(bus);
            self.exec_cb(bus, cb)
        } else {
            self.exec_instr(bus, opcode, i)
        }
    }

    fn exec_instr<B: Bus>(&mut self, bus: &mut B, opcode: u8, i: Instr) -> u32 {
        match i.op {
            Op::Nop => i.cycles,

            Op::Ld8 => {
                let value = self.read_place8(bus, i.rhs);
                self.write_place8(bus, i.lhs, value);
                i.cycles
            }
            Op::Ld16 => {
                let value = self.read_place16(bus, i.rhs);
                self.write_place16(i.lhs, value);
                i.cycles
            }
            Op::LdMemSp => {
                let addr = self.fetch16(bus);
                let sp = self.regs.sp;
                bus.write8(addr, sp as u8);
                bus.write8(addr.wrapping_add(1), (sp >> 8) as u8);
                i.cycles
            }
            Op::LdHlSpOff => {
                let imm = self.fetch8(bus);
                let result = self.alu_add16_signed(self.regs.sp, imm);
                self.regs.set_hl(result);
                i.cycles
            }

            Op::Push => {
                let value = self.read_place16(bus, i.lhs);
                self.push_u16(bus, value);
                i.cycles
            }
            Op::Pop => {
                let value = self.pop_u16(bus);
                self.write_place16(i.lhs, value);
                i.cycles
            }

            Op::Add { carry } => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_add(value, carry);
                i.cycles
            }
            Op::Sub { carry } => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_sub(value, carry);
                i.cycles
            }
            Op::And => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_and(value);
                i.cycles
            }
            Op::Xor => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_xor(value);
                i.cycles
            }
            Op::Or => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_or(value);
                i.cycles
            }
            Op::Cp => {
                let value = self.read_place8(bus, i.rhs);
                self.alu_cp(value);
                i.cycles
            }

            Op::Inc8 => {
                let value = self.read_place8(bus, i.lhs);
                let result = self.alu_inc8(value);
                self.write_place8(bus, i.lhs, result);
                i.cycles
            }
            Op::Dec8 => {
                let value = self.read_place8(bus, i.lhs);
                let result = self.alu_dec8(value);
                self.write_place8(bus, i.lhs, result);
                i.cycles
            }
            Op::Inc16 => {
                let value = self.read_place16(bus, i.lhs).wrapping_add(1);
                self.write_place16(i.lhs, value);
                i.cycles
            }
            Op::Dec16 => {
                let value = self.read_place16(bus, i.lhs).wrapping_sub(1);
                self.write_place16(i.lhs, value);
                i.cycles
            }

            Op::AddHl => {
                let value = self.read_place16(bus, i.rhs);
                self.alu_add16_hl(value);
                i.cycles
            }
            Op::AddSp => {
                let imm = self.fetch8(bus);
                self.regs.sp = self.alu_add16_signed(self.regs.sp, imm);
                i.cycles
            }

            Op::Daa => {
                self.alu_daa();
                i.cycles
            }
            Op::Cpl => {
                self.regs.a = !self.regs.a;
                self.set_flag(Flag::N, true);
                self.set_flag(Flag::H, true);
                i.cycles
            }
            Op::Scf => {
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::C, true);
                i.cycles
            }
            Op::Ccf => {
                let carry = self.get_flag(Flag::C);
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::C, !carry);
                i.cycles
            }

            // Unprefixed rotates always operate on A and clear Z, unlike the
            // CB-prefixed forms.
            Op::Rlca => {
                let a = self.regs.a;
                self.regs.a = a.rotate_left(1);
                self.clear_flags();
                self.set_flag(Flag::C, (a & 0x80) != 0);
                i.cycles
            }
            Op::Rrca => {
                let a = self.regs.a;
                self.regs.a = a.rotate_right(1);
                self.clear_flags();
                self.set_flag(Flag::C, (a & 0x01) != 0);
                i.cycles
            }
            Op::Rla => {
                let a = self.regs.a;
                let carry_in = if self.get_flag(Flag::C) { 1 } else { 0 };
                self.regs.a = (a << 1) | carry_in;
                self.clear_flags();
                self.set_flag(Flag::C, (a & 0x80) != 0);
                i.cycles
            }
            Op::Rra => {
                let a = self.regs.a;
                let carry_in = if self.get_flag(Flag::C) { 0x80 } else { 0 };
                self.regs.a = (a >> 1) | carry_in;
                self.clear_flags();
                self.set_flag(Flag::C, (a & 0x01) != 0);
                i.cycles
            }

            Op::Jp => {
                // The target word is consumed whether or not the branch is
                // taken; only the cycle cost differs.
                let addr = self.fetch16(bus);
                if self.cond_met(i.cond) {
                    self.regs.pc = addr;
                    i.cycles_taken
                } else {
                    i.cycles
                }
            }
            Op::JpHl => {
                self.regs.pc = self.regs.hl();
                i.cycles
            }
            Op::Jr => {
                let offset = self.fetch8(bus) as i8;
                if self.cond_met(i.cond) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                    i.cycles_taken
                } else {
                    i.cycles
                }
            }
            Op::Call => {
                let addr = self.fetch16(bus);
                if self.cond_met(i.cond) {
                    let ret = self.regs.pc;
                    self.push_u16(bus, ret);
                    self.regs.pc = addr;
                    i.cycles_taken
                } else {
                    i.cycles
                }
            }
            Op::Ret => {
                if self.cond_met(i.cond) {
                    self.regs.pc = self.pop_u16(bus);
                    i.cycles_taken
                } else {
                    i.cycles
                }
            }
            Op::Reti => {
                self.regs.pc = self.pop_u16(bus);
                // Unlike EI, RETI enables interrupts without the one
                // instruction delay.
                self.ime = true;
                i.cycles
            }
            Op::Rst(target) => {
                let ret = self.regs.pc;
                self.push_u16(bus, ret);
                self.regs.pc = target as u16;
                i.cycles
            }

            Op::Halt => {
                if !self.ime {
                    // HALT bug: with IME clear and an interrupt already
                    // pending, the CPU does not halt and the next opcode
                    // fetch fails to increment PC.
                    let ie = bus.read8(0xFFFF);
                    let iflags = bus.read8(0xFF0F);
                    if ie & iflags & 0x1F != 0 {
                        self.halt_bug = true;
                        return i.cycles;
                    }
                }
                self.halted = true;
                i.cycles
            }
            Op::Stop => {
                // STOP is a 2-byte instruction; the padding byte is fetched
                // and discarded so PC matches hardware.
                let _padding = self.fetch8(bus);
                self.stopped = true;
                self.halted = false;
                i.cycles
            }
            Op::Di => {
                self.ime = false;
                self.ime_enable_pending = false;
                self.ime_enable_delay = false;
                i.cycles
            }
            Op::Ei => {
                self.ime_enable_pending = true;
                i.cycles
            }

            Op::Lock => {
                log::warn!(
                    "invalid opcode 0x{:02X} at 0x{:04X}; locking CPU",
                    opcode,
                    self.regs.pc.wrapping_sub(1)
                );
                self.locked = true;
                i.cycles
            }

            // Handled in `exec` before dispatch.
            Op::Prefix => unreachable!("CB prefix reached the primary handler"),
        }
    }

    /// Execute one CB-prefixed (bit/rotate/shift) instruction.
    fn exec_cb<B: Bus>(&mut self, bus: &mut B, code: u8) -> u32 {
        let i = decode::decode_cb(code);
        let value = self.read_place8(bus, i.place);

        let result = match i.op {
            CbOp::Rlc => {
                let result = value.rotate_left(1);
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x80) != 0);
                result
            }
            CbOp::Rrc => {
                let result = value.rotate_right(1);
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x01) != 0);
                result
            }
            CbOp::Rl => {
                let carry_in = if self.get_flag(Flag::C) { 1 } else { 0 };
                let result = (value << 1) | carry_in;
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x80) != 0);
                result
            }
            CbOp::Rr => {
                let carry_in = if self.get_flag(Flag::C) { 0x80 } else { 0 };
                let result = (value >> 1) | carry_in;
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x01) != 0);
                result
            }
            CbOp::Sla => {
                let result = value << 1;
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x80) != 0);
                result
            }
            CbOp::Sra => {
                let result = (value >> 1) | (value & 0x80);
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x01) != 0);
                result
            }
            CbOp::Swap => {
                let result = (value << 4) | (value >> 4);
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                result
            }
            CbOp::Srl => {
                let result = value >> 1;
                self.clear_flags();
                self.set_flag(Flag::Z, result == 0);
                self.set_flag(Flag::C, (value & 0x01) != 0);
                result
            }
            CbOp::Bit => {
                let set = (value & (1 << i.bit)) != 0;
                self.set_flag(Flag::Z, !set);
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, true);
                // BIT only tests; nothing is written back.
                return i.cycles;
            }
            CbOp::Res => value & !(1 << i.bit),
            CbOp::Set => value | (1 << i.bit),
        };

        self.write_place8(bus, i.place, result);
        i.cycles
    }
}
