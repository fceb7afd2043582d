//! Instruction decode tables.
//!
//! Every opcode maps to a tagged descriptor: an operation tag plus the
//! addressing mode of each operand slot and the instruction's fixed cycle
//! costs (taken and not-taken for conditional branches). Operand resolution
//! lives in `exec`, decoupled from the operation handlers, so one handler
//! serves every addressing-mode combination of its family. Both tables are
//! total over 0-255 by construction; the match arms below are checked
//! exhaustive by the compiler.

/// 8-bit register operand.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum R8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

/// 16-bit register pair operand.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum R16 {
    AF,
    BC,
    DE,
    HL,
    SP,
}

/// Addressing mode of one operand slot.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Place {
    None,
    R8(R8),
    R16(R16),
    /// Immediate byte fetched from the instruction stream.
    Imm8,
    /// Immediate word fetched from the instruction stream.
    Imm16,
    /// Memory indirect through a register pair.
    Ind(R16),
    /// Memory at an absolute address from an immediate word.
    IndImm16,
    /// I/O-port-relative: memory at 0xFF00 + immediate byte.
    HighImm8,
    /// I/O-port-relative: memory at 0xFF00 + C.
    HighC,
    /// Memory at HL, incrementing HL after the access.
    IndHlInc,
    /// Memory at HL, decrementing HL after the access.
    IndHlDec,
}

impl Place {
    /// Whether resolving this operand touches memory (affects cycle costs in
    /// the table constructors below).
    #[inline]
    fn is_mem(self) -> bool {
        matches!(
            self,
            Place::Ind(_) | Place::IndHlInc | Place::IndHlDec | Place::IndImm16
        )
    }
}

/// Branch condition attached to jump/call/return descriptors.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Cond {
    Always,
    Nz,
    Z,
    Nc,
    C,
}

/// Operation tag. One handler per variant family in `exec`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Op {
    Nop,
    /// 8-bit load, lhs <- rhs.
    Ld8,
    /// 16-bit load, lhs <- rhs.
    Ld16,
    /// LD (a16), SP.
    LdMemSp,
    /// LD HL, SP + signed imm8.
    LdHlSpOff,
    Push,
    Pop,
    Add { carry: bool },
    Sub { carry: bool },
    And,
    Xor,
    Or,
    Cp,
    Inc8,
    Dec8,
    Inc16,
    Dec16,
    AddHl,
    /// ADD SP, signed imm8.
    AddSp,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Jp,
    JpHl,
    Jr,
    Call,
    Ret,
    Reti,
    Rst(u8),
    Halt,
    Stop,
    Di,
    Ei,
    /// CB prefix byte; the real descriptor comes from `decode_cb`.
    Prefix,
    /// Invalid opcode that hard-locks the machine.
    Lock,
}

/// One primary-table entry.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Instr {
    pub op: Op,
    pub lhs: Place,
    pub rhs: Place,
    pub cond: Cond,
    /// Base cost in T-cycles (the not-taken cost for conditional branches).
    pub cycles: u32,
    /// Cost when a conditional branch is taken; equals `cycles` otherwise.
    pub cycles_taken: u32,
}

const fn instr(op: Op, lhs: Place, rhs: Place, cycles: u32) -> Instr {
    Instr {
        op,
        lhs,
        rhs,
        cond: Cond::Always,
        cycles,
        cycles_taken: cycles,
    }
}

const fn branch(op: Op, cond: Cond, cycles: u32, cycles_taken: u32) -> Instr {
    Instr {
        op,
        lhs: Place::None,
        rhs: Place::None,
        cond,
        cycles,
        cycles_taken,
    }
}

/// Standard register-order encoding used by the opcode tables:
/// 0=B, 1=C, 2=D, 3=E, 4=H, 5=L, 6=(HL), 7=A.
fn r8_place(index: u8) -> Place {
    match index & 0x07 {
        0 => Place::R8(R8::B),
        1 => Place::R8(R8::C),
        2 => Place::R8(R8::D),
        3 => Place::R8(R8::E),
        4 => Place::R8(R8::H),
        5 => Place::R8(R8::L),
        6 => Place::Ind(R16::HL),
        _ => Place::R8(R8::A),
    }
}

/// Register-pair encoding for rows 0x0n-0x3n: 0=BC, 1=DE, 2=HL, 3=SP.
fn rp_place(index: u8) -> Place {
    match index & 0x03 {
        0 => Place::R16(R16::BC),
        1 => Place::R16(R16::DE),
        2 => Place::R16(R16::HL),
        _ => Place::R16(R16::SP),
    }
}

/// Register-pair encoding for PUSH/POP: 0=BC, 1=DE, 2=HL, 3=AF.
fn stack_place(index: u8) -> Place {
    match index & 0x03 {
        0 => Place::R16(R16::BC),
        1 => Place::R16(R16::DE),
        2 => Place::R16(R16::HL),
        _ => Place::R16(R16::AF),
    }
}

/// ALU operation encoding shared by 0x80-0xBF and the d8 column:
/// 0=ADD, 1=ADC, 2=SUB, 3=SBC, 4=AND, 5=XOR, 6=OR, 7=CP.
fn alu_op(y: u8) -> Op {
    match y & 0x07 {
        0 => Op::Add { carry: false },
        1 => Op::Add { carry: true },
        2 => Op::Sub { carry: false },
        3 => Op::Sub { carry: true },
        4 => Op::And,
        5 => Op::Xor,
        6 => Op::Or,
        _ => Op::Cp,
    }
}

/// Condition encoding shared by JR/JP/CALL/RET: 0=NZ, 1=Z, 2=NC, 3=C.
fn cond_code(y: u8) -> Cond {
    match y & 0x03 {
        0 => Cond::Nz,
        1 => Cond::Z,
        2 => Cond::Nc,
        _ => Cond::C,
    }
}

/// Decode one primary-table opcode into its descriptor.
pub(crate) fn decode(opcode: u8) -> Instr {
    match opcode {
        0x00 => instr(Op::Nop, Place::None, Place::None, 4),

        // 16-bit immediate loads.
        0x01 | 0x11 | 0x21 | 0x31 => {
            instr(Op::Ld16, rp_place(opcode >> 4), Place::Imm16, 12)
        }
        // LD SP, HL.
        0xF9 => instr(Op::Ld16, Place::R16(R16::SP), Place::R16(R16::HL), 8),

        // A <-> pair-indirect transfers, including the HL+/HL- forms.
        0x02 => instr(Op::Ld8, Place::Ind(R16::BC), Place::R8(R8::A), 8),
        0x12 => instr(Op::Ld8, Place::Ind(R16::DE), Place::R8(R8::A), 8),
        0x22 => instr(Op::Ld8, Place::IndHlInc, Place::R8(R8::A), 8),
        0x32 => instr(Op::Ld8, Place::IndHlDec, Place::R8(R8::A), 8),
        0x0A => instr(Op::Ld8, Place::R8(R8::A), Place::Ind(R16::BC), 8),
        0x1A => instr(Op::Ld8, Place::R8(R8::A), Place::Ind(R16::DE), 8),
        0x2A => instr(Op::Ld8, Place::R8(R8::A), Place::IndHlInc, 8),
        0x3A => instr(Op::Ld8, Place::R8(R8::A), Place::IndHlDec, 8),

        // 16-bit INC/DEC.
        0x03 | 0x13 | 0x23 | 0x33 => {
            instr(Op::Inc16, rp_place(opcode >> 4), Place::None, 8)
        }
        0x0B | 0x1B | 0x2B | 0x3B => {
            instr(Op::Dec16, rp_place(opcode >> 4), Place::None, 8)
        }

        // 8-bit INC/DEC over the register-order column.
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let lhs = r8_place(opcode >> 3);
            let cycles = if lhs.is_mem() { 12 } else { 4 };
            instr(Op::Inc8, lhs, Place::None, cycles)
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let lhs = r8_place(opcode >> 3);
            let cycles = if lhs.is_mem() { 12 } else { 4 };
            instr(Op::Dec8, lhs, Place::None, cycles)
        }

        // LD r, d8 (and LD (HL), d8).
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let lhs = r8_place(opcode >> 3);
            let cycles = if lhs.is_mem() { 12 } else { 8 };
            instr(Op::Ld8, lhs, Place::Imm8, cycles)
        }

        // Unprefixed rotates on A (Z always cleared, unlike the CB forms).
        0x07 => instr(Op::Rlca, Place::None, Place::None, 4),
        0x0F => instr(Op::Rrca, Place::None, Place::None, 4),
        0x17 => instr(Op::Rla, Place::None, Place::None, 4),
        0x1F => instr(Op::Rra, Place::None, Place::None, 4),

        0x08 => instr(Op::LdMemSp, Place::IndImm16, Place::R16(R16::SP), 20),

        // ADD HL, rr.
        0x09 | 0x19 | 0x29 | 0x39 => {
            instr(Op::AddHl, Place::R16(R16::HL), rp_place(opcode >> 4), 8)
        }

        0x10 => instr(Op::Stop, Place::None, Place::None, 4),

        // Relative jumps.
        0x18 => branch(Op::Jr, Cond::Always, 12, 12),
        0x20 | 0x28 | 0x30 | 0x38 => branch(Op::Jr, cond_code(opcode >> 3), 8, 12),

        0x27 => instr(Op::Daa, Place::None, Place::None, 4),
        0x2F => instr(Op::Cpl, Place::None, Place::None, 4),
        0x37 => instr(Op::Scf, Place::None, Place::None, 4),
        0x3F => instr(Op::Ccf, Place::None, Place::None, 4),

        0x76 => instr(Op::Halt, Place::None, Place::None, 4),

        // 8-bit register/memory transfer block (0x76 handled above).
        0x40..=0x7F => {
            let lhs = r8_place(opcode >> 3);
            let rhs = r8_place(opcode);
            let cycles = if lhs.is_mem() || rhs.is_mem() { 8 } else { 4 };
            instr(Op::Ld8, lhs, rhs, cycles)
        }

        // ALU block: ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, r.
        0x80..=0xBF => {
            let rhs = r8_place(opcode);
            let cycles = if rhs.is_mem() { 8 } else { 4 };
            instr(alu_op(opcode >> 3), Place::R8(R8::A), rhs, cycles)
        }
        // The same operations against an immediate byte.
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            instr(alu_op(opcode >> 3), Place::R8(R8::A), Place::Imm8, 8)
        }

        // Returns.
        0xC0 | 0xC8 | 0xD0 | 0xD8 => branch(Op::Ret, cond_code(opcode >> 3), 8, 20),
        0xC9 => branch(Op::Ret, Cond::Always, 16, 16),
        0xD9 => instr(Op::Reti, Place::None, Place::None, 16),

        // Stack pushes and pops.
        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            instr(Op::Pop, stack_place(opcode >> 4), Place::None, 12)
        }
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            instr(Op::Push, stack_place(opcode >> 4), Place::None, 16)
        }

        // Absolute jumps and calls.
        0xC2 | 0xCA | 0xD2 | 0xDA => branch(Op::Jp, cond_code(opcode >> 3), 12, 16),
        0xC3 => branch(Op::Jp, Cond::Always, 16, 16),
        0xE9 => instr(Op::JpHl, Place::None, Place::None, 4),
        0xC4 | 0xCC | 0xD4 | 0xDC => branch(Op::Call, cond_code(opcode >> 3), 12, 24),
        0xCD => branch(Op::Call, Cond::Always, 24, 24),

        // Restarts to the fixed low vectors.
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            instr(Op::Rst(opcode & 0x38), Place::None, Place::None, 16)
        }

        0xCB => instr(Op::Prefix, Place::None, Place::None, 0),

        // I/O-port-relative and absolute A transfers.
        0xE0 => instr(Op::Ld8, Place::HighImm8, Place::R8(R8::A), 12),
        0xF0 => instr(Op::Ld8, Place::R8(R8::A), Place::HighImm8, 12),
        0xE2 => instr(Op::Ld8, Place::HighC, Place::R8(R8::A), 8),
        0xF2 => instr(Op::Ld8, Place::R8(R8::A), Place::HighC, 8),
        0xEA => instr(Op::Ld8, Place::IndImm16, Place::R8(R8::A), 16),
        0xFA => instr(Op::Ld8, Place::R8(R8::A), Place::IndImm16, 16),

        // Signed stack-pointer arithmetic.
        0xE8 => instr(Op::AddSp, Place::R16(R16::SP), Place::Imm8, 16),
        0xF8 => instr(Op::LdHlSpOff, Place::R16(R16::HL), Place::Imm8, 12),

        0xF3 => instr(Op::Di, Place::None, Place::None, 4),
        0xFB => instr(Op::Ei, Place::None, Place::None, 4),

        // Invalid opcodes hard-lock the machine on real hardware.
        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
            instr(Op::Lock, Place::None, Place::None, 4)
        }
    }
}

/// Operation tag for the CB-prefixed (bit/rotate/shift) table.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
}

/// One extended-table entry.
#[derive(Copy, Clone, Debug)]
pub(crate) struct CbInstr {
    pub op: CbOp,
    /// Bit index for BIT/RES/SET; unused by the rotate/shift rows.
    pub bit: u8,
    pub place: Place,
    pub cycles: u32,
}

/// Decode one CB-prefixed opcode. The extended space is fully regular:
/// two bits of operation class, three of bit index (or sub-operation),
/// three of register/memory operand.
pub(crate) fn decode_cb(code: u8) -> CbInstr {
    let place = r8_place(code);
    let y = (code >> 3) & 0x07;
    let mem = place.is_mem();

    match code >> 6 {
        0 => {
            let op = match y {
                0 => CbOp::Rlc,
                1 => CbOp::Rrc,
                2 => CbOp::Rl,
                3 => CbOp::Rr,
                4 => CbOp::Sla,
                5 => CbOp::Sra,
                6 => CbOp::Swap,
                _ => CbOp::Srl,
            };
            CbInstr {
                op,
                bit: 0,
                place,
                cycles: if mem { 16 } else { 8 },
            }
        }
        1 => CbInstr {
            op: CbOp::Bit,
            bit: y,
            place,
            // BIT only reads (HL), so the memory form is cheaper than the
            // read-modify-write rows.
            cycles: if mem { 12 } else { 8 },
        },
        2 => CbInstr {
            op: CbOp::Res,
            bit: y,
            place,
            cycles: if mem { 16 } else { 8 },
        },
        3 => CbInstr {
            op: CbOp::Set,
            bit: y,
            place,
            cycles: if mem { 16 } else { 8 },
        },
        // `code >> 6` is two bits wide.
        _ => unreachable!(),
    }
}
