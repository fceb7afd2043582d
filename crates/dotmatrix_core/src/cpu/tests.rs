use super::{Bus, Cpu, Flag};

/// Flat 64 KiB memory with no mapping logic, enough to exercise the core.
struct TestBus {
    mem: Vec<u8>,
}

impl TestBus {
    fn new() -> TestBus {
        TestBus {
            mem: vec![0; 0x1_0000],
        }
    }

    /// Place a program at the post-boot entry point, 0x0100.
    fn with_program(program: &[u8]) -> TestBus {
        let mut bus = TestBus::new();
        bus.mem[0x0100..0x0100 + program.len()].copy_from_slice(program);
        bus
    }
}

impl Bus for TestBus {
    fn read8(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write8(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }
}

#[test]
fn boot_state_matches_dmg_handoff() {
    let cpu = Cpu::new();
    assert_eq!(cpu.regs.af(), 0x01B0);
    assert_eq!(cpu.regs.bc(), 0x0013);
    assert_eq!(cpu.regs.de(), 0x00D8);
    assert_eq!(cpu.regs.hl(), 0x014D);
    assert_eq!(cpu.regs.sp, 0xFFFE);
    assert_eq!(cpu.regs.pc, 0x0100);
    assert!(!cpu.ime);
}

#[test]
fn nop_advances_pc_and_costs_four_cycles() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x00]);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.pc, 0x0101);
    assert_eq!(cpu.cycles, 4);
}

#[test]
fn add_sets_half_carry_on_low_nibble_overflow() {
    // ADD A, 0x01 with A = 0x0F.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xC6, 0x01]);
    cpu.regs.a = 0x0F;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x10);
    assert!(cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::C));
    assert!(!cpu.get_flag(Flag::Z));
    assert!(!cpu.get_flag(Flag::N));
}

#[test]
fn add_sets_carry_and_zero_on_full_overflow() {
    // ADD A, 0x01 with A = 0xFF.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xC6, 0x01]);
    cpu.regs.a = 0xFF;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::H));
    assert!(cpu.get_flag(Flag::C));
}

#[test]
fn adc_folds_carry_into_the_sum() {
    // ADC A, 0x00 with A = 0x00 and carry set.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCE, 0x00]);
    cpu.regs.a = 0x00;
    cpu.set_flag(Flag::C, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn sub_sets_borrow_flags() {
    // SUB A, 0x01 with A = 0x00.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xD6, 0x01]);
    cpu.regs.a = 0x00;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(cpu.get_flag(Flag::N));
    assert!(cpu.get_flag(Flag::H));
    assert!(cpu.get_flag(Flag::C));
}

#[test]
fn cp_sets_flags_without_touching_a() {
    // CP 0x42 with A = 0x42.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xFE, 0x42]);
    cpu.regs.a = 0x42;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x42);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::N));
}

#[test]
fn daa_adjusts_bcd_addition() {
    // ADD A, 0x27 with A = 0x15, then DAA: 15 + 27 = 42 in BCD.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xC6, 0x27, 0x27]);
    cpu.regs.a = 0x15;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x42);
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn ld_register_to_register() {
    // LD B, A.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x47]);
    cpu.regs.a = 0x5A;
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.b, 0x5A);
}

#[test]
fn ld_through_hl_costs_eight_cycles() {
    // LD (HL), A then LD C, (HL).
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x77, 0x4E]);
    cpu.regs.a = 0x99;
    cpu.regs.set_hl(0xC123);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(bus.mem[0xC123], 0x99);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.c, 0x99);
}

#[test]
fn ld_hl_inc_and_dec_post_modify() {
    // LD (HL+), A then LD (HL-), A.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x22, 0x32]);
    cpu.regs.a = 0x11;
    cpu.regs.set_hl(0xC000);
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0xC000], 0x11);
    assert_eq!(cpu.regs.hl(), 0xC001);
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0xC001], 0x11);
    assert_eq!(cpu.regs.hl(), 0xC000);
}

#[test]
fn ldh_uses_high_page() {
    // LDH (0x80), A then LDH A, (0x80) into a cleared A.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xE0, 0x80, 0xAF, 0xF0, 0x80]);
    cpu.regs.a = 0x3C;
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(bus.mem[0xFF80], 0x3C);
    cpu.step(&mut bus); // XOR A
    assert_eq!(cpu.regs.a, 0x00);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x3C);
}

#[test]
fn ld_mem_sp_stores_little_endian() {
    // LD (0xC200), SP.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x08, 0x00, 0xC2]);
    cpu.regs.sp = 0xBEEF;
    assert_eq!(cpu.step(&mut bus), 20);
    assert_eq!(bus.mem[0xC200], 0xEF);
    assert_eq!(bus.mem[0xC201], 0xBE);
}

#[test]
fn push_pop_round_trip() {
    // PUSH BC then POP DE.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xC5, 0xD1]);
    cpu.regs.set_bc(0x1234);
    cpu.regs.sp = 0xDFFF;
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.sp, 0xDFFD);
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(cpu.regs.de(), 0x1234);
    assert_eq!(cpu.regs.sp, 0xDFFF);
}

#[test]
fn pop_af_masks_the_low_flag_nibble() {
    // POP AF with 0xFFFF on the stack; F's low nibble does not exist.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xF1]);
    cpu.regs.sp = 0xC000;
    bus.mem[0xC000] = 0xFF;
    bus.mem[0xC001] = 0xFF;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.af(), 0xFFF0);
}

#[test]
fn jr_cycle_cost_depends_on_the_branch() {
    // JR NZ, +2 taken, then from the new location JR NZ with Z set.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x20, 0x02]);
    cpu.set_flag(Flag::Z, false);
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x0104);

    bus.mem[0x0104] = 0x20;
    bus.mem[0x0105] = 0x10;
    cpu.set_flag(Flag::Z, true);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 0x0106);
}

#[test]
fn jr_supports_negative_offsets() {
    // JR -2 loops back onto itself.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x18, 0xFE]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0100);
}

#[test]
fn call_and_ret_cycle_costs() {
    // CALL 0x0200 ... RET at 0x0200.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCD, 0x00, 0x02]);
    bus.mem[0x0200] = 0xC9;
    cpu.regs.sp = 0xDFFF;
    assert_eq!(cpu.step(&mut bus), 24);
    assert_eq!(cpu.regs.pc, 0x0200);
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 0x0103);
    assert_eq!(cpu.regs.sp, 0xDFFF);
}

#[test]
fn conditional_call_not_taken_still_consumes_operand() {
    // CALL Z, 0x0200 with Z clear.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCC, 0x00, 0x02]);
    cpu.set_flag(Flag::Z, false);
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x0103);
}

#[test]
fn conditional_ret_costs_differ() {
    // RET C taken vs not taken.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xD8, 0xD8]);
    cpu.regs.sp = 0xC000;
    bus.mem[0xC000] = 0x00;
    bus.mem[0xC001] = 0x03;

    cpu.set_flag(Flag::C, false);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 0x0101);

    cpu.set_flag(Flag::C, true);
    assert_eq!(cpu.step(&mut bus), 20);
    assert_eq!(cpu.regs.pc, 0x0300);
}

#[test]
fn rst_jumps_to_its_fixed_vector() {
    // RST 0x28.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xEF]);
    cpu.regs.sp = 0xDFFF;
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 0x0028);
    // 0x0101, the return address, was pushed.
    assert_eq!(bus.mem[0xDFFE], 0x01);
    assert_eq!(bus.mem[0xDFFD], 0x01);
}

#[test]
fn jp_hl_is_a_bare_register_jump() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xE9]);
    cpu.regs.set_hl(0x4321);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x4321);
}

#[test]
fn add_sp_signed_uses_low_byte_carries() {
    // ADD SP, -1 with SP = 0x0000.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xE8, 0xFF]);
    cpu.regs.sp = 0x0000;
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert!(!cpu.get_flag(Flag::Z));
    assert!(!cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn interrupt_dispatch_jumps_to_the_vector() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x00]);
    cpu.ime = true;
    cpu.regs.sp = 0xDFFF;
    bus.mem[0xFFFF] = 0x01; // VBlank enabled
    bus.mem[0xFF0F] = 0x01; // VBlank pending

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 20);
    assert_eq!(cpu.regs.pc, 0x0040);
    assert!(!cpu.ime);
    // The serviced IF bit is cleared, the return address pushed.
    assert_eq!(bus.mem[0xFF0F], 0x00);
    assert_eq!(bus.mem[0xDFFE], 0x01);
    assert_eq!(bus.mem[0xDFFD], 0x00);
}

#[test]
fn interrupt_priority_prefers_the_lowest_bit() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x00]);
    cpu.ime = true;
    cpu.regs.sp = 0xDFFF;
    bus.mem[0xFFFF] = 0x1F;
    bus.mem[0xFF0F] = 0x14; // Timer (bit 2) and Joypad (bit 4) pending

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0050); // Timer vector
    assert_eq!(bus.mem[0xFF0F], 0x10); // Joypad still pending
}

#[test]
fn masked_interrupt_is_not_dispatched() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x00]);
    cpu.ime = true;
    bus.mem[0xFFFF] = 0x00;
    bus.mem[0xFF0F] = 0x01;

    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x0101);
    assert_eq!(bus.mem[0xFF0F], 0x01);
}

#[test]
fn halt_wakes_without_dispatch_when_ime_is_clear() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x76, 0x00]);
    cpu.step(&mut bus);
    assert!(cpu.halted);

    // Idle ticks while nothing is pending.
    assert_eq!(cpu.step(&mut bus), 4);
    assert!(cpu.halted);

    // A pending interrupt wakes the CPU; with IME clear it resumes at the
    // next instruction instead of jumping to the vector.
    bus.mem[0xFFFF] = 0x04;
    bus.mem[0xFF0F] = 0x04;
    cpu.step(&mut bus);
    assert!(!cpu.halted);
    assert_eq!(cpu.regs.pc, 0x0102);
    assert_eq!(bus.mem[0xFF0F], 0x04); // not serviced
}

#[test]
fn ei_takes_effect_after_one_instruction() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xFB, 0x00, 0x00]);
    cpu.regs.sp = 0xDFFF;
    bus.mem[0xFFFF] = 0x01;
    bus.mem[0xFF0F] = 0x01;

    cpu.step(&mut bus); // EI
    assert!(!cpu.ime);
    assert_eq!(cpu.step(&mut bus), 4); // shadow instruction still runs
    assert_eq!(cpu.regs.pc, 0x0102);

    // IME is now live; the next step dispatches.
    assert_eq!(cpu.step(&mut bus), 20);
    assert_eq!(cpu.regs.pc, 0x0040);
}

#[test]
fn di_cancels_a_pending_enable() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xFB, 0xF3, 0x00, 0x00]);
    bus.mem[0xFFFF] = 0x01;
    bus.mem[0xFF0F] = 0x01;

    cpu.step(&mut bus); // EI
    cpu.step(&mut bus); // DI
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(!cpu.ime);
    assert_eq!(cpu.regs.pc, 0x0104);
}

#[test]
fn halt_bug_reexecutes_the_next_byte() {
    // IME clear with an interrupt already pending: HALT does not halt and
    // the following opcode's fetch fails to advance PC, so INC A runs twice.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x76, 0x3C, 0x00]);
    bus.mem[0xFFFF] = 0x01;
    bus.mem[0xFF0F] = 0x01;
    cpu.regs.a = 0;

    cpu.step(&mut bus); // HALT, bug armed
    assert!(!cpu.halted);
    cpu.step(&mut bus); // INC A, PC stays
    cpu.step(&mut bus); // INC A again
    assert_eq!(cpu.regs.a, 2);
    assert_eq!(cpu.regs.pc, 0x0102);
}

#[test]
fn stop_ignores_interrupts_until_woken() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x10, 0x00, 0x00]);
    cpu.ime = true;
    cpu.step(&mut bus);
    assert!(cpu.is_stopped());
    // PC skipped the padding byte.
    assert_eq!(cpu.regs.pc, 0x0102);

    bus.mem[0xFFFF] = 0x10;
    bus.mem[0xFF0F] = 0x10;
    // Still stopped; interrupts are not taken in this state.
    assert_eq!(cpu.step(&mut bus), 4);
    assert!(cpu.is_stopped());

    cpu.wake();
    assert!(!cpu.is_stopped());
    // Execution resumes; the pending interrupt now dispatches normally.
    assert_eq!(cpu.step(&mut bus), 20);
    assert_eq!(cpu.regs.pc, 0x0060);
}

#[test]
fn invalid_opcode_locks_the_cpu() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xD3, 0x00]);
    cpu.step(&mut bus);
    assert!(cpu.is_locked());
    // A locked CPU makes no further progress.
    assert_eq!(cpu.step(&mut bus), 0);
    assert_eq!(cpu.step(&mut bus), 0);
}

#[test]
fn rotate_a_clears_zero_flag() {
    // RLCA with A = 0x80.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x07]);
    cpu.regs.a = 0x80;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.get_flag(Flag::C));
    assert!(!cpu.get_flag(Flag::Z));
}

#[test]
fn cb_swap_exchanges_nibbles() {
    // SWAP A.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCB, 0x37]);
    cpu.regs.a = 0xF0;
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.a, 0x0F);
    assert!(!cpu.get_flag(Flag::Z));
}

#[test]
fn cb_bit_tests_without_writing() {
    // BIT 7, H with bit clear.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCB, 0x7C]);
    cpu.regs.h = 0x7F;
    cpu.set_flag(Flag::C, true);
    cpu.step(&mut bus);
    assert!(cpu.get_flag(Flag::Z));
    assert!(!cpu.get_flag(Flag::N));
    assert!(cpu.get_flag(Flag::H));
    // Carry is untouched by BIT.
    assert!(cpu.get_flag(Flag::C));
    assert_eq!(cpu.regs.h, 0x7F);
}

#[test]
fn cb_memory_operand_costs_more() {
    // RLC (HL).
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCB, 0x06]);
    cpu.regs.set_hl(0xC050);
    bus.mem[0xC050] = 0x81;
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(bus.mem[0xC050], 0x03);
    assert!(cpu.get_flag(Flag::C));
}

#[test]
fn cb_srl_shifts_in_zero() {
    // SRL B.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCB, 0x38]);
    cpu.regs.b = 0x01;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.b, 0x00);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::C));
}

#[test]
fn cb_set_and_res_are_inverses() {
    // SET 3, C then RES 3, C.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0xCB, 0xD9, 0xCB, 0x99]);
    cpu.regs.c = 0x00;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.c, 0x08);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.c, 0x00);
}

#[test]
fn add_hl_preserves_zero_flag() {
    // ADD HL, BC.
    let mut cpu = Cpu::new();
    let mut bus = TestBus::with_program(&[0x09]);
    cpu.regs.set_hl(0x0FFF);
    cpu.regs.set_bc(0x0001);
    cpu.set_flag(Flag::Z, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.hl(), 0x1000);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn decode_covers_every_primary_opcode() {
    // Every one of the 256 rows carries a plausible cycle cost; the match
    // in `decode` has no wildcard, so this mostly guards the cost columns.
    for opcode in 0u16..=0xFF {
        let i = super::decode::decode(opcode as u8);
        // The CB prefix byte is costed by the extended table instead.
        if i.op != super::decode::Op::Prefix {
            assert!(i.cycles >= 4, "opcode 0x{opcode:02X} has no cycle cost");
        }
        assert!(i.cycles_taken >= i.cycles);
    }
}
