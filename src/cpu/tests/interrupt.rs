use crate::SubSystem;
use crate::constants::{INTERRUPT_ENABLE, INTERRUPT_FLAG};
use crate::cpu::{CPU, ImeState};
use crate::tests::MockBus;

#[test]
fn test_service_basics() {
    // IME on, VBlank requested: the CPU pays 2 cycles for the dispatch and
    // then executes the handler's first instruction (NOP at 0x40).
    let mut cpu = CPU::default();
    let mut bus = MockBus::default();
    cpu.ime = ImeState::Enabled;
    cpu.pc = 0x1234;
    cpu.sp = 0xFFFE;
    bus.write(INTERRUPT_ENABLE, 0x01);
    bus.write(INTERRUPT_FLAG, 0x01);

    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 2 + 1);
    assert_eq!(cpu.pc, 0x41, "handler NOP already retired");
    assert_eq!(cpu.ime, ImeState::Disabled);
    assert_eq!(bus.read(INTERRUPT_FLAG), 0x00, "request acknowledged");
    assert_eq!(bus.read(0xFFFD), 0x12);
    assert_eq!(bus.read(0xFFFC), 0x34);
}

#[test]
fn test_priority_order() {
    // With several requests pending, the lowest bit wins.
    let mut cpu = CPU::default();
    let mut bus = MockBus::default();
    cpu.ime = ImeState::Enabled;
    cpu.sp = 0xFFFE;
    bus.write(INTERRUPT_ENABLE, 0x1F);
    bus.write(INTERRUPT_FLAG, 0b0001_0110);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc, 0x49, "STAT (bit 1) before TIMER and JOYPAD");
    assert_eq!(bus.read(INTERRUPT_FLAG), 0b0001_0100);
}

#[test]
fn test_masked_requests_are_not_serviced() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::default();
    cpu.ime = ImeState::Enabled;
    bus.write(INTERRUPT_ENABLE, 0x00);
    bus.write(INTERRUPT_FLAG, 0x1F);

    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 1, "plain NOP, no dispatch");
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_ime_off_blocks_service_but_wakes_halt() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::default();
    cpu.is_halted = true;
    bus.write(INTERRUPT_ENABLE, 0x04);
    bus.write(INTERRUPT_FLAG, 0x04);

    cpu.step(&mut bus).unwrap();
    assert!(!cpu.is_halted, "pending interrupt wakes the CPU");
    assert_eq!(bus.read(INTERRUPT_FLAG), 0x04, "request stays pending");
    assert_eq!(cpu.pc, 1, "execution resumed in place");
}

#[test]
fn test_halted_cpu_idles() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0x76, 0x3C]);

    cpu.step(&mut bus).unwrap();
    assert!(cpu.is_halted);
    for _ in 0..10 {
        let cycles = cpu.step(&mut bus).unwrap();
        assert_eq!(cycles, 1);
        assert_eq!(cpu.pc, 1, "no fetch while halted");
    }
}

#[test]
fn test_halt_bug_executes_next_byte_twice() {
    // HALT at 0xC000 with IME off and an interrupt already pending: the
    // INC A at 0xC001 runs twice because its byte is fetched again.
    let mut cpu = CPU::default();
    let mut bus = MockBus::default();
    bus.write(0xC000, 0x76); // HALT
    bus.write(0xC001, 0x3C); // INC A
    bus.write(0xC002, 0x3C); // INC A
    bus.write(INTERRUPT_ENABLE, 0x01);
    bus.write(INTERRUPT_FLAG, 0x01);
    cpu.pc = 0xC000;

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc, 0xC001);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.r.a, 2, "INC A executed twice");
    assert_eq!(cpu.pc, 0xC002);
}

#[test]
fn test_halt_without_pending_interrupt_has_no_bug() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0x76, 0x3C, 0x3C]);

    cpu.step(&mut bus).unwrap();
    assert!(cpu.is_halted);

    // The interrupt arrives later; the CPU wakes and runs normally.
    bus.write(INTERRUPT_ENABLE, 0x04);
    bus.write(INTERRUPT_FLAG, 0x04);
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.r.a, 2);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn test_ei_delays_by_one_instruction() {
    // EI; NOP; NOP with VBlank pending: the service happens after the
    // first NOP retires, not before it.
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0xFB, 0x00, 0x00]);
    cpu.sp = 0xFFFE;
    bus.write(INTERRUPT_ENABLE, 0x01);
    bus.write(INTERRUPT_FLAG, 0x01);

    cpu.step(&mut bus).unwrap(); // EI
    assert_eq!(cpu.ime, ImeState::Pending);
    assert_eq!(cpu.pc, 1);

    cpu.step(&mut bus).unwrap(); // first NOP retires, IME now live
    assert_eq!(cpu.ime, ImeState::Enabled);
    assert_eq!(cpu.pc, 2, "still in the main program");

    cpu.step(&mut bus).unwrap(); // dispatch + handler NOP
    assert_eq!(bus.read(0xFFFC), 0x02, "return address is after the first NOP");
    assert_eq!(cpu.pc, 0x41);
}

#[test]
fn test_di_cancels_pending_enable() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0xFB, 0xF3, 0x00]);
    bus.write(INTERRUPT_ENABLE, 0x01);
    bus.write(INTERRUPT_FLAG, 0x01);

    cpu.step(&mut bus).unwrap(); // EI
    cpu.step(&mut bus).unwrap(); // DI retires before anything is serviced
    assert_eq!(cpu.ime, ImeState::Disabled);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc, 3, "no dispatch happened");
}

#[test]
fn test_reti_enables_immediately() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0xD9]);
    cpu.sp = 0xFFFC;
    bus.write(0xFFFC, 0x34);
    bus.write(0xFFFD, 0x12);

    let cycles = cpu.step(&mut bus).unwrap();
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.ime, ImeState::Enabled);
}
