mod interrupt;

use crate::cpu::CPU;
use crate::cpu::registers::FlagsRegister;
use crate::tests::MockBus;

/// Runs a fresh CPU over the given program (placed at address 0) for one
/// step and returns the machine state and the cycle count.
pub fn step_program(program: &[u8]) -> (CPU, MockBus, u8) {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(program);
    let cycles = cpu.step(&mut bus).unwrap();
    (cpu, bus, cycles)
}

pub fn assert_flags(f: FlagsRegister, zero: bool, subtraction: bool, half_carry: bool, carry: bool) {
    assert_eq!(f.contains(FlagsRegister::ZERO), zero, "zero flag");
    assert_eq!(
        f.contains(FlagsRegister::SUBTRACTION),
        subtraction,
        "subtraction flag"
    );
    assert_eq!(
        f.contains(FlagsRegister::HALF_CARRY),
        half_carry,
        "half carry flag"
    );
    assert_eq!(f.contains(FlagsRegister::CARRY), carry, "carry flag");
}

#[test]
fn test_unknown_opcode_is_fatal() {
    let mut cpu = CPU::default();
    let mut bus = MockBus::with_program(&[0xD3]);
    assert!(cpu.step(&mut bus).is_err());
}

#[test]
fn test_stop_is_a_single_byte_nop() {
    let (cpu, _, cycles) = step_program(&[0x10, 0x00]);
    assert_eq!(cpu.pc, 1);
    assert_eq!(cycles, 1);
    assert!(!cpu.is_halted);
}
