use crate::bus::InterruptRegister;
use crate::constants::*;
use crate::cpu::instruction::Instruction;
use crate::cpu::instruction::Instruction::*;
use crate::cpu::misc::{
    ByteSource, ByteTarget, JumpCondition, JumpTarget, Load, LoadByteTarget, LoadWordTarget,
    ResetCode, StackTarget, WordRegister, WordSource,
};
use crate::cpu::registers::FlagsRegister;
use crate::joypad::Joypad;
use crate::{CoreError, CoreResult, SubSystem, utils};
use registers::Registers;

mod instruction;
mod misc;
pub mod registers;
#[cfg(test)]
mod tests;

/// IME (Interrupt Master Enable) state. The EI instruction enables the
/// interrupt only after the following instruction has retired, which puts it
/// on state `ImeState::Pending` first.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub enum ImeState {
    #[default]
    Disabled,
    Pending,
    Enabled,
}

/// Implements the CPU for the GB (DMG-01),
/// the CPU is LR35902 which is a subset of i8080 & Z80.
#[derive(Default)]
pub struct CPU {
    pub r: Registers, // CPU registers
    pub pc: u16,      // Program counter
    pub sp: u16,      // Stack Pointer
    pub ime: ImeState,
    pub is_halted: bool,
    /// Latched when HALT executes with IME off while an interrupt is already
    /// pending; makes the next fetch read its byte twice.
    halt_bug: bool,
    pub joypad: Joypad,
}

impl CPU {
    /// Makes one CPU step and returns the number of machine cycles it took.
    ///
    /// A step services at most one pending interrupt, then either idles (when
    /// halted) or retires exactly one instruction. The fixed order below is
    /// observable: the joypad matrix is refreshed first, interrupts are
    /// arbitrated before the fetch, and a pending IME enable is promoted
    /// after arbitration so that EI takes effect one instruction late.
    pub fn step<T: SubSystem>(&mut self, bus: &mut T) -> CoreResult<u8> {
        self.joypad.refresh(bus);

        let mut cycles = 0;
        let irq = self.pending_interrupts(bus);
        if !irq.is_empty() {
            // A pending interrupt always wakes the CPU, even with IME off.
            self.is_halted = false;
            if self.ime == ImeState::Enabled {
                cycles += self.service_interrupt(bus, irq);
            }
        }

        if self.is_halted {
            return Ok(1);
        }

        if self.ime == ImeState::Pending {
            self.ime = ImeState::Enabled;
        }

        // Read next opcode from memory and check whether it is prefixed
        let opcode = self.consume_byte(bus);
        let (opcode, prefixed) = match opcode == 0xCB {
            true => (self.consume_byte(bus), true),
            false => (opcode, false),
        };

        if self.halt_bug {
            // The fetch increment is undone exactly once, so the byte after
            // HALT is read again as the next opcode.
            self.pc = self.pc.wrapping_sub(1);
            self.halt_bug = false;
        }

        let instruction = Instruction::from_byte(opcode, prefixed)
            .ok_or(CoreError::UnknownOpcode { opcode, prefixed })?;
        cycles += Instruction::base_cycles(opcode, prefixed);
        cycles += self.execute(instruction, bus);
        Ok(cycles)
    }

    /// Executes the given instruction and returns the extra machine cycles
    /// conditional control flow paid on top of the tabulated cost.
    fn execute<T: SubSystem>(&mut self, instruction: Instruction, bus: &mut T) -> u8 {
        match instruction {
            ADD(source) => self.handle_add(source, bus),
            ADDHL(source) => self.handle_add_hl(source, bus),
            ADDSP => self.handle_add_sp(bus),
            ADC(source) => self.handle_adc(source, bus),
            AND(source) => self.handle_and(source, bus),
            BIT(bit, target) => self.handle_bit(bit, target, bus),
            CALL(test) => self.handle_call(test, bus),
            CCF => self.handle_ccf(),
            CP(source) => self.handle_cp(source, bus),
            CPL => self.handle_cpl(),
            DAA => self.handle_daa(),
            DI => self.handle_di(),
            DEC(target) => self.handle_dec_byte(target, bus),
            DEC2(target) => self.handle_dec_word(target),
            EI => self.handle_ei(),
            HALT => self.handle_halt(bus),
            INC(target) => self.handle_inc_byte(target, bus),
            INC2(target) => self.handle_inc_word(target),
            JR(test) => self.handle_jr(test, bus),
            JP(test, target) => self.handle_jp(test, target, bus),
            LD(load_type) => self.handle_ld(load_type, bus),
            NOP => 0,
            OR(source) => self.handle_or(source, bus),
            RES(bit, target) => self.handle_res(bit, target, bus),
            RET(test) => self.handle_ret(test, bus),
            RETI => self.handle_reti(bus),
            RL(target) => self.handle_rl(target, bus),
            RLA => self.handle_rla(),
            RLC(target) => self.handle_rlc(target, bus),
            RLCA => self.handle_rlca(),
            RR(target) => self.handle_rr(target, bus),
            RRA => self.handle_rra(),
            RRC(target) => self.handle_rrc(target, bus),
            RRCA => self.handle_rrca(),
            RST(code) => self.handle_rst(code, bus),
            SBC(source) => self.handle_sbc(source, bus),
            SCF => self.handle_scf(),
            SET(bit, target) => self.handle_set(bit, target, bus),
            SLA(target) => self.handle_sla(target, bus),
            SRA(target) => self.handle_sra(target, bus),
            SRL(target) => self.handle_srl(target, bus),
            STOP => 0,
            SUB(source) => self.handle_sub(source, bus),
            SWAP(target) => self.handle_swap(target, bus),
            PUSH(target) => self.handle_push(target, bus),
            POP(target) => self.handle_pop(target, bus),
            XOR(source) => self.handle_xor(source, bus),
        }
    }

    /// The set of interrupts that are both requested and enabled.
    #[inline]
    fn pending_interrupts<T: SubSystem>(&self, bus: &mut T) -> InterruptRegister {
        let flags = bus.read(INTERRUPT_FLAG);
        let enabled = bus.read(INTERRUPT_ENABLE);
        InterruptRegister::from_bits_truncate(flags & enabled)
    }

    /// Dispatches the highest-priority pending interrupt: IME is dropped,
    /// the request bit is acknowledged, the current PC is pushed and
    /// execution continues at the service vector. Costs 2 machine cycles on
    /// top of whatever the handler's first instruction takes.
    fn service_interrupt<T: SubSystem>(&mut self, bus: &mut T, pending: InterruptRegister) -> u8 {
        // Vector table in priority order, lowest request bit first.
        const VECTORS: [(InterruptRegister, u16); 5] = [
            (InterruptRegister::VBLANK, VBLANK_IRQ_ADDRESS),
            (InterruptRegister::STAT, LCD_IRQ_ADDRESS),
            (InterruptRegister::TIMER, TIMER_IRQ_ADDRESS),
            (InterruptRegister::SERIAL, SERIAL_IRQ_ADDRESS),
            (InterruptRegister::JOYPAD, JOYPAD_IRQ_ADDRESS),
        ];

        for (irq, address) in VECTORS {
            if !pending.contains(irq) {
                continue;
            }
            self.ime = ImeState::Disabled;
            let flags = bus.read(INTERRUPT_FLAG);
            bus.write(INTERRUPT_FLAG, flags & !irq.bits());

            self.push(bus, self.pc);
            self.pc = address;
            return 2;
        }
        0
    }

    /// Reads the byte at PC and advances PC past it.
    #[inline]
    pub fn consume_byte<T: SubSystem>(&mut self, bus: &mut T) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    /// Reads the little-endian word at PC and advances PC past it.
    #[inline]
    pub fn consume_word<T: SubSystem>(&mut self, bus: &mut T) -> u16 {
        u16::from(self.consume_byte(bus)) | (u16::from(self.consume_byte(bus)) << 8)
    }

    /// Push a u16 value onto the stack, most significant byte first.
    #[inline]
    pub fn push<T: SubSystem>(&mut self, bus: &mut T, value: u16) {
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, (value >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, value as u8);
    }

    /// Pop a u16 value from the stack.
    #[inline]
    fn pop<T: SubSystem>(&mut self, bus: &mut T) -> u16 {
        let lsb = u16::from(bus.read(self.sp));
        self.sp = self.sp.wrapping_add(1);
        let msb = u16::from(bus.read(self.sp));
        self.sp = self.sp.wrapping_add(1);
        (msb << 8) | lsb
    }

    /// Handles ADD instructions
    fn handle_add<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        let (result, overflow) = self.r.a.overflowing_add(value);
        // Half carry is set when adding the lower nibbles of the value and
        // register A overflows into the upper nibble.
        self.r.f.update(
            result == 0,
            false,
            utils::half_carry_u8(self.r.a, value),
            overflow,
        );
        self.r.a = result;
        0
    }

    /// Handles ADD HL, nn instructions
    fn handle_add_hl<T: SubSystem>(&mut self, source: WordSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        let hl = self.r.get_hl();
        let (result, overflow) = hl.overflowing_add(value);

        // The zero flag survives a 16-bit add.
        let half_carry = (hl ^ value ^ result) & 0x1000 != 0;
        self.r.f.remove(FlagsRegister::SUBTRACTION);
        self.r.f.set(FlagsRegister::HALF_CARRY, half_carry);
        self.r.f.set(FlagsRegister::CARRY, overflow);
        self.r.set_hl(result);
        0
    }

    /// Handles the ADD SP, e8 instruction
    fn handle_add_sp<T: SubSystem>(&mut self, bus: &mut T) -> u8 {
        let sp = self.sp as i32;
        let byte = self.consume_byte(bus) as i8 as i32;
        let result = sp.wrapping_add(byte);
        self.sp = result as u16;

        // Carry and half carry are computed on the low byte.
        let half_carry = (sp ^ byte ^ result) & 0b0001_0000 != 0;
        let carry = (sp ^ byte ^ result) & 0b1_0000_0000 != 0;
        self.r.f.update(false, false, half_carry, carry);
        0
    }

    /// Handles ADC instructions
    fn handle_adc<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        let carry_in = self.r.f.contains(FlagsRegister::CARRY) as u8;
        let half_carry = (self.r.a & 0b1111) + (value & 0b1111) + carry_in > 0b1111;

        let (result, overflow) = self.r.a.overflowing_add(value);
        let mut carry = overflow;
        let (result, overflow) = result.overflowing_add(carry_in);
        carry |= overflow;
        self.r.f.update(result == 0, false, half_carry, carry);
        self.r.a = result;
        0
    }

    /// Handles AND instructions
    #[inline]
    fn handle_and<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        self.r.a &= value;
        self.r.f.update(self.r.a == 0, false, true, false);
        0
    }

    /// Handles BIT instructions
    fn handle_bit<T: SubSystem>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        self.r
            .f
            .set(FlagsRegister::ZERO, !utils::bit_at(value, bit));
        self.r.f.remove(FlagsRegister::SUBTRACTION);
        self.r.f.insert(FlagsRegister::HALF_CARRY);
        0
    }

    /// Handles CALL instructions
    fn handle_call<T: SubSystem>(&mut self, test: JumpCondition, bus: &mut T) -> u8 {
        let address = self.consume_word(bus);
        if !test.resolve(self) {
            return 0;
        }
        self.push(bus, self.pc);
        self.pc = address;
        match test {
            JumpCondition::Always => 0,
            _ => 3,
        }
    }

    /// Handles the CCF instruction
    #[inline]
    fn handle_ccf(&mut self) -> u8 {
        self.r.f.remove(FlagsRegister::SUBTRACTION);
        self.r.f.remove(FlagsRegister::HALF_CARRY);
        self.r.f.toggle(FlagsRegister::CARRY);
        0
    }

    /// Handles CP instructions
    fn handle_cp<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        let result = u32::from(self.r.a).wrapping_sub(u32::from(value));

        self.r.f.update(
            result as u8 == 0,
            true,
            (self.r.a ^ value ^ result as u8) & 0b0001_0000 != 0,
            result & 0b1_0000_0000 != 0,
        );
        0
    }

    /// Handles the CPL instruction
    #[inline]
    fn handle_cpl(&mut self) -> u8 {
        self.r.a = !self.r.a;
        self.r.f.insert(FlagsRegister::SUBTRACTION);
        self.r.f.insert(FlagsRegister::HALF_CARRY);
        0
    }

    /// Handles the DAA instruction
    fn handle_daa(&mut self) -> u8 {
        if self.r.f.contains(FlagsRegister::SUBTRACTION) {
            if self.r.f.contains(FlagsRegister::CARRY) {
                self.r.a = self.r.a.wrapping_sub(0x60);
            }
            if self.r.f.contains(FlagsRegister::HALF_CARRY) {
                self.r.a = self.r.a.wrapping_sub(0x06);
            }
        } else {
            if self.r.f.contains(FlagsRegister::CARRY) || self.r.a > 0x99 {
                self.r.a = self.r.a.wrapping_add(0x60);
                self.r.f.insert(FlagsRegister::CARRY);
            }
            if self.r.f.contains(FlagsRegister::HALF_CARRY) || (self.r.a & 0b0000_1111) > 0x09 {
                self.r.a = self.r.a.wrapping_add(0x06);
            }
        }
        self.r.f.set(FlagsRegister::ZERO, self.r.a == 0);
        self.r.f.remove(FlagsRegister::HALF_CARRY);
        0
    }

    /// Handles DEC instructions for bytes
    fn handle_dec_byte<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let result = value.wrapping_sub(1);
        target.write(self, bus, result);
        // The carry flag survives INC/DEC.
        self.r
            .f
            .set(FlagsRegister::HALF_CARRY, value.trailing_zeros() >= 4);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.insert(FlagsRegister::SUBTRACTION);
        0
    }

    /// Handles DEC instructions for words
    fn handle_dec_word(&mut self, target: WordRegister) -> u8 {
        let value = target.read(self);
        target.write(self, value.wrapping_sub(1));
        0
    }

    /// Handles the DI instruction
    #[inline]
    fn handle_di(&mut self) -> u8 {
        self.ime = ImeState::Disabled;
        0
    }

    /// Handles the EI instruction. The enable is promoted at the start of
    /// the instruction after the next one, so an interrupt arriving between
    /// EI and that instruction is held back by exactly one retirement.
    #[inline]
    fn handle_ei(&mut self) -> u8 {
        if self.ime == ImeState::Disabled {
            self.ime = ImeState::Pending;
        }
        0
    }

    /// Handles the HALT instruction
    fn handle_halt<T: SubSystem>(&mut self, bus: &mut T) -> u8 {
        self.is_halted = true;
        if self.ime != ImeState::Enabled && !self.pending_interrupts(bus).is_empty() {
            self.halt_bug = true;
        }
        0
    }

    /// Handles INC instructions for bytes
    fn handle_inc_byte<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let result = value.wrapping_add(1);
        target.write(self, bus, result);
        self.r
            .f
            .set(FlagsRegister::HALF_CARRY, value & 0b1111 == 0b1111);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.remove(FlagsRegister::SUBTRACTION);
        0
    }

    /// Handles INC instructions for words
    fn handle_inc_word(&mut self, target: WordRegister) -> u8 {
        let value = target.read(self);
        target.write(self, value.wrapping_add(1));
        0
    }

    /// Handles JR instructions
    fn handle_jr<T: SubSystem>(&mut self, test: JumpCondition, bus: &mut T) -> u8 {
        // The offset is consumed either way and is relative to the
        // instruction's end.
        let offset = self.consume_byte(bus) as i8;
        if !test.resolve(self) {
            return 0;
        }
        self.pc = self.pc.wrapping_add(offset as i16 as u16);
        match test {
            JumpCondition::Always => 0,
            _ => 1,
        }
    }

    /// Handles JP instructions
    fn handle_jp<T: SubSystem>(&mut self, test: JumpCondition, target: JumpTarget, bus: &mut T) -> u8 {
        let address = match target {
            JumpTarget::D16 => self.consume_word(bus),
            JumpTarget::HL => self.r.get_hl(),
        };
        if !test.resolve(self) {
            return 0;
        }
        self.pc = address;
        match test {
            JumpCondition::Always => 0,
            _ => 1,
        }
    }

    /// Handles LD instructions
    fn handle_ld<T: SubSystem>(&mut self, load_type: Load, bus: &mut T) -> u8 {
        match load_type {
            Load::Byte(target, source) => {
                let value = source.read(self, bus);
                match target {
                    LoadByteTarget::R(register) => ByteTarget::R(register).write(self, bus, value),
                    LoadByteTarget::BCI => bus.write(self.r.get_bc(), value),
                    LoadByteTarget::DEI => bus.write(self.r.get_de(), value),
                    LoadByteTarget::HLI => bus.write(self.r.get_hl(), value),
                    LoadByteTarget::D16I => {
                        let address = self.consume_word(bus);
                        bus.write(address, value);
                    }
                    LoadByteTarget::CIFF00 => bus.write(u16::from(self.r.c) | 0xFF00, value),
                    LoadByteTarget::D8IFF00 => {
                        let address = u16::from(self.consume_byte(bus)) | 0xFF00;
                        bus.write(address, value);
                    }
                }
            }
            Load::Word(target, source) => {
                let value = source.read(self, bus);
                match target {
                    LoadWordTarget::BC => self.r.set_bc(value),
                    LoadWordTarget::DE => self.r.set_de(value),
                    LoadWordTarget::HL => self.r.set_hl(value),
                    LoadWordTarget::SP => self.sp = value,
                    LoadWordTarget::D16I => {
                        let address = self.consume_word(bus);
                        bus.write(address, value as u8);
                        bus.write(address.wrapping_add(1), (value >> 8) as u8);
                    }
                }
            }
            Load::FromAInc => {
                let address = self.r.get_hl();
                bus.write(address, self.r.a);
                self.r.set_hl(address.wrapping_add(1));
            }
            Load::FromADec => {
                let address = self.r.get_hl();
                bus.write(address, self.r.a);
                self.r.set_hl(address.wrapping_sub(1));
            }
            Load::IntoAInc => {
                let address = self.r.get_hl();
                self.r.a = bus.read(address);
                self.r.set_hl(address.wrapping_add(1));
            }
            Load::IntoADec => {
                let address = self.r.get_hl();
                self.r.a = bus.read(address);
                self.r.set_hl(address.wrapping_sub(1));
            }
            Load::SpOffset => {
                let sp = self.sp as i32;
                let offset = self.consume_byte(bus) as i8 as i32;
                let result = sp.wrapping_add(offset);
                let half_carry = (sp ^ offset ^ result) & 0b0001_0000 != 0;
                let carry = (sp ^ offset ^ result) & 0b1_0000_0000 != 0;
                self.r.f.update(false, false, half_carry, carry);
                self.r.set_hl(result as u16);
            }
        }
        0
    }

    /// Handles OR instructions
    #[inline]
    fn handle_or<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        self.r.a |= value;
        self.r.f.update(self.r.a == 0, false, false, false);
        0
    }

    /// Handles the POP instruction
    #[inline]
    fn handle_pop<T: SubSystem>(&mut self, target: StackTarget, bus: &mut T) -> u8 {
        let result = self.pop(bus);
        match target {
            // The flag low nibble does not exist; set_af masks it off.
            StackTarget::AF => self.r.set_af(result),
            StackTarget::BC => self.r.set_bc(result),
            StackTarget::DE => self.r.set_de(result),
            StackTarget::HL => self.r.set_hl(result),
        };
        0
    }

    /// Handles the PUSH instruction
    #[inline]
    fn handle_push<T: SubSystem>(&mut self, target: StackTarget, bus: &mut T) -> u8 {
        let value = match target {
            StackTarget::AF => self.r.get_af(),
            StackTarget::BC => self.r.get_bc(),
            StackTarget::DE => self.r.get_de(),
            StackTarget::HL => self.r.get_hl(),
        };
        self.push(bus, value);
        0
    }

    /// Handles RES instructions
    #[inline]
    fn handle_res<T: SubSystem>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        target.write(self, bus, utils::set_bit(value, bit, false));
        0
    }

    /// Handles RET instructions
    fn handle_ret<T: SubSystem>(&mut self, test: JumpCondition, bus: &mut T) -> u8 {
        if !test.resolve(self) {
            return 0;
        }
        self.pc = self.pop(bus);
        match test {
            JumpCondition::Always => 0,
            _ => 3,
        }
    }

    /// Handles the RETI instruction
    #[inline]
    fn handle_reti<T: SubSystem>(&mut self, bus: &mut T) -> u8 {
        self.ime = ImeState::Enabled;
        self.pc = self.pop(bus);
        0
    }

    /// Handles RL instructions
    /// Rotate n left through Carry flag.
    fn handle_rl<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0b1000_0000 != 0;
        let result = (value << 1) | self.r.f.contains(FlagsRegister::CARRY) as u8;
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
        0
    }

    /// Handles the RLA instruction
    /// Rotate A left through carry, the zero flag is always cleared.
    #[inline]
    fn handle_rla(&mut self) -> u8 {
        let carry = (self.r.a >> 7) != 0;
        self.r.a = (self.r.a << 1) | self.r.f.contains(FlagsRegister::CARRY) as u8;
        self.r.f.update(false, false, false, carry);
        0
    }

    /// Handles RLC instructions
    fn handle_rlc<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0b1000_0000 != 0;
        let result = value.rotate_left(1);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
        0
    }

    /// Handles the RLCA instruction
    #[inline]
    fn handle_rlca(&mut self) -> u8 {
        let carry = self.r.a & 0b1000_0000 != 0;
        self.r.a = self.r.a.rotate_left(1);
        self.r.f.update(false, false, false, carry);
        0
    }

    /// Handles RR instructions
    fn handle_rr<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (u8::from(self.r.f.contains(FlagsRegister::CARRY)) << 7);
        target.write(self, bus, result);
        self.r.f.update(result == 0, false, false, carry);
        0
    }

    /// Handles the RRA instruction
    #[inline]
    fn handle_rra(&mut self) -> u8 {
        let carry = self.r.a & 0x01 != 0;
        self.r.a = (self.r.a >> 1) | (u8::from(self.r.f.contains(FlagsRegister::CARRY)) << 7);
        self.r.f.update(false, false, false, carry);
        0
    }

    /// Handles RRC instructions
    fn handle_rrc<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = value.rotate_right(1);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
        0
    }

    /// Handles the RRCA instruction
    #[inline]
    fn handle_rrca(&mut self) -> u8 {
        let carry = self.r.a & 0x01;
        self.r.a = self.r.a.rotate_right(1);
        self.r.f.update(false, false, false, carry != 0);
        0
    }

    /// Handles RST instructions
    #[inline]
    fn handle_rst<T: SubSystem>(&mut self, code: ResetCode, bus: &mut T) -> u8 {
        self.push(bus, self.pc);
        self.pc = code as u16;
        0
    }

    /// Handles SBC instructions
    fn handle_sbc<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let a = u32::from(self.r.a);
        let value = u32::from(source.read(self, bus));
        let result = a
            .wrapping_sub(value)
            .wrapping_sub(self.r.f.contains(FlagsRegister::CARRY) as u32);
        self.r.a = result as u8;
        self.r.f.update(
            result as u8 == 0,
            true,
            (a ^ value ^ result) & 0b0001_0000 != 0,
            result & 0b1_0000_0000 != 0,
        );
        0
    }

    /// Handles the SCF instruction
    #[inline]
    fn handle_scf(&mut self) -> u8 {
        self.r.f.remove(FlagsRegister::SUBTRACTION);
        self.r.f.remove(FlagsRegister::HALF_CARRY);
        self.r.f.insert(FlagsRegister::CARRY);
        0
    }

    /// Handles SET instructions
    #[inline]
    fn handle_set<T: SubSystem>(&mut self, bit: u8, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        target.write(self, bus, utils::set_bit(value, bit, true));
        0
    }

    /// Handles SLA instructions
    fn handle_sla<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0b1000_0000 != 0;
        let result = value << 1;
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
        0
    }

    /// Handles SRA instructions, the sign bit is preserved.
    fn handle_sra<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (value & 0b1000_0000);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
        0
    }

    /// Handles SRL instructions
    fn handle_srl<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = value >> 1;
        target.write(self, bus, result);
        self.r.f.update(result == 0, false, false, carry);
        0
    }

    /// Handles SUB instructions
    fn handle_sub<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let a = u16::from(self.r.a);
        let value = u16::from(source.read(self, bus));
        let result = a.wrapping_sub(value);

        let carry_bits = a ^ value ^ result;
        self.r.f.update(
            result as u8 == 0,
            true,
            carry_bits & 0b0001_0000 != 0,
            carry_bits & 0b1_0000_0000 != 0,
        );
        self.r.a = result as u8;
        0
    }

    /// Handles SWAP instructions
    #[inline]
    fn handle_swap<T: SubSystem>(&mut self, target: ByteTarget, bus: &mut T) -> u8 {
        let value = target.read(self, bus);
        self.r.f.update(value == 0, false, false, false);
        target.write(self, bus, value.rotate_right(4));
        0
    }

    /// Handles XOR instructions
    #[inline]
    fn handle_xor<T: SubSystem>(&mut self, source: ByteSource, bus: &mut T) -> u8 {
        let value = source.read(self, bus);
        self.r.a ^= value;
        self.r.f.update(self.r.a == 0, false, false, false);
        0
    }
}
