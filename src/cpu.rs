//! 6502 CPU Emulator
//!
//! Implements the Ricoh 2A03 CPU used in the NES (a 6502 without decimal mode).
//!
//! Timing follows the bus: every read and write costs one cycle, and the
//! instructions that do internal work add idle cycles so the totals match the
//! documented cycle table.

use bitflags::bitflags;
use log::{debug, log_enabled, trace, Level};

use crate::instruction::{decode, AddressingMode, Instruction, Mnemonic};
use crate::interrupt::{Interrupt, InterruptLine};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Memory and interrupt line seen by the CPU
pub trait Bus {
    fn read(&mut self, address: u16) -> u8;
    fn write(&mut self, address: u16, value: u8);
    fn interrupts(&mut self) -> &mut InterruptLine;
}

bitflags! {
    /// CPU status flags (P register)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        const C = 1 << 0;
        const Z = 1 << 1;
        const I = 1 << 2;
        const D = 1 << 3;
        /// Only exists on the stack copy pushed by PHP/BRK
        const B = 1 << 4;
        /// Always reads back as 1
        const R = 1 << 5;
        const V = 1 << 6;
        const N = 1 << 7;
    }
}

impl Status {
    /// Update Z and N from a value
    pub fn set_zn(&mut self, value: u8) {
        self.set(Status::Z, value == 0);
        self.set(Status::N, value & 0x80 != 0);
    }
}

/// CPU Registers
///
/// A, X and Y are only writable through setters so Z/N always follow the
/// last value loaded.
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    a: u8,
    x: u8,
    y: u8,
    pub s: u8,
    pub p: Status,
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            p: Status::from_bits_retain(0x24),
            pc: 0,
        }
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
        self.p.set_zn(value);
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
        self.p.set_zn(value);
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
        self.p.set_zn(value);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// The 6502 CPU core
#[derive(Debug, Clone)]
pub struct Cpu {
    registers: Registers,
    cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            cycles: 0,
        }
    }

    /// Power-on register state. PC is loaded later by the RESET service.
    pub fn power_on(&mut self) {
        self.registers = Registers::new();
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Total cycles consumed since creation
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Service one pending interrupt or execute one instruction.
    ///
    /// Returns the number of CPU cycles consumed.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u64 {
        let before = self.cycles;

        match bus.interrupts().get() {
            Some(Interrupt::RESET) => {
                self.reset(bus);
                bus.interrupts().clear(Interrupt::RESET);
            }
            Some(Interrupt::NMI) => {
                self.interrupt(bus, NMI_VECTOR, false);
                bus.interrupts().clear(Interrupt::NMI);
            }
            // IRQ/BRK are only serviced while I is already set
            Some(Interrupt::IRQ) if self.registers.p.contains(Status::I) => {
                self.interrupt(bus, IRQ_VECTOR, false);
                bus.interrupts().clear(Interrupt::IRQ);
            }
            Some(Interrupt::BRK) if self.registers.p.contains(Status::I) => {
                self.registers.pc = self.registers.pc.wrapping_add(1);
                self.interrupt(bus, IRQ_VECTOR, true);
                bus.interrupts().clear(Interrupt::BRK);
            }
            _ => self.execute_next(bus),
        }

        self.cycles.wrapping_sub(before)
    }

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.tick_n(5);
        self.registers.s = self.registers.s.wrapping_sub(3);
        self.registers.p.insert(Status::I);
        self.registers.pc = self.read_word(bus, RESET_VECTOR);
        debug!("RESET -> PC={:04X}", self.registers.pc);
    }

    /// Push PC and P, set I and jump through `vector`. 7 cycles.
    fn interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16, brk: bool) {
        self.tick_n(2);
        self.push_word(bus, self.registers.pc);
        let mut p = self.registers.p | Status::R;
        p.set(Status::B, brk);
        self.push(bus, p.bits());
        self.registers.p.insert(Status::I);
        self.registers.pc = self.read_word(bus, vector);
        debug!(
            "interrupt via {:04X} (brk={}) -> PC={:04X}",
            vector, brk, self.registers.pc
        );
    }

    fn execute_next<B: Bus>(&mut self, bus: &mut B) {
        let pc = self.registers.pc;
        let opcode = self.fetch(bus);
        let instruction = decode(opcode);

        if log_enabled!(Level::Trace) {
            trace!(
                "{:04X}  {:02X}  {:?} {:?}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
                pc,
                opcode,
                instruction.mnemonic,
                instruction.mode,
                self.registers.a,
                self.registers.x,
                self.registers.y,
                self.registers.p.bits(),
                self.registers.s,
                self.cycles
            );
        }

        self.execute(bus, instruction);
    }

    // MARK: bus access

    fn tick(&mut self) {
        self.cycles = self.cycles.wrapping_add(1);
    }

    fn tick_n(&mut self, count: u64) {
        self.cycles = self.cycles.wrapping_add(count);
    }

    fn read<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        self.tick();
        bus.read(address)
    }

    fn read_word<B: Bus>(&mut self, bus: &mut B, address: u16) -> u16 {
        let low = self.read(bus, address) as u16;
        let high = self.read(bus, address.wrapping_add(1)) as u16;
        high << 8 | low
    }

    fn write<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        self.tick();
        bus.write(address, value);
    }

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let value = self.read_word(bus, self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(2);
        value
    }

    /// Read a pointer whose high byte wraps within the page of `address`
    fn read_on_indirect<B: Bus>(&mut self, bus: &mut B, address: u16) -> u16 {
        let low = self.read(bus, address) as u16;
        let high = self.read(bus, (address & 0xFF00) | (address.wrapping_add(1) & 0x00FF)) as u16;
        high << 8 | low
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let address = 0x0100 | self.registers.s as u16;
        self.write(bus, address, value);
        self.registers.s = self.registers.s.wrapping_sub(1);
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    fn pull<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.registers.s = self.registers.s.wrapping_add(1);
        let address = 0x0100 | self.registers.s as u16;
        self.read(bus, address)
    }

    fn pull_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.pull(bus) as u16;
        let high = self.pull(bus) as u16;
        high << 8 | low
    }

    // MARK: addressing modes

    /// Resolve the operand address, consuming operand bytes and index penalties
    fn operand<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate => {
                let address = self.registers.pc;
                self.registers.pc = self.registers.pc.wrapping_add(1);
                address
            }
            AddressingMode::ZeroPage => self.fetch(bus) as u16,
            AddressingMode::ZeroPageX => {
                self.tick();
                self.fetch(bus).wrapping_add(self.registers.x) as u16
            }
            AddressingMode::ZeroPageY => {
                self.tick();
                self.fetch(bus).wrapping_add(self.registers.y) as u16
            }
            AddressingMode::Absolute => self.fetch_word(bus),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                self.tick();
                base.wrapping_add(self.registers.x as u16)
            }
            AddressingMode::AbsoluteXWithPenalty => {
                let base = self.fetch_word(bus);
                let index = self.registers.x as u16;
                if page_crossed(base, index) {
                    self.tick();
                }
                base.wrapping_add(index)
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                self.tick();
                base.wrapping_add(self.registers.y as u16)
            }
            AddressingMode::AbsoluteYWithPenalty => {
                let base = self.fetch_word(bus);
                let index = self.registers.y as u16;
                if page_crossed(base, index) {
                    self.tick();
                }
                base.wrapping_add(index)
            }
            AddressingMode::Relative => self.fetch(bus) as u16,
            AddressingMode::Indirect => {
                let pointer = self.fetch_word(bus);
                self.read_on_indirect(bus, pointer)
            }
            AddressingMode::IndexedIndirect => {
                let zp = self.fetch(bus).wrapping_add(self.registers.x);
                self.tick();
                self.read_on_indirect(bus, zp as u16)
            }
            AddressingMode::IndirectIndexed => {
                let zp = self.fetch(bus) as u16;
                let base = self.read_on_indirect(bus, zp);
                self.tick();
                base.wrapping_add(self.registers.y as u16)
            }
            AddressingMode::IndirectIndexedWithPenalty => {
                let zp = self.fetch(bus) as u16;
                let base = self.read_on_indirect(bus, zp);
                let index = self.registers.y as u16;
                if page_crossed(base, index) {
                    self.tick();
                }
                base.wrapping_add(index)
            }
        }
    }

    // MARK: execution

    fn execute<B: Bus>(&mut self, bus: &mut B, instruction: Instruction) {
        let mode = instruction.mode;
        let operand = self.operand(bus, mode);

        match instruction.mnemonic {
            Mnemonic::LDA => {
                let value = self.read(bus, operand);
                self.registers.set_a(value);
            }
            Mnemonic::LDX => {
                let value = self.read(bus, operand);
                self.registers.set_x(value);
            }
            Mnemonic::LDY => {
                let value = self.read(bus, operand);
                self.registers.set_y(value);
            }
            Mnemonic::STA => self.write(bus, operand, self.registers.a),
            Mnemonic::STX => self.write(bus, operand, self.registers.x),
            Mnemonic::STY => self.write(bus, operand, self.registers.y),

            Mnemonic::TAX => {
                self.registers.set_x(self.registers.a);
                self.tick();
            }
            Mnemonic::TSX => {
                self.registers.set_x(self.registers.s);
                self.tick();
            }
            Mnemonic::TAY => {
                self.registers.set_y(self.registers.a);
                self.tick();
            }
            Mnemonic::TXA => {
                self.registers.set_a(self.registers.x);
                self.tick();
            }
            Mnemonic::TXS => {
                self.registers.s = self.registers.x;
                self.tick();
            }
            Mnemonic::TYA => {
                self.registers.set_a(self.registers.y);
                self.tick();
            }

            Mnemonic::PHA => {
                self.push(bus, self.registers.a);
                self.tick();
            }
            Mnemonic::PHP => {
                let p = self.registers.p | Status::B | Status::R;
                self.push(bus, p.bits());
                self.tick();
            }
            Mnemonic::PLA => {
                let value = self.pull(bus);
                self.registers.set_a(value);
                self.tick_n(2);
            }
            Mnemonic::PLP => {
                let value = self.pull(bus);
                self.registers.p = pulled_status(value);
                self.tick_n(2);
            }

            Mnemonic::AND => {
                let value = self.read(bus, operand);
                self.registers.set_a(self.registers.a & value);
            }
            Mnemonic::EOR => {
                let value = self.read(bus, operand);
                self.registers.set_a(self.registers.a ^ value);
            }
            Mnemonic::ORA => {
                let value = self.read(bus, operand);
                self.registers.set_a(self.registers.a | value);
            }
            Mnemonic::BIT => {
                let value = self.read(bus, operand);
                let p = &mut self.registers.p;
                p.set(Status::Z, self.registers.a & value == 0);
                p.set(Status::V, value & 0x40 != 0);
                p.set(Status::N, value & 0x80 != 0);
            }

            Mnemonic::ADC => {
                let value = self.read(bus, operand);
                self.add_with_carry(value);
            }
            Mnemonic::SBC => {
                let value = self.read(bus, operand);
                self.add_with_carry(!value);
            }
            Mnemonic::CMP => {
                let value = self.read(bus, operand);
                self.compare(self.registers.a, value);
            }
            Mnemonic::CPX => {
                let value = self.read(bus, operand);
                self.compare(self.registers.x, value);
            }
            Mnemonic::CPY => {
                let value = self.read(bus, operand);
                self.compare(self.registers.y, value);
            }

            Mnemonic::INC => {
                self.modify(bus, operand, |_, v| v.wrapping_add(1));
            }
            Mnemonic::DEC => {
                self.modify(bus, operand, |_, v| v.wrapping_sub(1));
            }
            Mnemonic::INX => {
                self.registers.set_x(self.registers.x.wrapping_add(1));
                self.tick();
            }
            Mnemonic::INY => {
                self.registers.set_y(self.registers.y.wrapping_add(1));
                self.tick();
            }
            Mnemonic::DEX => {
                self.registers.set_x(self.registers.x.wrapping_sub(1));
                self.tick();
            }
            Mnemonic::DEY => {
                self.registers.set_y(self.registers.y.wrapping_sub(1));
                self.tick();
            }

            Mnemonic::ASL => self.shift(bus, mode, operand, asl),
            Mnemonic::LSR => self.shift(bus, mode, operand, lsr),
            Mnemonic::ROL => self.shift(bus, mode, operand, rol),
            Mnemonic::ROR => self.shift(bus, mode, operand, ror),

            Mnemonic::JMP => self.registers.pc = operand,
            Mnemonic::JSR => {
                self.push_word(bus, self.registers.pc.wrapping_sub(1));
                self.tick();
                self.registers.pc = operand;
            }
            Mnemonic::RTS => {
                self.tick_n(3);
                self.registers.pc = self.pull_word(bus).wrapping_add(1);
            }
            Mnemonic::RTI => {
                self.tick_n(2);
                let value = self.pull(bus);
                self.registers.p = pulled_status(value);
                self.registers.pc = self.pull_word(bus);
            }

            Mnemonic::BCC => self.branch(operand, !self.registers.p.contains(Status::C)),
            Mnemonic::BCS => self.branch(operand, self.registers.p.contains(Status::C)),
            Mnemonic::BEQ => self.branch(operand, self.registers.p.contains(Status::Z)),
            Mnemonic::BMI => self.branch(operand, self.registers.p.contains(Status::N)),
            Mnemonic::BNE => self.branch(operand, !self.registers.p.contains(Status::Z)),
            Mnemonic::BPL => self.branch(operand, !self.registers.p.contains(Status::N)),
            Mnemonic::BVC => self.branch(operand, !self.registers.p.contains(Status::V)),
            Mnemonic::BVS => self.branch(operand, self.registers.p.contains(Status::V)),

            Mnemonic::CLC => self.set_flag(Status::C, false),
            Mnemonic::CLD => self.set_flag(Status::D, false),
            Mnemonic::CLI => self.set_flag(Status::I, false),
            Mnemonic::CLV => self.set_flag(Status::V, false),
            Mnemonic::SEC => self.set_flag(Status::C, true),
            Mnemonic::SED => self.set_flag(Status::D, true),
            Mnemonic::SEI => self.set_flag(Status::I, true),

            Mnemonic::BRK => {
                // the byte after BRK is padding
                self.registers.pc = self.registers.pc.wrapping_add(1);
                self.tick_n(1);
                self.push_word(bus, self.registers.pc);
                self.push(bus, (self.registers.p | Status::B | Status::R).bits());
                self.registers.p.insert(Status::I);
                self.registers.pc = self.read_word(bus, IRQ_VECTOR);
                debug!("BRK -> PC={:04X}", self.registers.pc);
            }
            Mnemonic::NOP => self.tick(),

            Mnemonic::LAX => {
                let value = self.read(bus, operand);
                self.registers.set_a(value);
                self.registers.set_x(value);
            }
            Mnemonic::SAX => self.write(bus, operand, self.registers.a & self.registers.x),
            Mnemonic::DCP => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_sub(1));
                self.compare(self.registers.a, value);
            }
            Mnemonic::ISB => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_add(1));
                self.add_with_carry(!value);
            }
            Mnemonic::SLO => {
                let value = self.modify(bus, operand, asl);
                self.registers.set_a(self.registers.a | value);
            }
            Mnemonic::RLA => {
                let value = self.modify(bus, operand, rol);
                self.registers.set_a(self.registers.a & value);
            }
            Mnemonic::SRE => {
                let value = self.modify(bus, operand, lsr);
                self.registers.set_a(self.registers.a ^ value);
            }
            Mnemonic::RRA => {
                let value = self.modify(bus, operand, ror);
                self.add_with_carry(value);
            }
        }
    }

    fn set_flag(&mut self, flag: Status, value: bool) {
        self.registers.p.set(flag, value);
        self.tick();
    }

    /// Read-modify-write: read, idle, write back. Returns the written value.
    fn modify<B, F>(&mut self, bus: &mut B, address: u16, op: F) -> u8
    where
        B: Bus,
        F: FnOnce(&mut Status, u8) -> u8,
    {
        let value = self.read(bus, address);
        let result = op(&mut self.registers.p, value);
        self.registers.p.set_zn(result);
        self.write(bus, address, result);
        self.tick();
        result
    }

    fn shift<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: AddressingMode,
        operand: u16,
        op: fn(&mut Status, u8) -> u8,
    ) {
        if mode == AddressingMode::Accumulator {
            let result = op(&mut self.registers.p, self.registers.a);
            self.registers.set_a(result);
            self.tick();
        } else {
            self.modify(bus, operand, op);
        }
    }

    // http://www.righto.com/2012/12/the-6502-overflow-flag-explained.html
    fn add_with_carry(&mut self, value: u8) {
        let a = self.registers.a;
        let carry = self.registers.p.contains(Status::C) as u8;
        let result = a.wrapping_add(value).wrapping_add(carry);

        let a7 = a >> 7;
        let v7 = value >> 7;
        let c6 = a7 ^ v7 ^ (result >> 7);
        let c7 = (a7 & v7) | (a7 & c6) | (v7 & c6);

        self.registers.p.set(Status::C, c7 == 1);
        self.registers.p.set(Status::V, c6 ^ c7 == 1);
        self.registers.set_a(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.registers.p.set_zn(register.wrapping_sub(value));
        self.registers.p.set(Status::C, register >= value);
    }

    fn branch(&mut self, operand: u16, taken: bool) {
        if !taken {
            return;
        }
        self.tick();
        let pc = self.registers.pc;
        let target = pc.wrapping_add(operand as u8 as i8 as u16);
        if (pc & 0xFF00) != (target & 0xFF00) {
            self.tick();
        }
        self.registers.pc = target;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

fn page_crossed(base: u16, index: u16) -> bool {
    (base.wrapping_add(index) & 0xFF00) != (base & 0xFF00)
}

/// P as restored by PLP/RTI: B dropped, R forced
fn pulled_status(value: u8) -> Status {
    (Status::from_bits_retain(value) - Status::B) | Status::R
}

fn asl(p: &mut Status, value: u8) -> u8 {
    p.set(Status::C, value & 0x80 != 0);
    value << 1
}

fn lsr(p: &mut Status, value: u8) -> u8 {
    p.set(Status::C, value & 0x01 != 0);
    value >> 1
}

fn rol(p: &mut Status, value: u8) -> u8 {
    let carry = p.contains(Status::C) as u8;
    p.set(Status::C, value & 0x80 != 0);
    value << 1 | carry
}

fn ror(p: &mut Status, value: u8) -> u8 {
    let carry = (p.contains(Status::C) as u8) << 7;
    p.set(Status::C, value & 0x01 != 0);
    value >> 1 | carry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ram {
        memory: Vec<u8>,
        line: InterruptLine,
    }

    impl Bus for Ram {
        fn read(&mut self, address: u16) -> u8 {
            self.memory[address as usize]
        }

        fn write(&mut self, address: u16, value: u8) {
            self.memory[address as usize] = value;
        }

        fn interrupts(&mut self) -> &mut InterruptLine {
            &mut self.line
        }
    }

    fn setup(program: &[u8]) -> (Cpu, Ram) {
        let mut ram = Ram {
            memory: vec![0; 0x10000],
            line: InterruptLine::new(),
        };
        ram.memory[0x8000..0x8000 + program.len()].copy_from_slice(program);
        let mut cpu = Cpu::new();
        cpu.registers_mut().pc = 0x8000;
        (cpu, ram)
    }

    #[test]
    fn test_register_setters_sync_zn() {
        let mut reg = Registers::new();
        reg.set_a(0b0010_1111);
        assert!(!reg.p.contains(Status::N));
        reg.set_a(0b1010_1111);
        assert!(reg.p.contains(Status::N));
        reg.set_x(0);
        assert!(reg.p.contains(Status::Z));
    }

    #[test]
    fn test_reset_keeps_registers() {
        let (mut cpu, mut ram) = setup(&[]);
        ram.memory[0xFFFC] = 0x20;
        ram.memory[0xFFFD] = 0x7F;
        cpu.registers_mut().set_a(0xFA);
        cpu.registers_mut().s = 0x37;
        cpu.registers_mut().p = Status::N | Status::V;

        ram.line.send(Interrupt::RESET);
        let cycles = cpu.step(&mut ram);

        assert_eq!(cycles, 7);
        assert_eq!(cpu.registers().a(), 0xFA);
        assert_eq!(cpu.registers().s, 0x34);
        assert_eq!(cpu.registers().p, Status::N | Status::V | Status::I);
        assert_eq!(cpu.registers().pc, 0x7F20);
        assert!(ram.line.is_empty());
    }

    #[test]
    fn test_stack_round_trip() {
        let (mut cpu, mut ram) = setup(&[]);
        cpu.registers_mut().s = 0xFF;
        cpu.push_word(&mut ram, 0x98AF);
        cpu.push(&mut ram, 0x14);
        assert_eq!(cpu.pull(&mut ram), 0x14);
        assert_eq!(cpu.pull_word(&mut ram), 0x98AF);
        assert_eq!(cpu.registers().s, 0xFF);
    }

    #[test]
    fn test_adc_overflow() {
        // LDA #$50; ADC #$50
        let (mut cpu, mut ram) = setup(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step(&mut ram);
        cpu.step(&mut ram);
        assert_eq!(cpu.registers().a(), 0xA0);
        assert!(cpu.registers().p.contains(Status::V));
        assert!(!cpu.registers().p.contains(Status::C));
        assert!(cpu.registers().p.contains(Status::N));
    }

    #[test]
    fn test_sbc_borrow() {
        // SEC; LDA #$00; SBC #$01
        let (mut cpu, mut ram) = setup(&[0x38, 0xA9, 0x00, 0xE9, 0x01]);
        for _ in 0..3 {
            cpu.step(&mut ram);
        }
        assert_eq!(cpu.registers().a(), 0xFF);
        assert!(!cpu.registers().p.contains(Status::C));
        assert!(!cpu.registers().p.contains(Status::V));
    }

    #[test]
    fn test_irq_needs_interrupt_flag_set() {
        // CLI; NOP
        let (mut cpu, mut ram) = setup(&[0x58, 0xEA]);
        ram.memory[0xFFFE] = 0x00;
        ram.memory[0xFFFF] = 0x90;
        cpu.step(&mut ram);

        ram.line.send(Interrupt::IRQ);
        assert_eq!(cpu.step(&mut ram), 2);
        assert_eq!(cpu.registers().pc, 0x8002);
        assert!(ram.line.is_set(Interrupt::IRQ));

        cpu.registers_mut().p.insert(Status::I);
        assert_eq!(cpu.step(&mut ram), 7);
        assert_eq!(cpu.registers().pc, 0x9000);
        assert!(!ram.line.is_set(Interrupt::IRQ));
    }
}
