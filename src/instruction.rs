//! 6502 instruction decoding
//!
//! Every opcode byte decodes to a mnemonic, an addressing mode and the documented
//! base cycle count. Opcodes with no entry decode to a 2-cycle implied `NOP`.

/// CPU Addressing Modes
///
/// The `*WithPenalty` variants are used by read instructions and only take the
/// extra cycle when indexing crosses a page. The plain indexed variants always
/// take it (stores and read-modify-write).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implicit,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteXWithPenalty,
    AbsoluteY,
    AbsoluteYWithPenalty,
    Relative,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
    IndirectIndexedWithPenalty,
}

/// CPU Mnemonics, including the common undocumented ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    LDA, LDX, LDY,
    STA, STX, STY,
    TAX, TAY, TSX, TXA, TXS, TYA,
    PHA, PHP, PLA, PLP,
    AND, EOR, ORA, BIT,
    ADC, SBC, CMP, CPX, CPY,
    INC, INX, INY, DEC, DEX, DEY,
    ASL, LSR, ROL, ROR,
    JMP, JSR, RTS, RTI,
    BCC, BCS, BEQ, BMI, BNE, BPL, BVC, BVS,
    CLC, CLD, CLI, CLV, SEC, SED, SEI,
    BRK, NOP,
    // Undocumented
    LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA,
}

/// Decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Documented cycle count without page-cross or branch penalties
    pub cycles: u8,
}

const fn ins(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    Instruction { mnemonic, mode, cycles }
}

/// Decode an opcode byte
pub fn decode(opcode: u8) -> Instruction {
    INSTRUCTIONS[opcode as usize]
}

/// Static decode table indexed by opcode
pub static INSTRUCTIONS: [Instruction; 256] = build_table();

const fn build_table() -> [Instruction; 256] {
    let mut table = [ins(Mnemonic::NOP, AddressingMode::Implicit, 2); 256];
    let mut opcode = 0;
    while opcode < 256 {
        if let Some(entry) = lookup(opcode as u8) {
            table[opcode] = entry;
        }
        opcode += 1;
    }
    table
}

const fn lookup(opcode: u8) -> Option<Instruction> {
    use AddressingMode::*;
    use Mnemonic::*;

    let entry = match opcode {
        // Load/Store
        0xA9 => ins(LDA, Immediate, 2),
        0xA5 => ins(LDA, ZeroPage, 3),
        0xB5 => ins(LDA, ZeroPageX, 4),
        0xAD => ins(LDA, Absolute, 4),
        0xBD => ins(LDA, AbsoluteXWithPenalty, 4),
        0xB9 => ins(LDA, AbsoluteYWithPenalty, 4),
        0xA1 => ins(LDA, IndexedIndirect, 6),
        0xB1 => ins(LDA, IndirectIndexedWithPenalty, 5),
        0xA2 => ins(LDX, Immediate, 2),
        0xA6 => ins(LDX, ZeroPage, 3),
        0xB6 => ins(LDX, ZeroPageY, 4),
        0xAE => ins(LDX, Absolute, 4),
        0xBE => ins(LDX, AbsoluteYWithPenalty, 4),
        0xA0 => ins(LDY, Immediate, 2),
        0xA4 => ins(LDY, ZeroPage, 3),
        0xB4 => ins(LDY, ZeroPageX, 4),
        0xAC => ins(LDY, Absolute, 4),
        0xBC => ins(LDY, AbsoluteXWithPenalty, 4),
        0x85 => ins(STA, ZeroPage, 3),
        0x95 => ins(STA, ZeroPageX, 4),
        0x8D => ins(STA, Absolute, 4),
        0x9D => ins(STA, AbsoluteX, 5),
        0x99 => ins(STA, AbsoluteY, 5),
        0x81 => ins(STA, IndexedIndirect, 6),
        0x91 => ins(STA, IndirectIndexed, 6),
        0x86 => ins(STX, ZeroPage, 3),
        0x96 => ins(STX, ZeroPageY, 4),
        0x8E => ins(STX, Absolute, 4),
        0x84 => ins(STY, ZeroPage, 3),
        0x94 => ins(STY, ZeroPageX, 4),
        0x8C => ins(STY, Absolute, 4),

        // Register transfers
        0xAA => ins(TAX, Implicit, 2),
        0xBA => ins(TSX, Implicit, 2),
        0xA8 => ins(TAY, Implicit, 2),
        0x8A => ins(TXA, Implicit, 2),
        0x9A => ins(TXS, Implicit, 2),
        0x98 => ins(TYA, Implicit, 2),

        // Stack
        0x48 => ins(PHA, Implicit, 3),
        0x08 => ins(PHP, Implicit, 3),
        0x68 => ins(PLA, Implicit, 4),
        0x28 => ins(PLP, Implicit, 4),

        // Logical
        0x29 => ins(AND, Immediate, 2),
        0x25 => ins(AND, ZeroPage, 3),
        0x35 => ins(AND, ZeroPageX, 4),
        0x2D => ins(AND, Absolute, 4),
        0x3D => ins(AND, AbsoluteXWithPenalty, 4),
        0x39 => ins(AND, AbsoluteYWithPenalty, 4),
        0x21 => ins(AND, IndexedIndirect, 6),
        0x31 => ins(AND, IndirectIndexedWithPenalty, 5),
        0x49 => ins(EOR, Immediate, 2),
        0x45 => ins(EOR, ZeroPage, 3),
        0x55 => ins(EOR, ZeroPageX, 4),
        0x4D => ins(EOR, Absolute, 4),
        0x5D => ins(EOR, AbsoluteXWithPenalty, 4),
        0x59 => ins(EOR, AbsoluteYWithPenalty, 4),
        0x41 => ins(EOR, IndexedIndirect, 6),
        0x51 => ins(EOR, IndirectIndexedWithPenalty, 5),
        0x09 => ins(ORA, Immediate, 2),
        0x05 => ins(ORA, ZeroPage, 3),
        0x15 => ins(ORA, ZeroPageX, 4),
        0x0D => ins(ORA, Absolute, 4),
        0x1D => ins(ORA, AbsoluteXWithPenalty, 4),
        0x19 => ins(ORA, AbsoluteYWithPenalty, 4),
        0x01 => ins(ORA, IndexedIndirect, 6),
        0x11 => ins(ORA, IndirectIndexedWithPenalty, 5),
        0x24 => ins(BIT, ZeroPage, 3),
        0x2C => ins(BIT, Absolute, 4),

        // Arithmetic
        0x69 => ins(ADC, Immediate, 2),
        0x65 => ins(ADC, ZeroPage, 3),
        0x75 => ins(ADC, ZeroPageX, 4),
        0x6D => ins(ADC, Absolute, 4),
        0x7D => ins(ADC, AbsoluteXWithPenalty, 4),
        0x79 => ins(ADC, AbsoluteYWithPenalty, 4),
        0x61 => ins(ADC, IndexedIndirect, 6),
        0x71 => ins(ADC, IndirectIndexedWithPenalty, 5),
        0xE9 | 0xEB => ins(SBC, Immediate, 2),
        0xE5 => ins(SBC, ZeroPage, 3),
        0xF5 => ins(SBC, ZeroPageX, 4),
        0xED => ins(SBC, Absolute, 4),
        0xFD => ins(SBC, AbsoluteXWithPenalty, 4),
        0xF9 => ins(SBC, AbsoluteYWithPenalty, 4),
        0xE1 => ins(SBC, IndexedIndirect, 6),
        0xF1 => ins(SBC, IndirectIndexedWithPenalty, 5),
        0xC9 => ins(CMP, Immediate, 2),
        0xC5 => ins(CMP, ZeroPage, 3),
        0xD5 => ins(CMP, ZeroPageX, 4),
        0xCD => ins(CMP, Absolute, 4),
        0xDD => ins(CMP, AbsoluteXWithPenalty, 4),
        0xD9 => ins(CMP, AbsoluteYWithPenalty, 4),
        0xC1 => ins(CMP, IndexedIndirect, 6),
        0xD1 => ins(CMP, IndirectIndexedWithPenalty, 5),
        0xE0 => ins(CPX, Immediate, 2),
        0xE4 => ins(CPX, ZeroPage, 3),
        0xEC => ins(CPX, Absolute, 4),
        0xC0 => ins(CPY, Immediate, 2),
        0xC4 => ins(CPY, ZeroPage, 3),
        0xCC => ins(CPY, Absolute, 4),

        // Increment/Decrement
        0xE6 => ins(INC, ZeroPage, 5),
        0xF6 => ins(INC, ZeroPageX, 6),
        0xEE => ins(INC, Absolute, 6),
        0xFE => ins(INC, AbsoluteX, 7),
        0xE8 => ins(INX, Implicit, 2),
        0xC8 => ins(INY, Implicit, 2),
        0xC6 => ins(DEC, ZeroPage, 5),
        0xD6 => ins(DEC, ZeroPageX, 6),
        0xCE => ins(DEC, Absolute, 6),
        0xDE => ins(DEC, AbsoluteX, 7),
        0xCA => ins(DEX, Implicit, 2),
        0x88 => ins(DEY, Implicit, 2),

        // Shifts
        0x0A => ins(ASL, Accumulator, 2),
        0x06 => ins(ASL, ZeroPage, 5),
        0x16 => ins(ASL, ZeroPageX, 6),
        0x0E => ins(ASL, Absolute, 6),
        0x1E => ins(ASL, AbsoluteX, 7),
        0x4A => ins(LSR, Accumulator, 2),
        0x46 => ins(LSR, ZeroPage, 5),
        0x56 => ins(LSR, ZeroPageX, 6),
        0x4E => ins(LSR, Absolute, 6),
        0x5E => ins(LSR, AbsoluteX, 7),
        0x2A => ins(ROL, Accumulator, 2),
        0x26 => ins(ROL, ZeroPage, 5),
        0x36 => ins(ROL, ZeroPageX, 6),
        0x2E => ins(ROL, Absolute, 6),
        0x3E => ins(ROL, AbsoluteX, 7),
        0x6A => ins(ROR, Accumulator, 2),
        0x66 => ins(ROR, ZeroPage, 5),
        0x76 => ins(ROR, ZeroPageX, 6),
        0x6E => ins(ROR, Absolute, 6),
        0x7E => ins(ROR, AbsoluteX, 7),

        // Jumps
        0x4C => ins(JMP, Absolute, 3),
        0x6C => ins(JMP, Indirect, 5),
        0x20 => ins(JSR, Absolute, 6),
        0x60 => ins(RTS, Implicit, 6),
        0x40 => ins(RTI, Implicit, 6),

        // Branches
        0x90 => ins(BCC, Relative, 2),
        0xB0 => ins(BCS, Relative, 2),
        0xF0 => ins(BEQ, Relative, 2),
        0x30 => ins(BMI, Relative, 2),
        0xD0 => ins(BNE, Relative, 2),
        0x10 => ins(BPL, Relative, 2),
        0x50 => ins(BVC, Relative, 2),
        0x70 => ins(BVS, Relative, 2),

        // Flags
        0x18 => ins(CLC, Implicit, 2),
        0xD8 => ins(CLD, Implicit, 2),
        0x58 => ins(CLI, Implicit, 2),
        0xB8 => ins(CLV, Implicit, 2),
        0x38 => ins(SEC, Implicit, 2),
        0xF8 => ins(SED, Implicit, 2),
        0x78 => ins(SEI, Implicit, 2),

        0x00 => ins(BRK, Implicit, 7),
        0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => ins(NOP, Implicit, 2),
        0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => ins(NOP, Immediate, 2),
        0x04 | 0x44 | 0x64 => ins(NOP, ZeroPage, 3),
        0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => ins(NOP, ZeroPageX, 4),
        0x0C => ins(NOP, Absolute, 4),
        0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => ins(NOP, AbsoluteXWithPenalty, 4),

        // Undocumented
        0xA3 => ins(LAX, IndexedIndirect, 6),
        0xA7 => ins(LAX, ZeroPage, 3),
        0xAF => ins(LAX, Absolute, 4),
        0xB3 => ins(LAX, IndirectIndexedWithPenalty, 5),
        0xB7 => ins(LAX, ZeroPageY, 4),
        0xBF => ins(LAX, AbsoluteYWithPenalty, 4),
        0x83 => ins(SAX, IndexedIndirect, 6),
        0x87 => ins(SAX, ZeroPage, 3),
        0x8F => ins(SAX, Absolute, 4),
        0x97 => ins(SAX, ZeroPageY, 4),
        0xC3 => ins(DCP, IndexedIndirect, 8),
        0xC7 => ins(DCP, ZeroPage, 5),
        0xCF => ins(DCP, Absolute, 6),
        0xD3 => ins(DCP, IndirectIndexed, 8),
        0xD7 => ins(DCP, ZeroPageX, 6),
        0xDB => ins(DCP, AbsoluteY, 7),
        0xDF => ins(DCP, AbsoluteX, 7),
        0xE3 => ins(ISB, IndexedIndirect, 8),
        0xE7 => ins(ISB, ZeroPage, 5),
        0xEF => ins(ISB, Absolute, 6),
        0xF3 => ins(ISB, IndirectIndexed, 8),
        0xF7 => ins(ISB, ZeroPageX, 6),
        0xFB => ins(ISB, AbsoluteY, 7),
        0xFF => ins(ISB, AbsoluteX, 7),
        0x03 => ins(SLO, IndexedIndirect, 8),
        0x07 => ins(SLO, ZeroPage, 5),
        0x0F => ins(SLO, Absolute, 6),
        0x13 => ins(SLO, IndirectIndexed, 8),
        0x17 => ins(SLO, ZeroPageX, 6),
        0x1B => ins(SLO, AbsoluteY, 7),
        0x1F => ins(SLO, AbsoluteX, 7),
        0x23 => ins(RLA, IndexedIndirect, 8),
        0x27 => ins(RLA, ZeroPage, 5),
        0x2F => ins(RLA, Absolute, 6),
        0x33 => ins(RLA, IndirectIndexed, 8),
        0x37 => ins(RLA, ZeroPageX, 6),
        0x3B => ins(RLA, AbsoluteY, 7),
        0x3F => ins(RLA, AbsoluteX, 7),
        0x43 => ins(SRE, IndexedIndirect, 8),
        0x47 => ins(SRE, ZeroPage, 5),
        0x4F => ins(SRE, Absolute, 6),
        0x53 => ins(SRE, IndirectIndexed, 8),
        0x57 => ins(SRE, ZeroPageX, 6),
        0x5B => ins(SRE, AbsoluteY, 7),
        0x5F => ins(SRE, AbsoluteX, 7),
        0x63 => ins(RRA, IndexedIndirect, 8),
        0x67 => ins(RRA, ZeroPage, 5),
        0x6F => ins(RRA, Absolute, 6),
        0x73 => ins(RRA, IndirectIndexed, 8),
        0x77 => ins(RRA, ZeroPageX, 6),
        0x7B => ins(RRA, AbsoluteY, 7),
        0x7F => ins(RRA, AbsoluteX, 7),

        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_official() {
        let lda = decode(0xB1);
        assert_eq!(lda.mnemonic, Mnemonic::LDA);
        assert_eq!(lda.mode, AddressingMode::IndirectIndexedWithPenalty);
        assert_eq!(lda.cycles, 5);

        let jmp = decode(0x6C);
        assert_eq!(jmp.mnemonic, Mnemonic::JMP);
        assert_eq!(jmp.mode, AddressingMode::Indirect);
    }

    #[test]
    fn test_unmapped_opcode_is_nop() {
        for opcode in [0x02u8, 0x0B, 0x8B, 0x9B, 0xAB, 0xCB] {
            let info = decode(opcode);
            assert_eq!(info.mnemonic, Mnemonic::NOP);
            assert_eq!(info.mode, AddressingMode::Implicit);
            assert_eq!(info.cycles, 2);
        }
    }

    #[test]
    fn test_sbc_alias() {
        assert_eq!(decode(0xEB), decode(0xE9));
    }
}
