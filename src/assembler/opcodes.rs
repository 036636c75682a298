//! Static opcode tables for the 6502 and 65C02
//!
//! Structure: mnemonic → { addressing mode → opcode byte }. The 65C02 table
//! is the 6502 table plus the CMOS additions, built by copying and patching.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::statement::AddressingMode::{self, *};

pub type ModeMap = HashMap<AddressingMode, u8>;
pub type OpcodeTable = HashMap<&'static str, ModeMap>;

/// Which opcode table is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMode {
    Mos6502,
    Wdc65C02,
}

impl CpuMode {
    /// Parse the argument of a `.cpu` directive
    pub fn from_name(name: &str) -> Option<CpuMode> {
        match name.to_lowercase().as_str() {
            "6502" => Some(CpuMode::Mos6502),
            "65c02" => Some(CpuMode::Wdc65C02),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static OpcodeTable {
        match self {
            CpuMode::Mos6502 => &OPCODES_6502,
            CpuMode::Wdc65C02 => &OPCODES_65C02,
        }
    }
}

macro_rules! modes {
    ($($mode:ident: $opcode:literal),+ $(,)?) => {{
        let mut map = ModeMap::new();
        $(map.insert($mode, $opcode);)+
        map
    }};
}

pub static OPCODES_6502: LazyLock<OpcodeTable> = LazyLock::new(|| {
    let mut t = OpcodeTable::new();

    // Load/Store
    t.insert("LDA", modes! { Immediate: 0xA9, ZeroPage: 0xA5, ZeroPageX: 0xB5, Absolute: 0xAD, AbsoluteX: 0xBD, AbsoluteY: 0xB9, IndexedIndirect: 0xA1, IndirectIndexed: 0xB1 });
    t.insert("LDX", modes! { Immediate: 0xA2, ZeroPage: 0xA6, ZeroPageY: 0xB6, Absolute: 0xAE, AbsoluteY: 0xBE });
    t.insert("LDY", modes! { Immediate: 0xA0, ZeroPage: 0xA4, ZeroPageX: 0xB4, Absolute: 0xAC, AbsoluteX: 0xBC });
    t.insert("STA", modes! { ZeroPage: 0x85, ZeroPageX: 0x95, Absolute: 0x8D, AbsoluteX: 0x9D, AbsoluteY: 0x99, IndexedIndirect: 0x81, IndirectIndexed: 0x91 });
    t.insert("STX", modes! { ZeroPage: 0x86, ZeroPageY: 0x96, Absolute: 0x8E });
    t.insert("STY", modes! { ZeroPage: 0x84, ZeroPageX: 0x94, Absolute: 0x8C });

    // Arithmetic
    t.insert("ADC", modes! { Immediate: 0x69, ZeroPage: 0x65, ZeroPageX: 0x75, Absolute: 0x6D, AbsoluteX: 0x7D, AbsoluteY: 0x79, IndexedIndirect: 0x61, IndirectIndexed: 0x71 });
    t.insert("SBC", modes! { Immediate: 0xE9, ZeroPage: 0xE5, ZeroPageX: 0xF5, Absolute: 0xED, AbsoluteX: 0xFD, AbsoluteY: 0xF9, IndexedIndirect: 0xE1, IndirectIndexed: 0xF1 });

    // Compare
    t.insert("CMP", modes! { Immediate: 0xC9, ZeroPage: 0xC5, ZeroPageX: 0xD5, Absolute: 0xCD, AbsoluteX: 0xDD, AbsoluteY: 0xD9, IndexedIndirect: 0xC1, IndirectIndexed: 0xD1 });
    t.insert("CPX", modes! { Immediate: 0xE0, ZeroPage: 0xE4, Absolute: 0xEC });
    t.insert("CPY", modes! { Immediate: 0xC0, ZeroPage: 0xC4, Absolute: 0xCC });

    // Logical
    t.insert("AND", modes! { Immediate: 0x29, ZeroPage: 0x25, ZeroPageX: 0x35, Absolute: 0x2D, AbsoluteX: 0x3D, AbsoluteY: 0x39, IndexedIndirect: 0x21, IndirectIndexed: 0x31 });
    t.insert("ORA", modes! { Immediate: 0x09, ZeroPage: 0x05, ZeroPageX: 0x15, Absolute: 0x0D, AbsoluteX: 0x1D, AbsoluteY: 0x19, IndexedIndirect: 0x01, IndirectIndexed: 0x11 });
    t.insert("EOR", modes! { Immediate: 0x49, ZeroPage: 0x45, ZeroPageX: 0x55, Absolute: 0x4D, AbsoluteX: 0x5D, AbsoluteY: 0x59, IndexedIndirect: 0x41, IndirectIndexed: 0x51 });
    t.insert("BIT", modes! { ZeroPage: 0x24, Absolute: 0x2C });

    // Increment/Decrement
    t.insert("INC", modes! { ZeroPage: 0xE6, ZeroPageX: 0xF6, Absolute: 0xEE, AbsoluteX: 0xFE });
    t.insert("DEC", modes! { ZeroPage: 0xC6, ZeroPageX: 0xD6, Absolute: 0xCE, AbsoluteX: 0xDE });
    t.insert("INX", modes! { Implied: 0xE8 });
    t.insert("DEX", modes! { Implied: 0xCA });
    t.insert("INY", modes! { Implied: 0xC8 });
    t.insert("DEY", modes! { Implied: 0x88 });

    // Shifts
    t.insert("ASL", modes! { Accumulator: 0x0A, ZeroPage: 0x06, ZeroPageX: 0x16, Absolute: 0x0E, AbsoluteX: 0x1E });
    t.insert("LSR", modes! { Accumulator: 0x4A, ZeroPage: 0x46, ZeroPageX: 0x56, Absolute: 0x4E, AbsoluteX: 0x5E });
    t.insert("ROL", modes! { Accumulator: 0x2A, ZeroPage: 0x26, ZeroPageX: 0x36, Absolute: 0x2E, AbsoluteX: 0x3E });
    t.insert("ROR", modes! { Accumulator: 0x6A, ZeroPage: 0x66, ZeroPageX: 0x76, Absolute: 0x6E, AbsoluteX: 0x7E });

    // Jumps/Calls
    t.insert("JMP", modes! { Absolute: 0x4C, Indirect: 0x6C });
    t.insert("JSR", modes! { Absolute: 0x20 });
    t.insert("RTS", modes! { Implied: 0x60 });
    t.insert("RTI", modes! { Implied: 0x40 });

    // Branches
    t.insert("BCC", modes! { Relative: 0x90 });
    t.insert("BCS", modes! { Relative: 0xB0 });
    t.insert("BEQ", modes! { Relative: 0xF0 });
    t.insert("BMI", modes! { Relative: 0x30 });
    t.insert("BNE", modes! { Relative: 0xD0 });
    t.insert("BPL", modes! { Relative: 0x10 });
    t.insert("BVC", modes! { Relative: 0x50 });
    t.insert("BVS", modes! { Relative: 0x70 });

    // Stack/Flags
    t.insert("PHA", modes! { Implied: 0x48 });
    t.insert("PLA", modes! { Implied: 0x68 });
    t.insert("PHP", modes! { Implied: 0x08 });
    t.insert("PLP", modes! { Implied: 0x28 });
    t.insert("CLC", modes! { Implied: 0x18 });
    t.insert("SEC", modes! { Implied: 0x38 });
    t.insert("CLI", modes! { Implied: 0x58 });
    t.insert("SEI", modes! { Implied: 0x78 });
    t.insert("CLV", modes! { Implied: 0xB8 });
    t.insert("CLD", modes! { Implied: 0xD8 });
    t.insert("SED", modes! { Implied: 0xF8 });
    t.insert("BRK", modes! { Implied: 0x00 });
    t.insert("NOP", modes! { Implied: 0xEA });

    // Register transfers
    t.insert("TAX", modes! { Implied: 0xAA });
    t.insert("TXA", modes! { Implied: 0x8A });
    t.insert("TAY", modes! { Implied: 0xA8 });
    t.insert("TYA", modes! { Implied: 0x98 });
    t.insert("TSX", modes! { Implied: 0xBA });
    t.insert("TXS", modes! { Implied: 0x9A });

    t
});

pub static OPCODES_65C02: LazyLock<OpcodeTable> = LazyLock::new(|| {
    let mut t = OPCODES_6502.clone();

    t.insert("BRA", modes! { Relative: 0x80 });
    t.insert("PHX", modes! { Implied: 0xDA });
    t.insert("PLX", modes! { Implied: 0xFA });
    t.insert("PHY", modes! { Implied: 0x5A });
    t.insert("PLY", modes! { Implied: 0x7A });
    t.insert("STZ", modes! { ZeroPage: 0x64, ZeroPageX: 0x74, Absolute: 0x9C, AbsoluteX: 0x9E });
    t.insert("TRB", modes! { ZeroPage: 0x14, Absolute: 0x1C });
    t.insert("TSB", modes! { ZeroPage: 0x04, Absolute: 0x0C });

    patch(&mut t, "BIT", Immediate, 0x89);
    patch(&mut t, "BIT", ZeroPageX, 0x34);
    patch(&mut t, "BIT", AbsoluteX, 0x3C);

    patch(&mut t, "INC", Accumulator, 0x1A);
    patch(&mut t, "DEC", Accumulator, 0x3A);

    // (zp) indirect for the ALU mnemonics
    patch(&mut t, "ADC", Indirect, 0x72);
    patch(&mut t, "AND", Indirect, 0x32);
    patch(&mut t, "CMP", Indirect, 0xD2);
    patch(&mut t, "EOR", Indirect, 0x52);
    patch(&mut t, "LDA", Indirect, 0xB2);
    patch(&mut t, "ORA", Indirect, 0x12);
    patch(&mut t, "SBC", Indirect, 0xF2);
    patch(&mut t, "STA", Indirect, 0x92);

    // JMP (abs,X) keeps the IndexedIndirect tag but takes a 16-bit operand
    patch(&mut t, "JMP", IndexedIndirect, 0x7C);

    t
});

fn patch(table: &mut OpcodeTable, mnemonic: &'static str, mode: AddressingMode, opcode: u8) {
    table.entry(mnemonic).or_default().insert(mode, opcode);
}
