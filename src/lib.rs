//! A two-pass assembler for the MOS 6502 and WDC 65C02, featuring:
//! - transparent `.include` splicing with cycle detection
//! - forward references, local labels (`1f`/`1b`) and zero-page optimization
//! - mid-source CPU switching between the 6502 and 65C02 opcode tables

pub mod assembler;
pub mod logging;
