use asm65::assembler::{self, Error};

fn assemble_hex(source: &str) -> String {
    assembler::assemble(source)
        .expect("assembly failed")
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[test]
fn default_cpu_rejects_65c02_mnemonics() {
    let code = "\
start:
    BRA start
";
    let err = assembler::assemble(code).unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn c02_extensions() {
    let code = "\
.cpu \"65c02\"
start:
    BRA start
    PHX
    PLY
    STZ $12
    STZ $1234
";
    assert_eq!(assemble_hex(code), "80feda7a64129c3412");
}

#[test]
fn switching_back_restricts_the_table() {
    let ok = "\
.cpu \"65c02\"
PHX
.cpu \"6502\"
NOP
";
    assert_eq!(assemble_hex(ok), "daea");

    let bad = "\
.cpu \"65c02\"
.cpu \"6502\"
PHX
";
    let err = assembler::assemble(bad).unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn jmp_absolute_indexed_indirect() {
    let code = "\
.cpu \"65c02\"
JMP ($1234, X)
";
    // the only (abs,X) form; everything else in that shape is zero page
    assert_eq!(assemble_hex(code), "7c3412");
}

#[test]
fn zero_page_indirect_operands() {
    let code = "\
.cpu \"65c02\"
LDA ($12)
STA ($34)
ADC ($56)
";
    assert_eq!(assemble_hex(code), "b21292347256");
}

#[test]
fn zero_page_indirect_rejected_on_6502() {
    let err = assembler::assemble("LDA ($12)\n").unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn accumulator_increment() {
    let code = "\
.cpu \"65c02\"
INC A
DEC A
";
    assert_eq!(assemble_hex(code), "1a3a");

    let err = assembler::assemble("INC A\n").unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn bit_gains_immediate_and_indexed_forms() {
    let code = "\
.cpu \"65c02\"
BIT #$42
BIT $12,X
BIT $1234,X
";
    assert_eq!(assemble_hex(code), "894234123c3412");
}

#[test]
fn trb_tsb_and_stack_extensions() {
    let code = "\
.cpu \"65c02\"
TRB $12
TSB $1234
PHY
PLX
";
    assert_eq!(assemble_hex(code), "14120c34125afa");
}
