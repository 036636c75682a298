use asm65::assembler::{self, Error};

fn assemble_hex(source: &str) -> String {
    assembler::assemble(source)
        .expect("assembly failed")
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[test]
fn local_forward() {
    let code = "\
1:
    lda #0
    beq 1f
    brk
1:
    rts
";
    // BEQ at offset 2 skips the BRK to reach the second `1:` at offset 5
    assert_eq!(assemble_hex(code), "a900f0010060");
}

#[test]
fn local_backward() {
    let code = "\
1:
    dex
    bne 1b
    rts
";
    assert_eq!(assemble_hex(code), "cad0fd60");
}

#[test]
fn mixed_directions() {
    let code = "\
1:
    ldx #10
2:
    dex
    bne 2b
    beq 1f
    jmp 1b
1:
    rts
";
    // `1f` picks the nearest following definition, `1b` the nearest
    // preceding one; `2b` branches back into the loop
    assert_eq!(assemble_hex(code), "a20acad0fdf0034c000060");
}

#[test]
fn same_label_many_times() {
    let code = "\
.org $1000
1:
    nop
1:
    nop
1:
    bne 1b
";
    // the reference binds to the closest `1:` at or before the branch,
    // including one declared at the branch's own address
    assert_eq!(assemble_hex(code), "eaead0fe");
}

#[test]
fn missing_local_reference_is_an_error() {
    let code = "\
1:
    beq 2f
";
    let err = assembler::assemble(code).unwrap_err();
    assert!(matches!(err, Error::Resolve { .. }), "got {:?}", err);
}

#[test]
fn backward_reference_with_no_earlier_definition_is_an_error() {
    let code = "\
    beq 1b
1:
    nop
";
    let err = assembler::assemble(code).unwrap_err();
    assert!(matches!(err, Error::Resolve { .. }), "got {:?}", err);
}

#[test]
fn local_labels_as_word_operands() {
    let code = "\
.org $1000
1:
    nop
    .word 1b
";
    assert_eq!(assemble_hex(code), "ea0010");
}
