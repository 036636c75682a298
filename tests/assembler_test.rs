use asm65::assembler::{self, Error};

fn assemble_hex(source: &str) -> String {
    assembler::assemble(source)
        .expect("assembly failed")
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[test]
fn immediate_mode() {
    let code = "\
.org $1000
LDA #$01
LDX #$02
LDY #$03
ADC #$04
AND #$05
EOR #$06
ORA #$07
SBC #$08
CMP #$09
CPX #$0A
CPY #$0B
";
    assert_eq!(
        assemble_hex(code),
        "a901a202a0036904290549060907e908c909e00ac00b"
    );
}

#[test]
fn forward_reference_resolution() {
    let code = "\
.org $1000
start:
    .byte $4C       ; JMP opcode
    .word target    ; forward reference, full address

    .byte $A9       ; LDA # opcode
    .byte <target   ; forward reference, low byte

    .byte $A9       ; LDA # opcode
    .byte >target   ; forward reference, high byte

target:
    .byte $EA       ; NOP
";
    assert_eq!(assemble_hex(code), "4c0710a907a910ea");
}

#[test]
fn branch_backward() {
    let code = "\
.org $1000
loop: NOP
BNE loop
";
    assert_eq!(assemble_hex(code), "ead0fd");
}

#[test]
fn branch_forward() {
    let code = "\
.org $1000
BNE target
.byte $EA, $EA, $EA
target: .byte $00
";
    assert_eq!(assemble_hex(code), "d003eaeaea00");
}

#[test]
fn branch_out_of_range() {
    let code = "\
.org $1000
BNE target
.fill 130, $EA
target: .byte $00
";
    let err = assembler::assemble(code).unwrap_err();
    assert!(matches!(err, Error::Range { .. }), "got {:?}", err);
}

#[test]
fn zero_page_optimization() {
    assert_eq!(assemble_hex(".org $1000\nLDA $10\n"), "a510");
}

#[test]
fn zero_page_optimization_indexed() {
    assert_eq!(assemble_hex(".org $1000\nLDA $10,X\n"), "b510");
    assert_eq!(assemble_hex(".org $1000\nLDX $10,Y\n"), "b610");
    assert_eq!(assemble_hex(".org $1000\nSTA $10,X\n"), "9510");
}

#[test]
fn zero_page_not_available_for_jmp() {
    // JMP has no zero-page form, so $0010 must stay absolute
    assert_eq!(assemble_hex(".org $1000\nJMP $0010\n"), "4c1000");
}

#[test]
fn forward_reference_is_never_demoted() {
    // `value` turns out to fit in the zero page, but its value is unknown
    // when the LDA is sized, so both passes must keep it absolute
    let code = "\
.org $1000
LDA value
value = $10
";
    assert_eq!(assemble_hex(code), "ad1000");
}

#[test]
fn known_zero_page_symbol_is_demoted() {
    let code = "\
value = $10
.org $1000
LDA value
";
    assert_eq!(assemble_hex(code), "a510");
}

#[test]
fn absolute_modes() {
    assert_eq!(assemble_hex(".org $1000\nADC $1234\n"), "6d3412");
    assert_eq!(assemble_hex(".org $1000\nSTA $2000\n"), "8d0020");
    assert_eq!(assemble_hex(".org $1000\nLDA $1234,X\n"), "bd3412");
    assert_eq!(assemble_hex(".org $1000\nLDA $1234,Y\n"), "b93412");
}

#[test]
fn indirect_modes() {
    assert_eq!(assemble_hex(".org $1000\nJMP ($1234)\n"), "6c3412");
    assert_eq!(assemble_hex(".org $1000\nLDA ($10,X)\n"), "a110");
    assert_eq!(assemble_hex(".org $1000\nLDA ($10),Y\n"), "b110");
}

#[test]
fn accumulator_mode() {
    assert_eq!(assemble_hex("ASL A\n"), "0a");
    assert_eq!(assemble_hex("LSR A\nROL A\nROR A\n"), "4a2a6a");
}

#[test]
fn symbol_named_a_is_still_an_operand() {
    // `A` at the end of the line is the accumulator; `A,X` is a symbol
    let code = "\
A = $20
LDA A,X
";
    assert_eq!(assemble_hex(code), "b520");
}

#[test]
fn assignment_arithmetic() {
    let code = "\
base = $1000
.org base
LDA base+1
STA base-1
";
    assert_eq!(assemble_hex(code), "ad01108dff0f");
}

#[test]
fn low_and_high_byte_immediates() {
    let code = "\
addr = $1234
LDA #<addr
LDX #>addr
";
    assert_eq!(assemble_hex(code), "a934a212");
}

#[test]
fn char_literal_immediate() {
    assert_eq!(assemble_hex("LDA #'A'\n"), "a941");
}

#[test]
fn mnemonics_are_case_insensitive() {
    assert_eq!(assemble_hex("lda #$01\nRts\n"), "a90160");
}

#[test]
fn undefined_symbol_is_an_error() {
    let err = assembler::assemble(".org $1000\nLDA #missing\n").unwrap_err();
    assert!(matches!(err, Error::Resolve { .. }), "got {:?}", err);
}

#[test]
fn label_redefinition_is_an_error() {
    let err = assembler::assemble("foo:\nfoo:\n").unwrap_err();
    assert!(matches!(err, Error::Resolve { .. }), "got {:?}", err);
}

#[test]
fn assignment_may_override() {
    let code = "\
value = $01
value = $02
.byte value
";
    assert_eq!(assemble_hex(code), "02");
}

#[test]
fn unknown_mnemonic_is_an_error() {
    let err = assembler::assemble("FROB $1234\n").unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn unsupported_mode_is_an_error() {
    // STX has no AbsoluteX form
    let err = assembler::assemble("STX $1234,X\n").unwrap_err();
    assert!(matches!(err, Error::Encoding { .. }), "got {:?}", err);
}

#[test]
fn multiplication_is_rejected() {
    let err = assembler::assemble("LDA #1*2\n").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "got {:?}", err);
}

#[test]
fn missing_closing_paren_is_an_error() {
    let err = assembler::assemble("LDA ($10\n").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "got {:?}", err);
}

#[test]
fn bad_index_register_is_an_error() {
    let err = assembler::assemble("LDA $10,Z\n").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "got {:?}", err);
}

#[test]
fn unknown_character_is_a_lex_error() {
    let err = assembler::assemble("LDA {\n").unwrap_err();
    assert!(matches!(err, Error::Lex { .. }), "got {:?}", err);
}

#[test]
fn error_display_carries_the_line() {
    let err = assembler::assemble("NOP\nLDA missing\n").unwrap_err();
    assert!(err.to_string().starts_with("2:"), "got {}", err);
}

#[test]
fn string_in_memory() {
    let bytes = assembler::assemble(".org $2000\nstr: .byte \"Hello, World!\", $00\n")
        .expect("assembly failed");
    let text: String = bytes[..bytes.len() - 1]
        .iter()
        .map(|&b| b as char)
        .collect();
    assert_eq!(text, "Hello, World!");
    assert_eq!(*bytes.last().unwrap(), 0x00);
}
