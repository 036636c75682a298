use asm65::assembler::{self, Error};

fn data_path(name: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn assemble_file_hex(name: &str) -> String {
    assembler::assemble_from_file(&data_path(name))
        .expect("assembly failed")
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[test]
fn included_file_splices_in_place() {
    assert_eq!(assemble_file_hex("include_main.asm"), "a201a9ffa002");
}

#[test]
fn includes_nest() {
    assert_eq!(assemble_file_hex("include_deep.asm"), "a201a9ffa002");
}

#[test]
fn included_definitions_are_visible() {
    assert_eq!(assemble_file_hex("include_uses_defs.asm"), "4c3412");
}

#[test]
fn include_cycle_is_detected() {
    let err = assembler::assemble_from_file(&data_path("include_cycle_a.asm")).unwrap_err();
    assert!(matches!(err, Error::Include { .. }), "got {:?}", err);
    assert!(
        err.to_string().contains("Recursive include detected"),
        "got {}",
        err
    );
}

#[test]
fn self_include_is_detected() {
    let err = assembler::assemble_from_file(&data_path("include_cycle_self.asm")).unwrap_err();
    assert!(
        err.to_string().contains("Recursive include detected"),
        "got {}",
        err
    );
}

#[test]
fn missing_include_is_an_error() {
    let err = assembler::assemble_from_file(&data_path("include_missing.asm")).unwrap_err();
    assert!(matches!(err, Error::Include { .. }), "got {:?}", err);
    assert!(
        err.to_string().contains("Include file not found"),
        "got {}",
        err
    );
}

#[test]
fn missing_source_file_is_an_error() {
    let err = assembler::assemble_from_file(&data_path("does_not_exist.asm")).unwrap_err();
    assert!(matches!(err, Error::Read { .. }), "got {:?}", err);
}

#[test]
fn include_error_names_the_including_file() {
    let err = assembler::assemble_from_file(&data_path("include_missing.asm")).unwrap_err();
    assert!(
        err.to_string().contains("include_missing.asm:1:"),
        "got {}",
        err
    );
}
