use std::path::Path;
use std::{env, fs, process};

use asm65::assembler::{Compiler, Parser, Program};
use asm65::logging::error;

enum Format {
    Bin,
    Hex,
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [-f bin|hex] [-D NAME[=VALUE]] <input.asm>... <output>",
        program
    );
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut format = Format::Bin;
    let mut defines: Vec<(String, i64)> = Vec::new();
    let mut paths: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-f" {
            i += 1;
            match args.get(i).map(String::as_str) {
                Some("bin") => format = Format::Bin,
                Some("hex") => format = Format::Hex,
                _ => usage(&args[0]),
            }
        } else if let Some(def) = arg.strip_prefix("-D") {
            let def = if def.is_empty() {
                i += 1;
                match args.get(i) {
                    Some(next) => next.clone(),
                    None => usage(&args[0]),
                }
            } else {
                def.to_string()
            };
            match parse_define(&def) {
                Some(define) => defines.push(define),
                None => {
                    error(format!("invalid definition: {}", def));
                    process::exit(1);
                }
            }
        } else {
            paths.push(arg.clone());
        }
        i += 1;
    }

    if paths.len() < 2 {
        usage(&args[0]);
    }
    let output_path = match paths.pop() {
        Some(path) => path,
        None => usage(&args[0]),
    };

    let mut compiler = Compiler::new();
    for (name, value) in &defines {
        compiler.symbols_mut().set(name, Some(*value));
    }

    // all inputs parse, in order, into one program sharing one symbol table
    let mut program = Program::default();
    for input in &paths {
        println!("Assembling {}", input);
        let parsed = Parser::from_file(Path::new(input))
            .and_then(|mut parser| parser.parse_program())
            .unwrap_or_else(|e| {
                error(e.to_string());
                process::exit(2);
            });
        program.statements.extend(parsed.statements);
    }

    compiler.compile(&program).unwrap_or_else(|e| {
        error(e.to_string());
        process::exit(2);
    });

    let bytes = compiler.bytes();
    let (contents, label) = match format {
        Format::Bin => (bytes.to_vec(), "binary"),
        Format::Hex => (
            format_hex(compiler.start_origin(), bytes).into_bytes(),
            "hex",
        ),
    };

    fs::write(&output_path, contents).unwrap_or_else(|e| {
        error(format!("failed to write to output file: {}", e));
        process::exit(3);
    });

    println!("Written {} bytes to {} ({})", bytes.len(), output_path, label);
}

/// `NAME[=VALUE]`; a bare name defines 1, VALUE honors the 0x prefix
fn parse_define(def: &str) -> Option<(String, i64)> {
    let mut parts = def.splitn(2, '=');
    let name = parts.next()?.to_string();
    if name.is_empty() {
        return None;
    }
    let value = match parts.next() {
        Some(value) => parse_int(value)?,
        None => 1,
    };
    Some((name, value))
}

fn parse_int(s: &str) -> Option<i64> {
    match s.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// 16 bytes per row: `ADDR: HH HH …`, addresses starting at the origin
fn format_hex(start: i64, data: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let addr = start + (i as i64) * 16;
        let row: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&format!("{:04X}: {}\n", addr, row.join(" ")));
    }
    out
}
