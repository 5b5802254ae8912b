//! `compile <input.t> [-f]` - compiles T source to a TPU assembly text file.
//! see SPEC_FULL.md §13.

extern crate clap;
extern crate colored;
extern crate tpu;

use std::fs;
use std::path::Path;
use std::process;

use clap::{App, Arg};
use colored::Colorize;

use tpu::compiler;
use tpu::config::Config;

fn main() {
    let matches = App::new("compile")
        .version("0.1")
        .about("compiles a .t source file to TPU assembly")
        .arg(
            Arg::with_name("INPUT")
                .help("the .t source file to compile")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("force")
                .short("f")
                .long("force")
                .help("overwrite the output file if it already exists"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let config = Config::load(Some(Path::new("tpu.toml")));
    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), input, e);
        process::exit(1);
    });

    let output = Path::new(input)
        .with_extension("tpu")
        .to_string_lossy()
        .into_owned();

    if Path::new(&output).exists() && !matches.is_present("force") {
        eprintln!(
            "{} {} already exists, pass -f to overwrite",
            "io error:".red().bold(),
            output
        );
        process::exit(1);
    }

    let asm = compiler::compile_with_config(&source, &config).unwrap_or_else(|e| {
        eprintln!("{} {}", "compile error:".red().bold(), e);
        process::exit(1);
    });

    fs::write(&output, asm).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), output, e);
        process::exit(1);
    });

    println!("{} {}", "compiled".green().bold(), output);
}
