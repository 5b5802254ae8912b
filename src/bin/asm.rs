//! `asm <input.tpu> [-o <out>]` - assembles to a flat binary memory image.
//! the disk-image packer from spec.md §6 is out of scope; `-o` here writes
//! a raw 64 KiB memory dump rather than a packed drive image, matching
//! SPEC_FULL.md §13.

extern crate clap;
extern crate colored;
extern crate tpu;

use std::fs;
use std::path::Path;
use std::process;

use clap::{App, Arg};
use colored::Colorize;

use tpu::asm;
use tpu::config::Config;

fn main() {
    let matches = App::new("asm")
        .version("0.1")
        .about("assembles a .tpu file into a raw memory image")
        .arg(
            Arg::with_name("INPUT")
                .help("the .tpu source file to assemble")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("output path (defaults to INPUT with a .bin extension)"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let config = Config::load(Some(Path::new("tpu.toml")));
    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), input, e);
        process::exit(1);
    });

    let mem = asm::assemble_with_config(&source, &config).unwrap_or_else(|e| {
        eprintln!("{} {}", "assembly error:".red().bold(), e);
        process::exit(1);
    });

    let output = matches
        .value_of("output")
        .map(String::from)
        .unwrap_or_else(|| default_output_path(input));

    fs::write(&output, mem.as_slice()).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), output, e);
        process::exit(1);
    });

    println!("{} {}", "assembled".green().bold(), output);
}

fn default_output_path(input: &str) -> String {
    Path::new(input)
        .with_extension("bin")
        .to_string_lossy()
        .into_owned()
}
