//! `vm <program.tpu>` - load and execute; exit code is the VM's ES register.
//! see SPEC_FULL.md §13.

extern crate clap;
extern crate colored;
extern crate tpu;

use std::fs;
use std::path::Path;
use std::process;
use std::time::Duration;

use clap::{App, Arg};
use colored::Colorize;

use tpu::asm;
use tpu::config::Config;
use tpu::memory::{Address, Memory};
use tpu::tools;
use tpu::vm::Cpu;

fn main() {
    let matches = App::new("vm")
        .version("0.1")
        .about("executes a TPU program")
        .arg(
            Arg::with_name("INPUT")
                .help("the .tpu source or pre-assembled image to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("trace")
                .short("t")
                .long("trace")
                .help("trace every fetched instruction to stderr"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let config = Config::load(Some(Path::new("tpu.toml")));

    let mem = load_memory(input, &config);
    let mut cpu = Cpu::new_with_layout(mem, config.memory);
    cpu.trace = matches.is_present("trace") || config.vm.trace;

    // the clock-frequency shim lives here, not in `Cpu::step` - see
    // SPEC_FULL.md §10: sleeping is a wall-time concern of the CLI, not of
    // the executor itself.
    let period = if config.vm.clock_hz > 0 {
        Duration::from_secs_f64(1.0 / config.vm.clock_hz as f64)
    } else {
        Duration::from_secs(0)
    };

    loop {
        if cpu.suspended {
            break;
        }
        if let Err(e) = cpu.step() {
            eprintln!("{} {}", "runtime error:".red().bold(), e);
            process::exit(1);
        }
        if period > Duration::from_secs(0) {
            std::thread::sleep(period);
        }
    }

    process::exit(cpu.regs.es as i32);
}

/// a `.tpu` file is assembly text unless it fails to parse as UTF-8, in
/// which case it is treated as a pre-assembled raw memory image loaded flat
/// at address 0 - see SPEC_FULL.md §13's "asm's -o writes a raw memory
/// dump" note.
fn load_memory(path: &str, config: &Config) -> Memory {
    match fs::read_to_string(path) {
        Ok(source) => match asm::assemble_with_config(&source, config) {
            Ok(mem) => mem,
            Err(e) => {
                eprintln!("{} {}", "assembly error:".red().bold(), e);
                process::exit(1);
            }
        },
        Err(_) => {
            let bytes = tools::read_binary(path).unwrap_or_else(|e| {
                eprintln!("{} {}: {}", "io error:".red().bold(), path, e);
                process::exit(1);
            });
            let mut mem = Memory::new();
            mem.write_bytes(Address::new(0), &bytes);
            mem
        }
    }
}
