//! `postproc <input.tpu> (-o <out> | -f) [--minify] [--strip-comments]`
//!
//! an explicit pass-through stub: the assembly-text rewriting this implies
//! (minifying, stripping comments) is out of scope per spec.md §1, but the
//! binary still exists in the toolchain's CLI surface and validates its
//! flags, so a pipeline that invokes it unconditionally doesn't break. see
//! SPEC_FULL.md §13.

extern crate clap;
extern crate colored;
extern crate tpu;

use std::fs;
use std::process;

use clap::{App, Arg};
use colored::Colorize;

fn main() {
    let matches = App::new("postproc")
        .version("0.1")
        .about("post-processes a TPU assembly file (pass-through stub)")
        .arg(
            Arg::with_name("INPUT")
                .help("the .tpu file to post-process")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("output path"),
        )
        .arg(
            Arg::with_name("force")
                .short("f")
                .long("force")
                .help("overwrite INPUT in place"),
        )
        .arg(
            Arg::with_name("minify")
                .long("minify")
                .help("not implemented: accepted for CLI compatibility only"),
        )
        .arg(
            Arg::with_name("strip-comments")
                .long("strip-comments")
                .help("not implemented: accepted for CLI compatibility only"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");

    if output.is_none() && !matches.is_present("force") {
        eprintln!(
            "{} pass -o <out> or -f to overwrite in place",
            "usage error:".red().bold()
        );
        process::exit(1);
    }

    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), input, e);
        process::exit(1);
    });

    if matches.is_present("minify") || matches.is_present("strip-comments") {
        eprintln!(
            "{} --minify/--strip-comments are accepted but not implemented; \
             writing the input unchanged",
            "warning:".yellow().bold()
        );
    }

    let dest = output.unwrap_or(input);
    fs::write(dest, source).unwrap_or_else(|e| {
        eprintln!("{} {}: {}", "io error:".red().bold(), dest, e);
        process::exit(1);
    });

    println!("{} {}", "wrote".green().bold(), dest);
}
