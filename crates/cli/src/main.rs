//! `genc` — the GEN language CLI.
//!
//! Reads a source file, compiles it, and runs it to stdout. Everything in
//! this binary is "glue": file loading, ANSI-coloured diagnostics,
//! bytecode-dump printing, and wall-clock timing are all explicitly listed
//! as external collaborators in spec §1 — the core compile-and-execute
//! pipeline lives in `gen-compiler` and `gen-vm`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;

/// Exit code for a usage error (spec §6).
const EXIT_USAGE: u8 = 64;
/// Exit code for a source file that could not be read (spec §6).
const EXIT_NO_INPUT: u8 = 74;
/// Exit code for a compile-time or run-time error (spec §6).
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "genc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run a GEN source file", long_about = None)]
struct Cli {
    /// GEN source file to compile and run
    source: PathBuf,

    /// Print the compiled bytecode instead of (as well as) running it
    #[arg(long)]
    dump: bool,

    /// Print compile + run wall-clock timing to stderr
    #[arg(long)]
    time: bool,

    /// Disable ANSI colour in diagnostics
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if cli.no_color {
        colored::control::set_override(false);
    }

    let source = match std::fs::read_to_string(&cli.source) {
        Ok(source) => source,
        Err(err) => {
            eprintln!(
                "{} {}: {}",
                "Error".red().bold(),
                cli.source.display(),
                err
            );
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    let compile_start = Instant::now();
    let chunk = match gen_compiler::compile(&source) {
        Ok(chunk) => chunk,
        Err(err) => {
            print_error(&err);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let compile_elapsed = compile_start.elapsed();

    if cli.dump {
        print!("{}", chunk.disassemble());
    }

    let run_start = Instant::now();
    let result = gen_vm::run(chunk);
    let run_elapsed = run_start.elapsed();

    if cli.time {
        eprintln!(
            "compile: {:?}, run: {:?}, total: {:?}",
            compile_elapsed,
            run_elapsed,
            compile_elapsed + run_elapsed
        );
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn print_error(err: &gen_core::GenError) {
    eprintln!(
        "{} {}",
        format!("{} Error (line {}):", err.phase(), err.line()).red().bold(),
        err.message()
    );
}
