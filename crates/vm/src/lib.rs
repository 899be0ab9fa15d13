//! GEN Virtual Machine: the stack-based interpreter that owns a compiled
//! [`gen_core::Chunk`] for the length of one run.
//!
//! # Modules
//!
//! - `vm`: the dispatch loop, value stack, call frames, and global tables
//! - `output`: the `Output` sink trait — real stdout vs. harness-mode
//!   recording (spec §6)

mod output;
mod vm;

pub use output::{CaptureOutput, Output, StdoutOutput};
pub use vm::Vm;

use gen_core::{Chunk, GenError, Value};

/// Runs `chunk` to stdout. Convenience wrapper around [`Vm::run`] for the
/// common case.
pub fn run(chunk: Chunk) -> Result<(), GenError> {
    let mut output = StdoutOutput;
    Vm::new(chunk, &mut output).run()
}

/// Runs `chunk` in harness mode (spec §6): returns the ordered sequence of
/// printed values instead of writing to stdout.
pub fn run_with_capture(chunk: Chunk) -> Result<Vec<Value>, GenError> {
    let mut output = CaptureOutput::new();
    Vm::new(chunk, &mut output).run()?;
    Ok(output.recorded)
}
