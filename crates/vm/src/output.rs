//! Where `PRINT`/`ENDL` go: real stdout, or a recorded value stream for the
//! test harness (spec §6). The VM's dispatch loop is written once against
//! the [`Output`] trait object and never knows which sink it has.

use std::io::{self, Write};

use gen_core::Value;

pub trait Output {
    fn print(&mut self, value: &Value);
    fn endl(&mut self);
}

/// Writes straight to stdout. Used by the `genc` binary.
#[derive(Default)]
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn print(&mut self, value: &Value) {
        print!("{}", value);
    }

    fn endl(&mut self) {
        println!();
        let _ = io::stdout().flush();
    }
}

/// Harness mode (spec §6): every printed [`Value`] is appended to an
/// ordered vector instead of reaching stdout. `endl` carries no recorded
/// meaning and is a no-op.
#[derive(Default)]
pub struct CaptureOutput {
    pub recorded: Vec<Value>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        CaptureOutput::default()
    }
}

impl Output for CaptureOutput {
    fn print(&mut self, value: &Value) {
        self.recorded.push(value.clone());
    }

    fn endl(&mut self) {}
}
