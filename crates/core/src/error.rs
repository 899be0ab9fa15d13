//! Shared compile-time/run-time error type.
//!
//! Both phases fail fast with a single-line diagnostic of the same shape
//! (`<Phase> Error (line N): <message>`), so one enum covers both instead of
//! two separate error hierarchies that callers would have to unify anyway.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GenError {
    Compile { line: i32, message: String },
    Runtime { line: i32, message: String },
}

impl GenError {
    pub fn compile(line: i32, message: impl Into<String>) -> Self {
        GenError::Compile {
            line,
            message: message.into(),
        }
    }

    pub fn runtime(line: i32, message: impl Into<String>) -> Self {
        GenError::Runtime {
            line,
            message: message.into(),
        }
    }

    pub fn line(&self) -> i32 {
        match self {
            GenError::Compile { line, .. } | GenError::Runtime { line, .. } => *line,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GenError::Compile { message, .. } | GenError::Runtime { message, .. } => message,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            GenError::Compile { .. } => "Compile",
            GenError::Runtime { .. } => "Runtime",
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Error (line {}): {}",
            self.phase(),
            self.line(),
            self.message()
        )
    }
}

impl std::error::Error for GenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_compile_error() {
        let e = GenError::compile(3, "unexpected character '@'");
        assert_eq!(
            e.to_string(),
            "Compile Error (line 3): unexpected character '@'"
        );
    }

    #[test]
    fn formats_runtime_error() {
        let e = GenError::runtime(12, "division by zero");
        assert_eq!(e.to_string(), "Runtime Error (line 12): division by zero");
    }
}
