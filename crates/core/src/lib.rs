//! GEN Core: bytecode, constant pool, and value model.
//!
//! This crate is the binary contract between the compiler and the VM. It
//! owns nothing at runtime by itself — the compiler builds a [`Chunk`] and
//! hands it to the VM, which then owns it exclusively for the rest of the
//! run.
//!
//! # Modules
//!
//! - `error`: shared compile/runtime error type
//! - `value`: the `Value` tagged union and its container handles
//! - `opcode`: the one-byte instruction set
//! - `chunk`: the bytecode buffer, parallel line array, and constant pool

pub mod chunk;
pub mod error;
pub mod opcode;
pub mod value;

pub use chunk::Chunk;
pub use error::GenError;
pub use opcode::OpCode;
pub use value::{EnumData, ObjectData, Value};
