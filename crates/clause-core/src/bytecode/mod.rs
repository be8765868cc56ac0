//! Bytecode vocabulary shared by the compiler and the VM.
//!
//! A [`Program`] is a flat stream of `u32` words (opcodes, some followed by
//! one inline constant-pool index) plus the constant pool itself.

/// Opcode table (numbering, mnemonics, operand arity).
pub mod opcode;
/// Tagged runtime values.
pub mod value;
/// Compiled program container and instruction decoding.
pub mod program;
pub mod helpers;
pub mod disasm;

pub use opcode::Opcode;
pub use program::{Instruction, Instructions, Program};
pub use value::{Scope, Value, ValueKind};
