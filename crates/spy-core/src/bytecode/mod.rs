//! Operation sequences produced by the code generator.
//!
//! - [`OpCode`]: the closed set of operation kinds
//! - [`Instruction`]: an opcode with validated operands
//! - [`CodeObject`]: one function's instructions and operand tables

mod code_object;
mod instruction;
mod opcode;

pub use code_object::{CodeObject, ConstantPool, LocalSlot};
pub use instruction::Instruction;
pub use opcode::OpCode;
