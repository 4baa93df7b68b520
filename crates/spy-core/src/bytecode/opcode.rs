//! The closed set of operation kinds.
//!
//! The VM is a stack machine with one slot per local variable. Operands are
//! unsigned integers whose meaning is fixed per opcode.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::InternalError;

/// Operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// Push a constant from the code object's pool.
    /// Operand: constant index
    ConstLoad = 0,
    /// Push the value of a local slot.
    /// Operand: slot index
    LocalGet,
    /// Pop into a local slot.
    /// Operand: slot index
    LocalSet,
    /// Call a function by qualified name.
    /// Operands: callee-table index, argument count
    Call,
    /// Call a resolved operator binding.
    /// Operands: OpImpl-table index, call-site argument count
    CallOpImpl,
    /// Resolve an operator on run-time types, then call it.
    /// Operands: stub id, argument count, mask of arguments that were
    /// compile-time constants at the call site (bit `i` for argument `i`)
    CallDynamic,
    /// Discard the top of stack.
    Pop,
    /// Return the top of stack.
    Return,
    /// Stop with a runtime error.
    /// Operand: constant index of the message
    Abort,
}

impl OpCode {
    /// Every opcode, in encoding order.
    pub const ALL: [OpCode; 9] = [
        OpCode::ConstLoad,
        OpCode::LocalGet,
        OpCode::LocalSet,
        OpCode::Call,
        OpCode::CallOpImpl,
        OpCode::CallDynamic,
        OpCode::Pop,
        OpCode::Return,
        OpCode::Abort,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::ConstLoad => "const_load",
            OpCode::LocalGet => "local_get",
            OpCode::LocalSet => "local_set",
            OpCode::Call => "call",
            OpCode::CallOpImpl => "call_opimpl",
            OpCode::CallDynamic => "call_dynamic",
            OpCode::Pop => "pop",
            OpCode::Return => "return",
            OpCode::Abort => "abort",
        }
    }

    /// Look up an opcode by name. Unknown names are rejected.
    pub fn from_name(name: &str) -> Result<Self, InternalError> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| InternalError::InvalidOpcode(name.to_string()))
    }

    /// Decode from the single-byte encoding.
    pub fn from_u8(byte: u8) -> Result<Self, InternalError> {
        Self::try_from(byte).map_err(|e| InternalError::InvalidOpcode(format!("{:#04x}", e.number)))
    }

    /// Number of operands this opcode takes.
    pub fn arity(self) -> usize {
        match self {
            OpCode::Pop | OpCode::Return => 0,
            OpCode::ConstLoad | OpCode::LocalGet | OpCode::LocalSet | OpCode::Abort => 1,
            OpCode::Call | OpCode::CallOpImpl => 2,
            OpCode::CallDynamic => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_name(op.name()), Ok(op));
        }
    }

    #[test]
    fn invalid_name() {
        let err = OpCode::from_name("xxx").unwrap_err();
        assert_eq!(err.to_string(), "Invalid opcode: xxx");
    }

    #[test]
    fn byte_encoding() {
        assert_eq!(u8::from(OpCode::ConstLoad), 0);
        assert_eq!(OpCode::from_u8(7), Ok(OpCode::Return));
        assert_eq!(
            OpCode::from_u8(200),
            Err(InternalError::InvalidOpcode("0xc8".into()))
        );
    }

    #[test]
    fn arity() {
        assert_eq!(OpCode::Return.arity(), 0);
        assert_eq!(OpCode::ConstLoad.arity(), 1);
        assert_eq!(OpCode::CallOpImpl.arity(), 2);
        assert_eq!(OpCode::CallDynamic.arity(), 3);
    }
}
