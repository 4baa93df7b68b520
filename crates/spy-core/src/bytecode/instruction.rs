//! Validated instructions and their byte encoding.

use std::fmt;

use super::OpCode;
use crate::Span;
use crate::error::InternalError;

/// One operation with its operands.
///
/// Construction checks the operand count against [`OpCode::arity`], so a
/// well-formed code object never holds a malformed instruction.
#[derive(Clone, PartialEq, Eq)]
pub struct Instruction {
    op: OpCode,
    operands: Vec<u32>,
    span: Span,
}

impl Instruction {
    /// Build an instruction, rejecting the wrong operand count.
    pub fn new(op: OpCode, operands: impl Into<Vec<u32>>) -> Result<Self, InternalError> {
        let operands = operands.into();
        if operands.len() != op.arity() {
            return Err(InternalError::OperandShape {
                op: op.name(),
                expected: op.arity(),
                got: operands.len(),
            });
        }
        Ok(Self {
            op,
            operands,
            span: Span::default(),
        })
    }

    /// Build an instruction from an opcode name.
    pub fn parse(name: &str, operands: impl Into<Vec<u32>>) -> Result<Self, InternalError> {
        Self::new(OpCode::from_name(name)?, operands)
    }

    /// Attach the source location the instruction was generated from.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn op(&self) -> OpCode {
        self.op
    }

    pub fn operands(&self) -> &[u32] {
        &self.operands
    }

    /// Operand `i`; arity was validated at construction.
    pub fn operand(&self, i: usize) -> u32 {
        self.operands.get(i).copied().unwrap_or_default()
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Append the byte encoding: opcode byte, then each operand as LE `u32`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.op.into());
        for operand in &self.operands {
            out.extend_from_slice(&operand.to_le_bytes());
        }
    }

    /// Decode one instruction, returning it and the bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), InternalError> {
        let (&first, rest) = bytes
            .split_first()
            .ok_or_else(|| InternalError::InvalidOpcode("<end of stream>".into()))?;
        let op = OpCode::from_u8(first)?;
        let mut operands = Vec::with_capacity(op.arity());
        for chunk in rest.chunks_exact(4).take(op.arity()) {
            let mut word = [0u8; 4];
            word.copy_from_slice(chunk);
            operands.push(u32::from_le_bytes(word));
        }
        let consumed = 1 + 4 * operands.len();
        Ok((Self::new(op, operands)?, consumed))
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "<OpCode {}>", self.op.name())
        } else {
            write!(f, "<OpCode {} {:?}>", self.op.name(), self.operands)
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op.name())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_repr() {
        let ret = Instruction::parse("return", vec![]).unwrap();
        assert_eq!(format!("{ret:?}"), "<OpCode return>");
        let call = Instruction::parse("call_opimpl", vec![1, 2]).unwrap();
        assert_eq!(format!("{call:?}"), "<OpCode call_opimpl [1, 2]>");
        assert_eq!(call.to_string(), "call_opimpl 1 2");
    }

    #[test]
    fn invalid_name_rejected_eagerly() {
        assert_eq!(
            Instruction::parse("xxx", vec![]).unwrap_err(),
            InternalError::InvalidOpcode("xxx".into())
        );
    }

    #[test]
    fn wrong_operand_count_rejected() {
        assert_eq!(
            Instruction::new(OpCode::ConstLoad, vec![1, 2, 3, 4]).unwrap_err(),
            InternalError::OperandShape {
                op: "const_load",
                expected: 1,
                got: 4,
            }
        );
        assert!(Instruction::new(OpCode::Return, vec![0]).is_err());
    }

    #[test]
    fn encode_then_decode_stream() {
        let code = [
            Instruction::new(OpCode::LocalGet, vec![0]).unwrap(),
            Instruction::new(OpCode::LocalGet, vec![1]).unwrap(),
            Instruction::new(OpCode::CallOpImpl, vec![0, 2]).unwrap(),
            Instruction::new(OpCode::Return, vec![]).unwrap(),
        ];
        let mut bytes = Vec::new();
        for ins in &code {
            ins.encode(&mut bytes);
        }
        assert_eq!(bytes.len(), 5 + 5 + 9 + 1);

        let mut offset = 0;
        let mut decoded = Vec::new();
        while offset < bytes.len() {
            let (ins, used) = Instruction::decode(&bytes[offset..]).unwrap();
            decoded.push(ins);
            offset += used;
        }
        assert_eq!(decoded, code);
    }

    #[test]
    fn truncated_operands_are_a_shape_error() {
        let bytes = [u8::from(OpCode::Call), 1, 0, 0, 0];
        assert!(matches!(
            Instruction::decode(&bytes),
            Err(InternalError::OperandShape { expected: 2, got: 1, .. })
        ));
    }
}
