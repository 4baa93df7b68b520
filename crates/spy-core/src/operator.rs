//! The closed set of generic operators.
//!
//! Every operator use in a checked program names one [`OpKind`]. Each kind
//! is registered once as a stub in the `operator` module and picks which type
//! hook the resolver consults when no exact primitive matches.

use std::fmt;

/// A generic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    Not,

    // Access
    GetItem,
    SetItem,
    GetAttr,
    SetAttr,
    CallMethod,
}

impl OpKind {
    /// Every operator kind, in registration order.
    pub const ALL: [OpKind; 18] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Div,
        OpKind::Mod,
        OpKind::Neg,
        OpKind::Eq,
        OpKind::Ne,
        OpKind::Lt,
        OpKind::Le,
        OpKind::Gt,
        OpKind::Ge,
        OpKind::Not,
        OpKind::GetItem,
        OpKind::SetItem,
        OpKind::GetAttr,
        OpKind::SetAttr,
        OpKind::CallMethod,
    ];

    /// Surface-syntax symbol used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mul => "*",
            OpKind::Div => "/",
            OpKind::Mod => "%",
            OpKind::Neg => "-",
            OpKind::Eq => "==",
            OpKind::Ne => "!=",
            OpKind::Lt => "<",
            OpKind::Le => "<=",
            OpKind::Gt => ">",
            OpKind::Ge => ">=",
            OpKind::Not => "not",
            OpKind::GetItem => "[]",
            OpKind::SetItem => "[]=",
            OpKind::GetAttr => ".",
            OpKind::SetAttr => ".=",
            OpKind::CallMethod => ".()",
        }
    }

    /// Member name of the stub in the `operator` module.
    pub fn stub_name(self) -> &'static str {
        match self {
            OpKind::Add => "ADD",
            OpKind::Sub => "SUB",
            OpKind::Mul => "MUL",
            OpKind::Div => "DIV",
            OpKind::Mod => "MOD",
            OpKind::Neg => "NEG",
            OpKind::Eq => "EQ",
            OpKind::Ne => "NE",
            OpKind::Lt => "LT",
            OpKind::Le => "LE",
            OpKind::Gt => "GT",
            OpKind::Ge => "GE",
            OpKind::Not => "NOT",
            OpKind::GetItem => "GETITEM",
            OpKind::SetItem => "SETITEM",
            OpKind::GetAttr => "GETATTR",
            OpKind::SetAttr => "SETATTR",
            OpKind::CallMethod => "CALL_METHOD",
        }
    }

    /// Whether the operator takes exactly one operand.
    pub fn is_unary(self) -> bool {
        matches!(self, OpKind::Neg | OpKind::Not)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stub_name())
    }
}
