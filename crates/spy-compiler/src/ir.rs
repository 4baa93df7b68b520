//! Typed function bodies produced by the checker and consumed by codegen.
//!
//! Every expression carries its static type and, when known at compile time,
//! its constant value. Operator uses already hold their resolved [`OpImpl`].

use spy_core::bytecode::LocalSlot;
use spy_core::{Color, Constant, FuncType, OpImpl, OpKind, QualifiedName, Span, TypeHash};
use spy_registry::StubId;

/// A checked expression.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    /// Static type.
    pub ty: TypeHash,
    /// Value, when known at compile time.
    pub blue: Option<Constant>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypedExprKind {
    Const(Constant),
    Local(u32),
    /// Operator use bound at compile time. `args` are the call-site
    /// arguments, before the plan is applied.
    OpCall { opimpl: OpImpl, args: Vec<TypedExpr> },
    /// Operator use with a `dynamic` operand, resolved when it runs.
    DynOp {
        kind: OpKind,
        stub: StubId,
        args: Vec<TypedExpr>,
    },
    /// Call of a named function.
    Call {
        callee: QualifiedName,
        args: Vec<TypedExpr>,
    },
}

impl TypedExpr {
    /// A compile-time constant.
    pub fn constant(value: Constant, span: Span) -> Self {
        Self {
            ty: value.static_type(),
            kind: TypedExprKind::Const(value.clone()),
            blue: Some(value),
            span,
        }
    }

    pub fn local(slot: u32, ty: TypeHash, span: Span) -> Self {
        Self {
            kind: TypedExprKind::Local(slot),
            ty,
            blue: None,
            span,
        }
    }

    pub fn is_blue(&self) -> bool {
        self.blue.is_some()
    }
}

/// A checked statement.
#[derive(Debug, Clone)]
pub enum TypedStmt {
    /// Evaluate `value` and store it into `slot`.
    Store { slot: u32, value: TypedExpr, span: Span },
    Return { value: TypedExpr, span: Span },
    /// Evaluate and discard.
    Expr { value: TypedExpr, span: Span },
}

impl TypedStmt {
    pub fn is_return(&self) -> bool {
        matches!(self, TypedStmt::Return { .. })
    }
}

/// A checked function, ready for code generation.
#[derive(Debug, Clone)]
pub struct TypedFunction {
    pub qn: QualifiedName,
    pub functype: FuncType,
    pub color: Color,
    pub locals: Vec<LocalSlot>,
    pub param_count: usize,
    pub body: Vec<TypedStmt>,
    pub span: Span,
}

impl TypedFunction {
    /// Whether control can reach the end of the body.
    pub fn falls_through(&self) -> bool {
        !self.body.last().is_some_and(TypedStmt::is_return)
    }
}
