//! Syntax tree consumed by the SPy type checker.
//!
//! The tree arrives from an external parser that has already rejected
//! variadic parameters, default arguments, positional/keyword-only markers
//! and unknown decorators. Node kinds are closed enums so the checker and
//! code generator match them exhaustively.
//!
//! Nodes can be built directly, which is how tests construct programs:
//!
//! ```
//! use spy_ast::{Expr, FuncDef, Param, Stmt, TypeExpr};
//!
//! // def add(x: i32, y: i32) -> i32:
//! //     return x + y
//! let add = FuncDef::new("add")
//!     .param(Param::typed("x", "i32"))
//!     .param(Param::typed("y", "i32"))
//!     .returns(TypeExpr::named("i32"))
//!     .body(vec![Stmt::ret(Expr::add(Expr::name("x"), Expr::name("y")))]);
//! assert_eq!(add.params.len(), 2);
//! ```

use spy_core::{Color, Span};

// ============================================================================
// Module and declarations
// ============================================================================

/// A parsed source module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub decls: Vec<Decl>,
}

impl Module {
    pub fn new(name: impl Into<String>, decls: Vec<Decl>) -> Self {
        Self {
            name: name.into(),
            decls,
        }
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    FuncDef(FuncDef),
    /// Module-level variable; parsed but not supported by the compiler.
    GlobalVarDef(VarDef),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::FuncDef(f) => f.span,
            Decl::GlobalVarDef(v) => v.span,
        }
    }

    /// Short description used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Decl::FuncDef(_) => "function definition",
            Decl::GlobalVarDef(_) => "global variable",
        }
    }
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    /// Type name, either a builtin (`i32`) or qualified (`geom::Point`).
    pub name: String,
    pub span: Span,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// One function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Omitted only on blue functions, where it defaults to `dynamic`.
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

impl Param {
    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(TypeExpr::named(ty)),
            span: Span::default(),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// `def name(params) -> return_type: body`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub color: Color,
    pub params: Vec<Param>,
    /// `None` means `-> None` for red functions and `dynamic` for blue ones.
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl FuncDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Color::Red,
            params: Vec::new(),
            return_type: None,
            body: Vec::new(),
            span: Span::default(),
        }
    }

    /// Mark as `@blue`.
    pub fn blue(mut self) -> Self {
        self.color = Color::Blue;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, ty: TypeExpr) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn into_decl(self) -> Decl {
        Decl::FuncDef(self)
    }
}

// ============================================================================
// Statements
// ============================================================================

/// `name: type = value`, with either part optional.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
    pub span: Span,
}

/// A statement with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local declaration.
    VarDef(VarDef),
    /// `name = value`; declares `name` when it is not yet a local.
    Assign { target: String, value: Expr },
    /// `target.attr = value`
    SetAttr {
        target: Expr,
        attr: String,
        value: Expr,
    },
    /// `target[index] = value`
    SetItem {
        target: Expr,
        index: Expr,
        value: Expr,
    },
    /// `return value`; a bare `return` returns `None`.
    Return(Option<Expr>),
    /// Expression evaluated for its side effects.
    Expr(Expr),
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// `name: ty = value`
    pub fn var(name: impl Into<String>, ty: TypeExpr, value: Option<Expr>) -> Self {
        Self::new(StmtKind::VarDef(VarDef {
            name: name.into(),
            ty: Some(ty),
            value,
            span: Span::default(),
        }))
    }

    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            target: target.into(),
            value,
        })
    }

    pub fn set_attr(target: Expr, attr: impl Into<String>, value: Expr) -> Self {
        Self::new(StmtKind::SetAttr {
            target,
            attr: attr.into(),
            value,
        })
    }

    pub fn set_item(target: Expr, index: Expr, value: Expr) -> Self {
        Self::new(StmtKind::SetItem {
            target,
            index,
            value,
        })
    }

    pub fn ret(value: Expr) -> Self {
        Self::new(StmtKind::Return(Some(value)))
    }

    pub fn ret_none() -> Self {
        Self::new(StmtKind::Return(None))
    }

    pub fn expr(value: Expr) -> Self {
        Self::new(StmtKind::Expr(value))
    }

    /// Whether control never continues past this statement.
    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return(_))
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// An expression with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Constant(Literal),
    BinOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    GetItem {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    GetAttr {
        value: Box<Expr>,
        attr: String,
    },
    /// Call of a module function, a builtin, or a qualified name.
    Call {
        func: String,
        args: Vec<Expr>,
    },
    CallMethod {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Name(name.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Constant(Literal::Int(value)))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Constant(Literal::Bool(value)))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Constant(Literal::Str(value.into())))
    }

    pub fn none() -> Self {
        Self::new(ExprKind::Constant(Literal::None))
    }

    pub fn binop(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binop(BinaryOp::Add, left, right)
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn getitem(value: Expr, index: Expr) -> Self {
        Self::new(ExprKind::GetItem {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    pub fn getattr(value: Expr, attr: impl Into<String>) -> Self {
        Self::new(ExprKind::GetAttr {
            value: Box::new(value),
            attr: attr.into(),
        })
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            func: func.into(),
            args,
        })
    }

    pub fn call_method(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::CallMethod {
            target: Box::new(target),
            method: method.into(),
            args,
        })
    }
}
