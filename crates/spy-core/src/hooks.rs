//! Per-type operator dispatch hooks.
//!
//! A type may attach an [`OperatorHooks`] implementation at registration
//! time. The resolver consults it only when no exact primitive matches the
//! operand types, and only the one method fixed by the operator kind.
//!
//! Every method defaults to `None`, meaning "this type does not implement
//! the hook". Returning `Some(OpImpl::NULL)` is a definite refusal.

use std::fmt;

use crate::opimpl::OpImpl;
use crate::types::TypeLookup;
use crate::value::Constant;
use crate::{AbsVal, OpKind, TypeHash};

/// One call-site argument as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpArg {
    /// Symbolic reference to the argument.
    pub abs: AbsVal,
    /// The argument's value, when known at compile time.
    pub blue: Option<Constant>,
}

impl OpArg {
    /// An argument known only by its static type.
    pub fn red(abs: AbsVal) -> Self {
        Self { abs, blue: None }
    }

    /// An argument whose value is known at compile time.
    pub fn blue(abs: AbsVal, value: Constant) -> Self {
        Self {
            abs,
            blue: Some(value),
        }
    }

    pub fn static_type(&self) -> TypeHash {
        self.abs.static_type
    }
}

/// Everything a hook may inspect.
pub struct HookContext<'a> {
    pub kind: OpKind,
    pub types: &'a dyn TypeLookup,
    pub args: &'a [OpArg],
}

impl<'a> HookContext<'a> {
    /// Static type of argument `index`.
    pub fn arg_type(&self, index: usize) -> Option<TypeHash> {
        self.args.get(index).map(OpArg::static_type)
    }

    /// Compile-time string value of argument `index`, e.g. an attribute name.
    pub fn blue_str(&self, index: usize) -> Option<&'a str> {
        self.args.get(index)?.blue.as_ref()?.as_str()
    }

    /// Symbolic reference to argument `index`.
    pub fn abs(&self, index: usize) -> Option<&'a AbsVal> {
        self.args.get(index).map(|a| &a.abs)
    }
}

/// Operator hooks a type may implement.
pub trait OperatorHooks: Send + Sync {
    /// `obj.attr`: args are `(obj, attr-name)`.
    fn op_getattr(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `obj.attr = value`: args are `(obj, attr-name, value)`.
    fn op_setattr(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `obj.meth(...)`: args are `(obj, method-name, args...)`.
    fn op_call_method(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `obj[index]`.
    fn op_getitem(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `obj[index] = value`.
    fn op_setitem(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `a == b`.
    fn op_eq(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// `a != b`. Never derived from [`OperatorHooks::op_eq`].
    fn op_ne(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// Arithmetic, ordering and unary operators.
    fn op_generic(&self, _cx: &HookContext<'_>) -> Option<OpImpl> {
        None
    }

    /// Name used in debug output.
    fn describe(&self) -> &str {
        "hooks"
    }
}

impl fmt::Debug for dyn OperatorHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<OperatorHooks {}>", self.describe())
    }
}

/// Run the single hook method that `cx.kind` selects.
pub fn dispatch_hook(hooks: &dyn OperatorHooks, cx: &HookContext<'_>) -> Option<OpImpl> {
    match cx.kind {
        OpKind::GetAttr => hooks.op_getattr(cx),
        OpKind::SetAttr => hooks.op_setattr(cx),
        OpKind::CallMethod => hooks.op_call_method(cx),
        OpKind::GetItem => hooks.op_getitem(cx),
        OpKind::SetItem => hooks.op_setitem(cx),
        OpKind::Eq => hooks.op_eq(cx),
        OpKind::Ne => hooks.op_ne(cx),
        OpKind::Add
        | OpKind::Sub
        | OpKind::Mul
        | OpKind::Div
        | OpKind::Mod
        | OpKind::Neg
        | OpKind::Lt
        | OpKind::Le
        | OpKind::Gt
        | OpKind::Ge
        | OpKind::Not => hooks.op_generic(cx),
    }
}
