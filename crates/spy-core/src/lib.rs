//! Shared building blocks for the SPy compiler and VM.
//!
//! This crate holds everything the other crates agree on:
//!
//! - Type identity and descriptors ([`TypeHash`], [`TypeDef`], [`compatible`])
//! - Qualified names and source spans
//! - Runtime values and compile-time constants
//! - Functions, native callables and the [`Caller`] seam
//! - Operator kinds, [`OpImpl`] results and per-type [`OperatorHooks`]
//! - The operation set in [`bytecode`]
//! - The error hierarchy

pub mod abs_val;
pub mod bytecode;
pub mod error;
pub mod function;
pub mod hooks;
pub mod native_fn;
pub mod opimpl;
pub mod operator;
pub mod qualified_name;
pub mod span;
pub mod type_hash;
pub mod types;
pub mod value;

pub use abs_val::AbsVal;
pub use error::{
    Annotation, CompilationError, CompileErrors, InternalError, Level, MismatchReason,
    RegistrationError, RuntimeError, SpyError,
};
pub use function::{Caller, Color, FuncRef, Function, FunctionBody};
pub use hooks::{HookContext, OpArg, OperatorHooks, dispatch_hook};
pub use native_fn::{CallContext, FromValue, NativeCallable, NativeFn};
pub use opimpl::OpImpl;
pub use operator::OpKind;
pub use qualified_name::QualifiedName;
pub use span::Span;
pub use type_hash::{TypeHash, builtins};
pub use types::{FuncType, TypeDef, TypeKind, TypeLookup, compatible};
pub use value::{Buffer, Constant, Value};
