//! # spy
//!
//! Type-directed operator dispatch, type checking and code generation for
//! the SPy language, plus a small VM to run the result.
//!
//! ## Crates
//!
//! - [`spy_core`]: types, values, functions, `OpImpl`, operations, errors
//! - [`spy_ast`]: the syntax tree the compiler consumes
//! - [`spy_registry`]: operator stubs, primitives, hooks and resolution
//! - [`spy_compiler`]: type checker and code generator
//! - [`spy_modules`]: the `builtins`, `operator` and `structs` modules
//!
//! ## Quick Start
//!
//! ```ignore
//! use spy::prelude::*;
//!
//! let mut vm = SpyVm::new(VmConfig::default())?;
//! vm.compile_module(&source)?;
//! assert_eq!(vm.call("test::add", vec![1.into(), 2.into()])?, Value::I32(3));
//! ```

pub mod config;
pub mod vm;

pub use config::VmConfig;
pub use vm::SpyVm;

pub use spy_ast as ast;
pub use spy_compiler::{CompileOptions, MISSING_RETURN, Module, ModuleGen};
pub use spy_core::{
    AbsVal, Buffer, Color, CompilationError, CompileErrors, Constant, FuncType, Function, InternalError,
    OpImpl, OpKind, QualifiedName, RegistrationError, RuntimeError, Span, SpyError, TypeHash,
    Value, builtins,
};
pub use spy_modules::{StructBuilder, StructLayout};
pub use spy_registry::{OperatorRegistry, RegistryBuilder, StubId};

/// Everything needed to compile and run a module.
pub mod prelude {
    pub use crate::ast;
    pub use crate::config::VmConfig;
    pub use crate::vm::SpyVm;
    pub use spy_core::builtins::{BOOL, DYNAMIC, I32, STR, VOID};
    pub use spy_core::{QualifiedName, SpyError, Value};
    pub use spy_modules::StructBuilder;
}
