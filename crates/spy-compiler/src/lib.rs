//! SPy type checker and code generator.
//!
//! ## Architecture
//!
//! - **Pass 1 (Signatures)**: resolve every function type of a module
//! - **Pass 2 (Bodies)**: type check each body, resolving every operator use
//!   to an `OpImpl`, then lower it to a code object
//!
//! ## Modules
//!
//! - [`scope`]: locals, frame slots and the `@return` binding
//! - [`type_resolver`]: annotations to registered types
//! - [`checker`]: per-function type checking
//! - [`ir`]: the typed tree between checking and code generation
//! - [`codegen`]: lowering to operation sequences
//! - [`module`]: the two-pass module builder

mod blue;
pub mod checker;
pub mod codegen;
pub mod ir;
pub mod module;
pub mod scope;
pub mod type_resolver;

pub use blue::BlueEvaluator;
pub use checker::{FunctionChecker, Signature};
pub use codegen::{CodeGen, MISSING_RETURN};
pub use module::{Module, ModuleGen};
pub use scope::{LocalScope, LocalVar};
pub use type_resolver::TypeResolver;

/// Knobs the module builder honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Evaluate calls to blue functions while compiling.
    pub fold_blue_calls: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fold_blue_calls: true,
        }
    }
}
