//! Callable functions: native primitives and compiled code objects.

use std::fmt;
use std::sync::Arc;

use crate::bytecode::CodeObject;
use crate::error::SpyError;
use crate::native_fn::{CallContext, NativeFn};
use crate::types::FuncType;
use crate::value::Value;
use crate::{QualifiedName, RuntimeError};

/// When a function runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Executed at run time only.
    #[default]
    Red,
    /// Executed at compile time; results become constants.
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Red => "red",
            Color::Blue => "blue",
        })
    }
}

/// How a function is implemented.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Native(NativeFn),
    Script(Arc<CodeObject>),
}

/// A function with a resolved static type.
#[derive(Debug, Clone)]
pub struct Function {
    pub qn: QualifiedName,
    pub functype: FuncType,
    pub color: Color,
    pub body: FunctionBody,
}

/// Shared handle to a function.
pub type FuncRef = Arc<Function>;

impl Function {
    /// Create a red native function.
    pub fn native<F>(qn: QualifiedName, functype: FuncType, f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            qn,
            functype,
            color: Color::Red,
            body: FunctionBody::Native(NativeFn::new(f)),
        }
    }

    /// Create a function backed by compiled code.
    pub fn script(qn: QualifiedName, functype: FuncType, color: Color, code: CodeObject) -> Self {
        Self {
            qn,
            functype,
            color,
            body: FunctionBody::Script(Arc::new(code)),
        }
    }

    pub fn is_blue(&self) -> bool {
        self.color == Color::Blue
    }

    /// The compiled code, when this is not a native function.
    pub fn code(&self) -> Option<&CodeObject> {
        match &self.body {
            FunctionBody::Script(code) => Some(code),
            FunctionBody::Native(_) => None,
        }
    }
}

/// Anything able to execute a function: the VM interpreter, or a test double.
pub trait Caller {
    fn call_function(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, SpyError>;
}
