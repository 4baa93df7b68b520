//! Native function storage and the argument accessor they receive.

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::value::{Buffer, Value};
use crate::AbsVal;

/// Type-erased native function.
///
/// Wraps any callable implementing [`NativeCallable`] so primitives, builtin
/// functions and hook-synthesized implementations are stored uniformly.
/// Clones share the same callable.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Wrap a callable that is not a closure.
    pub fn from_callable<C>(callable: C) -> Self
    where
        C: NativeCallable + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callable),
        }
    }

    /// Call this native function with already-selected arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        self.inner.call(&CallContext::new(args))
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Trait for callable native functions.
pub trait NativeCallable {
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, RuntimeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError>,
{
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, RuntimeError> {
        (self)(ctx)
    }
}

// ============================================================================
// Call context
// ============================================================================

/// Read access to the arguments of one native call.
pub struct CallContext<'a> {
    args: &'a [Value],
}

impl<'a> CallContext<'a> {
    pub fn new(args: &'a [Value]) -> Self {
        Self { args }
    }

    /// Number of arguments passed.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Raw access to one argument.
    pub fn arg_value(&self, index: usize) -> Result<&'a Value, RuntimeError> {
        self.args.get(index).ok_or(RuntimeError::ArgumentCount {
            name: "native function".into(),
            expected: index + 1,
            got: self.args.len(),
        })
    }

    /// Typed access to one argument.
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, RuntimeError> {
        let value = self.arg_value(index)?;
        T::from_value(value).ok_or_else(|| RuntimeError::TypeError {
            expected: T::TYPE_NAME.to_string(),
            got: value.kind_name().to_string(),
        })
    }
}

/// Conversion from a VM value into a native argument.
pub trait FromValue: Sized {
    const TYPE_NAME: &'static str;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "i32";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for Arc<str> {
    const TYPE_NAME: &'static str = "str";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Buffer {
    const TYPE_NAME: &'static str = "rawbuffer";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Buffer(buf) => Some(buf.clone()),
            _ => None,
        }
    }
}

impl FromValue for AbsVal {
    const TYPE_NAME: &'static str = "AbsVal";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::AbsVal(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "dynamic";
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
