//! Runtime values and compile-time constants.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AbsVal, TypeHash, builtins};

// ============================================================================
// Runtime values
// ============================================================================

/// A value on the VM stack or in a local slot.
#[derive(Clone)]
pub enum Value {
    Void,
    I32(i32),
    Bool(bool),
    Str(Arc<str>),
    Buffer(Buffer),
    AbsVal(AbsVal),
}

impl Value {
    /// The type of this value as observed at run time.
    pub fn dynamic_type(&self) -> TypeHash {
        match self {
            Value::Void => builtins::VOID,
            Value::I32(_) => builtins::I32,
            Value::Bool(_) => builtins::BOOL,
            Value::Str(_) => builtins::STR,
            Value::Buffer(buf) => buf.ty,
            Value::AbsVal(_) => builtins::ABSVAL,
        }
    }

    /// Short name of the value's category for runtime diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "None",
            Value::I32(_) => "i32",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Buffer(_) => "rawbuffer",
            Value::AbsVal(_) => "AbsVal",
        }
    }

    /// Convert to a constant when the value has a constant representation.
    pub fn to_constant(&self) -> Option<Constant> {
        match self {
            Value::Void => Some(Constant::Void),
            Value::I32(v) => Some(Constant::I32(*v)),
            Value::Bool(v) => Some(Constant::Bool(*v)),
            Value::Str(s) => Some(Constant::Str(s.clone())),
            Value::Buffer(_) | Value::AbsVal(_) => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        match c {
            Constant::Void => Value::Void,
            Constant::I32(v) => Value::I32(v),
            Constant::Bool(v) => Value::Bool(v),
            Constant::Str(s) => Value::Str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a.ptr_eq(b),
            (Value::AbsVal(a), Value::AbsVal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "None"),
            Value::I32(v) => write!(f, "{v}"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Buffer(buf) => write!(f, "<buffer {:?} ({} bytes)>", buf.ty, buf.len()),
            Value::AbsVal(v) => write!(f, "{v:?}"),
        }
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Shared, mutable byte storage tagged with the type that owns its layout.
///
/// Clones alias the same bytes, so a field written through one handle is
/// visible through every other.
#[derive(Clone)]
pub struct Buffer {
    pub ty: TypeHash,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Buffer {
    /// Allocate `size` zeroed bytes.
    pub fn zeroed(ty: TypeHash, size: usize) -> Self {
        Self {
            ty,
            bytes: Arc::new(Mutex::new(vec![0; size])),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `N` bytes starting at `offset`.
    pub fn read<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let bytes = self.bytes.lock();
        let slice = bytes.get(offset..offset.checked_add(N)?)?;
        slice.try_into().ok()
    }

    /// Overwrite bytes starting at `offset`. Returns `false` when out of range.
    pub fn write(&self, offset: usize, data: &[u8]) -> bool {
        let mut bytes = self.bytes.lock();
        let Some(end) = offset.checked_add(data.len()) else {
            return false;
        };
        match bytes.get_mut(offset..end) {
            Some(dst) => {
                dst.copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the whole contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Whether both handles alias the same storage.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

// ============================================================================
// Constants
// ============================================================================

/// A value known at compile time.
///
/// Constants fill code-object constant pools and form the compile-time
/// part of OpImpl cache keys, so they are hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Void,
    I32(i32),
    Bool(bool),
    Str(Arc<str>),
}

impl Constant {
    /// Static type of the constant.
    pub fn static_type(&self) -> TypeHash {
        match self {
            Constant::Void => builtins::VOID,
            Constant::I32(_) => builtins::I32,
            Constant::Bool(_) => builtins::BOOL,
            Constant::Str(_) => builtins::STR,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::Str(Arc::from(s))
    }
}
