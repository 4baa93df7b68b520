//! Deterministic hash-based type identity.
//!
//! A [`TypeHash`] is computed from a type's qualified name, so two lookups of
//! the same type always agree and the builtin types can be named by `const`
//! values before anything is registered.
//!
//! # Examples
//!
//! ```
//! use spy_core::{TypeHash, builtins};
//!
//! assert_eq!(TypeHash::from_name("builtins::i32"), builtins::I32);
//! assert_ne!(builtins::I32, builtins::BOOL);
//! ```

use std::fmt;
use xxhash_rust::{const_xxh64, xxh64::xxh64};

/// Domain marker mixed into every type hash.
const TYPE_DOMAIN: u64 = 0x2fac10b63a6cc57c;

/// A deterministic 64-bit identity for a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(TYPE_DOMAIN ^ xxh64(name.as_bytes(), 0))
    }

    /// Compile-time variant of [`TypeHash::from_name`].
    pub const fn from_name_const(name: &str) -> Self {
        TypeHash(TYPE_DOMAIN ^ const_xxh64::xxh64(name.as_bytes(), 0))
    }

    /// Check if this is the empty hash.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Identities of the types every VM starts with.
pub mod builtins {
    use super::TypeHash;

    /// 32-bit signed integer.
    pub const I32: TypeHash = TypeHash::from_name_const("builtins::i32");
    /// Boolean.
    pub const BOOL: TypeHash = TypeHash::from_name_const("builtins::bool");
    /// Immutable text.
    pub const STR: TypeHash = TypeHash::from_name_const("builtins::str");
    /// Absence of a value.
    pub const VOID: TypeHash = TypeHash::from_name_const("builtins::void");
    /// Type known only at run time.
    pub const DYNAMIC: TypeHash = TypeHash::from_name_const("builtins::dynamic");
    /// Symbolic call-site argument.
    pub const ABSVAL: TypeHash = TypeHash::from_name_const("operator::AbsVal");
    /// Untyped byte storage that struct types specialize.
    pub const RAWBUFFER: TypeHash = TypeHash::from_name_const("structs::rawbuffer");
}
