//! Type descriptors and the compatibility rule.
//!
//! A [`TypeDef`] is created once when a module registers it and is never
//! mutated afterwards. Identity is the [`TypeHash`] of its qualified name,
//! never structural equality: two struct types with identical layouts are
//! still distinct types.

use std::fmt;

use crate::{QualifiedName, TypeHash, builtins};

// ============================================================================
// Descriptors
// ============================================================================

/// What category of value a type describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Scalar value built into the VM (`i32`, `bool`, `str`, `void`).
    Primitive,
    /// The `dynamic` type: checked only at run time.
    Dynamic,
    /// Type contributed by a registration module.
    User,
}

/// A registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Qualified name, e.g. `builtins::i32`.
    pub qn: QualifiedName,
    /// Identity computed from `qn`.
    pub hash: TypeHash,
    /// Value category.
    pub kind: TypeKind,
    /// The type this one is declared a typedef of, if any.
    pub typedef_of: Option<TypeHash>,
}

impl TypeDef {
    /// Create a descriptor whose identity is derived from `qn`.
    pub fn new(qn: QualifiedName, kind: TypeKind) -> Self {
        let hash = qn.type_hash();
        Self {
            qn,
            hash,
            kind,
            typedef_of: None,
        }
    }

    /// Declare this type a typedef of `base`.
    pub fn with_typedef_of(mut self, base: TypeHash) -> Self {
        self.typedef_of = Some(base);
        self
    }

    /// Human-readable name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.qn.name
    }
}

/// A function type: ordered parameter types and one return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    pub params: Vec<TypeHash>,
    pub restype: TypeHash,
}

impl FuncType {
    pub fn new(params: impl Into<Vec<TypeHash>>, restype: TypeHash) -> Self {
        Self {
            params: params.into(),
            restype,
        }
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Render as `def(i32, i32) -> i32` using the names known to `types`.
    pub fn display<'a, L: TypeLookup + ?Sized>(&'a self, types: &'a L) -> impl fmt::Display + 'a {
        DisplayFuncType { func: self, types }
    }
}

struct DisplayFuncType<'a, L: ?Sized> {
    func: &'a FuncType,
    types: &'a L,
}

impl<L: TypeLookup + ?Sized> fmt::Display for DisplayFuncType<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def(")?;
        for (i, p) in self.func.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.types.type_name(*p))?;
        }
        write!(f, ") -> {}", self.types.type_name(self.func.restype))
    }
}

// ============================================================================
// Lookup and compatibility
// ============================================================================

/// Read access to registered type descriptors.
pub trait TypeLookup {
    /// Find the descriptor for `hash`.
    fn type_def(&self, hash: TypeHash) -> Option<&TypeDef>;

    /// Name of a type for diagnostics, falling back to the raw hash.
    fn type_name(&self, hash: TypeHash) -> String {
        match self.type_def(hash) {
            Some(def) => def.name().to_string(),
            None => hash.to_string(),
        }
    }
}

/// Whether a value of type `value` may be stored where `declared` is expected.
///
/// Identical types are compatible. `dynamic` is compatible in both
/// directions. Otherwise `declared` must appear on `value`'s typedef chain.
pub fn compatible<L: TypeLookup + ?Sized>(types: &L, value: TypeHash, declared: TypeHash) -> bool {
    if value == declared || value == builtins::DYNAMIC || declared == builtins::DYNAMIC {
        return true;
    }
    let mut current = types.type_def(value).and_then(|def| def.typedef_of);
    while let Some(base) = current {
        if base == declared {
            return true;
        }
        current = types.type_def(base).and_then(|def| def.typedef_of);
    }
    false
}
