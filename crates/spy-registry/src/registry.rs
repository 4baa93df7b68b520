//! OperatorRegistry - the frozen operator and type tables.
//!
//! # Storage Model
//!
//! - **Types**: descriptors by `TypeHash`, plus optional per-type hooks
//! - **Stubs**: generic operator identities, indexed by [`StubId`]
//! - **Primitives**: concrete functions keyed by `(stub, operand types)`
//! - **Functions**: builtin module functions by qualified name
//! - **Cache**: memoized resolution results (see [`crate::cache`])
//!
//! # Thread Safety
//!
//! All tables are immutable once built, so the registry is `Send + Sync` and
//! is shared behind an `Arc` by every compilation. The resolution cache is the
//! only interior mutability and sits behind a `parking_lot::RwLock`.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = RegistryBuilder::new();
//! spy_modules::register_all(&mut builder)?;
//! let registry = builder.finish();
//!
//! let add = registry.operator(OpKind::Add)?;
//! let op = registry.resolve(add, &[builtins::I32, builtins::I32], &args);
//! assert_eq!(op.restype(), Some(builtins::I32));
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spy_core::{
    FuncRef, InternalError, OpKind, OperatorHooks, QualifiedName, TypeDef, TypeHash, TypeLookup,
    compatible,
};

use crate::builder::EntityKind;
use crate::cache::OpImplCache;
use crate::{RegistryBuilder, Stub, StubId};

/// The read-only registry all compilations share.
pub struct OperatorRegistry {
    types: FxHashMap<TypeHash, TypeDef>,
    names: FxHashMap<QualifiedName, EntityKind>,
    stubs: Vec<Stub>,
    operators: FxHashMap<OpKind, StubId>,
    primitives: FxHashMap<(StubId, Vec<TypeHash>), FuncRef>,
    hooks: FxHashMap<TypeHash, Arc<dyn OperatorHooks>>,
    functions: FxHashMap<QualifiedName, FuncRef>,
    pub(crate) cache: OpImplCache,
    pub(crate) cache_enabled: bool,
}

impl OperatorRegistry {
    pub(crate) fn from_builder(b: RegistryBuilder) -> Self {
        Self {
            types: b.types,
            names: b.names,
            stubs: b.stubs,
            operators: b.operators,
            primitives: b.primitives,
            hooks: b.hooks,
            functions: b.functions,
            cache: OpImplCache::new(),
            cache_enabled: !b.cache_disabled,
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Descriptor of `hash`, or an internal error when none was registered.
    pub fn expect_type(&self, hash: TypeHash) -> Result<&TypeDef, InternalError> {
        self.types
            .get(&hash)
            .ok_or_else(|| InternalError::MissingTypeRepr(hash.to_string()))
    }

    /// Resolve a type annotation.
    ///
    /// Qualified names (`geom::Point`) are looked up as written; bare names
    /// (`i32`) are looked up in the `builtins` module.
    pub fn type_by_name(&self, name: &str) -> Option<TypeHash> {
        let mut qn = QualifiedName::from_qualified_string(name);
        if !qn.is_qualified() {
            qn = QualifiedName::new("builtins", qn.name);
        }
        let hash = qn.type_hash();
        self.types.contains_key(&hash).then_some(hash)
    }

    /// Whether a value of type `value` may be used where `declared` is expected.
    pub fn compatible(&self, value: TypeHash, declared: TypeHash) -> bool {
        compatible(self, value, declared)
    }

    /// Hooks attached to `ty`.
    pub fn hooks(&self, ty: TypeHash) -> Option<&Arc<dyn OperatorHooks>> {
        self.hooks.get(&ty)
    }

    // ==========================================================================
    // Stubs and primitives
    // ==========================================================================

    pub fn stub(&self, id: StubId) -> Option<&Stub> {
        self.stubs.get(id.0 as usize)
    }

    /// The stub registered for a well-known operator.
    pub fn operator(&self, kind: OpKind) -> Result<StubId, InternalError> {
        self.operators
            .get(&kind)
            .copied()
            .ok_or_else(|| InternalError::MissingStub(kind.stub_name().to_string()))
    }

    /// Exact-tuple lookup. Absence is not an error.
    pub fn lookup_primitive(&self, stub: StubId, operand_types: &[TypeHash]) -> Option<&FuncRef> {
        self.primitives.get(&(stub, operand_types.to_vec()))
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Builtin module function by qualified name.
    pub fn function(&self, qn: &QualifiedName) -> Option<&FuncRef> {
        self.functions.get(qn)
    }

    /// Whether `qn` is taken by any registered entity.
    pub fn contains_name(&self, qn: &QualifiedName) -> bool {
        self.names.contains_key(qn)
    }

    // ==========================================================================
    // Statistics
    // ==========================================================================

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Number of memoized resolutions.
    pub fn cached_resolutions(&self) -> usize {
        self.cache.len()
    }
}

impl TypeLookup for OperatorRegistry {
    fn type_def(&self, hash: TypeHash) -> Option<&TypeDef> {
        self.types.get(&hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spy_core::{FuncType, Function, TypeKind, Value, builtins};

    fn registry() -> OperatorRegistry {
        let mut b = RegistryBuilder::new();
        for name in ["i32", "bool"] {
            b.register_type(TypeDef::new(
                QualifiedName::new("builtins", name),
                TypeKind::Primitive,
            ))
            .unwrap();
        }
        b.register_type(TypeDef::new(
            QualifiedName::new("geom", "Point"),
            TypeKind::User,
        ))
        .unwrap();
        let lt = b.register_operator(OpKind::Lt).unwrap();
        b.register_primitive(
            lt,
            &[builtins::I32, builtins::I32],
            Function::native(
                QualifiedName::new("operator", "i32_lt"),
                FuncType::new([builtins::I32, builtins::I32], builtins::BOOL),
                |ctx| Ok(Value::Bool(ctx.arg::<i32>(0)? < ctx.arg::<i32>(1)?)),
            ),
        )
        .unwrap();
        b.register_function(Function::native(
            QualifiedName::new("builtins", "zero"),
            FuncType::new([], builtins::I32),
            |_| Ok(Value::I32(0)),
        ))
        .unwrap();
        b.finish()
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OperatorRegistry>();
    }

    #[test]
    fn type_lookup_by_name() {
        let r = registry();
        assert_eq!(r.type_by_name("i32"), Some(builtins::I32));
        assert_eq!(r.type_by_name("builtins::bool"), Some(builtins::BOOL));
        assert_eq!(
            r.type_by_name("geom::Point"),
            Some(TypeHash::from_name("geom::Point"))
        );
        assert_eq!(r.type_by_name("Point"), None);
        assert_eq!(r.type_by_name("f64"), None);
    }

    #[test]
    fn missing_type_is_internal_error() {
        let r = registry();
        assert!(r.expect_type(builtins::I32).is_ok());
        assert!(matches!(
            r.expect_type(builtins::STR),
            Err(InternalError::MissingTypeRepr(_))
        ));
    }

    #[test]
    fn exact_lookup() {
        let r = registry();
        let lt = r.operator(OpKind::Lt).unwrap();
        let f = r.lookup_primitive(lt, &[builtins::I32, builtins::I32]).unwrap();
        assert_eq!(f.qn.to_string(), "operator::i32_lt");
        assert!(r.lookup_primitive(lt, &[builtins::BOOL, builtins::BOOL]).is_none());
        assert!(matches!(
            r.operator(OpKind::Add),
            Err(InternalError::MissingStub(_))
        ));
    }

    #[test]
    fn functions_and_names() {
        let r = registry();
        let zero = QualifiedName::new("builtins", "zero");
        assert!(r.function(&zero).is_some());
        assert!(r.contains_name(&zero));
        assert!(r.contains_name(&QualifiedName::new("operator", "LT")));
        assert_eq!(r.type_count(), 3);
        assert_eq!(r.primitive_count(), 1);
    }
}
