//! Start-up registration.
//!
//! Every built-in and foreign module exposes a `register` function taking a
//! `&mut RegistryBuilder`. Once all modules have run, [`RegistryBuilder::finish`]
//! freezes the tables into an [`OperatorRegistry`] that is only read from.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spy_core::{
    FuncRef, Function, OpKind, OperatorHooks, QualifiedName, RegistrationError, TypeDef, TypeHash,
    TypeLookup,
};
use tracing::{debug, trace};

use crate::{OperatorRegistry, Stub, StubId};

/// What a qualified name is registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Type,
    Stub,
    Primitive,
    Function,
}

/// Mutable registration tables, used only during start-up.
#[derive(Default)]
pub struct RegistryBuilder {
    pub(crate) types: FxHashMap<TypeHash, TypeDef>,
    pub(crate) names: FxHashMap<QualifiedName, EntityKind>,
    pub(crate) stubs: Vec<Stub>,
    pub(crate) operators: FxHashMap<OpKind, StubId>,
    pub(crate) primitives: FxHashMap<(StubId, Vec<TypeHash>), FuncRef>,
    pub(crate) hooks: FxHashMap<TypeHash, Arc<dyn OperatorHooks>>,
    pub(crate) functions: FxHashMap<QualifiedName, FuncRef>,
    pub(crate) cache_disabled: bool,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn memoization of resolution results on or off.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_disabled = !enabled;
        self
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    fn claim_name(&mut self, qn: &QualifiedName, kind: EntityKind) -> Result<(), RegistrationError> {
        if self.names.contains_key(qn) {
            return Err(RegistrationError::DuplicateName {
                qn: qn.to_string(),
            });
        }
        self.names.insert(qn.clone(), kind);
        Ok(())
    }

    /// What `qn` is registered as, if anything.
    pub fn entity(&self, qn: &QualifiedName) -> Option<EntityKind> {
        self.names.get(qn).copied()
    }

    fn require_type(&self, ty: TypeHash) -> Result<(), RegistrationError> {
        if self.types.contains_key(&ty) {
            Ok(())
        } else {
            Err(RegistrationError::UnknownType(ty.to_string()))
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Register a type descriptor. A typedef base must already be registered.
    pub fn register_type(&mut self, def: TypeDef) -> Result<TypeHash, RegistrationError> {
        if let Some(base) = def.typedef_of {
            self.require_type(base)?;
        }
        self.claim_name(&def.qn, EntityKind::Type)?;
        let hash = def.hash;
        trace!(ty = %def.qn, "registered type");
        self.types.insert(hash, def);
        Ok(hash)
    }

    /// Attach operator hooks to a registered type.
    pub fn register_hooks(
        &mut self,
        ty: TypeHash,
        hooks: Arc<dyn OperatorHooks>,
    ) -> Result<(), RegistrationError> {
        self.require_type(ty)?;
        if self.hooks.contains_key(&ty) {
            return Err(RegistrationError::DuplicateHooks {
                ty: self.type_name(ty),
            });
        }
        trace!(ty = %self.type_name(ty), hooks = hooks.describe(), "registered hooks");
        self.hooks.insert(ty, hooks);
        Ok(())
    }

    // ==========================================================================
    // Stubs and primitives
    // ==========================================================================

    /// Create a new generic operator identity.
    pub fn register_stub(&mut self, qn: QualifiedName) -> Result<StubId, RegistrationError> {
        self.push_stub(qn, None)
    }

    /// Register the well-known stub `operator::<KIND>`.
    pub fn register_operator(&mut self, kind: OpKind) -> Result<StubId, RegistrationError> {
        let id = self.push_stub(QualifiedName::new("operator", kind.stub_name()), Some(kind))?;
        self.operators.insert(kind, id);
        Ok(id)
    }

    fn push_stub(&mut self, qn: QualifiedName, kind: Option<OpKind>) -> Result<StubId, RegistrationError> {
        self.claim_name(&qn, EntityKind::Stub)?;
        let id = StubId(self.stubs.len() as u32);
        trace!(stub = %qn, id = id.0, "registered stub");
        self.stubs.push(Stub { qn, kind });
        Ok(id)
    }

    /// The stub registered for `kind`.
    pub fn operator(&self, kind: OpKind) -> Result<StubId, RegistrationError> {
        self.operators
            .get(&kind)
            .copied()
            .ok_or_else(|| RegistrationError::UnknownStub(kind.stub_name().to_string()))
    }

    /// Bind `func` to one exact operand-type tuple of `stub`.
    pub fn register_primitive(
        &mut self,
        stub: StubId,
        operand_types: &[TypeHash],
        func: Function,
    ) -> Result<FuncRef, RegistrationError> {
        let stub_qn = self
            .stubs
            .get(stub.0 as usize)
            .map(|s| s.qn.to_string())
            .ok_or_else(|| RegistrationError::UnknownStub(stub.to_string()))?;
        for ty in operand_types.iter().chain(std::iter::once(&func.functype.restype)) {
            self.require_type(*ty)?;
        }
        if func.functype.params != operand_types {
            return Err(RegistrationError::SignatureMismatch {
                qn: func.qn.to_string(),
                declared: func.functype.display(self).to_string(),
                operands: operand_types.iter().map(|t| self.type_name(*t)).collect(),
            });
        }
        let key = (stub, operand_types.to_vec());
        if self.primitives.contains_key(&key) {
            return Err(RegistrationError::DuplicatePrimitive {
                stub: stub_qn,
                types: operand_types.iter().map(|t| self.type_name(*t)).collect(),
            });
        }
        self.claim_name(&func.qn, EntityKind::Primitive)?;
        trace!(stub = %stub_qn, func = %func.qn, "registered primitive");
        let func = Arc::new(func);
        self.primitives.insert(key, func.clone());
        Ok(func)
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Register a module-level function callable by qualified name.
    pub fn register_function(&mut self, func: Function) -> Result<FuncRef, RegistrationError> {
        for ty in func.functype.params.iter().chain(std::iter::once(&func.functype.restype)) {
            self.require_type(*ty)?;
        }
        self.claim_name(&func.qn, EntityKind::Function)?;
        trace!(func = %func.qn, "registered function");
        let func = Arc::new(func);
        self.functions.insert(func.qn.clone(), func.clone());
        Ok(func)
    }

    // ==========================================================================
    // Finish
    // ==========================================================================

    /// Freeze the tables. No registration is possible afterwards.
    pub fn finish(self) -> OperatorRegistry {
        debug!(
            types = self.types.len(),
            stubs = self.stubs.len(),
            primitives = self.primitives.len(),
            functions = self.functions.len(),
            "operator registry finished"
        );
        OperatorRegistry::from_builder(self)
    }
}

impl TypeLookup for RegistryBuilder {
    fn type_def(&self, hash: TypeHash) -> Option<&TypeDef> {
        self.types.get(&hash)
    }
}
