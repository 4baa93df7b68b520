//! Local scope management for function checking.
//!
//! A function has one flat scope: parameters first, then every local in the
//! order it is declared. Each local owns one frame slot. The special
//! `@return` binding records the declared return type so `return` statements
//! are checked with the same machinery as assignments.

use rustc_hash::FxHashMap;
use spy_core::bytecode::LocalSlot;
use spy_core::{CompilationError, MismatchReason, Span, TypeHash, TypeLookup, compatible};

/// Name of the binding that holds the declared return type.
pub const RETURN_BINDING: &str = "@return";

// ============================================================================
// Types
// ============================================================================

/// Information about a local variable.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    /// Declared type.
    pub ty: TypeHash,
    /// Frame slot index.
    pub slot: u32,
    /// Where the local was declared.
    pub span: Span,
    /// Whether a value has been stored.
    pub initialized: bool,
}

// ============================================================================
// LocalScope
// ============================================================================

#[derive(Debug)]
pub struct LocalScope {
    variables: FxHashMap<String, LocalVar>,
    /// Slot table in slot order.
    slots: Vec<LocalSlot>,
    param_count: usize,
    return_type: TypeHash,
    return_span: Span,
}

impl LocalScope {
    /// Create the scope of a function returning `return_type`, annotated at
    /// `return_span`.
    pub fn new(return_type: TypeHash, return_span: Span) -> Self {
        Self {
            variables: FxHashMap::default(),
            slots: Vec::new(),
            param_count: 0,
            return_type,
            return_span,
        }
    }

    /// Declare a parameter. Parameters are always initialized.
    pub fn declare_param(&mut self, name: &str, ty: TypeHash, span: Span) -> Result<u32, CompilationError> {
        let slot = self.declare_local(name, ty, span, true)?;
        self.param_count += 1;
        Ok(slot)
    }

    /// Declare a local, allocating its slot.
    pub fn declare_local(
        &mut self,
        name: &str,
        ty: TypeHash,
        span: Span,
        initialized: bool,
    ) -> Result<u32, CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            return Err(CompilationError::DuplicateDeclaration {
                name: name.to_string(),
                span,
                original_span: existing.span,
            });
        }
        let slot = self.slots.len() as u32;
        self.slots.push(LocalSlot {
            name: name.to_string(),
            ty,
        });
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                ty,
                slot,
                span,
                initialized,
            },
        );
        Ok(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(var) = self.variables.get_mut(name) {
            var.initialized = true;
        }
    }

    pub fn return_type(&self) -> TypeHash {
        self.return_type
    }

    /// Check that a value of type `got`, found at `span`, may be stored into
    /// `name` (or returned, when `name` is [`RETURN_BINDING`]).
    pub fn typecheck_local<L: TypeLookup + ?Sized>(
        &self,
        types: &L,
        span: Span,
        name: &str,
        got: TypeHash,
    ) -> Result<(), CompilationError> {
        let (expected, expected_span, reason) = if name == RETURN_BINDING {
            (self.return_type, self.return_span, MismatchReason::ReturnType)
        } else {
            let var = self.lookup(name).ok_or_else(|| CompilationError::NameError {
                name: name.to_string(),
                span,
            })?;
            (var.ty, var.span, MismatchReason::Declaration)
        };
        if compatible(types, got, expected) {
            return Ok(());
        }
        Err(CompilationError::TypeMismatch {
            expected: types.type_name(expected),
            got: types.type_name(got),
            span,
            expected_span,
            reason,
        })
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consume the scope, yielding the slot table.
    pub fn into_slots(self) -> Vec<LocalSlot> {
        self.slots
    }
}
