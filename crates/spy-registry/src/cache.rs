//! Memoized resolution results.
//!
//! Entries are never invalidated: registrations are append-only and types
//! are immutable, so a key always resolves to the same binding for the life
//! of the process. Concurrent population is idempotent; the last writer wins
//! with a structurally equal value.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use spy_core::{Constant, OpArg, OpImpl, TypeHash};

use crate::StubId;

/// Cache key: the stub, the static operand types, and whatever the call
/// site knows at compile time about each argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpImplKey {
    pub stub: StubId,
    pub types: Vec<TypeHash>,
    pub blue: Vec<Option<Constant>>,
}

impl OpImplKey {
    pub fn new(stub: StubId, types: &[TypeHash], args: &[OpArg]) -> Self {
        Self {
            stub,
            types: types.to_vec(),
            blue: args.iter().map(|a| a.blue.clone()).collect(),
        }
    }
}

/// Cache for resolved operator bindings.
///
/// Maps (stub, operand types, compile-time arguments) → OpImpl, including
/// definite `NULL` results.
#[derive(Debug, Default)]
pub struct OpImplCache {
    entries: RwLock<FxHashMap<OpImplKey, OpImpl>>,
}

impl OpImplCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached resolution.
    pub fn get(&self, key: &OpImplKey) -> Option<OpImpl> {
        self.entries.read().get(key).cloned()
    }

    /// Record a resolution.
    pub fn insert(&self, key: OpImplKey, opimpl: OpImpl) {
        self.entries.write().insert(key, opimpl);
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
