//! OpImpl resolution.
//!
//! For an operator use, the resolver tries in order:
//!
//! 1. An exact primitive for `(stub, operand types)`, bound with the
//!    identity argument plan.
//! 2. The first operand's type hooks, using the single hook method the
//!    stub's [`OpKind`](spy_core::OpKind) selects.
//! 3. Otherwise [`OpImpl::NULL`].
//!
//! An exact primitive always wins over a hook. Results depend only on the
//! key (stub, operand types, compile-time argument values) and are memoized.

use spy_core::{HookContext, OpArg, OpImpl, TypeHash, TypeLookup, dispatch_hook};
use tracing::{debug, trace};

use crate::cache::OpImplKey;
use crate::{OperatorRegistry, StubId};

impl OperatorRegistry {
    /// Resolve one operator use.
    ///
    /// `operand_types[i]` is the static type of `args[i]`. A `NULL` result is
    /// definite and is cached like any other.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, stub: StubId, operand_types: &[TypeHash], args: &[OpArg]) -> OpImpl {
        let key = self
            .cache_enabled
            .then(|| OpImplKey::new(stub, operand_types, args));
        if let Some(key) = &key
            && let Some(hit) = self.cache.get(key)
        {
            trace!(stub = %stub, result = ?hit, "opimpl cache hit");
            return hit;
        }

        let result = self.resolve_uncached(stub, operand_types, args);
        debug!(
            stub = %self.stub_name(stub),
            types = ?operand_types.iter().map(|t| self.type_name(*t)).collect::<Vec<_>>(),
            result = ?result,
            "resolved operator"
        );
        if let Some(key) = key {
            self.cache.insert(key, result.clone());
        }
        result
    }

    fn resolve_uncached(&self, stub: StubId, operand_types: &[TypeHash], args: &[OpArg]) -> OpImpl {
        if let Some(func) = self.lookup_primitive(stub, operand_types) {
            return OpImpl::simple(func.clone());
        }

        let Some(kind) = self.stub(stub).and_then(|s| s.kind) else {
            return OpImpl::NULL;
        };
        let Some(hooks) = operand_types.first().and_then(|ty| self.hooks(*ty)) else {
            return OpImpl::NULL;
        };
        let cx = HookContext {
            kind,
            types: self,
            args,
        };
        dispatch_hook(hooks.as_ref(), &cx).unwrap_or(OpImpl::NULL)
    }

    fn stub_name(&self, stub: StubId) -> String {
        match self.stub(stub) {
            Some(s) => s.qn.to_string(),
            None => stub.to_string(),
        }
    }
}
