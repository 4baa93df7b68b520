//! Operator registry and OpImpl resolution.
//!
//! Registration happens once at start-up through [`RegistryBuilder`]; the
//! frozen [`OperatorRegistry`] then answers type lookups and resolves every
//! operator use to an [`OpImpl`](spy_core::OpImpl).

mod builder;
pub mod cache;
mod registry;
mod resolve;
mod stub;

pub use builder::{EntityKind, RegistryBuilder};
pub use cache::{OpImplCache, OpImplKey};
pub use registry::OperatorRegistry;
pub use stub::{Stub, StubId};
