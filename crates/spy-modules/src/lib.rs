//! Built-in modules registered into every SPy registry.
//!
//! - [`builtins`]: scalar types and free functions (`abs`, `max`, ...)
//! - [`operator`]: the operator stubs, scalar primitives and `AbsVal`
//! - [`structs`]: the `rawbuffer` base type and [`StructBuilder`]

pub mod builtins;
pub mod operator;
pub mod structs;

pub use structs::{StructBuilder, StructLayout};

use spy_core::RegistrationError;
use spy_registry::RegistryBuilder;
use tracing::debug;

/// Register every built-in module. `builtins` must run first since the
/// others refer to its types.
pub fn register_all(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builtins::register(b)?;
    operator::register(b)?;
    structs::register(b)?;
    debug!("registered built-in modules");
    Ok(())
}
