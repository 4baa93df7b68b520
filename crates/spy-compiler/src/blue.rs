//! Compile-time evaluation seam.

use spy_core::{Function, SpyError, Value};

use crate::Module;

/// Runs blue functions while a module is being built.
///
/// The VM implements this; `pending` holds the functions of the module
/// compiled so far, so a blue function can call its siblings.
pub trait BlueEvaluator {
    fn eval_blue(&mut self, pending: &Module, func: &Function, args: Vec<Value>) -> Result<Value, SpyError>;
}
