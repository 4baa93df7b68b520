//! The result of resolving one operator use.
//!
//! An [`OpImpl`] is either [`OpImpl::NULL`] (the operator is definitely not
//! supported for the operand types) or a function bound to the call site,
//! optionally with an argument plan: the list of [`AbsVal`]s naming which
//! call-site arguments feed the function, in which order.
//!
//! # Example
//!
//! ```ignore
//! // A field getter drops the attribute-name argument:
//! // call site  (obj, "x")  ->  getter(obj)
//! let plan = vec![cx.args[0].abs.clone()];
//! OpImpl::with_plan(getter, plan)
//! ```

use std::fmt;

use crate::error::{InternalError, SpyError};
use crate::function::{Caller, FuncRef};
use crate::types::FuncType;
use crate::value::Value;
use crate::{AbsVal, TypeHash};

/// A resolved operator binding, or the definite absence of one.
#[derive(Clone)]
pub enum OpImpl {
    /// No implementation exists for the operand types.
    Unsupported,
    /// A function bound to the call site.
    Bound {
        func: FuncRef,
        /// `None` passes every argument through in order.
        plan: Option<Vec<AbsVal>>,
    },
}

impl OpImpl {
    /// The unsupported sentinel.
    pub const NULL: OpImpl = OpImpl::Unsupported;

    /// Bind `func` with arguments passed through unchanged.
    pub fn simple(func: FuncRef) -> Self {
        OpImpl::Bound { func, plan: None }
    }

    /// Bind `func` with an explicit argument plan.
    pub fn with_plan(func: FuncRef, plan: Vec<AbsVal>) -> Self {
        OpImpl::Bound {
            func,
            plan: Some(plan),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OpImpl::Unsupported)
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, OpImpl::Bound { plan: None, .. })
    }

    /// The bound function.
    pub fn func(&self) -> Option<&FuncRef> {
        match self {
            OpImpl::Unsupported => None,
            OpImpl::Bound { func, .. } => Some(func),
        }
    }

    /// The bound function's type.
    pub fn functype(&self) -> Option<&FuncType> {
        self.func().map(|f| &f.functype)
    }

    /// The bound function's declared return type.
    pub fn restype(&self) -> Option<TypeHash> {
        self.functype().map(|ft| ft.restype)
    }

    /// Select the function's arguments from the call-site arguments.
    pub fn select_args(&self, args: Vec<Value>) -> Result<Vec<Value>, InternalError> {
        match self {
            OpImpl::Unsupported => Err(InternalError::NullOpImplCall),
            OpImpl::Bound { plan: None, .. } => Ok(args),
            OpImpl::Bound {
                plan: Some(plan), ..
            } => plan
                .iter()
                .map(|abs| {
                    args.get(abs.index)
                        .cloned()
                        .ok_or(InternalError::PlanOutOfRange {
                            index: abs.index,
                            argc: args.len(),
                        })
                })
                .collect(),
        }
    }

    /// Call the bound function with the call-site arguments.
    ///
    /// Calling [`OpImpl::NULL`] is a compiler defect.
    pub fn call(&self, caller: &mut dyn Caller, args: Vec<Value>) -> Result<Value, SpyError> {
        let selected = self.select_args(args)?;
        match self {
            OpImpl::Unsupported => Err(InternalError::NullOpImplCall.into()),
            OpImpl::Bound { func, .. } => caller.call_function(func, selected),
        }
    }
}

impl PartialEq for OpImpl {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OpImpl::Unsupported, OpImpl::Unsupported) => true,
            (
                OpImpl::Bound { func: fa, plan: pa },
                OpImpl::Bound { func: fb, plan: pb },
            ) => fa.qn == fb.qn && fa.functype == fb.functype && pa == pb,
            _ => false,
        }
    }
}

impl fmt::Debug for OpImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpImpl::Unsupported => write!(f, "<OpImpl NULL>"),
            OpImpl::Bound { func, plan: None } => write!(f, "<OpImpl `{}`>", func.qn),
            OpImpl::Bound {
                func,
                plan: Some(plan),
            } => {
                let indices: Vec<_> = plan.iter().map(|a| a.index).collect();
                write!(f, "<OpImpl `{}` plan {:?}>", func.qn, indices)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Function, FunctionBody};
    use crate::{QualifiedName, builtins};
    use std::sync::Arc;

    fn concat() -> FuncRef {
        Arc::new(Function::native(
            QualifiedName::new("test", "concat"),
            FuncType::new([builtins::STR, builtins::STR], builtins::STR),
            |ctx| {
                let a: Arc<str> = ctx.arg(0)?;
                let b: Arc<str> = ctx.arg(1)?;
                Ok(Value::from(format!("{a}{b}").as_str()))
            },
        ))
    }

    struct NativeOnly;

    impl Caller for NativeOnly {
        fn call_function(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, SpyError> {
            match &func.body {
                FunctionBody::Native(native) => Ok(native.call(&args)?),
                FunctionBody::Script(_) => unreachable!("no scripts in this test"),
            }
        }
    }

    #[test]
    fn null_is_null() {
        assert!(OpImpl::NULL.is_null());
        assert!(OpImpl::NULL.func().is_none());
        assert_eq!(OpImpl::NULL.restype(), None);
        assert_eq!(OpImpl::NULL, OpImpl::Unsupported);
    }

    #[test]
    fn bound_restype_matches_function() {
        let op = OpImpl::simple(concat());
        assert!(!op.is_null());
        assert!(op.is_simple());
        assert_eq!(op.restype(), Some(builtins::STR));
    }

    #[test]
    fn calling_null_is_internal_error() {
        let err = OpImpl::NULL.call(&mut NativeOnly, vec![]).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err, SpyError::Internal(InternalError::NullOpImplCall));
    }

    #[test]
    fn plan_reorders_and_drops_arguments() {
        let plan = vec![
            AbsVal::new("b", 2, builtins::STR),
            AbsVal::new("a", 0, builtins::STR),
        ];
        let op = OpImpl::with_plan(concat(), plan);
        let result = op
            .call(
                &mut NativeOnly,
                vec![Value::from("x"), Value::from("ignored"), Value::from("y")],
            )
            .unwrap();
        assert_eq!(result, Value::from("yx"));
    }

    #[test]
    fn plan_out_of_range() {
        let op = OpImpl::with_plan(concat(), vec![AbsVal::new("z", 5, builtins::STR)]);
        assert_eq!(
            op.select_args(vec![Value::from("a")]).unwrap_err(),
            InternalError::PlanOutOfRange { index: 5, argc: 1 }
        );
    }

    #[test]
    fn structural_equality() {
        let a = OpImpl::simple(concat());
        let b = OpImpl::simple(concat());
        assert_eq!(a, b);
        let planned = OpImpl::with_plan(concat(), vec![AbsVal::new("a", 0, builtins::STR)]);
        assert_ne!(a, planned);
        assert_ne!(a, OpImpl::NULL);
    }

    #[test]
    fn debug_rendering() {
        assert_eq!(format!("{:?}", OpImpl::NULL), "<OpImpl NULL>");
        assert_eq!(format!("{:?}", OpImpl::simple(concat())), "<OpImpl `test::concat`>");
    }
}
