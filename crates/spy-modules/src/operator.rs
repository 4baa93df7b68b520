//! The `operator` module: one stub per operator kind, the scalar primitives,
//! and the `AbsVal` type with its equality hook.

use std::sync::Arc;

use spy_core::{
    AbsVal, FuncRef, FuncType, Function, HookContext, OpImpl, OpKind, OperatorHooks,
    QualifiedName, RegistrationError, RuntimeError, TypeDef, TypeHash, TypeKind, Value,
    builtins::{ABSVAL, BOOL, I32, STR},
};
use spy_registry::RegistryBuilder;

pub const MODULE: &str = "operator";

/// Register the operator stubs, primitives and `AbsVal`.
pub fn register(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    for kind in OpKind::ALL {
        b.register_operator(kind)?;
    }
    register_i32(b)?;
    register_bool(b)?;
    register_str(b)?;
    register_absval(b)?;
    Ok(())
}

fn primitive<F>(
    b: &mut RegistryBuilder,
    kind: OpKind,
    name: &str,
    params: &[TypeHash],
    restype: TypeHash,
    f: F,
) -> Result<(), RegistrationError>
where
    F: Fn(&spy_core::CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    let stub = b.operator(kind)?;
    let func = Function::native(
        QualifiedName::new(MODULE, name),
        FuncType::new(params, restype),
        f,
    );
    b.register_primitive(stub, params, func)?;
    Ok(())
}

// ============================================================================
// i32
// ============================================================================

fn register_i32(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    type Arith = fn(i32, i32) -> Result<i32, RuntimeError>;
    let arith: [(OpKind, &str, Arith); 5] = [
        (OpKind::Add, "i32_add", |a, b| {
            a.checked_add(b).ok_or(RuntimeError::Overflow { op: "i32_add" })
        }),
        (OpKind::Sub, "i32_sub", |a, b| {
            a.checked_sub(b).ok_or(RuntimeError::Overflow { op: "i32_sub" })
        }),
        (OpKind::Mul, "i32_mul", |a, b| {
            a.checked_mul(b).ok_or(RuntimeError::Overflow { op: "i32_mul" })
        }),
        (OpKind::Div, "i32_div", |a, b| {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.checked_div(b).ok_or(RuntimeError::Overflow { op: "i32_div" })
        }),
        (OpKind::Mod, "i32_mod", |a, b| {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.checked_rem(b).ok_or(RuntimeError::Overflow { op: "i32_mod" })
        }),
    ];
    for (kind, name, f) in arith {
        primitive(b, kind, name, &[I32, I32], I32, move |ctx| {
            f(ctx.arg::<i32>(0)?, ctx.arg::<i32>(1)?).map(Value::I32)
        })?;
    }

    let compare: [(OpKind, &str, fn(&i32, &i32) -> bool); 6] = [
        (OpKind::Eq, "i32_eq", i32::eq),
        (OpKind::Ne, "i32_ne", i32::ne),
        (OpKind::Lt, "i32_lt", i32::lt),
        (OpKind::Le, "i32_le", i32::le),
        (OpKind::Gt, "i32_gt", i32::gt),
        (OpKind::Ge, "i32_ge", i32::ge),
    ];
    for (kind, name, f) in compare {
        primitive(b, kind, name, &[I32, I32], BOOL, move |ctx| {
            Ok(Value::Bool(f(&ctx.arg::<i32>(0)?, &ctx.arg::<i32>(1)?)))
        })?;
    }

    primitive(b, OpKind::Neg, "i32_neg", &[I32], I32, |ctx| {
        let v: i32 = ctx.arg(0)?;
        v.checked_neg()
            .map(Value::I32)
            .ok_or(RuntimeError::Overflow { op: "i32_neg" })
    })
}

// ============================================================================
// bool
// ============================================================================

fn register_bool(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    primitive(b, OpKind::Eq, "bool_eq", &[BOOL, BOOL], BOOL, |ctx| {
        Ok(Value::Bool(ctx.arg::<bool>(0)? == ctx.arg::<bool>(1)?))
    })?;
    primitive(b, OpKind::Ne, "bool_ne", &[BOOL, BOOL], BOOL, |ctx| {
        Ok(Value::Bool(ctx.arg::<bool>(0)? != ctx.arg::<bool>(1)?))
    })?;
    primitive(b, OpKind::Not, "bool_not", &[BOOL], BOOL, |ctx| {
        Ok(Value::Bool(!ctx.arg::<bool>(0)?))
    })
}

// ============================================================================
// str
// ============================================================================

fn register_str(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    primitive(b, OpKind::Add, "str_add", &[STR, STR], STR, |ctx| {
        let a: Arc<str> = ctx.arg(0)?;
        let c: Arc<str> = ctx.arg(1)?;
        Ok(Value::Str(format!("{a}{c}").into()))
    })?;
    primitive(b, OpKind::Mul, "str_mul", &[STR, I32], STR, |ctx| {
        let s: Arc<str> = ctx.arg(0)?;
        let n: i32 = ctx.arg(1)?;
        Ok(Value::Str(s.repeat(n.max(0) as usize).into()))
    })?;
    primitive(b, OpKind::GetItem, "str_getitem", &[STR, I32], STR, |ctx| {
        let s: Arc<str> = ctx.arg(0)?;
        let i: i32 = ctx.arg(1)?;
        let len = s.chars().count();
        let index = if i < 0 { len as i64 + i as i64 } else { i as i64 };
        usize::try_from(index)
            .ok()
            .and_then(|idx| s.chars().nth(idx))
            .map(|c| Value::Str(c.to_string().into()))
            .ok_or(RuntimeError::IndexOutOfBounds {
                index: i as i64,
                len,
            })
    })?;
    primitive(b, OpKind::Eq, "str_eq", &[STR, STR], BOOL, |ctx| {
        Ok(Value::Bool(
            ctx.arg::<Arc<str>>(0)? == ctx.arg::<Arc<str>>(1)?,
        ))
    })?;
    primitive(b, OpKind::Ne, "str_ne", &[STR, STR], BOOL, |ctx| {
        Ok(Value::Bool(
            ctx.arg::<Arc<str>>(0)? != ctx.arg::<Arc<str>>(1)?,
        ))
    })
}

// ============================================================================
// AbsVal
// ============================================================================

/// Equality on `AbsVal` compares index and static type only.
struct AbsValHooks {
    eq: FuncRef,
}

impl OperatorHooks for AbsValHooks {
    fn op_eq(&self, cx: &HookContext<'_>) -> Option<OpImpl> {
        if cx.arg_type(0) == Some(ABSVAL) && cx.arg_type(1) == Some(ABSVAL) {
            Some(OpImpl::simple(self.eq.clone()))
        } else {
            Some(OpImpl::NULL)
        }
    }

    fn describe(&self) -> &str {
        "AbsVal"
    }
}

fn register_absval(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    b.register_type(TypeDef::new(
        QualifiedName::new(MODULE, "AbsVal"),
        TypeKind::User,
    ))?;
    let eq = b.register_function(Function::native(
        QualifiedName::new(MODULE, "absval_eq"),
        FuncType::new([ABSVAL, ABSVAL], BOOL),
        |ctx| Ok(Value::Bool(ctx.arg::<AbsVal>(0)? == ctx.arg::<AbsVal>(1)?)),
    ))?;
    b.register_hooks(ABSVAL, Arc::new(AbsValHooks { eq }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spy_core::{Caller, FunctionBody, OpArg, SpyError, Span};
    use spy_registry::OperatorRegistry;

    fn registry() -> OperatorRegistry {
        let mut b = RegistryBuilder::new();
        crate::builtins::register(&mut b).unwrap();
        register(&mut b).unwrap();
        b.finish()
    }

    struct Native;

    impl Caller for Native {
        fn call_function(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, SpyError> {
            match &func.body {
                FunctionBody::Native(n) => Ok(n.call(&args)?),
                FunctionBody::Script(_) => unreachable!(),
            }
        }
    }

    fn apply(r: &OperatorRegistry, kind: OpKind, args: Vec<Value>) -> Result<Value, SpyError> {
        let types: Vec<_> = args.iter().map(Value::dynamic_type).collect();
        let op_args: Vec<_> = types
            .iter()
            .enumerate()
            .map(|(i, t)| OpArg::red(AbsVal::new(format!("a{i}"), i, *t)))
            .collect();
        let stub = r.operator(kind).unwrap();
        r.resolve(stub, &types, &op_args).call(&mut Native, args)
    }

    #[test]
    fn i32_arithmetic() {
        let r = registry();
        assert_eq!(apply(&r, OpKind::Add, vec![2.into(), 3.into()]), Ok(Value::I32(5)));
        assert_eq!(apply(&r, OpKind::Mul, vec![4.into(), 3.into()]), Ok(Value::I32(12)));
        assert_eq!(apply(&r, OpKind::Mod, vec![7.into(), 3.into()]), Ok(Value::I32(1)));
        assert_eq!(apply(&r, OpKind::Neg, vec![7.into()]), Ok(Value::I32(-7)));
        assert_eq!(
            apply(&r, OpKind::Div, vec![1.into(), 0.into()]),
            Err(RuntimeError::DivisionByZero.into())
        );
        assert_eq!(
            apply(&r, OpKind::Add, vec![i32::MAX.into(), 1.into()]),
            Err(RuntimeError::Overflow { op: "i32_add" }.into())
        );
    }

    #[test]
    fn i32_comparisons_return_bool() {
        let r = registry();
        let lt = r.operator(OpKind::Lt).unwrap();
        let f = r.lookup_primitive(lt, &[I32, I32]).unwrap();
        assert_eq!(f.functype.restype, BOOL);
        assert_eq!(apply(&r, OpKind::Ge, vec![3.into(), 3.into()]), Ok(Value::Bool(true)));
        assert_eq!(apply(&r, OpKind::Ne, vec![3.into(), 3.into()]), Ok(Value::Bool(false)));
    }

    #[test]
    fn str_primitives() {
        let r = registry();
        assert_eq!(
            apply(&r, OpKind::Add, vec!["ab".into(), "cd".into()]),
            Ok(Value::from("abcd"))
        );
        assert_eq!(
            apply(&r, OpKind::Mul, vec!["ab".into(), 3.into()]),
            Ok(Value::from("ababab"))
        );
        assert_eq!(
            apply(&r, OpKind::GetItem, vec!["hello".into(), 1.into()]),
            Ok(Value::from("e"))
        );
        assert_eq!(
            apply(&r, OpKind::GetItem, vec!["hello".into(), (-1).into()]),
            Ok(Value::from("o"))
        );
        assert_eq!(
            apply(&r, OpKind::GetItem, vec!["hi".into(), 5.into()]),
            Err(RuntimeError::IndexOutOfBounds { index: 5, len: 2 }.into())
        );
        assert_eq!(
            apply(&r, OpKind::Eq, vec!["a".into(), "a".into()]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn bool_primitives() {
        let r = registry();
        assert_eq!(apply(&r, OpKind::Not, vec![true.into()]), Ok(Value::Bool(false)));
        assert_eq!(
            apply(&r, OpKind::Eq, vec![true.into(), false.into()]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn mixed_types_have_no_operator() {
        let r = registry();
        let add = r.operator(OpKind::Add).unwrap();
        let args = [
            OpArg::red(AbsVal::new("a", 0, I32)),
            OpArg::red(AbsVal::new("b", 1, STR)),
        ];
        assert!(r.resolve(add, &[I32, STR], &args).is_null());
        let err = apply(&r, OpKind::Add, vec![1.into(), "x".into()]).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn absval_equality_through_hook() {
        let r = registry();
        let a = AbsVal::new("x", 0, I32).at(Span::new(1, 1, 1));
        let b = AbsVal::new("y", 0, I32);
        let c = AbsVal::new("x", 1, I32);
        assert_eq!(
            apply(&r, OpKind::Eq, vec![Value::AbsVal(a.clone()), Value::AbsVal(b)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply(&r, OpKind::Eq, vec![Value::AbsVal(a), Value::AbsVal(c)]),
            Ok(Value::Bool(false))
        );

        let eq = r.operator(OpKind::Eq).unwrap();
        let op = r.resolve(
            eq,
            &[ABSVAL, ABSVAL],
            &[
                OpArg::red(AbsVal::new("l", 0, ABSVAL)),
                OpArg::red(AbsVal::new("r", 1, ABSVAL)),
            ],
        );
        assert_eq!(op.func().unwrap().qn.to_string(), "operator::absval_eq");
    }

    #[test]
    fn absval_hook_refuses_other_right_operand() {
        let r = registry();
        let eq = r.operator(OpKind::Eq).unwrap();
        let op = r.resolve(
            eq,
            &[ABSVAL, I32],
            &[
                OpArg::red(AbsVal::new("l", 0, ABSVAL)),
                OpArg::red(AbsVal::new("r", 1, I32)),
            ],
        );
        assert!(op.is_null());
    }
}
