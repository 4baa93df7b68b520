//! The `builtins` module: scalar types and a handful of functions.

use spy_core::{
    FuncType, Function, QualifiedName, RegistrationError, RuntimeError, TypeDef, TypeKind, Value,
    builtins::{BOOL, I32, STR},
};
use spy_registry::RegistryBuilder;

pub const MODULE: &str = "builtins";

/// Register the builtin types and functions.
pub fn register(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    for (name, kind) in [
        ("i32", TypeKind::Primitive),
        ("bool", TypeKind::Primitive),
        ("str", TypeKind::Primitive),
        ("void", TypeKind::Primitive),
        ("dynamic", TypeKind::Dynamic),
    ] {
        b.register_type(TypeDef::new(QualifiedName::new(MODULE, name), kind))?;
    }

    b.register_function(Function::native(
        QualifiedName::new(MODULE, "abs"),
        FuncType::new([I32], I32),
        |ctx| {
            let v: i32 = ctx.arg(0)?;
            v.checked_abs()
                .map(Value::I32)
                .ok_or(RuntimeError::Overflow { op: "abs" })
        },
    ))?;
    b.register_function(Function::native(
        QualifiedName::new(MODULE, "max"),
        FuncType::new([I32, I32], I32),
        |ctx| Ok(Value::I32(ctx.arg::<i32>(0)?.max(ctx.arg::<i32>(1)?))),
    ))?;
    b.register_function(Function::native(
        QualifiedName::new(MODULE, "min"),
        FuncType::new([I32, I32], I32),
        |ctx| Ok(Value::I32(ctx.arg::<i32>(0)?.min(ctx.arg::<i32>(1)?))),
    ))?;
    b.register_function(Function::native(
        QualifiedName::new(MODULE, "len"),
        FuncType::new([STR], I32),
        |ctx| {
            let s: std::sync::Arc<str> = ctx.arg(0)?;
            i32::try_from(s.chars().count())
                .map(Value::I32)
                .map_err(|_| RuntimeError::Overflow { op: "len" })
        },
    ))?;
    b.register_function(Function::native(
        QualifiedName::new(MODULE, "bool_to_i32"),
        FuncType::new([BOOL], I32),
        |ctx| Ok(Value::I32(i32::from(ctx.arg::<bool>(0)?))),
    ))?;
    Ok(())
}
