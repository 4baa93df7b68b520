//! Fixed-layout structs backed by a raw byte buffer.
//!
//! [`StructBuilder`] registers a struct type, its constructor, one getter and
//! one setter per field, and operator hooks that route attribute access and
//! equality to those functions.
//!
//! # Example
//!
//! ```ignore
//! let point = StructBuilder::new("geom", "Point")
//!     .field("x", builtins::I32)
//!     .field("y", builtins::I32)
//!     .register(&mut builder)?;
//!
//! // p.x      resolves to  geom::Point::__get_x__(p)
//! // p.x = 1  resolves to  geom::Point::__set_x__(p, 1)
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spy_core::{
    Buffer, FuncRef, FuncType, Function, HookContext, OpImpl, OperatorHooks, QualifiedName,
    RegistrationError, RuntimeError, TypeDef, TypeHash, TypeKind, TypeLookup, Value,
    builtins::{BOOL, I32, RAWBUFFER, VOID},
    compatible,
};
use spy_registry::RegistryBuilder;
use tracing::debug;

pub const MODULE: &str = "structs";

/// Register the `rawbuffer` base type.
pub fn register(b: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    b.register_type(TypeDef::new(
        QualifiedName::new(MODULE, "rawbuffer"),
        TypeKind::User,
    ))?;
    Ok(())
}

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum FieldRepr {
    I32,
    Bool,
}

impl FieldRepr {
    fn of(ty: TypeHash) -> Option<Self> {
        match ty {
            I32 => Some(FieldRepr::I32),
            BOOL => Some(FieldRepr::Bool),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            FieldRepr::I32 => 4,
            FieldRepr::Bool => 1,
        }
    }

    fn read(self, buf: &Buffer, offset: usize) -> Result<Value, RuntimeError> {
        let out_of_bounds = || RuntimeError::IndexOutOfBounds {
            index: offset as i64,
            len: buf.len(),
        };
        match self {
            FieldRepr::I32 => buf
                .read::<4>(offset)
                .map(|bytes| Value::I32(i32::from_le_bytes(bytes)))
                .ok_or_else(out_of_bounds),
            FieldRepr::Bool => buf
                .read::<1>(offset)
                .map(|[byte]| Value::Bool(byte != 0))
                .ok_or_else(out_of_bounds),
        }
    }

    fn write(self, buf: &Buffer, offset: usize, value: &Value) -> Result<(), RuntimeError> {
        let written = match (self, value) {
            (FieldRepr::I32, Value::I32(v)) => buf.write(offset, &v.to_le_bytes()),
            (FieldRepr::Bool, Value::Bool(v)) => buf.write(offset, &[u8::from(*v)]),
            (repr, other) => {
                return Err(RuntimeError::TypeError {
                    expected: repr.name().to_string(),
                    got: other.kind_name().to_string(),
                });
            }
        };
        if written {
            Ok(())
        } else {
            Err(RuntimeError::IndexOutOfBounds {
                index: offset as i64,
                len: buf.len(),
            })
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldRepr::I32 => "i32",
            FieldRepr::Bool => "bool",
        }
    }
}

struct Field {
    ty: TypeHash,
    getter: FuncRef,
    setter: FuncRef,
}

/// Registered layout of one struct type.
pub struct StructLayout {
    pub qn: QualifiedName,
    pub ty: TypeHash,
    pub size: usize,
    fields: FxHashMap<String, Field>,
    eq: FuncRef,
}

impl StructLayout {
    /// Declared type of field `name`.
    pub fn field_type(&self, name: &str) -> Option<TypeHash> {
        self.fields.get(name).map(|f| f.ty)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent registration of a struct type.
pub struct StructBuilder {
    qn: QualifiedName,
    fields: Vec<(String, TypeHash)>,
}

impl StructBuilder {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qn: QualifiedName::new(module, name),
            fields: Vec::new(),
        }
    }

    /// Append a field. Fields are laid out in declaration order, unpadded.
    pub fn field(mut self, name: impl Into<String>, ty: TypeHash) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Register the type, its functions and its hooks.
    pub fn register(self, b: &mut RegistryBuilder) -> Result<Arc<StructLayout>, RegistrationError> {
        let ty = b.register_type(
            TypeDef::new(self.qn.clone(), TypeKind::User).with_typedef_of(RAWBUFFER),
        )?;

        let mut fields = FxHashMap::default();
        let mut offset = 0usize;
        for (name, field_ty) in &self.fields {
            let repr = FieldRepr::of(*field_ty).ok_or_else(|| RegistrationError::InvalidField {
                owner: self.qn.to_string(),
                field: name.clone(),
                ty: b.type_name(*field_ty),
            })?;
            let at = offset;
            let getter = b.register_function(Function::native(
                self.qn.child(format!("__get_{name}__")),
                FuncType::new([ty], *field_ty),
                move |ctx| repr.read(&ctx.arg::<Buffer>(0)?, at),
            ))?;
            let setter = b.register_function(Function::native(
                self.qn.child(format!("__set_{name}__")),
                FuncType::new([ty, *field_ty], VOID),
                move |ctx| {
                    repr.write(&ctx.arg::<Buffer>(0)?, at, ctx.arg_value(1)?)?;
                    Ok(Value::Void)
                },
            ))?;
            fields.insert(
                name.clone(),
                Field {
                    ty: *field_ty,
                    getter,
                    setter,
                },
            );
            offset += repr.size();
        }
        let size = offset;

        b.register_function(Function::native(
            self.qn.child("new"),
            FuncType::new([], ty),
            move |_| Ok(Value::Buffer(Buffer::zeroed(ty, size))),
        ))?;
        let eq = b.register_function(Function::native(
            self.qn.child("__eq__"),
            FuncType::new([ty, ty], BOOL),
            |ctx| {
                let a: Buffer = ctx.arg(0)?;
                let c: Buffer = ctx.arg(1)?;
                Ok(Value::Bool(a.ptr_eq(&c) || a.to_vec() == c.to_vec()))
            },
        ))?;

        let layout = Arc::new(StructLayout {
            qn: self.qn,
            ty,
            size,
            fields,
            eq,
        });
        b.register_hooks(ty, Arc::new(StructHooks {
            layout: layout.clone(),
        }))?;
        debug!(ty = %layout.qn, size, fields = layout.field_count(), "registered struct");
        Ok(layout)
    }
}

// ============================================================================
// Hooks
// ============================================================================

struct StructHooks {
    layout: Arc<StructLayout>,
}

impl OperatorHooks for StructHooks {
    fn op_getattr(&self, cx: &HookContext<'_>) -> Option<OpImpl> {
        let Some(field) = cx.blue_str(1).and_then(|name| self.layout.fields.get(name)) else {
            return Some(OpImpl::NULL);
        };
        let obj = cx.abs(0)?.clone();
        Some(OpImpl::with_plan(field.getter.clone(), vec![obj]))
    }

    fn op_setattr(&self, cx: &HookContext<'_>) -> Option<OpImpl> {
        let Some(field) = cx.blue_str(1).and_then(|name| self.layout.fields.get(name)) else {
            return Some(OpImpl::NULL);
        };
        let value_ty = cx.arg_type(2)?;
        if !compatible(cx.types, value_ty, field.ty) {
            return Some(OpImpl::NULL);
        }
        let plan = vec![cx.abs(0)?.clone(), cx.abs(2)?.clone()];
        Some(OpImpl::with_plan(field.setter.clone(), plan))
    }

    fn op_eq(&self, cx: &HookContext<'_>) -> Option<OpImpl> {
        if cx.arg_type(0) == Some(self.layout.ty) && cx.arg_type(1) == Some(self.layout.ty) {
            Some(OpImpl::simple(self.layout.eq.clone()))
        } else {
            Some(OpImpl::NULL)
        }
    }

    fn describe(&self) -> &str {
        self.layout.qn.name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spy_core::{AbsVal, Caller, Constant, FunctionBody, OpArg, OpKind, SpyError, builtins::STR};
    use spy_registry::OperatorRegistry;

    fn setup() -> (OperatorRegistry, TypeHash) {
        let mut b = RegistryBuilder::new();
        crate::register_all(&mut b).unwrap();
        let layout = StructBuilder::new("geom", "Point")
            .field("x", I32)
            .field("y", I32)
            .field("visible", BOOL)
            .register(&mut b)
            .unwrap();
        assert_eq!(layout.size, 9);
        (b.finish(), layout.ty)
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

    fn new_point(r: &OperatorRegistry) -> Value {
        let ctor = r.function(&QualifiedName::new("geom", "Point").child("new")).unwrap();
        Native.call_function(ctor, vec![]).unwrap()
    }

    fn attr_args(ty: TypeHash, attr: &str, value: Option<TypeHash>) -> Vec<OpArg> {
        let mut args = vec![
            OpArg::red(AbsVal::new("p", 0, ty)),
            OpArg::blue(AbsVal::new("attr", 1, STR), Constant::from(attr)),
        ];
        if let Some(value) = value {
            args.push(OpArg::red(AbsVal::new("v", 2, value)));
        }
        args
    }

    #[test]
    fn struct_is_typedef_of_rawbuffer() {
        let (r, ty) = setup();
        assert_eq!(r.expect_type(ty).unwrap().typedef_of, Some(RAWBUFFER));
        assert!(r.compatible(ty, RAWBUFFER));
        assert!(!r.compatible(RAWBUFFER, ty));
    }

    #[test]
    fn getattr_plan_drops_attribute_name() {
        let (r, ty) = setup();
        let getattr = r.operator(OpKind::GetAttr).unwrap();
        let op = r.resolve(getattr, &[ty, STR], &attr_args(ty, "x", None));
        assert_eq!(op.func().unwrap().qn.to_string(), "geom::Point::__get_x__");
        assert_eq!(op.restype(), Some(I32));
        assert!(!op.is_simple());

        let missing = r.resolve(getattr, &[ty, STR], &attr_args(ty, "z", None));
        assert!(missing.is_null());
    }

    #[test]
    fn setattr_then_getattr() {
        let (r, ty) = setup();
        let p = new_point(&r);
        let setattr = r.operator(OpKind::SetAttr).unwrap();
        let getattr = r.operator(OpKind::GetAttr).unwrap();

        let set = r.resolve(setattr, &[ty, STR, I32], &attr_args(ty, "y", Some(I32)));
        assert_eq!(set.restype(), Some(VOID));
        set.call(&mut Native, vec![p.clone(), Value::from("y"), Value::I32(-7)])
            .unwrap();

        let get = r.resolve(getattr, &[ty, STR], &attr_args(ty, "y", None));
        let y = get.call(&mut Native, vec![p.clone(), Value::from("y")]).unwrap();
        assert_eq!(y, Value::I32(-7));

        let get_x = r.resolve(getattr, &[ty, STR], &attr_args(ty, "x", None));
        assert_eq!(
            get_x.call(&mut Native, vec![p, Value::from("x")]).unwrap(),
            Value::I32(0)
        );
    }

    #[test]
    fn setattr_rejects_wrong_value_type() {
        let (r, ty) = setup();
        let setattr = r.operator(OpKind::SetAttr).unwrap();
        let op = r.resolve(setattr, &[ty, STR, STR], &attr_args(ty, "x", Some(STR)));
        assert!(op.is_null());
    }

    #[test]
    fn equality_compares_bytes() {
        let (r, ty) = setup();
        let eq = r.operator(OpKind::Eq).unwrap();
        let args = [
            OpArg::red(AbsVal::new("a", 0, ty)),
            OpArg::red(AbsVal::new("b", 1, ty)),
        ];
        let op = r.resolve(eq, &[ty, ty], &args);
        let a = new_point(&r);
        let b = new_point(&r);
        assert_eq!(
            op.call(&mut Native, vec![a.clone(), b.clone()]).unwrap(),
            Value::Bool(true)
        );

        let setattr = r.operator(OpKind::SetAttr).unwrap();
        r.resolve(setattr, &[ty, STR, BOOL], &attr_args(ty, "visible", Some(BOOL)))
            .call(&mut Native, vec![b.clone(), Value::from("visible"), Value::Bool(true)])
            .unwrap();
        assert_eq!(op.call(&mut Native, vec![a, b]).unwrap(), Value::Bool(false));

        let mixed = r.resolve(
            eq,
            &[ty, I32],
            &[
                OpArg::red(AbsVal::new("a", 0, ty)),
                OpArg::red(AbsVal::new("b", 1, I32)),
            ],
        );
        assert!(mixed.is_null());
    }

    #[test]
    fn unsupported_field_type() {
        let mut b = RegistryBuilder::new();
        crate::register_all(&mut b).unwrap();
        let err = StructBuilder::new("geom", "Label")
            .field("text", STR)
            .register(&mut b)
            .err()
            .unwrap();
        assert!(matches!(err, RegistrationError::InvalidField { .. }));
    }
}
