//! Type resolution from annotations to registered types.

use spy_ast::{FuncDef, TypeExpr};
use spy_core::{
    Color, CompilationError, CompileErrors, FuncType, Span, TypeHash,
    builtins::{DYNAMIC, VOID},
};
use spy_registry::OperatorRegistry;

/// Resolves type annotations against the registry.
pub struct TypeResolver<'a> {
    registry: &'a OperatorRegistry,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a OperatorRegistry) -> Self {
        Self { registry }
    }

    /// Resolve one annotation.
    pub fn resolve(&self, ty: &TypeExpr) -> Result<TypeHash, CompilationError> {
        self.registry
            .type_by_name(&ty.name)
            .ok_or_else(|| CompilationError::UnknownType {
                name: ty.name.clone(),
                span: ty.span,
            })
    }

    /// Resolve the signature of a function definition.
    ///
    /// Blue functions may omit annotations; missing ones become `dynamic`.
    /// A red function without a return annotation returns `void`, and every
    /// red parameter needs an annotation.
    pub fn signature(&self, def: &FuncDef) -> Result<FuncType, CompileErrors> {
        let mut errors = CompileErrors::new();
        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let ty = match (&param.ty, def.color) {
                (Some(ty), _) => self.resolve(ty),
                (None, Color::Blue) => Ok(DYNAMIC),
                (None, Color::Red) => Err(CompilationError::MissingAnnotation {
                    name: param.name.clone(),
                    span: param.span,
                }),
            };
            match ty {
                Ok(ty) => params.push(ty),
                Err(e) => errors.push(e),
            }
        }

        let restype = match (&def.return_type, def.color) {
            (Some(ty), _) => self.resolve(ty).unwrap_or_else(|e| {
                errors.push(e);
                DYNAMIC
            }),
            (None, Color::Blue) => DYNAMIC,
            (None, Color::Red) => VOID,
        };

        errors.into_result()?;
        Ok(FuncType::new(params, restype))
    }

    /// Location of the return annotation, falling back to the definition.
    pub fn return_span(def: &FuncDef) -> Span {
        def.return_type.as_ref().map_or(def.span, |ty| ty.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spy_ast::Param;
    use spy_core::builtins::{I32, STR};
    use spy_registry::RegistryBuilder;

    fn registry() -> OperatorRegistry {
        let mut b = RegistryBuilder::new();
        spy_modules::register_all(&mut b).unwrap();
        b.finish()
    }

    #[test]
    fn resolves_annotations() {
        let r = registry();
        let resolver = TypeResolver::new(&r);
        let def = FuncDef::new("f")
            .param(Param::typed("x", "i32"))
            .param(Param::typed("s", "str"))
            .returns(TypeExpr::named("i32"));
        let ft = resolver.signature(&def).unwrap();
        assert_eq!(ft.params, vec![I32, STR]);
        assert_eq!(ft.restype, I32);
    }

    #[test]
    fn red_defaults() {
        let r = registry();
        let resolver = TypeResolver::new(&r);
        let ft = resolver.signature(&FuncDef::new("f")).unwrap();
        assert_eq!(ft.restype, VOID);

        let err = resolver
            .signature(&FuncDef::new("g").param(Param::untyped("x").at(Span::new(1, 7, 1))))
            .unwrap_err();
        assert!(matches!(
            err.first(),
            Some(CompilationError::MissingAnnotation { name, .. }) if name == "x"
        ));
    }

    #[test]
    fn blue_defaults_to_dynamic() {
        let r = registry();
        let resolver = TypeResolver::new(&r);
        let ft = resolver
            .signature(&FuncDef::new("f").blue().param(Param::untyped("x")))
            .unwrap();
        assert_eq!(ft.params, vec![DYNAMIC]);
        assert_eq!(ft.restype, DYNAMIC);
    }

    #[test]
    fn unknown_types_are_all_reported() {
        let r = registry();
        let resolver = TypeResolver::new(&r);
        let def = FuncDef::new("f")
            .param(Param::typed("x", "f64"))
            .returns(TypeExpr::named("list"));
        let errors = resolver.signature(&def).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, CompilationError::UnknownType { .. })));
    }
}
