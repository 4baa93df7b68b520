//! Module building: signatures first, then bodies.
//!
//! ## Passes
//!
//! 1. **Signatures**: resolve every function type and reject duplicate
//!    names and unsupported top-level declarations.
//! 2. **Bodies**: check and generate every function, blue functions first
//!    so red code can fold calls to them.
//!
//! User errors are collected across the whole module; an internal error
//! stops the build immediately.

use rustc_hash::FxHashMap;
use spy_ast::{self as ast, Decl, FuncDef};
use spy_core::{
    Color, CompilationError, CompileErrors, FuncRef, Function, InternalError, QualifiedName,
    SpyError,
};
use spy_registry::OperatorRegistry;
use tracing::debug;

use crate::checker::{FunctionChecker, Signature};
use crate::codegen::CodeGen;
use crate::type_resolver::TypeResolver;
use crate::{BlueEvaluator, CompileOptions};

// ============================================================================
// Module
// ============================================================================

/// The compiled functions of one source module.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    functions: FxHashMap<String, FuncRef>,
    order: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Function by unqualified name.
    pub fn get(&self, name: &str) -> Option<&FuncRef> {
        self.functions.get(name)
    }

    /// Function by qualified name, when it belongs to this module.
    pub fn lookup(&self, qn: &QualifiedName) -> Option<&FuncRef> {
        if qn.module() != self.name {
            return None;
        }
        self.get(&qn.name)
    }

    /// Add a function, replacing one of the same name.
    pub fn insert(&mut self, func: FuncRef) {
        let name = func.qn.name.clone();
        if self.functions.insert(name.clone(), func).is_none() {
            self.order.push(name);
        }
    }

    /// Functions in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &FuncRef> {
        self.order.iter().filter_map(|n| self.functions.get(n))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// ============================================================================
// ModuleGen
// ============================================================================

/// Builds a [`Module`] from its syntax tree.
pub struct ModuleGen<'a> {
    registry: &'a OperatorRegistry,
    options: CompileOptions,
    evaluator: Option<&'a mut dyn BlueEvaluator>,
}

impl<'a> ModuleGen<'a> {
    pub fn new(registry: &'a OperatorRegistry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
            evaluator: None,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluator for blue calls. Without one, blue calls run at run time.
    pub fn with_evaluator(mut self, evaluator: &'a mut dyn BlueEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Run both passes.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(mut self, source: &ast::Module) -> Result<Module, SpyError> {
        debug!(module = %source.name, decls = source.decls.len(), "building module");
        let signatures = self.collect_signatures(source)?;

        let mut pending = Module::new(source.name.clone());
        let mut errors = CompileErrors::new();
        let (blue, red): (Vec<&Decl>, Vec<&Decl>) = source
            .decls
            .iter()
            .partition(|d| matches!(d, Decl::FuncDef(f) if f.color == Color::Blue));

        for decl in blue.into_iter().chain(red) {
            let Decl::FuncDef(def) = decl else {
                return Err(InternalError::UnsupportedDeclaration(decl.kind_name()).into());
            };
            let sig = signatures
                .get(&def.name)
                .ok_or_else(|| InternalError::MissingSignature(def.name.clone()))?;
            match self.build_function(&signatures, &pending, &source.name, def, sig) {
                Ok(func) => pending.insert(func),
                Err(SpyError::Compilation(e)) => errors.extend(e),
                Err(other) => return Err(other),
            }
        }

        errors.into_result()?;
        debug!(module = %pending.name, functions = pending.len(), "built module");
        Ok(pending)
    }

    fn build_function(
        &mut self,
        signatures: &FxHashMap<String, Signature>,
        pending: &Module,
        module_name: &str,
        def: &FuncDef,
        sig: &Signature,
    ) -> Result<FuncRef, SpyError> {
        let mut checker = FunctionChecker::new(self.registry, signatures, module_name, pending)
            .with_options(self.options);
        if let Some(evaluator) = self.evaluator.as_mut() {
            checker = checker.with_evaluator(&mut **evaluator);
        }
        let typed = checker.check(def, sig)?;
        let code = CodeGen::generate(&typed)?;
        Ok(std::sync::Arc::new(Function::script(
            sig.qn.clone(),
            sig.functype.clone(),
            sig.color,
            code,
        )))
    }

    /// Pass 1.
    fn collect_signatures(&self, source: &ast::Module) -> Result<FxHashMap<String, Signature>, CompileErrors> {
        let resolver = TypeResolver::new(self.registry);
        let mut signatures: FxHashMap<String, Signature> = FxHashMap::default();
        let mut errors = CompileErrors::new();

        for decl in &source.decls {
            let def = match decl {
                Decl::FuncDef(def) => def,
                Decl::GlobalVarDef(var) => {
                    errors.push(CompilationError::UnsupportedDeclaration {
                        kind: decl.kind_name(),
                        span: var.span,
                    });
                    continue;
                }
            };
            if let Some(existing) = signatures.get(&def.name) {
                errors.push(CompilationError::DuplicateDefinition {
                    name: def.name.clone(),
                    span: def.span,
                    original_span: existing.span,
                });
                continue;
            }
            match resolver.signature(def) {
                Ok(functype) => {
                    signatures.insert(
                        def.name.clone(),
                        Signature {
                            qn: QualifiedName::new(source.name.clone(), def.name.clone()),
                            functype,
                            color: def.color,
                            span: def.span,
                        },
                    );
                }
                Err(e) => errors.extend(e),
            }
        }

        errors.into_result()?;
        Ok(signatures)
    }
}
