//! The SPy virtual machine.
//!
//! [`SpyVm`] owns the operator registry and every loaded module. Compiling
//! a module runs blue calls through the same interpreter that later
//! executes red code.
//!
//! ```ignore
//! let mut vm = SpyVm::new(VmConfig::default())?;
//! vm.compile_module(&source)?;
//! let result = vm.call("test::add", vec![1.into(), 2.into()])?;
//! ```

mod interp;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spy_ast as ast;
use spy_compiler::{CompileOptions, Module, ModuleGen};
use spy_core::{
    FuncRef, QualifiedName, RegistrationError, RuntimeError, SpyError, TypeLookup, Value,
};
use spy_registry::{OperatorRegistry, RegistryBuilder};
use tracing::{debug, info};

use crate::config::VmConfig;
use interp::{Interpreter, value_type_name};

/// Registry plus loaded modules.
pub struct SpyVm {
    config: VmConfig,
    registry: Arc<OperatorRegistry>,
    modules: FxHashMap<String, Arc<Module>>,
}

impl SpyVm {
    /// Create a VM with the built-in modules registered.
    pub fn new(config: VmConfig) -> Result<Self, SpyError> {
        Self::with_registration(config, |_| Ok(()))
    }

    /// Create a VM, letting `register` add types, hooks and functions
    /// after the built-in modules.
    pub fn with_registration<F>(config: VmConfig, register: F) -> Result<Self, SpyError>
    where
        F: FnOnce(&mut RegistryBuilder) -> Result<(), RegistrationError>,
    {
        let mut builder = RegistryBuilder::new().with_cache(config.cache_opimpls);
        spy_modules::register_all(&mut builder)?;
        register(&mut builder)?;
        let registry = builder.finish();

        info!(
            types = registry.type_count(),
            primitives = registry.primitive_count(),
            "vm ready"
        );
        Ok(Self {
            config,
            registry: Arc::new(registry),
            modules: FxHashMap::default(),
        })
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<OperatorRegistry> {
        &self.registry
    }

    /// A loaded module by name.
    pub fn module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.get(name)
    }

    /// Type check, generate and load a module.
    ///
    /// A module with the same name replaces the earlier one.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_module(&mut self, source: &ast::Module) -> Result<Arc<Module>, SpyError> {
        let options = CompileOptions {
            fold_blue_calls: self.config.fold_blue_calls,
        };
        let module = {
            let mut interp = Interpreter::new(&self.registry, &self.modules, &self.config);
            ModuleGen::new(&self.registry)
                .with_options(options)
                .with_evaluator(&mut interp)
                .build(source)?
        };

        let module = Arc::new(module);
        debug!(module = %module.name, functions = module.len(), "module loaded");
        self.modules.insert(module.name.clone(), Arc::clone(&module));
        Ok(module)
    }

    /// Call a function by qualified name, e.g. `"test::add"`.
    ///
    /// Arguments are checked against the declared parameter types first.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, SpyError> {
        let qn = QualifiedName::from_qualified_string(name);
        let mut interp = Interpreter::new(&self.registry, &self.modules, &self.config);
        let func = interp.resolve_callee(&qn)?;
        self.check_args(&func, &args)?;

        debug!(func = %qn, args = args.len(), "call");
        Ok(spy_core::Caller::call_function(&mut interp, &func, args)?)
    }

    fn check_args(&self, func: &FuncRef, args: &[Value]) -> Result<(), RuntimeError> {
        let params = &func.functype.params;
        if params.len() != args.len() {
            return Err(RuntimeError::ArgumentCount {
                name: func.qn.to_string(),
                expected: params.len(),
                got: args.len(),
            });
        }
        for (param, arg) in params.iter().zip(args) {
            if !self.registry.compatible(arg.dynamic_type(), *param) {
                return Err(RuntimeError::TypeError {
                    expected: self.registry.type_name(*param),
                    got: value_type_name(&self.registry, arg),
                });
            }
        }
        Ok(())
    }
}
