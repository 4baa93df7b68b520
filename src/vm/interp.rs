//! The operation interpreter.
//!
//! Calls between compiled functions run in one loop over an explicit
//! [`StackFrame`] stack, so script recursion never grows the native stack.
//! Natives are called directly.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spy_compiler::{BlueEvaluator, Module};
use spy_core::bytecode::{CodeObject, Instruction, OpCode};
use spy_core::builtins::DYNAMIC;
use spy_core::{
    AbsVal, Caller, FuncRef, Function, FunctionBody, InternalError, OpArg, QualifiedName,
    RuntimeError, SpyError, TypeHash, TypeLookup, Value,
};
use spy_registry::{OperatorRegistry, StubId};
use tracing::trace;

use crate::config::VmConfig;

// ============================================================================
// StackFrame
// ============================================================================

/// Locals, operand stack and resume point of one executing function.
pub(crate) struct StackFrame {
    code: Arc<CodeObject>,
    restype: TypeHash,
    ip: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl StackFrame {
    fn new(code: Arc<CodeObject>, restype: TypeHash, args: Vec<Value>) -> Self {
        let mut locals = vec![Value::Void; code.locals().len().max(args.len())];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = arg;
        }
        Self {
            code,
            restype,
            ip: 0,
            locals,
            stack: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, InternalError> {
        self.stack
            .pop()
            .ok_or_else(|| InternalError::StackUnderflow(self.code.name.to_string()))
    }

    fn pop_n(&mut self, count: u32) -> Result<Vec<Value>, InternalError> {
        let count = count as usize;
        if self.stack.len() < count {
            return Err(InternalError::StackUnderflow(self.code.name.to_string()));
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn get_local(&self, op: &'static str, slot: u32) -> Result<Value, InternalError> {
        self.locals
            .get(slot as usize)
            .cloned()
            .ok_or(InternalError::BadOperand { op, operand: slot })
    }

    fn set_local(&mut self, op: &'static str, slot: u32, value: Value) -> Result<(), InternalError> {
        let local = self
            .locals
            .get_mut(slot as usize)
            .ok_or(InternalError::BadOperand { op, operand: slot })?;
        *local = value;
        Ok(())
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Executes functions against a registry and the loaded modules.
///
/// While a module is being compiled, `pending` holds its functions built so
/// far so blue functions can reach their siblings.
pub(crate) struct Interpreter<'a> {
    registry: &'a OperatorRegistry,
    modules: &'a FxHashMap<String, Arc<Module>>,
    pending: Option<&'a Module>,
    config: &'a VmConfig,
    /// Frames live across this interpreter and any nested runs.
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        registry: &'a OperatorRegistry,
        modules: &'a FxHashMap<String, Arc<Module>>,
        config: &'a VmConfig,
    ) -> Self {
        Self {
            registry,
            modules,
            pending: None,
            config,
            depth: 0,
        }
    }

    /// Find a callee by qualified name.
    pub(crate) fn resolve_callee(&self, qn: &QualifiedName) -> Result<FuncRef, RuntimeError> {
        self.pending
            .and_then(|m| m.lookup(qn))
            .or_else(|| self.modules.get(&qn.module()).and_then(|m| m.lookup(qn)))
            .or_else(|| self.registry.function(qn))
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownFunction(qn.to_string()))
    }

    fn run(&mut self, func: &Function, code: &Arc<CodeObject>, args: Vec<Value>) -> Result<Value, SpyError> {
        let base = self.depth;
        let result = self.execute(func, code, args);
        self.depth = base;
        result
    }

    /// Push a frame for `func`, enforcing arity and the depth limit.
    fn enter(
        &mut self,
        frames: &mut Vec<StackFrame>,
        func: &Function,
        code: Arc<CodeObject>,
        args: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        if args.len() != code.param_count() {
            return Err(RuntimeError::ArgumentCount {
                name: func.qn.to_string(),
                expected: code.param_count(),
                got: args.len(),
            });
        }
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow(self.config.max_call_depth));
        }
        self.depth += 1;
        frames.push(StackFrame::new(code, func.functype.restype, args));
        Ok(())
    }

    fn execute(&mut self, func: &Function, code: &Arc<CodeObject>, args: Vec<Value>) -> Result<Value, SpyError> {
        let mut frames: Vec<StackFrame> = Vec::new();
        self.enter(&mut frames, func, Arc::clone(code), args)?;

        loop {
            let frame = frames
                .last_mut()
                .ok_or_else(|| InternalError::StackUnderflow(func.qn.to_string()))?;
            let code = Arc::clone(&frame.code);
            let ip = frame.ip;
            let Some(instr) = code.instructions().get(ip) else {
                return Err(InternalError::FellOffEnd(code.name.to_string()).into());
            };
            frame.ip += 1;

            trace!(func = %code.name, ip, op = %instr, depth = self.depth, "step");
            match instr.op() {
                OpCode::ConstLoad => {
                    let value = constant(&code, instr)?;
                    frame.push(value);
                }
                OpCode::LocalGet => {
                    let value = frame.get_local("local_get", instr.operand(0))?;
                    frame.push(value);
                }
                OpCode::LocalSet => {
                    let value = frame.pop()?;
                    frame.set_local("local_set", instr.operand(0), value)?;
                }
                OpCode::Call => {
                    let qn = code.callee(instr.operand(0)).ok_or(InternalError::BadOperand {
                        op: "call",
                        operand: instr.operand(0),
                    })?;
                    let callee = self.resolve_callee(qn)?;
                    let args = frame.pop_n(instr.operand(1))?;
                    match &callee.body {
                        FunctionBody::Script(callee_code) => {
                            self.enter(&mut frames, &callee, Arc::clone(callee_code), args)?;
                        }
                        FunctionBody::Native(_) => {
                            let result = self.call_function(&callee, args)?;
                            frame.push(result);
                        }
                    }
                }
                OpCode::CallOpImpl => {
                    let opimpl = code
                        .opimpl(instr.operand(0))
                        .ok_or(InternalError::BadOperand {
                            op: "call_opimpl",
                            operand: instr.operand(0),
                        })?
                        .clone();
                    let args = frame.pop_n(instr.operand(1))?;
                    let result = opimpl.call(self, args)?;
                    frame.push(result);
                }
                OpCode::CallDynamic => {
                    let args = frame.pop_n(instr.operand(1))?;
                    let result = self.call_dynamic(StubId(instr.operand(0)), args, instr.operand(2))?;
                    frame.push(result);
                }
                OpCode::Pop => {
                    frame.pop()?;
                }
                OpCode::Return => {
                    let value = frame.pop()?;
                    self.check_return(frame.restype, &value)?;
                    frames.pop();
                    self.depth -= 1;
                    match frames.last_mut() {
                        Some(caller) => caller.push(value),
                        None => return Ok(value),
                    }
                }
                OpCode::Abort => {
                    let message = constant(&code, instr)?;
                    let message = message.as_str().unwrap_or_default().to_string();
                    return Err(RuntimeError::Abort { message }.into());
                }
            }
        }
    }

    /// Resolve an operator on run-time types and call the result.
    ///
    /// Only arguments flagged in `blue_mask` were constants at the call site;
    /// every other value is passed as red so resolutions stay keyed on
    /// compile-time information.
    fn call_dynamic(&mut self, stub: StubId, args: Vec<Value>, blue_mask: u32) -> Result<Value, SpyError> {
        let types: Vec<_> = args.iter().map(Value::dynamic_type).collect();
        let op_args: Vec<OpArg> = args
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let abs = AbsVal::new(format!("v{i}"), i, value.dynamic_type());
                let blue = i < u32::BITS as usize && blue_mask & (1 << i) != 0;
                match value.to_constant() {
                    Some(c) if blue => OpArg::blue(abs, c),
                    _ => OpArg::red(abs),
                }
            })
            .collect();

        let opimpl = self.registry.resolve(stub, &types, &op_args);
        if opimpl.is_null() {
            let op = match self.registry.stub(stub) {
                Some(s) => s.kind.map(|k| k.symbol().to_string()).unwrap_or_else(|| s.qn.to_string()),
                None => stub.to_string(),
            };
            return Err(RuntimeError::NoOperator {
                op,
                types: types.iter().map(|t| self.registry.type_name(*t)).collect(),
            }
            .into());
        }
        trace!(%stub, "dynamic dispatch");
        opimpl.call(self, args)
    }

    fn check_return(&self, declared: TypeHash, value: &Value) -> Result<(), RuntimeError> {
        if declared == DYNAMIC || self.registry.compatible(value.dynamic_type(), declared) {
            return Ok(());
        }
        Err(RuntimeError::TypeError {
            expected: self.registry.type_name(declared),
            got: value_type_name(self.registry, value),
        })
    }
}

/// Type name of a run-time value for diagnostics. Buffers are named after
/// the struct type that owns their layout.
pub(crate) fn value_type_name(registry: &OperatorRegistry, value: &Value) -> String {
    match value {
        Value::Buffer(buf) => registry.type_name(buf.ty),
        other => other.kind_name().to_string(),
    }
}

fn constant(code: &CodeObject, instr: &Instruction) -> Result<Value, InternalError> {
    code.constant(instr.operand(0))
        .cloned()
        .map(Value::from)
        .ok_or(InternalError::BadOperand {
            op: instr.op().name(),
            operand: instr.operand(0),
        })
}

impl Caller for Interpreter<'_> {
    fn call_function(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, SpyError> {
        match &func.body {
            FunctionBody::Native(native) => {
                trace!(func = %func.qn, args = args.len(), "native call");
                Ok(native.call(&args)?)
            }
            FunctionBody::Script(code) => self.run(func, code, args),
        }
    }
}

impl BlueEvaluator for Interpreter<'_> {
    fn eval_blue(&mut self, pending: &Module, func: &Function, args: Vec<Value>) -> Result<Value, SpyError> {
        let mut inner = Interpreter {
            registry: self.registry,
            modules: self.modules,
            pending: Some(pending),
            config: self.config,
            depth: self.depth,
        };
        inner.call_function(func, args)
    }
}
