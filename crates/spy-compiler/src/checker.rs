//! Function body type checking.
//!
//! [`FunctionChecker`] walks one function definition, assigns every local a
//! slot, computes the static type of every expression and resolves every
//! operator use through the registry. User errors are accumulated per
//! statement; internal errors end the pass immediately.

use rustc_hash::FxHashMap;
use spy_ast::{BinaryOp, Expr, ExprKind, FuncDef, Literal, Stmt, StmtKind, UnaryOp, VarDef};
use spy_core::{
    AbsVal, Color, CompilationError, CompileErrors, Constant, FuncType, InternalError,
    MismatchReason, OpArg, OpKind, QualifiedName, Span, SpyError, TypeLookup, Value,
    builtins::DYNAMIC,
};
use spy_registry::OperatorRegistry;
use tracing::{debug, trace};

use crate::ir::{TypedExpr, TypedExprKind, TypedFunction, TypedStmt};
use crate::scope::{LocalScope, RETURN_BINDING};
use crate::type_resolver::TypeResolver;
use crate::{BlueEvaluator, CompileOptions, Module};

/// Resolved signature of a module-level function.
#[derive(Debug, Clone)]
pub struct Signature {
    pub qn: QualifiedName,
    pub functype: FuncType,
    pub color: Color,
    pub span: Span,
}

/// Why checking an expression stopped.
enum Failure {
    User(CompilationError),
    Fatal(SpyError),
}

impl From<CompilationError> for Failure {
    fn from(error: CompilationError) -> Self {
        Failure::User(error)
    }
}

impl From<InternalError> for Failure {
    fn from(error: InternalError) -> Self {
        Failure::Fatal(error.into())
    }
}

type Check<T> = Result<T, Failure>;

/// A callee found by name.
struct Callee {
    qn: QualifiedName,
    functype: FuncType,
    color: Color,
    span: Span,
}

/// Type checker for one function.
pub struct FunctionChecker<'a> {
    registry: &'a OperatorRegistry,
    signatures: &'a FxHashMap<String, Signature>,
    module_name: &'a str,
    pending: &'a Module,
    evaluator: Option<&'a mut dyn BlueEvaluator>,
    options: CompileOptions,
    color: Color,
    scope: LocalScope,
    errors: CompileErrors,
}

impl<'a> FunctionChecker<'a> {
    pub fn new(
        registry: &'a OperatorRegistry,
        signatures: &'a FxHashMap<String, Signature>,
        module_name: &'a str,
        pending: &'a Module,
    ) -> Self {
        Self {
            registry,
            signatures,
            module_name,
            pending,
            evaluator: None,
            options: CompileOptions::default(),
            color: Color::Red,
            scope: LocalScope::new(DYNAMIC, Span::default()),
            errors: CompileErrors::new(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluator used to fold calls to blue functions.
    pub fn with_evaluator(mut self, evaluator: &'a mut dyn BlueEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Check `def` against its resolved signature.
    pub fn check(mut self, def: &FuncDef, sig: &Signature) -> Result<TypedFunction, SpyError> {
        self.color = sig.color;
        self.scope = LocalScope::new(sig.functype.restype, TypeResolver::return_span(def));
        for (param, ty) in def.params.iter().zip(&sig.functype.params) {
            if let Err(e) = self.scope.declare_param(&param.name, *ty, param.span) {
                self.errors.push(e);
            }
        }

        let mut body = Vec::with_capacity(def.body.len());
        for stmt in &def.body {
            match self.check_stmt(stmt) {
                Ok(Some(typed)) => body.push(typed),
                Ok(None) => {}
                Err(Failure::User(e)) => self.errors.push(e),
                Err(Failure::Fatal(e)) => return Err(e),
            }
        }

        if !self.errors.is_empty() {
            debug!(func = %sig.qn, errors = self.errors.len(), "function has errors");
            return Err(SpyError::Compilation(self.errors));
        }
        trace!(func = %sig.qn, locals = self.scope.len(), "checked function");
        let param_count = self.scope.param_count();
        Ok(TypedFunction {
            qn: sig.qn.clone(),
            functype: sig.functype.clone(),
            color: sig.color,
            locals: self.scope.into_slots(),
            param_count,
            body,
            span: def.span,
        })
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn check_stmt(&mut self, stmt: &Stmt) -> Check<Option<TypedStmt>> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::VarDef(var) => self.check_vardef(var, span),
            StmtKind::Assign { target, value } => {
                let value = self.check_expr(value)?;
                let slot = match self.scope.lookup(target) {
                    Some(var) => {
                        let slot = var.slot;
                        self.scope
                            .typecheck_local(self.registry, value.span, target, value.ty)?;
                        self.scope.mark_initialized(target);
                        slot
                    }
                    None => self.scope.declare_local(target, value.ty, span, true)?,
                };
                Ok(Some(TypedStmt::Store { slot, value, span }))
            }
            StmtKind::SetAttr {
                target,
                attr,
                value,
            } => {
                let target = self.check_expr(target)?;
                let attr = TypedExpr::constant(Constant::from(attr.as_str()), span);
                let value = self.check_expr(value)?;
                let value = self.resolve_op(OpKind::SetAttr, vec![target, attr, value], span)?;
                Ok(Some(TypedStmt::Expr { value, span }))
            }
            StmtKind::SetItem {
                target,
                index,
                value,
            } => {
                let args = vec![
                    self.check_expr(target)?,
                    self.check_expr(index)?,
                    self.check_expr(value)?,
                ];
                let value = self.resolve_op(OpKind::SetItem, args, span)?;
                Ok(Some(TypedStmt::Expr { value, span }))
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.check_expr(expr)?,
                    None => TypedExpr::constant(Constant::Void, span),
                };
                self.scope
                    .typecheck_local(self.registry, value.span, RETURN_BINDING, value.ty)?;
                Ok(Some(TypedStmt::Return { value, span }))
            }
            StmtKind::Expr(expr) => {
                let value = self.check_expr(expr)?;
                Ok(Some(TypedStmt::Expr { value, span }))
            }
        }
    }

    fn check_vardef(&mut self, var: &VarDef, stmt_span: Span) -> Check<Option<TypedStmt>> {
        let span = if var.span.is_unknown() { stmt_span } else { var.span };
        let ty = match &var.ty {
            Some(ty) => TypeResolver::new(self.registry).resolve(ty)?,
            None => {
                let Some(value) = &var.value else {
                    return Err(CompilationError::MissingAnnotation {
                        name: var.name.clone(),
                        span,
                    }
                    .into());
                };
                let value = self.check_expr(value)?;
                let slot = self.scope.declare_local(&var.name, value.ty, span, true)?;
                return Ok(Some(TypedStmt::Store { slot, value, span }));
            }
        };

        // Uninitialized until the initializer has been checked.
        let slot = self.scope.declare_local(&var.name, ty, span, false)?;
        let Some(value) = &var.value else {
            return Ok(None);
        };
        let value = self.check_expr(value)?;
        self.scope
            .typecheck_local(self.registry, value.span, &var.name, value.ty)?;
        self.scope.mark_initialized(&var.name);
        Ok(Some(TypedStmt::Store { slot, value, span }))
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn check_expr(&mut self, expr: &Expr) -> Check<TypedExpr> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Name(name) => {
                let var = self
                    .scope
                    .lookup(name)
                    .ok_or_else(|| CompilationError::NameError {
                        name: name.clone(),
                        span,
                    })?;
                if !var.initialized {
                    return Err(CompilationError::UninitializedLocal {
                        name: name.clone(),
                        span,
                        decl_span: var.span,
                    }
                    .into());
                }
                Ok(TypedExpr::local(var.slot, var.ty, span))
            }
            ExprKind::Constant(lit) => Ok(TypedExpr::constant(literal(lit, span)?, span)),
            ExprKind::BinOp { op, left, right } => {
                let args = vec![self.check_expr(left)?, self.check_expr(right)?];
                self.resolve_op(binary_kind(*op), args, span)
            }
            ExprKind::UnaryOp { op, operand } => {
                let kind = match op {
                    UnaryOp::Neg => OpKind::Neg,
                    UnaryOp::Not => OpKind::Not,
                };
                let args = vec![self.check_expr(operand)?];
                self.resolve_op(kind, args, span)
            }
            ExprKind::GetItem { value, index } => {
                let args = vec![self.check_expr(value)?, self.check_expr(index)?];
                self.resolve_op(OpKind::GetItem, args, span)
            }
            ExprKind::GetAttr { value, attr } => {
                let target = self.check_expr(value)?;
                let attr = TypedExpr::constant(Constant::from(attr.as_str()), span);
                self.resolve_op(OpKind::GetAttr, vec![target, attr], span)
            }
            ExprKind::CallMethod {
                target,
                method,
                args,
            } => {
                let mut all = Vec::with_capacity(args.len() + 2);
                all.push(self.check_expr(target)?);
                all.push(TypedExpr::constant(Constant::from(method.as_str()), span));
                for arg in args {
                    all.push(self.check_expr(arg)?);
                }
                self.resolve_op(OpKind::CallMethod, all, span)
            }
            ExprKind::Call { func, args } => self.check_call(func, args, span),
        }
    }

    /// Resolve an operator use from the static types of its arguments.
    fn resolve_op(&mut self, kind: OpKind, args: Vec<TypedExpr>, span: Span) -> Check<TypedExpr> {
        let stub = self.registry.operator(kind)?;
        if args.iter().any(|a| a.ty == DYNAMIC) {
            return Ok(TypedExpr {
                kind: TypedExprKind::DynOp { kind, stub, args },
                ty: DYNAMIC,
                blue: None,
                span,
            });
        }

        let types: Vec<_> = args.iter().map(|a| a.ty).collect();
        let op_args: Vec<_> = args
            .iter()
            .enumerate()
            .map(|(i, a)| OpArg {
                abs: AbsVal::new(format!("v{i}"), i, a.ty).at(a.span),
                blue: a.blue.clone(),
            })
            .collect();
        let opimpl = self.registry.resolve(stub, &types, &op_args);
        let Some(restype) = opimpl.restype() else {
            return Err(CompilationError::NoOperator {
                op: kind.symbol().to_string(),
                types: types.iter().map(|t| self.registry.type_name(*t)).collect(),
                span,
            }
            .into());
        };
        Ok(TypedExpr {
            kind: TypedExprKind::OpCall { opimpl, args },
            ty: restype,
            blue: None,
            span,
        })
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn check_call(&mut self, name: &str, args: &[Expr], span: Span) -> Check<TypedExpr> {
        let callee = self.lookup_function(name, span)?;
        let mut typed = Vec::with_capacity(args.len());
        for arg in args {
            typed.push(self.check_expr(arg)?);
        }

        if typed.len() != callee.functype.arity() {
            return Err(CompilationError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: callee.functype.arity(),
                got: typed.len(),
                span,
            }
            .into());
        }
        for (arg, param) in typed.iter().zip(&callee.functype.params) {
            if !self.registry.compatible(arg.ty, *param) {
                return Err(CompilationError::TypeMismatch {
                    expected: self.registry.type_name(*param),
                    got: self.registry.type_name(arg.ty),
                    span: arg.span,
                    expected_span: callee.span,
                    reason: MismatchReason::Argument,
                }
                .into());
            }
        }

        if callee.color == Color::Blue && self.color == Color::Red {
            if !typed.iter().all(TypedExpr::is_blue) {
                return Err(CompilationError::BlueCallNeedsConstants {
                    name: name.to_string(),
                    span,
                }
                .into());
            }
            if let Some(folded) = self.fold_blue_call(name, &callee, &typed, span)? {
                return Ok(folded);
            }
        }

        Ok(TypedExpr {
            kind: TypedExprKind::Call {
                callee: callee.qn,
                args: typed,
            },
            ty: callee.functype.restype,
            blue: None,
            span,
        })
    }

    /// Evaluate a blue call now. `None` leaves it as a run-time call.
    fn fold_blue_call(
        &mut self,
        name: &str,
        callee: &Callee,
        args: &[TypedExpr],
        span: Span,
    ) -> Check<Option<TypedExpr>> {
        if !self.options.fold_blue_calls {
            return Ok(None);
        }
        let Some(evaluator) = self.evaluator.as_deref_mut() else {
            return Ok(None);
        };
        let func = match self.pending.get(&callee.qn.name) {
            Some(f) if f.qn == callee.qn => f.clone(),
            _ => match self.registry.function(&callee.qn) {
                Some(f) => f.clone(),
                None => return Ok(None),
            },
        };

        let values: Vec<Value> = args
            .iter()
            .filter_map(|a| a.blue.clone().map(Value::from))
            .collect();
        let evaluation_error = |message: String| CompilationError::BlueEvaluation {
            name: name.to_string(),
            message,
            span,
        };
        let result = match evaluator.eval_blue(self.pending, &func, values) {
            Ok(value) => value,
            Err(SpyError::Internal(e)) => return Err(Failure::Fatal(e.into())),
            Err(e) => return Err(evaluation_error(e.to_string()).into()),
        };
        let constant = result.to_constant().ok_or_else(|| {
            evaluation_error(format!(
                "result of type `{}` is not a compile-time constant",
                result.kind_name()
            ))
        })?;
        debug!(func = %callee.qn, result = ?constant, "folded blue call");
        Ok(Some(TypedExpr::constant(constant, span)))
    }

    /// Module functions first, then `builtins`, then fully qualified names.
    fn lookup_function(&self, name: &str, span: Span) -> Check<Callee> {
        let qn = QualifiedName::from_qualified_string(name);
        let local = if !qn.is_qualified() {
            self.signatures.get(name)
        } else if qn.module() == self.module_name {
            self.signatures.get(&qn.name)
        } else {
            None
        };
        if let Some(sig) = local {
            return Ok(Callee {
                qn: sig.qn.clone(),
                functype: sig.functype.clone(),
                color: sig.color,
                span: sig.span,
            });
        }

        let registered = if qn.is_qualified() {
            qn
        } else {
            QualifiedName::new("builtins", name)
        };
        match self.registry.function(&registered) {
            Some(f) => Ok(Callee {
                qn: f.qn.clone(),
                functype: f.functype.clone(),
                color: f.color,
                span: Span::default(),
            }),
            None => Err(CompilationError::NameError {
                name: name.to_string(),
                span,
            }
            .into()),
        }
    }
}

fn literal(lit: &Literal, span: Span) -> Result<Constant, CompilationError> {
    Ok(match lit {
        Literal::Int(v) => Constant::I32(
            i32::try_from(*v).map_err(|_| CompilationError::IntegerOverflow { value: *v, span })?,
        ),
        Literal::Bool(b) => Constant::Bool(*b),
        Literal::Str(s) => Constant::from(s.as_str()),
        Literal::None => Constant::Void,
    })
}

fn binary_kind(op: BinaryOp) -> OpKind {
    match op {
        BinaryOp::Add => OpKind::Add,
        BinaryOp::Sub => OpKind::Sub,
        BinaryOp::Mul => OpKind::Mul,
        BinaryOp::Div => OpKind::Div,
        BinaryOp::Mod => OpKind::Mod,
        BinaryOp::Eq => OpKind::Eq,
        BinaryOp::Ne => OpKind::Ne,
        BinaryOp::Lt => OpKind::Lt,
        BinaryOp::Le => OpKind::Le,
        BinaryOp::Gt => OpKind::Gt,
        BinaryOp::Ge => OpKind::Ge,
    }
}
