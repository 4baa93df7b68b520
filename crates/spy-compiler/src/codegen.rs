//! Lowering of checked functions to operation sequences.

use spy_core::bytecode::{CodeObject, Instruction, OpCode};
use spy_core::{
    Constant, InternalError, Span,
    builtins::{DYNAMIC, VOID},
};
use tracing::trace;

use crate::ir::{TypedExpr, TypedExprKind, TypedFunction, TypedStmt};

/// Message of the abort emitted when a value-returning function can reach
/// its end.
pub const MISSING_RETURN: &str = "reached the end of the function without a `return`";

/// Emits one [`CodeObject`].
pub struct CodeGen {
    code: CodeObject,
}

impl CodeGen {
    /// Generate the code of a checked function.
    pub fn generate(func: &TypedFunction) -> Result<CodeObject, InternalError> {
        let mut emitter = CodeGen {
            code: CodeObject::new(func.qn.clone()),
        };
        emitter.code.set_locals(func.locals.clone(), func.param_count);

        for stmt in &func.body {
            emitter.emit_stmt(stmt)?;
        }
        if func.falls_through() {
            emitter.emit_implicit_return(func.functype.restype, func.span)?;
        }

        trace!(
            func = %func.qn,
            instructions = emitter.code.instructions().len(),
            "generated code"
        );
        Ok(emitter.code)
    }

    fn emit(&mut self, op: OpCode, operands: impl Into<Vec<u32>>, span: Span) -> Result<(), InternalError> {
        let instruction = Instruction::new(op, operands)?.at(span);
        self.code.push(instruction);
        Ok(())
    }

    fn emit_implicit_return(&mut self, restype: spy_core::TypeHash, span: Span) -> Result<(), InternalError> {
        if restype == VOID || restype == DYNAMIC {
            let none = self.code.add_constant(Constant::Void);
            self.emit(OpCode::ConstLoad, [none], span)?;
            self.emit(OpCode::Return, [], span)
        } else {
            let msg = self.code.add_constant(Constant::from(MISSING_RETURN));
            self.emit(OpCode::Abort, [msg], span)
        }
    }

    fn emit_stmt(&mut self, stmt: &TypedStmt) -> Result<(), InternalError> {
        match stmt {
            TypedStmt::Store { slot, value, span } => {
                self.emit_expr(value)?;
                self.emit(OpCode::LocalSet, [*slot], *span)
            }
            TypedStmt::Return { value, span } => {
                self.emit_expr(value)?;
                self.emit(OpCode::Return, [], *span)
            }
            TypedStmt::Expr { value, span } => {
                self.emit_expr(value)?;
                self.emit(OpCode::Pop, [], *span)
            }
        }
    }

    fn emit_args(&mut self, args: &[TypedExpr]) -> Result<u32, InternalError> {
        for arg in args {
            self.emit_expr(arg)?;
        }
        Ok(args.len() as u32)
    }

    fn emit_expr(&mut self, expr: &TypedExpr) -> Result<(), InternalError> {
        let span = expr.span;
        match &expr.kind {
            TypedExprKind::Const(value) => {
                let idx = self.code.add_constant(value.clone());
                self.emit(OpCode::ConstLoad, [idx], span)
            }
            TypedExprKind::Local(slot) => self.emit(OpCode::LocalGet, [*slot], span),
            TypedExprKind::OpCall { opimpl, args } => {
                if opimpl.is_null() {
                    return Err(InternalError::NullOpImplCall);
                }
                let argc = self.emit_args(args)?;
                let idx = self.code.add_opimpl(opimpl.clone());
                self.emit(OpCode::CallOpImpl, [idx, argc], span)
            }
            TypedExprKind::DynOp { stub, args, .. } => {
                let argc = self.emit_args(args)?;
                self.emit(OpCode::CallDynamic, [stub.0, argc, blue_mask(args)], span)
            }
            TypedExprKind::Call { callee, args } => {
                let argc = self.emit_args(args)?;
                let idx = self.code.add_callee(callee.clone());
                self.emit(OpCode::Call, [idx, argc], span)
            }
        }
    }
}

/// Bit `i` set when argument `i` is a compile-time constant. Arguments past
/// the 32nd are always treated as run-time values.
fn blue_mask(args: &[TypedExpr]) -> u32 {
    args.iter()
        .take(u32::BITS as usize)
        .enumerate()
        .filter(|(_, arg)| arg.is_blue())
        .fold(0, |mask, (i, _)| mask | (1 << i))
}
