//! Shared helpers for integration tests.

#![allow(dead_code)]

use spy::ast::{Decl, Expr, FuncDef, Module, Param, Stmt, TypeExpr};
use spy::{Span, SpyVm, VmConfig};

/// Route `tracing` output to the test harness once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn vm() -> SpyVm {
    init_tracing();
    SpyVm::new(VmConfig::default()).expect("built-in registration")
}

pub fn module(name: &str, funcs: Vec<FuncDef>) -> Module {
    Module::new(name, funcs.into_iter().map(FuncDef::into_decl).collect::<Vec<Decl>>())
}

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

pub fn ty_at(name: &str, line: u32, col: u32) -> TypeExpr {
    TypeExpr::named(name).at(Span::new(line, col, name.len() as u32))
}

/// `def name(p: t, ...) -> ret:` with `body`.
pub fn red(name: &str, params: &[(&str, &str)], ret: Option<&str>, body: Vec<Stmt>) -> FuncDef {
    let mut f = FuncDef::new(name);
    for (p, t) in params {
        f = f.param(Param::typed(*p, *t));
    }
    if let Some(ret) = ret {
        f = f.returns(ty(ret));
    }
    f.body(body)
}

/// `@blue def name(p, ...):` with `body`.
pub fn blue(name: &str, params: &[&str], body: Vec<Stmt>) -> FuncDef {
    let mut f = FuncDef::new(name).blue();
    for p in params {
        f = f.param(Param::untyped(*p));
    }
    f.body(body)
}

pub fn name(n: &str) -> Expr {
    Expr::name(n)
}

pub fn at(line: u32, col: u32, len: u32) -> Span {
    Span::new(line, col, len)
}
