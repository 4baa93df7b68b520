//! End-to-end tests: build modules from syntax trees, then run them.

mod common;

use common::*;
use spy::ast::{BinaryOp, Decl, Expr, Stmt, StmtKind, VarDef};
use spy::builtins::{BOOL, I32};
use spy::config::DEFAULT_MAX_CALL_DEPTH;
use spy::{
    AbsVal, CompilationError, InternalError, MISSING_RETURN, OpKind, RuntimeError, SpyError,
    SpyVm, StructBuilder, Value, VmConfig,
};
use spy_core::bytecode::OpCode;
use spy_core::{MismatchReason, OpArg, TypeHash};

fn first_error(err: &SpyError) -> &CompilationError {
    err.compile_errors()
        .and_then(|e| e.first())
        .expect("a compilation error")
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn add_resolves_to_i32_add() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "add",
            &[("x", "i32"), ("y", "i32")],
            Some("i32"),
            vec![Stmt::ret(Expr::add(name("x"), name("y")))],
        )],
    );
    let m = vm.compile_module(&src).unwrap();

    let add = m.get("add").unwrap();
    let code = add.code().unwrap();
    let opimpl = &code.opimpls()[0];
    assert_eq!(opimpl.func().unwrap().qn.to_string(), "operator::i32_add");
    assert_eq!(
        opimpl.functype().unwrap().display(&**vm.registry()).to_string(),
        "def(i32, i32) -> i32"
    );

    assert_eq!(
        vm.call("test::add", vec![Value::I32(20), Value::I32(22)]).unwrap(),
        Value::I32(42)
    );
}

#[test]
fn resolution_is_cached_and_idempotent() {
    let vm = vm();
    let registry = vm.registry();
    let add = registry.operator(OpKind::Add).unwrap();
    let args = [
        OpArg::red(AbsVal::new("a", 0, I32)),
        OpArg::red(AbsVal::new("b", 1, I32)),
    ];

    let first = registry.resolve(add, &[I32, I32], &args);
    let cached = registry.cached_resolutions();
    let second = registry.resolve(add, &[I32, I32], &args);

    assert_eq!(first, second);
    assert_eq!(registry.cached_resolutions(), cached);
}

#[test]
fn no_operator_names_symbol_and_types() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "bad",
            &[("x", "i32"), ("s", "str")],
            Some("i32"),
            vec![Stmt::ret(Expr::add(name("x"), name("s")).at(at(2, 12, 5)))],
        )],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert!(err.is_compilation());
    assert_eq!(
        first_error(&err).to_string(),
        "at 2:12: operator `+` is not supported for types (`i32`, `str`)"
    );
}

#[test]
fn string_operators_run() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "shout",
            &[("s", "str"), ("n", "i32")],
            Some("str"),
            vec![Stmt::ret(Expr::add(
                Expr::binop(BinaryOp::Mul, name("s"), name("n")),
                Expr::getitem(name("s"), Expr::int(-1)),
            ))],
        )],
    );
    vm.compile_module(&src).unwrap();

    assert_eq!(
        vm.call("test::shout", vec![Value::from("ab"), Value::I32(2)]).unwrap(),
        Value::from("ababb")
    );
}

// ============================================================================
// Type checking
// ============================================================================

#[test]
fn bool_into_i32_local_is_mismatch() {
    let mut vm = vm();
    let source = "def foo() -> i32:\n    x: i32 = 0\n    x = True\n    return x\n";
    let decl = Stmt::new(StmtKind::VarDef(VarDef {
        name: "x".into(),
        ty: Some(ty_at("i32", 2, 8)),
        value: Some(Expr::int(0).at(at(2, 14, 1))),
        span: at(2, 8, 3),
    }))
    .at(at(2, 5, 10));
    let src = module(
        "test",
        vec![red(
            "foo",
            &[],
            Some("i32"),
            vec![
                decl,
                Stmt::assign("x", Expr::bool(true).at(at(3, 9, 4))).at(at(3, 5, 8)),
                Stmt::ret(name("x")),
            ],
        )],
    );

    let err = vm.compile_module(&src).unwrap_err();
    let CompilationError::TypeMismatch {
        expected,
        got,
        span,
        expected_span,
        reason,
    } = first_error(&err)
    else {
        panic!("expected a type mismatch, got {err}");
    };
    assert_eq!(expected, "i32");
    assert_eq!(got, "bool");
    assert_eq!(*span, at(3, 9, 4));
    assert_eq!(*expected_span, at(2, 8, 3));
    assert_eq!(*reason, MismatchReason::Declaration);

    let text = first_error(&err).display_with_source(source);
    assert!(text.contains("expected `i32`, got `bool`"));
    assert!(text.contains("because of type declaration"));
}

#[test]
fn return_mismatch_points_at_annotation() {
    let mut vm = vm();
    let f = red("foo", &[], None, vec![Stmt::ret(Expr::str("x").at(at(2, 12, 3)))])
        .returns(ty_at("i32", 1, 14));
    let err = vm.compile_module(&module("test", vec![f])).unwrap_err();

    let annotations = first_error(&err).annotations();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].message, "expected `i32`, got `str`");
    assert_eq!(annotations[1].message, "expected `i32` because of return type");
    assert_eq!(annotations[1].span, at(1, 14, 3));
}

#[test]
fn duplicate_declaration_keeps_both_locations() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "f",
            &[],
            None,
            vec![
                Stmt::var("x", ty("i32"), Some(Expr::int(1))).at(at(2, 5, 10)),
                Stmt::var("x", ty("bool"), Some(Expr::bool(true))).at(at(3, 5, 13)),
            ],
        )],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert_eq!(
        *first_error(&err),
        CompilationError::DuplicateDeclaration {
            name: "x".into(),
            span: at(3, 5, 13),
            original_span: at(2, 5, 10),
        }
    );
}

#[test]
fn errors_from_several_functions_are_collected() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![
            red("a", &[], Some("i32"), vec![Stmt::ret(name("nope"))]),
            red("b", &[], Some("i32"), vec![Stmt::ret(Expr::bool(false))]),
        ],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert_eq!(err.compile_errors().unwrap().len(), 2);
}

#[test]
fn global_variables_are_rejected() {
    let mut vm = vm();
    let mut src = module("test", vec![]);
    src.decls.push(Decl::GlobalVarDef(VarDef {
        name: "g".into(),
        ty: Some(ty("i32")),
        value: Some(Expr::int(1)),
        span: at(1, 1, 1),
    }));
    let err = vm.compile_module(&src).unwrap_err();
    assert!(matches!(
        first_error(&err),
        CompilationError::UnsupportedDeclaration { .. }
    ));
}

// ============================================================================
// Structs
// ============================================================================

fn point_vm() -> SpyVm {
    init_tracing();
    SpyVm::with_registration(VmConfig::default(), |b| {
        StructBuilder::new("geom", "Point")
            .field("x", I32)
            .field("y", I32)
            .field("visible", BOOL)
            .register(b)
            .map(|_| ())
    })
    .unwrap()
}

#[test]
fn struct_fields_read_and_write() {
    let mut vm = point_vm();
    let src = module(
        "test",
        vec![red(
            "make",
            &[("x", "i32")],
            Some("i32"),
            vec![
                Stmt::var("p", ty("geom::Point"), Some(Expr::call("geom::Point::new", vec![]))),
                Stmt::set_attr(name("p"), "x", name("x")),
                Stmt::set_attr(name("p"), "y", Expr::int(5)),
                Stmt::ret(Expr::add(
                    Expr::getattr(name("p"), "x"),
                    Expr::getattr(name("p"), "y"),
                )),
            ],
        )],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(
        vm.call("test::make", vec![Value::I32(37)]).unwrap(),
        Value::I32(42)
    );
}

#[test]
fn struct_unknown_field_is_no_operator() {
    let mut vm = point_vm();
    let src = module(
        "test",
        vec![red(
            "bad",
            &[("p", "geom::Point")],
            Some("i32"),
            vec![Stmt::ret(Expr::getattr(name("p"), "z"))],
        )],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert!(matches!(
        first_error(&err),
        CompilationError::NoOperator { op, .. } if op == "."
    ));
}

#[test]
fn struct_field_type_is_enforced() {
    let mut vm = point_vm();
    let src = module(
        "test",
        vec![red(
            "bad",
            &[("p", "geom::Point")],
            None,
            vec![Stmt::set_attr(name("p"), "visible", Expr::int(1))],
        )],
    );
    assert!(vm.compile_module(&src).unwrap_err().is_compilation());
}

// ============================================================================
// AbsVal
// ============================================================================

#[test]
fn absval_equality_at_runtime() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "same",
            &[("a", "operator::AbsVal"), ("b", "operator::AbsVal")],
            Some("bool"),
            vec![Stmt::ret(Expr::binop(BinaryOp::Eq, name("a"), name("b")))],
        )],
    );
    vm.compile_module(&src).unwrap();

    let x0 = Value::AbsVal(AbsVal::new("x", 0, I32));
    let y0 = Value::AbsVal(AbsVal::new("y", 0, I32));
    let x1 = Value::AbsVal(AbsVal::new("x", 1, I32));
    assert_eq!(vm.call("test::same", vec![x0.clone(), y0]).unwrap(), Value::Bool(true));
    assert_eq!(vm.call("test::same", vec![x0, x1]).unwrap(), Value::Bool(false));
}

// ============================================================================
// Blue functions
// ============================================================================

fn blue_module() -> spy::ast::Module {
    module(
        "test",
        vec![
            blue("answer", &[], vec![Stmt::ret(Expr::int(42))]),
            blue("ident", &["x"], vec![Stmt::ret(name("x"))]),
            red(
                "use_answer",
                &[],
                Some("i32"),
                vec![Stmt::ret(Expr::call("answer", vec![]))],
            ),
            red(
                "use_ident",
                &[],
                Some("i32"),
                vec![Stmt::ret(Expr::call("ident", vec![Expr::int(53)]))],
            ),
        ],
    )
}

#[test]
fn blue_calls_fold_to_constants() {
    let mut vm = vm();
    let m = vm.compile_module(&blue_module()).unwrap();

    let code = m.get("use_answer").unwrap().code().unwrap();
    let ops: Vec<_> = code.instructions().iter().map(|i| i.op()).collect();
    assert_eq!(ops, vec![OpCode::ConstLoad, OpCode::Return]);

    assert_eq!(vm.call("test::use_answer", vec![]).unwrap(), Value::I32(42));
    assert_eq!(vm.call("test::use_ident", vec![]).unwrap(), Value::I32(53));
}

#[test]
fn blue_calls_without_folding_run_at_runtime() {
    init_tracing();
    let mut vm = SpyVm::new(VmConfig::default().with_fold_blue_calls(false)).unwrap();
    let m = vm.compile_module(&blue_module()).unwrap();

    let code = m.get("use_ident").unwrap().code().unwrap();
    assert!(code.instructions().iter().any(|i| i.op() == OpCode::Call));
    assert_eq!(vm.call("test::use_ident", vec![]).unwrap(), Value::I32(53));
}

#[test]
fn blue_function_called_directly() {
    let mut vm = vm();
    vm.compile_module(&blue_module()).unwrap();
    assert_eq!(
        vm.call("test::ident", vec![Value::from("hi")]).unwrap(),
        Value::from("hi")
    );
}

#[test]
fn blue_call_with_runtime_argument() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![
            blue("ident", &["x"], vec![Stmt::ret(name("x"))]),
            red(
                "f",
                &[("n", "i32")],
                Some("i32"),
                vec![Stmt::ret(Expr::call("ident", vec![name("n")]))],
            ),
        ],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert!(matches!(
        first_error(&err),
        CompilationError::BlueCallNeedsConstants { name, .. } if name == "ident"
    ));
}

// ============================================================================
// Runtime
// ============================================================================

#[test]
fn division_by_zero() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "div",
            &[("a", "i32"), ("b", "i32")],
            Some("i32"),
            vec![Stmt::ret(Expr::binop(BinaryOp::Div, name("a"), name("b")))],
        )],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(
        vm.call("test::div", vec![Value::I32(7), Value::I32(2)]).unwrap(),
        Value::I32(3)
    );
    assert_eq!(
        vm.call("test::div", vec![Value::I32(1), Value::I32(0)]).unwrap_err(),
        SpyError::Runtime(RuntimeError::DivisionByZero)
    );
}

#[test]
fn missing_return_aborts() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "f",
            &[("x", "i32")],
            Some("i32"),
            vec![Stmt::expr(name("x"))],
        )],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(
        vm.call("test::f", vec![Value::I32(1)]).unwrap_err(),
        SpyError::Runtime(RuntimeError::Abort {
            message: MISSING_RETURN.into()
        })
    );
}

#[test]
fn void_function_returns_none() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "f",
            &[],
            None,
            vec![Stmt::var("x", ty("i32"), Some(Expr::int(1)))],
        )],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(vm.call("test::f", vec![]).unwrap(), Value::Void);
}

#[test]
fn calls_between_module_functions() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![
            red(
                "double",
                &[("x", "i32")],
                Some("i32"),
                vec![Stmt::ret(Expr::add(name("x"), name("x")))],
            ),
            red(
                "quad",
                &[("x", "i32")],
                Some("i32"),
                vec![Stmt::ret(Expr::call(
                    "double",
                    vec![Expr::call("double", vec![name("x")])],
                ))],
            ),
        ],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(vm.call("test::quad", vec![Value::I32(3)]).unwrap(), Value::I32(12));
}

#[test]
fn unbounded_recursion_overflows() {
    init_tracing();
    let mut vm = SpyVm::new(VmConfig::default().with_max_call_depth(16)).unwrap();
    let src = module(
        "test",
        vec![red(
            "forever",
            &[("n", "i32")],
            Some("i32"),
            vec![Stmt::ret(Expr::call("forever", vec![name("n")]))],
        )],
    );
    vm.compile_module(&src).unwrap();
    assert_eq!(
        vm.call("test::forever", vec![Value::I32(0)]).unwrap_err(),
        SpyError::Runtime(RuntimeError::StackOverflow(16))
    );
}

#[test]
fn invalid_opcode_name() {
    let err = OpCode::from_name("xxx").unwrap_err();
    assert_eq!(err, InternalError::InvalidOpcode("xxx".into()));
    assert_eq!(err.to_string(), "Invalid opcode: xxx");
    assert!(SpyError::from(err).is_internal());
}

#[test]
fn registry_types_are_hashable_by_name() {
    let vm = vm();
    assert_eq!(vm.registry().type_by_name("i32"), Some(I32));
    assert_eq!(
        vm.registry().type_by_name("operator::AbsVal"),
        Some(TypeHash::from_name("operator::AbsVal"))
    );
}

#[test]
fn default_depth_limit_holds_on_a_small_thread() {
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut vm = vm();
            let src = module(
                "test",
                vec![red(
                    "forever",
                    &[("n", "i32")],
                    Some("i32"),
                    vec![Stmt::ret(Expr::call("forever", vec![name("n")]))],
                )],
            );
            vm.compile_module(&src).unwrap();
            vm.call("test::forever", vec![Value::I32(0)]).unwrap_err()
        })
        .unwrap();
    assert_eq!(
        handle.join().unwrap(),
        SpyError::Runtime(RuntimeError::StackOverflow(DEFAULT_MAX_CALL_DEPTH))
    );
}

#[test]
fn dynamic_dispatch_does_not_grow_the_cache() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![blue(
            "inc",
            &["x"],
            vec![Stmt::ret(Expr::add(name("x"), Expr::int(1)))],
        )],
    );
    vm.compile_module(&src).unwrap();

    assert_eq!(vm.call("test::inc", vec![Value::I32(0)]).unwrap(), Value::I32(1));
    let cached = vm.registry().cached_resolutions();
    for i in 1..500 {
        assert_eq!(
            vm.call("test::inc", vec![Value::I32(i)]).unwrap(),
            Value::I32(i + 1)
        );
    }
    assert_eq!(vm.registry().cached_resolutions(), cached);
}

#[test]
fn self_referencing_initializer_is_rejected() {
    let mut vm = vm();
    let src = module(
        "test",
        vec![red(
            "f",
            &[],
            Some("i32"),
            vec![
                Stmt::var("x", ty("i32"), Some(Expr::add(name("x"), Expr::int(1)))),
                Stmt::ret(name("x")),
            ],
        )],
    );
    let err = vm.compile_module(&src).unwrap_err();
    assert!(matches!(
        first_error(&err),
        CompilationError::UninitializedLocal { name, .. } if name == "x"
    ));
}

#[test]
fn struct_argument_errors_name_the_struct() {
    init_tracing();
    let mut vm = SpyVm::with_registration(VmConfig::default(), |b| {
        StructBuilder::new("geom", "Point").field("x", I32).register(b)?;
        StructBuilder::new("geom", "Size").field("w", I32).register(b)?;
        Ok(())
    })
    .unwrap();
    let src = module(
        "test",
        vec![red(
            "px",
            &[("p", "geom::Point")],
            Some("i32"),
            vec![Stmt::ret(Expr::getattr(name("p"), "x"))],
        )],
    );
    vm.compile_module(&src).unwrap();

    let size = vm.call("geom::Size::new", vec![]).unwrap();
    assert_eq!(
        vm.call("test::px", vec![size]).unwrap_err(),
        SpyError::Runtime(RuntimeError::TypeError {
            expected: "Point".into(),
            got: "Size".into(),
        })
    );
}
