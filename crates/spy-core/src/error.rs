//! Error types for every phase of SPy processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! SpyError (top-level wrapper)
//! ├── RegistrationError - Start-up registration defects
//! ├── CompileErrors     - User-facing name/type errors (CompilationError)
//! ├── InternalError     - Compiler or extension-module bugs
//! └── RuntimeError      - Conditions detected during execution
//! ```
//!
//! [`SpyError::is_internal`] separates "the compiler is broken" from "your
//! program is wrong".

use std::fmt;

use thiserror::Error;

use crate::Span;

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of one annotated location in a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Note,
}

/// One annotated source location of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub level: Level,
    pub message: String,
    pub span: Span,
}

impl Annotation {
    fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            span,
        }
    }

    fn note(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Note,
            message: message.into(),
            span,
        }
    }
}

/// What created the expectation a mismatching value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// The enclosing function's return annotation.
    ReturnType,
    /// A local variable's type declaration.
    Declaration,
    /// A parameter of the called function.
    Argument,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MismatchReason::ReturnType => "because of return type",
            MismatchReason::Declaration => "because of type declaration",
            MismatchReason::Argument => "because of parameter type",
        })
    }
}

fn joined(names: &[String]) -> String {
    names.join(", ")
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while modules register types, stubs and primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The qualified name is already taken by another registered entity.
    #[error("duplicate registration: '{qn}' is already registered")]
    DuplicateName { qn: String },

    /// A primitive already exists for this stub and operand tuple.
    #[error("duplicate primitive for '{stub}' with operand types ({})", joined(.types))]
    DuplicatePrimitive { stub: String, types: Vec<String> },

    /// Hooks were registered twice for one type.
    #[error("type '{ty}' already has operator hooks")]
    DuplicateHooks { ty: String },

    /// A referenced type was never registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The operand tuple does not match the function's parameters.
    #[error("primitive '{qn}' declares {declared} but was registered for ({})", joined(.operands))]
    SignatureMismatch {
        qn: String,
        declared: String,
        operands: Vec<String>,
    },

    /// The operator stub was never registered.
    #[error("operator stub {0} is not registered")]
    UnknownStub(String),

    /// A struct field whose type has no fixed layout.
    #[error("field '{field}' of '{owner}' has unsupported type {ty}")]
    InvalidField {
        owner: String,
        field: String,
        ty: String,
    },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// User-facing errors found while checking a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// Reference to a name that was never declared.
    #[error("at {span}: name `{name}` is not defined")]
    NameError { name: String, span: Span },

    /// A declared local is read before any value was assigned to it.
    #[error("at {span}: local `{name}` is used before assignment")]
    UninitializedLocal {
        name: String,
        span: Span,
        decl_span: Span,
    },

    /// A value does not fit the type that was declared for it.
    #[error("at {span}: mismatched types: expected `{expected}`, got `{got}`")]
    TypeMismatch {
        expected: String,
        got: String,
        /// Location of the mismatching value.
        span: Span,
        /// Location of the declaration that created the expectation.
        expected_span: Span,
        reason: MismatchReason,
    },

    /// A local name is declared twice in one scope.
    #[error("at {span}: duplicate declaration of `{name}`")]
    DuplicateDeclaration {
        name: String,
        span: Span,
        original_span: Span,
    },

    /// Two top-level functions share one name.
    #[error("at {span}: function `{name}` is defined more than once")]
    DuplicateDefinition {
        name: String,
        span: Span,
        original_span: Span,
    },

    /// No primitive or type hook implements the operator for these types.
    #[error("at {span}: operator `{op}` is not supported for types ({})", quoted(.types))]
    NoOperator {
        op: String,
        types: Vec<String>,
        span: Span,
    },

    /// A type annotation names no registered type.
    #[error("at {span}: unknown type `{name}`")]
    UnknownType { name: String, span: Span },

    /// A red function parameter without a type annotation.
    #[error("at {span}: parameter `{name}` of a red function needs a type annotation")]
    MissingAnnotation { name: String, span: Span },

    /// A call passes the wrong number of arguments.
    #[error("at {span}: `{name}` takes {expected} argument(s) but {got} were given")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    /// A blue function called with arguments not known at compile time.
    #[error("at {span}: blue function `{name}` can only be called with compile-time constants")]
    BlueCallNeedsConstants { name: String, span: Span },

    /// Evaluating a blue call at compile time failed.
    #[error("at {span}: evaluating blue function `{name}` failed: {message}")]
    BlueEvaluation {
        name: String,
        message: String,
        span: Span,
    },

    /// An integer literal outside the `i32` range.
    #[error("at {span}: integer literal {value} does not fit in `i32`")]
    IntegerOverflow { value: i64, span: Span },

    /// A top-level declaration other than a function definition.
    #[error("at {span}: {kind} is not supported at module level")]
    UnsupportedDeclaration { kind: &'static str, span: Span },
}

impl CompilationError {
    /// Get the primary span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::NameError { span, .. } => *span,
            CompilationError::UninitializedLocal { span, .. } => *span,
            CompilationError::TypeMismatch { span, .. } => *span,
            CompilationError::DuplicateDeclaration { span, .. } => *span,
            CompilationError::DuplicateDefinition { span, .. } => *span,
            CompilationError::NoOperator { span, .. } => *span,
            CompilationError::UnknownType { span, .. } => *span,
            CompilationError::MissingAnnotation { span, .. } => *span,
            CompilationError::ArgumentCountMismatch { span, .. } => *span,
            CompilationError::BlueCallNeedsConstants { span, .. } => *span,
            CompilationError::BlueEvaluation { span, .. } => *span,
            CompilationError::IntegerOverflow { span, .. } => *span,
            CompilationError::UnsupportedDeclaration { span, .. } => *span,
        }
    }

    /// Short headline without the location prefix.
    pub fn headline(&self) -> String {
        match self {
            CompilationError::TypeMismatch { .. } => "mismatched types".to_string(),
            CompilationError::NoOperator { op, .. } => {
                format!("cannot apply operator `{op}`")
            }
            other => {
                let full = other.to_string();
                match full.split_once(": ") {
                    Some((_, rest)) => rest.to_string(),
                    None => full,
                }
            }
        }
    }

    /// The primary annotation followed by any secondary notes.
    pub fn annotations(&self) -> Vec<Annotation> {
        match self {
            CompilationError::TypeMismatch {
                expected,
                got,
                span,
                expected_span,
                reason,
            } => vec![
                Annotation::error(format!("expected `{expected}`, got `{got}`"), *span),
                Annotation::note(format!("expected `{expected}` {reason}"), *expected_span),
            ],
            CompilationError::UninitializedLocal {
                name,
                span,
                decl_span,
            } => vec![
                Annotation::error(format!("`{name}` read here"), *span),
                Annotation::note("declared here without a value", *decl_span),
            ],
            CompilationError::DuplicateDeclaration {
                name,
                span,
                original_span,
            }
            | CompilationError::DuplicateDefinition {
                name,
                span,
                original_span,
            } => vec![
                Annotation::error(format!("`{name}` declared again here"), *span),
                Annotation::note("first declared here", *original_span),
            ],
            CompilationError::NoOperator { types, span, .. } => vec![Annotation::error(
                format!("this is `{}`", types.join("`, `")),
                *span,
            )],
            other => vec![Annotation::error(other.headline(), other.span())],
        }
    }

    /// Render the diagnostic with underlined source lines.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut out = format!("error: {}", self.headline());
        for ann in self.annotations() {
            let label = match ann.level {
                Level::Error => "-->",
                Level::Note => "note",
            };
            out.push_str(&format!("\n  {label} {}: {}", ann.span, ann.message));
            let marker = match ann.level {
                Level::Error => '^',
                Level::Note => '-',
            };
            if let Some(snippet) = ann.span.underline(source, marker) {
                for line in snippet.lines() {
                    out.push_str("\n    | ");
                    out.push_str(line);
                }
            }
        }
        out
    }
}

/// The user-facing errors of one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileErrors {
    errors: Vec<CompilationError>,
}

impl CompileErrors {
    /// Create a new empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: CompilationError) {
        self.errors.push(error);
    }

    /// Move every error of `other` into this collection.
    pub fn extend(&mut self, other: CompileErrors) {
        self.errors.extend(other.errors);
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &CompilationError> {
        self.errors.iter()
    }

    /// The first error, if any.
    pub fn first(&self) -> Option<&CompilationError> {
        self.errors.first()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), CompileErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for CompileErrors {
    type Item = CompilationError;
    type IntoIter = std::vec::IntoIter<CompilationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompileErrors {
    type Item = &'a CompilationError;
    type IntoIter = std::slice::Iter<'a, CompilationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<CompilationError> for CompileErrors {
    fn from(error: CompilationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

// ============================================================================
// Internal Errors
// ============================================================================

/// Defects in the compiler or in an extension module. Never user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// A caller invoked the unsupported-operator sentinel.
    #[error("attempted to call OpImpl::NULL")]
    NullOpImplCall,

    /// An operation name outside the closed opcode set.
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(String),

    /// An operation built with the wrong number of operands.
    #[error("opcode '{op}' takes {expected} operand(s), got {got}")]
    OperandShape {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// An operand indexes outside its code-object table.
    #[error("opcode '{op}' operand {operand} is out of range")]
    BadOperand { op: &'static str, operand: u32 },

    /// A type without a registered representation.
    #[error("type {0} has no registered representation")]
    MissingTypeRepr(String),

    /// An operator stub the core relies on was never registered.
    #[error("operator stub {0} is not registered")]
    MissingStub(String),

    /// A declaration the type checker should have rejected reached codegen.
    #[error("{0} reached code generation")]
    UnsupportedDeclaration(&'static str),

    /// A function reached pass two without a resolved signature.
    #[error("function '{0}' has no resolved signature")]
    MissingSignature(String),

    /// An argument plan points past the call-site arguments.
    #[error("argument plan index {index} out of range for {argc} argument(s)")]
    PlanOutOfRange { index: usize, argc: usize },

    /// Execution ran past the last operation of a code object.
    #[error("execution of '{0}' ran past its last operation")]
    FellOffEnd(String),

    /// The interpreter popped an empty stack.
    #[error("value stack underflow in '{0}'")]
    StackUnderflow(String),
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Conditions that can only be detected while code runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Explicit abort emitted by the code generator.
    #[error("abort: {message}")]
    Abort { message: String },

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed `i32`.
    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    /// Index outside a sequence.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    /// A value of the wrong type reached a typed boundary.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    /// A call named a function that is not loaded.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A call passed the wrong number of arguments.
    #[error("'{name}' takes {expected} argument(s) but {got} were given")]
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Call nesting exceeded the configured limit.
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),

    /// No implementation for an operator on run-time types.
    #[error("operator `{op}` is not supported for types ({})", joined(.types))]
    NoOperator { op: String, types: Vec<String> },
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Top-level error covering every phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpyError {
    /// A registration error.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// One or more compilation errors.
    #[error(transparent)]
    Compilation(#[from] CompileErrors),

    /// A compiler defect.
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    /// A runtime error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<CompilationError> for SpyError {
    fn from(error: CompilationError) -> Self {
        SpyError::Compilation(error.into())
    }
}

impl SpyError {
    /// Check if this is a registration error.
    pub fn is_registration(&self) -> bool {
        matches!(self, SpyError::Registration(_))
    }

    /// Check if this is a compilation error.
    pub fn is_compilation(&self) -> bool {
        matches!(self, SpyError::Compilation(_))
    }

    /// Check if this is a compiler defect.
    pub fn is_internal(&self) -> bool {
        matches!(self, SpyError::Internal(_))
    }

    /// Check if this is a runtime error.
    pub fn is_runtime(&self) -> bool {
        matches!(self, SpyError::Runtime(_))
    }

    /// The compilation errors, when this is a compilation failure.
    pub fn compile_errors(&self) -> Option<&CompileErrors> {
        match self {
            SpyError::Compilation(errors) => Some(errors),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
