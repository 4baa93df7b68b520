use std::fmt;

use crate::TypeHash;

/// Qualified name for every registered entity.
///
/// Stubs, primitives, types, builtin functions and compiled functions all
/// live in one process-wide `module::member` namespace.
///
/// # Examples
///
/// ```
/// use spy_core::QualifiedName;
///
/// let add = QualifiedName::new("operator", "i32_add");
/// assert_eq!(add.to_string(), "operator::i32_add");
///
/// let getter = QualifiedName::from_qualified_string("geom::Point::__get_x__");
/// assert_eq!(getter.module(), "geom::Point");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Member name (e.g., "i32_add", "foo")
    pub name: String,
    /// Module path (e.g., ["operator"]); never empty for registered entities
    pub namespace: Vec<String>,
}

impl QualifiedName {
    /// Create a name inside a single-segment module.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: vec![module.into()],
        }
    }

    /// Create from a qualified string (e.g., "builtins::abs").
    ///
    /// The last segment is the member name, the rest is the module path.
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts: Vec<String> = s
            .split("::")
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let name = parts.pop().unwrap_or_default();
        Self {
            name,
            namespace: parts,
        }
    }

    /// Create a child name nested under this one.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut namespace = self.namespace.clone();
        namespace.push(self.name.clone());
        Self {
            name: name.into(),
            namespace,
        }
    }

    /// The module path joined with `::`.
    pub fn module(&self) -> String {
        self.namespace.join("::")
    }

    /// Whether the name carries a module path.
    pub fn is_qualified(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Identity hash of this name.
    pub fn type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ns in &self.namespace {
            write!(f, "{ns}::")?;
        }
        write!(f, "{}", self.name)
    }
}
