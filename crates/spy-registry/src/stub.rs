use std::fmt;

use spy_core::{OpKind, QualifiedName};

/// Handle to a registered operator stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StubId(pub u32);

impl fmt::Display for StubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stub#{}", self.0)
    }
}

/// A generic operation identity. It has no implementation of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub qn: QualifiedName,
    /// Set for the well-known operators; selects which type hook applies.
    pub kind: Option<OpKind>,
}
