//! Symbolic call-site arguments.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Span, TypeHash};

/// A symbolic reference to one argument of an operator call site.
///
/// `index` points into the original argument list. `name` and `loc` exist
/// for diagnostics only and never take part in equality or hashing.
#[derive(Clone)]
pub struct AbsVal {
    pub name: String,
    pub index: usize,
    pub static_type: TypeHash,
    pub loc: Option<Span>,
}

impl AbsVal {
    pub fn new(name: impl Into<String>, index: usize, static_type: TypeHash) -> Self {
        Self {
            name: name.into(),
            index,
            static_type,
            loc: None,
        }
    }

    /// Attach the source location of the argument.
    pub fn at(mut self, loc: Span) -> Self {
        self.loc = Some(loc);
        self
    }
}

impl PartialEq for AbsVal {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.static_type == other.static_type
    }
}

impl Eq for AbsVal {}

impl Hash for AbsVal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.static_type.hash(state);
    }
}

impl fmt::Debug for AbsVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<AbsVal {}: {:?} #{}>", self.name, self.static_type, self.index)
    }
}
