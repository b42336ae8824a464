//! Source locations threaded through diagnostics, tracing and exceptions.

use std::fmt;

/// A position in the original source text, as handed in by the (external)
/// parser on each `Node`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub resource: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.resource.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.resource, self.line, self.column)
        }
    }
}

/// A `Location` plus the name of the function/unit currently executing,
/// attached to exceptions and fed to the `StepTracer` hook.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RuntimeLocation {
    pub location: Location,
    pub unit: Option<String>,
}

impl fmt::Display for RuntimeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{unit} ({})", self.location),
            None => write!(f, "{}", self.location),
        }
    }
}
