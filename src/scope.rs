//! # Scope labels for tally key prefixes.
//!
//! A [`Scope`] names one level of a naming hierarchy (module, class, function…).
//! A tally joins its scope names with `.` to prefix every counter key it reports.

use std::borrow::Cow;
use std::fmt;

/// Immutable `(kind, name)` label.
///
/// ## Example
/// ```rust
/// use tasktally::Scope;
///
/// let scope = Scope::new("module", "billing.invoices");
/// assert_eq!(scope.kind(), "module");
/// assert_eq!(scope.to_string(), "billing.invoices");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    kind: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl Scope {
    /// Creates a new scope label.
    pub fn new(kind: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Shorthand for a `module` scope.
    pub fn module(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new("module", name)
    }

    /// Shorthand for a `class` scope.
    pub fn class(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new("class", name)
    }

    /// Shorthand for a `function` scope.
    pub fn function(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new("function", name)
    }

    /// Kind of hierarchy level.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Joins scope names with `.`.
pub(crate) fn join(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::name)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_uses_names_only() {
        let scopes = [Scope::module("app"), Scope::class("Billing")];
        assert_eq!(join(&scopes), "app.Billing");
        assert_eq!(join(&[]), "");
    }
}
