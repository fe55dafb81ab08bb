//! # Captured call arguments.
//!
//! [`Invocation`] snapshots the inputs of one wrapped call so they can appear in
//! log lines and task records. The core never interprets the values.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use tasktally::Invocation;
//!
//! let inv = Invocation::new().arg(1).arg("two").kwarg("retries", 3);
//! assert_eq!(inv.args(), Some(&[json!(1), json!("two")][..]));
//! assert_eq!(inv.kwargs().and_then(|kw| kw.get("retries")), Some(&json!(3)));
//! ```

use serde_json::{Map, Value};

/// Positional and keyword arguments of one call.
///
/// An invocation with no positional arguments reports `args` as absent
/// (`null` in records); the same holds for keyword arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Invocation {
    args: Option<Vec<Value>>,
    kwargs: Option<Map<String, Value>>,
}

impl Invocation {
    /// Empty invocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocation built from positional arguments.
    pub fn from_args<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
            kwargs: None,
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.get_or_insert_with(Vec::new).push(value.into());
        self
    }

    /// Sets a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Positional arguments, if any were given.
    pub fn args(&self) -> Option<&[Value]> {
        self.args.as_deref()
    }

    /// Keyword arguments, if any were given.
    pub fn kwargs(&self) -> Option<&Map<String, Value>> {
        self.kwargs.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Option<Vec<Value>>, Option<Map<String, Value>>) {
        (self.args, self.kwargs)
    }
}
