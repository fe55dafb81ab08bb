//! # Call-site purpose strings.
//!
//! The [`purpose!`](crate::purpose) macro builds `"<file>.<line>: <name>"` from
//! compile-time information, so no runtime stack inspection is needed.

/// Formats a purpose string; used by [`purpose!`](crate::purpose).
#[doc(hidden)]
pub fn format_purpose(file: &str, line: u32, name: &str) -> String {
    let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
    format!("{base}.{line}: {name}")
}

/// Builds a purpose string for the current call site.
///
/// - `purpose!("name")` → `"<file>.<line>: name"`
/// - `purpose!()` → `"<file>.<line>: <module path>"`
///
/// ## Example
/// ```rust
/// let p = tasktally::purpose!("charge");
/// assert!(p.ends_with(": charge"));
/// ```
#[macro_export]
macro_rules! purpose {
    () => {
        $crate::format_purpose(file!(), line!(), module_path!())
    };
    ($name:expr) => {
        $crate::format_purpose(file!(), line!(), $name)
    };
}
