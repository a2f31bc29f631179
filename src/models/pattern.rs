//! Compiled validation patterns.

use std::sync::LazyLock;

use regex::Regex;

/// Email layout accepted for backoffice logins.
pub(crate) static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        "email",
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
    )
});

/// Four dot-separated groups of one to three ASCII digits.
pub(crate) static DOTTED_QUAD: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile("dotted quad", r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$"));

/// Compiles a pattern, logging an error if it is invalid.
fn compile(name: &'static str, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::error!(pattern = name, %err, "validation pattern does not compile");
            None
        }
    }
}

/// Returns `true` if `value` matches `pattern`. A pattern that failed to
/// compile matches nothing.
pub(crate) fn is_match(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}
