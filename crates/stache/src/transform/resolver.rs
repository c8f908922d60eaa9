//! Context-miss resolution.
//!
//! A dotted reference such as `user.address.city` is expanded, at compile
//! time, into an expression that never fails on missing data:
//!
//! - an undefined root renders as the empty string;
//! - a single segment renders its value whenever it is defined, falsy or not;
//! - deeper paths are checked prefix by prefix and render the empty string
//!   as soon as any prefix, the leaf included, is falsy.
//!
//! The last rule means a falsy leaf (`0`, `false`, `""`) on a dotted path is
//! indistinguishable from a missing one.
//!
//! Roots that MiniJinja would read as a literal or an operator (`true`,
//! `none`, `not`, a leading digit) are looked up through `_data` instead.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Fragment;

/// Identifiers the expression parser never treats as variable names.
const KEYWORDS: &[&str] = &[
    "true", "True", "false", "False", "none", "None", "not", "and", "or", "in", "is", "if",
    "else",
];

static PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*$").expect("path pattern is valid")
});

/// Resolves tag content into a guarded lookup.
///
/// Returns [`Fragment::Current`] for `.`, a guarded [`Fragment::Output`] for
/// a well-formed dotted path, and `None` for anything else.
pub fn resolve(content: &str) -> Option<Fragment> {
    if content == "." {
        return Some(Fragment::Current);
    }
    if !PATH.is_match(content) {
        return None;
    }
    Some(Fragment::Output(guard_expression(content)))
}

/// Builds the guarded expression for a well-formed dotted path.
///
/// ```rust
/// use stache::guard_expression;
///
/// assert_eq!(guard_expression("name"), r#"(name if name is defined else "")"#);
/// assert_eq!(
///     guard_expression("a.b"),
///     r#"(((a and a.b) or "") if a is defined else "")"#
/// );
/// ```
pub fn guard_expression(path: &str) -> String {
    let mut segments = path.split('.');
    let root = root_reference(segments.next().unwrap_or_default());

    let mut prefix = root.clone();
    let mut chain = vec![root.clone()];
    for segment in segments {
        prefix = format!("{prefix}.{segment}");
        chain.push(prefix.clone());
    }

    if chain.len() == 1 {
        return format!("({root} if {root} is defined else \"\")");
    }
    let chain = chain.join(" and ");
    format!("((({chain}) or \"\") if {root} is defined else \"\")")
}

/// Expression that reads the top-level data key `name`.
///
/// Plain identifiers are emitted as they are. Keywords, literals and names
/// starting with a digit go through `_data`.
///
/// ```rust
/// use stache::transform::root_reference;
///
/// assert_eq!(root_reference("user"), "user");
/// assert_eq!(root_reference("none"), r#"_data["none"]"#);
/// assert_eq!(root_reference("2fa"), r#"_data["2fa"]"#);
/// ```
pub fn root_reference(name: &str) -> String {
    let leading_digit = name.starts_with(|c: char| c.is_ascii_digit());
    if leading_digit || KEYWORDS.contains(&name) {
        format!("_data[\"{name}\"]")
    } else {
        name.to_string()
    }
}
