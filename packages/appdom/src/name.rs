//! Node naming: validation and slugification.
//!
//! Node names double as scripting-scope variable names, so they must match
//! the identifier grammar `[A-Za-z_][A-Za-z0-9_]*` and be unique across the
//! whole document. User-typed labels are slugified into legal names;
//! collisions are resolved with a numeric suffix. Naming problems are
//! expected, user-facing conditions -- they surface as [`NameError`]
//! values, never as panics.

use std::collections::HashSet;

use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("invalid name {0:?}: must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidSyntax(String),

    #[error("a node named {0:?} already exists")]
    Duplicate(String),
}

/// Check a name against the identifier grammar.
pub fn validate(name: &str) -> Result<(), NameError> {
    let mut chars = name.chars();
    let legal = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if legal {
        Ok(())
    } else {
        Err(NameError::InvalidSyntax(name.to_string()))
    }
}

/// Turn an arbitrary label into a legal identifier, or an empty string if
/// nothing survives.
///
/// Steps: strip diacritics (NFD, drop combining marks), camel-case on
/// whitespace, drop illegal characters, drop leading digits.
pub fn slugify(label: &str) -> String {
    let stripped: String = label.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut out = String::with_capacity(stripped.len());
    for word in stripped.split_whitespace() {
        let mut chars = word.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_');
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }

    let trimmed: String = out
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .collect();
    trimmed
}

/// Derive a unique legal name from a wanted label, falling back to a
/// type-derived default, disambiguating with a counter suffix: `Name`,
/// `Name2`, `Name3`, ...
pub fn propose(taken: &HashSet<&str>, wanted: &str, fallback: &str) -> String {
    let mut base = slugify(wanted);
    if base.is_empty() {
        base = slugify(fallback);
    }
    if base.is_empty() {
        base = "node".to_string();
    }

    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base}{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_identifier_grammar() {
        assert!(validate("page1").is_ok());
        assert!(validate("_private").is_ok());
        assert!(validate("MyComponent").is_ok());
        assert!(validate("").is_err());
        assert!(validate("1page").is_err());
        assert!(validate("my page").is_err());
        assert!(validate("naïve").is_err());
    }

    #[test]
    fn slugify_camel_cases_on_whitespace() {
        assert_eq!(slugify("my component"), "MyComponent");
        assert_eq!(slugify("My Component"), "MyComponent");
    }

    #[test]
    fn slugify_strips_diacritics() {
        assert_eq!(slugify("café menu"), "CafeMenu");
        assert_eq!(slugify("naïve"), "Naive");
    }

    #[test]
    fn slugify_drops_illegal_chars_and_leading_digits() {
        assert_eq!(slugify("my-component!"), "Mycomponent");
        assert_eq!(slugify("123 pages"), "Pages");
        assert_eq!(slugify("1;2'3"), "");
    }

    #[test]
    fn propose_disambiguates_with_a_counter() {
        let mut taken = HashSet::new();
        taken.insert("MyComponent");
        assert_eq!(propose(&taken, "My Component", "element"), "MyComponent2");
        taken.insert("MyComponent2");
        assert_eq!(propose(&taken, "My Component", "element"), "MyComponent3");
    }

    #[test]
    fn propose_falls_back_to_type_default() {
        let taken = HashSet::new();
        assert_eq!(propose(&taken, "", "page"), "Page");
        assert_eq!(propose(&taken, "!!!", "query"), "Query");
    }
}
