//! Ref name validation following git's `check-ref-format` rules.
//!
//! Valid ref names:
//! - Must be non-empty
//! - Must not contain control characters, space, `~`, `^`, `:`, `?`, `*`,
//!   `[` or `\`
//! - Must not contain `..` or `@{`, and must not be exactly `@`
//! - Must not start or end with `/`, nor end with `.`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RepoError, RepoResult};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];

fn malformed(name: &str, reason: impl Into<String>) -> RepoError {
    RepoError::MalformedRef {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full or abbreviated ref name, returning `Ok(())` if valid.
///
/// ```
/// use odb_repo::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/main").is_ok());
/// assert!(validate_ref_name("main").is_ok());
/// assert!(validate_ref_name("bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> RepoResult<()> {
    if name.is_empty() {
        return Err(malformed(name, "ref name must not be empty"));
    }
    if name == "@" {
        return Err(malformed(name, "'@' alone is not a ref name"));
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(malformed(name, format!("contains control character {ch:?}")));
    }
    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(malformed(name, format!("contains forbidden character {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(malformed(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(malformed(name, "must not contain '@{'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(malformed(name, "must not start or end with '/'"));
    }
    if name.ends_with('.') {
        return Err(malformed(name, "must not end with '.'"));
    }
    if name.ends_with(".lock") {
        return Err(malformed(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(malformed(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(malformed(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

/// `HEAD`, `ORIG_HEAD`, `FETCH_HEAD` and friends: top-level names made of
/// uppercase letters and underscores.
pub fn is_special_name(name: &str) -> bool {
    !name.is_empty()
        && name.ends_with("HEAD")
        && name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_ref_name("main").is_ok());
        assert!(validate_ref_name("HEAD").is_ok());
        assert!(validate_ref_name("refs/heads/feature/auth").is_ok());
        assert!(validate_ref_name("refs/tags/v1.0").is_ok());
        assert!(validate_ref_name("refs/remotes/origin/master").is_ok());
    }

    #[test]
    fn reject_empty_and_at() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("@").is_err());
    }

    #[test]
    fn reject_double_dot() {
        assert!(validate_ref_name("refs/heads/../../config").is_err());
        assert!(validate_ref_name("a..b").is_err());
    }

    #[test]
    fn reject_control_and_whitespace() {
        assert!(validate_ref_name("has space").is_err());
        assert!(validate_ref_name("has\ttab").is_err());
        assert!(validate_ref_name("has\nnewline").is_err());
        assert!(validate_ref_name("nul\0byte").is_err());
        assert!(validate_ref_name("del\x7f").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for name in ["a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b"] {
            let err = validate_ref_name(name).unwrap_err();
            assert!(matches!(err, RepoError::MalformedRef { .. }), "{name}");
        }
    }

    #[test]
    fn reject_boundaries() {
        assert!(validate_ref_name("/leading").is_err());
        assert!(validate_ref_name("trailing/").is_err());
        assert!(validate_ref_name("trailing.").is_err());
        assert!(validate_ref_name("a//b").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("ref@{0}").is_err());
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
    }

    #[test]
    fn special_names() {
        assert!(is_special_name("HEAD"));
        assert!(is_special_name("ORIG_HEAD"));
        assert!(!is_special_name("main"));
        assert!(!is_special_name("description"));
        assert!(!is_special_name("refs/HEAD"));
    }
}
