//! Shared-secret checks for the manual trigger endpoints.

/// Compare two strings without short-circuiting on the first differing byte.
///
/// Length is still observable; only the content comparison is constant time.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a presented token against the configured one.
///
/// An unset or blank expected token never authorizes.
pub fn verify_token(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) if !expected.trim().is_empty() => {
            constant_time_eq(expected, presented)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secret2"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_verify_token() {
        assert!(verify_token(Some("abc"), Some("abc")));
        assert!(!verify_token(Some("abc"), Some("abd")));
        assert!(!verify_token(Some("abc"), None));
        assert!(!verify_token(None, Some("abc")));
        assert!(!verify_token(None, None));
        assert!(!verify_token(Some(""), Some("")));
    }

    proptest! {
        #[test]
        fn constant_time_eq_matches_string_eq(a in ".{0,16}", b in ".{0,16}") {
            prop_assert_eq!(constant_time_eq(&a, &b), a == b);
        }
    }
}
