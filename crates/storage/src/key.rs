//! Object key validation.
//!
//! Keys are always `/`-separated regardless of platform, since they end up
//! in S3 object names and URLs as often as on a local disk.

use crate::error::{ErrorKind, Result};

/// Validates an object key and returns its normalized form.
///
/// Empty segments and `.` are dropped, `..` removes the previous segment and
/// may never climb above the bucket root. Null bytes are rejected outright.
///
/// # Examples
///
/// ```
/// use keepr_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("Documents/1700000000000-report.pdf").is_ok());
/// assert!(validate_key("a/../file.txt").is_ok()); // (never leaves the root)
/// // Invalid keys
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(validate_key("wrong/../Images//./cat.png/").unwrap(), "Images/cat.png");
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let raw = key.as_ref();
    if raw.contains('\0') {
        exn::bail!(ErrorKind::InvalidKey(raw.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(raw.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(raw.to_string())),
        false => Ok(segments.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Documents/1700000000000-report.pdf", "Documents/1700000000000-report.pdf")]
    #[case("simple.txt", "simple.txt")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("/Images/cat.png", "Images/cat.png")]
    #[case("Images/", "Images")]
    #[case("a/b/..", "a")]
    #[case("Others/My File (1).bin", "Others/My File (1).bin")]
    fn test_valid_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(validate(key).unwrap(), expected);
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("a\0b")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate(key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[test]
    fn test_backslashes_are_not_separators() {
        assert_eq!(validate("a\\b").unwrap(), "a\\b");
    }
}
