//! Storage key templating for uploads.
//!
//! Converts an upload's name, category and time into a storage key using a
//! user-configured [upon] template. The template syntax follows upon's
//! Mustache-like conventions (`{{ variable }}`, `{{ value|formatter }}`),
//! extended with key-safe formatters and functions:
//!
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation marks
//!   first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! # Template Variables
//!
//! | Variable    | Type     | Description                                      |
//! |-------------|----------|--------------------------------------------------|
//! | `category`  | `String` | Category label, e.g. `"Documents"`               |
//! | `timestamp` | `i64`    | Upload time in Unix milliseconds                 |
//! | `name`      | `String` | Original file name                               |
//! | `stem`      | `String` | File name up to its last `.`                     |
//! | `ext`       | `String` | File name after its last `.` (empty if none)     |
//! | `date`      | `String` | Upload date, `YYYY-MM-DD` (UTC)                  |
//! | `owner`     | `String` | Username of the uploader                         |
//!
//! # Example
//!
//! ```
//! use keepr_library::{Category, KeyGenerator, KeyInput};
//! use time::OffsetDateTime;
//!
//! let generator: KeyGenerator = "{{ owner }}/{{ category }}/{{ stem|slug }}.{{ ext }}".parse().unwrap();
//! let input = KeyInput::new("Quarterly Report.PDF", Category::Documents, "alice", OffsetDateTime::UNIX_EPOCH);
//! assert_eq!(generator.generate(&input).unwrap(), "alice/Documents/quarterly-report.PDF");
//! ```

use crate::category::Category;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use keepr_storage::validate_key;
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::instrument;
use upon::{Engine, Template};

/// Key layout used unless configured otherwise.
pub const DEFAULT_KEY_TEMPLATE: &str = "{{ category }}/{{ timestamp }}-{{ name }}";

/// Everything a key template can refer to.
#[derive(Debug, Clone)]
pub struct KeyInput<'a> {
    pub name: &'a str,
    pub category: Category,
    pub owner: &'a str,
    pub at: OffsetDateTime,
}
impl<'a> KeyInput<'a> {
    pub fn new(name: &'a str, category: Category, owner: &'a str, at: OffsetDateTime) -> Self {
        Self { name, category, owner, at }
    }
}

/// Generates storage keys from upload details and a template string.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at upload time.
///
/// Generated keys are normalized (trimmed segments, no empty segments) and
/// validated by [`keepr_storage::validate_key`] to prevent traversal.
pub struct KeyGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for KeyGenerator {
    type Err = Error;

    /// Registers the `slug` formatter and `truncate` function, then compiles.
    /// Returns [`ErrorKind::Template`] if the template syntax is invalid.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template })
    }
}
impl KeyGenerator {
    /// Renders the template for `input`, returning a normalized, validated key.
    #[instrument(skip_all, fields(name = input.name))]
    pub fn generate(&self, input: &KeyInput<'_>) -> Result<String> {
        let key = self
            .template
            .render(&self.engine, Self::parameters(input))
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        Self::normalize(key)
    }

    /// Trims each key segment and drops empty ones, then validates via
    /// [`keepr_storage::validate_key`].
    fn normalize(s: impl Into<String>) -> Result<String> {
        let key = s
            .into()
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        validate_key(&key).or_raise(|| ErrorKind::Template)
    }

    fn parameters(input: &KeyInput<'_>) -> upon::Value {
        let (stem, ext) = match input.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext),
            _ => (input.name, ""),
        };
        let at = input.at;
        let millis = at.unix_timestamp() * 1000 + i64::from(at.millisecond());
        upon::value! {
            category: input.category.to_string(),
            timestamp: millis,
            name: input.name,
            stem: stem,
            ext: ext,
            date: format!("{:04}-{:02}-{:02}", at.year(), u8::from(at.month()), at.day()),
            owner: input.owner,
        }
    }
}

/// Custom [`upon`] extensions for key-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Converts strings to URL-safe slugs, dropping quotation marks first so
    /// that `"hello"` doesn't become `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Truncates a string to at most `max_bytes` without splitting a character.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    fn input(name: &str) -> KeyInput<'_> {
        KeyInput::new(name, Category::classify(name), "alice", datetime!(2024-06-15 12:30:45.678 UTC))
    }

    #[test]
    fn test_default_template() {
        let generator: KeyGenerator = DEFAULT_KEY_TEMPLATE.parse().unwrap();
        let key = generator.generate(&input("report.PDF")).unwrap();
        assert_eq!(key, "Documents/1718454645678-report.PDF");
    }

    #[rstest]
    #[case("{{ owner }}/{{ date }}/{{ name }}", "alice/2024-06-15/My Photo.jpg")]
    #[case("{{ category }}/{{ stem|slug }}.{{ ext }}", "Images/my-photo.jpg")]
    #[case("{{ category }}/{{ name|truncate: 4 }}", "Images/My P")]
    #[case("{{ truncate(stem, 2)|slug }}", "my")]
    #[case("  {{ category }} //  {{ name }}  ", "Images/My Photo.jpg")]
    fn test_templates(#[case] template: &str, #[case] expected: &str) {
        let generator: KeyGenerator = template.parse().unwrap();
        assert_eq!(generator.generate(&input("My Photo.jpg")).unwrap(), expected);
    }

    #[test]
    fn test_slug_strips_quotes() {
        let generator: KeyGenerator = "{{ stem|slug }}".parse().unwrap();
        assert_eq!(generator.generate(&input("\"Hello\" World's 'Test'.txt")).unwrap(), "hello-worlds-test");
    }

    #[rstest]
    #[case(".bashrc", ".bashrc", "")]
    #[case("Makefile", "Makefile", "")]
    #[case("archive.tar.gz", "archive.tar", "gz")]
    fn test_stem_and_ext(#[case] name: &str, #[case] stem: &str, #[case] ext: &str) {
        let generator: KeyGenerator = "{{ stem }}|{{ ext }}".parse().unwrap();
        assert_eq!(generator.generate(&input(name)).unwrap(), format!("{stem}|{ext}"));
    }

    #[test]
    fn test_invalid_template_fails_early() {
        let err = "{{ category ".parse::<KeyGenerator>().err().unwrap();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[test]
    fn test_traversal_rejected() {
        let generator: KeyGenerator = "../../{{ name }}".parse().unwrap();
        let err = generator.generate(&input("passwd")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[test]
    fn test_empty_key_rejected() {
        let generator: KeyGenerator = "{{ ext }}".parse().unwrap();
        assert!(generator.generate(&input("Makefile")).is_err());
    }
}
