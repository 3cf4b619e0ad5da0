//! Extension-based file categories.
//!
//! Categories are never stored anywhere authoritative: they are derived from
//! the file name when a file is uploaded, and the label written alongside the
//! record is only a cache of that derivation.

use derive_more::Display;
use std::str::FromStr;

/// The folder a file is shown in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Images,
    Documents,
    Spreadsheets,
    Presentations,
    Videos,
    Audio,
    Archives,
    Code,
    Others,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 9] = [
        Self::Images,
        Self::Documents,
        Self::Spreadsheets,
        Self::Presentations,
        Self::Videos,
        Self::Audio,
        Self::Archives,
        Self::Code,
        Self::Others,
    ];

    /// Categorize a file by the (case-insensitive) text after the last `.` of
    /// its name. Names without a `.` are [`Others`](Self::Others), even when
    /// the whole name matches an extension: `json` is not [`Code`](Self::Code).
    pub fn classify(name: impl AsRef<str>) -> Self {
        let Some((_, ext)) = name.as_ref().rsplit_once('.') else {
            return Self::Others;
        };
        Self::from_extension(&ext.to_ascii_lowercase())
    }

    fn from_extension(ext: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|category| category.extensions().contains(&ext))
            .unwrap_or(Self::Others)
    }

    /// Lower-case extensions belonging to this category. Empty for
    /// [`Others`](Self::Others), which is whatever is left over.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Images => &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico"],
            Self::Documents => &["pdf", "doc", "docx", "txt", "rtf", "odt"],
            Self::Spreadsheets => &["xls", "xlsx", "csv", "ods"],
            Self::Presentations => &["ppt", "pptx", "odp"],
            Self::Videos => &["mp4", "avi", "mov", "wmv", "flv", "mkv", "webm"],
            Self::Audio => &["mp3", "wav", "flac", "aac", "m4a", "ogg"],
            Self::Archives => &["zip", "rar", "7z", "tar", "gz"],
            Self::Code => &["js", "jsx", "ts", "tsx", "py", "java", "cpp", "c", "html", "css", "json", "xml"],
            Self::Others => &[],
        }
    }

    /// Parse a stored category label, treating anything unrecognised
    /// (including labels written by other clients) as [`Others`](Self::Others).
    pub fn from_label(label: impl AsRef<str>) -> Self {
        label.as_ref().parse().unwrap_or(Self::Others)
    }
}

/// Label that isn't one of the [`Category`] names.
#[derive(Debug, Display, derive_more::Error)]
#[display("unknown category: {_0:?}")]
pub struct UnknownCategory(#[error(not(source))] pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.to_string().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("holiday.jpg", Category::Images)]
    #[case("holiday.JPEG", Category::Images)]
    #[case("report.PDF", Category::Documents)]
    #[case("notes.txt", Category::Documents)]
    #[case("budget.xlsx", Category::Spreadsheets)]
    #[case("data.csv", Category::Spreadsheets)]
    #[case("deck.pptx", Category::Presentations)]
    #[case("clip.MKV", Category::Videos)]
    #[case("song.m4a", Category::Audio)]
    #[case("backup.tar.gz", Category::Archives)]
    #[case("bundle.7z", Category::Archives)]
    #[case("main.cpp", Category::Code)]
    #[case("index.html", Category::Code)]
    #[case("setup.exe", Category::Others)]
    #[case("Makefile", Category::Others)]
    #[case("json", Category::Others)]
    #[case("trailing.", Category::Others)]
    #[case("", Category::Others)]
    fn test_classify(#[case] name: &str, #[case] expected: Category) {
        assert_eq!(Category::classify(name), expected);
    }

    #[test]
    fn test_extension_tables_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for category in Category::ALL {
            for ext in category.extensions() {
                assert!(seen.insert(*ext), "{ext} listed twice");
                assert_eq!(Category::classify(format!("file.{}", ext.to_uppercase())), category);
            }
        }
    }

    #[rstest]
    #[case("Images", Category::Images)]
    #[case("documents", Category::Documents)]
    #[case(" CODE ", Category::Code)]
    #[case("Others", Category::Others)]
    fn test_parse_label(#[case] label: &str, #[case] expected: Category) {
        assert_eq!(label.parse::<Category>().unwrap(), expected);
        assert_eq!(Category::from_label(label), expected);
    }

    #[test]
    fn test_unknown_label() {
        assert!("Music".parse::<Category>().is_err());
        assert_eq!(Category::from_label("Music"), Category::Others);
    }
}
