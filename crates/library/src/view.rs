//! Derived views over the in-memory file list.
//!
//! Nothing here mutates or copies files: every view is a list of references
//! into the slice it was computed from. Category filtering and searching are
//! independent predicates, so applying them in either order yields the same
//! result.

use crate::category::Category;
use crate::models::{File, Folder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a listing is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Size,
    Date,
}

/// Selection, search and ordering applied to the file list.
///
/// The default view is every file in the order the API returned them.
/// Without a sort key, `descending` reverses that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub descending: bool,
}
impl View {
    pub fn with_category(mut self, category: impl Into<Option<Category>>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<Option<SortKey>>, descending: bool) -> Self {
        self.sort = sort.into();
        self.descending = descending;
        self
    }

    /// Apply this view to `files`.
    pub fn apply<'a>(&self, files: &'a [File]) -> Vec<&'a File> {
        let mut selected: Vec<&File> = files
            .iter()
            .filter(|file| self.category.is_none_or(|category| file.category() == category))
            .filter(|file| self.search.as_deref().is_none_or(|term| matches_search(file, term)))
            .collect();
        match self.sort {
            // Stable, so ties keep API order in both directions.
            Some(key) => selected.sort_by(|a, b| {
                let ordering = compare(a, b, key);
                if self.descending { ordering.reverse() } else { ordering }
            }),
            None if self.descending => selected.reverse(),
            None => {},
        }
        selected
    }
}

/// Files in `category`.
pub fn filter_category<'a>(files: impl IntoIterator<Item = &'a File>, category: Category) -> Vec<&'a File> {
    files.into_iter().filter(|file| file.category() == category).collect()
}

/// Files whose name contains `term`, ignoring case. An empty term matches
/// everything.
pub fn search<'a>(files: impl IntoIterator<Item = &'a File>, term: &str) -> Vec<&'a File> {
    files.into_iter().filter(|file| matches_search(file, term)).collect()
}

fn matches_search(file: &File, term: &str) -> bool {
    term.is_empty() || file.name.to_lowercase().contains(&term.to_lowercase())
}

fn compare(a: &File, b: &File, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Date => a.upload_date.cmp(&b.upload_date),
    }
}

/// Categories present in `files` with their counts, in order of first
/// appearance.
pub fn folders<'a>(files: impl IntoIterator<Item = &'a File>) -> Vec<Folder> {
    let mut folders: Vec<Folder> = Vec::new();
    for file in files {
        match folders.iter_mut().find(|folder| folder.category == file.category()) {
            Some(folder) => folder.count += 1,
            None => folders.push(Folder { category: file.category(), count: 1 }),
        }
    }
    folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepr_api::FileRecord;
    use rstest::rstest;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn file(id: &str, name: &str, size: u64, uploaded: OffsetDateTime) -> File {
        let category = Category::classify(name);
        File::new(
            FileRecord {
                id: id.to_string(),
                name: name.to_string(),
                size,
                mime_type: None,
                category: category.to_string(),
                storage_key: format!("{category}/1-{name}"),
                url: None,
                upload_date: uploaded,
                owner: "alice".to_string(),
                created_at: None,
                updated_at: None,
            },
            None,
        )
    }

    fn files() -> Vec<File> {
        vec![
            file("1", "Holiday.JPG", 3_000, datetime!(2024-01-03 0:00 UTC)),
            file("2", "report.pdf", 10_000, datetime!(2024-01-01 0:00 UTC)),
            file("3", "holiday-notes.txt", 200, datetime!(2024-01-02 0:00 UTC)),
            file("4", "beach.png", 50_000, datetime!(2024-01-04 0:00 UTC)),
            file("5", "setup.exe", 1_000, datetime!(2024-01-05 0:00 UTC)),
        ]
    }

    fn ids(files: &[&File]) -> Vec<String> {
        files.iter().map(|file| file.id.clone()).collect()
    }

    #[test]
    fn test_default_view_is_everything_in_order() {
        let files = files();
        assert_eq!(ids(&View::default().apply(&files)), ["1", "2", "3", "4", "5"]);
    }

    #[rstest]
    #[case(Category::Images, &["1", "4"])]
    #[case(Category::Documents, &["2", "3"])]
    #[case(Category::Others, &["5"])]
    #[case(Category::Videos, &[])]
    fn test_category_filter(#[case] category: Category, #[case] expected: &[&str]) {
        let files = files();
        let filtered = filter_category(&files, category);
        assert!(filtered.iter().all(|file| file.category() == category));
        assert_eq!(ids(&filtered), expected);
        assert_eq!(ids(&View::default().with_category(category).apply(&files)), expected);
    }

    #[rstest]
    #[case("HOLIDAY", &["1", "3"])]
    #[case("day.j", &["1"])]
    #[case("", &["1", "2", "3", "4", "5"])]
    #[case("nothing", &[])]
    fn test_search_ignores_case(#[case] term: &str, #[case] expected: &[&str]) {
        let files = files();
        assert_eq!(ids(&search(&files, term)), expected);
    }

    #[rstest]
    #[case(Category::Images, "holiday")]
    #[case(Category::Documents, "holiday")]
    #[case(Category::Documents, "PDF")]
    #[case(Category::Others, "")]
    fn test_filter_and_search_commute(#[case] category: Category, #[case] term: &str) {
        let files = files();
        let category_first = search(filter_category(&files, category), term);
        let search_first = filter_category(search(&files, term), category);
        assert_eq!(ids(&category_first), ids(&search_first));
        let view = View::default().with_category(category).with_search(term);
        assert_eq!(ids(&view.apply(&files)), ids(&category_first));
    }

    #[rstest]
    #[case(SortKey::Name, false, &["4", "3", "1", "2", "5"])]
    #[case(SortKey::Size, false, &["3", "5", "1", "2", "4"])]
    #[case(SortKey::Size, true, &["4", "2", "1", "5", "3"])]
    #[case(SortKey::Date, true, &["5", "4", "1", "3", "2"])]
    fn test_sort(#[case] key: SortKey, #[case] descending: bool, #[case] expected: &[&str]) {
        let files = files();
        assert_eq!(ids(&View::default().with_sort(key, descending).apply(&files)), expected);
    }

    #[test]
    fn test_descending_without_sort_key_reverses_api_order() {
        let files = files();
        let view = View::default().with_category(Category::Images).with_sort(None::<SortKey>, true);
        assert_eq!(ids(&view.apply(&files)), ["4", "1"]);
    }

    #[test]
    fn test_folders_in_first_appearance_order() {
        let files = files();
        let folders = folders(&files);
        assert_eq!(
            folders,
            vec![
                Folder { category: Category::Images, count: 2 },
                Folder { category: Category::Documents, count: 2 },
                Folder { category: Category::Others, count: 1 },
            ]
        );
        assert_eq!(folders.iter().map(|folder| folder.count).sum::<usize>(), files.len());
    }
}
