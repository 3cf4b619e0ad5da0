//! Terminal output.

use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use keepr_library::{File, Folder, UploadEvent, ViewMode};
use std::io::{self, BufRead, Write};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]");
const GRID_COLUMNS: usize = 4;
const TABLE_WIDTH: u16 = 120;

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_HORIZONTAL_ONLY).set_content_arrangement(ContentArrangement::Dynamic).set_width(TABLE_WIDTH);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|name| Cell::new(name).add_attribute(Attribute::Bold)).collect()
}

fn format_date(date: OffsetDateTime) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub fn files(files: &[&File], mode: ViewMode) -> Table {
    match mode {
        ViewMode::Grid => grid(files),
        ViewMode::List => list(files),
    }
}

fn list(files: &[&File]) -> Table {
    let mut table = table();
    table.set_header(header(&["Name", "Folder", "Size", "Uploaded", "ID"]));
    for file in files {
        table.add_row(vec![
            Cell::new(&file.name),
            Cell::new(file.category()),
            Cell::new(file.display_size()).set_alignment(CellAlignment::Right),
            Cell::new(format_date(file.upload_date)),
            Cell::new(&file.id),
        ]);
    }
    table
}

fn grid(files: &[&File]) -> Table {
    let mut table = table();
    for row in files.chunks(GRID_COLUMNS) {
        table.add_row(
            row.iter().map(|file| Cell::new(format!("{}\n{} · {}", file.name, file.category(), file.display_size()))),
        );
    }
    table
}

/// Folder summary, led by the "All Files" total.
pub fn folders(total: usize, folders: &[Folder]) -> Table {
    let mut table = table();
    table.set_header(header(&["Folder", "Files"]));
    table.add_row(vec![Cell::new("All Files"), Cell::new(total).set_alignment(CellAlignment::Right)]);
    for folder in folders {
        table.add_row(vec![Cell::new(folder.category), Cell::new(folder.count).set_alignment(CellAlignment::Right)]);
    }
    table
}

/// Report upload progress on stderr, keeping stdout for results.
pub fn upload_event(event: UploadEvent<'_>) {
    let mut stderr = io::stderr().lock();
    // Progress output is best-effort; a closed stderr must not fail the upload.
    let _ = match event {
        UploadEvent::Started { name, key } => writeln!(stderr, "Uploading {name} to {key}"),
        UploadEvent::Progress { name, percent } => write!(stderr, "\r  {name}: {percent:>3}%"),
        UploadEvent::Uploaded(file) => writeln!(stderr, "\r  {}: done ({})", file.name, file.display_size()),
        UploadEvent::Failed { name, error } => writeln!(stderr, "\r  {name}: failed: {error}"),
    };
}

/// Ask on the terminal whether `file` should be deleted. Anything but an
/// explicit yes declines.
pub fn confirm_delete(file: &File) -> bool {
    ask(&mut io::stdin().lock(), &mut io::stderr(), file).unwrap_or(false)
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, file: &File) -> io::Result<bool> {
    write!(output, "Are you sure you want to delete {}? [y/N] ", file.name)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepr_api::FileRecord;
    use keepr_library::Category;
    use rstest::rstest;

    fn file(id: &str, name: &str, size: u64) -> File {
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
                upload_date: OffsetDateTime::UNIX_EPOCH,
                owner: "alice".to_string(),
                created_at: None,
                updated_at: None,
            },
            None,
        )
    }

    #[test]
    fn test_list_rows() {
        let files = [file("file-1", "cat.png", 2048), file("file-2", "notes.txt", 0)];
        let refs: Vec<&File> = files.iter().collect();
        let rendered = list(&refs).to_string();
        assert!(rendered.contains("cat.png"));
        assert!(rendered.contains("2 KB"));
        assert!(rendered.contains("0 Bytes"));
        assert!(rendered.contains("file-2"));
        assert!(rendered.contains("1970-01-01 00:00"));
    }

    #[test]
    fn test_grid_wraps_rows() {
        let files: Vec<File> = (0..9).map(|i| file(&format!("file-{i}"), &format!("{i}.png"), 1)).collect();
        let refs: Vec<&File> = files.iter().collect();
        assert_eq!(grid(&refs).row_iter().count(), 3);
    }

    #[test]
    fn test_folders_summary() {
        let summary = [Folder { category: Category::Images, count: 2 }, Folder { category: Category::Code, count: 1 }];
        let table = folders(3, &summary);
        assert_eq!(table.row_iter().count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("All Files"));
        assert!(rendered.contains("Images"));
    }

    #[rstest]
    #[case("y\n", true)]
    #[case("YES\n", true)]
    #[case("n\n", false)]
    #[case("\n", false)]
    #[case("", false)]
    fn test_confirmation(#[case] answer: &str, #[case] expected: bool) {
        let mut output = Vec::new();
        let confirmed = ask(&mut answer.as_bytes(), &mut output, &file("file-1", "cat.png", 1)).unwrap();
        assert_eq!(confirmed, expected);
        assert_eq!(String::from_utf8(output).unwrap(), "Are you sure you want to delete cat.png? [y/N] ");
    }
}
