use calamine::{Data, Reader, Xlsx};
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::LazyLock;
use tracing::debug;

use super::drawing;
use super::types::{PlaceholderMap, TemplateError};

/// Matches `${...}` placeholders; the token is any run of characters up to
/// the closing brace. Unclosed `${` never matches.
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]+\}").expect("constant regex pattern is valid"));

/// Extract placeholders from every sheet of a workbook.
///
/// Scans string-valued cells and drawing shape text. Duplicate occurrences
/// collapse per sheet; sheets without placeholders are omitted entirely.
pub fn extract(bytes: &[u8]) -> Result<PlaceholderMap, TemplateError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| TemplateError::invalid_format(format!("Failed to open workbook: {}", e)))?;

    let mut drawing_text = drawing::scan_drawing_text(bytes)?;

    let mut found = PlaceholderMap::new();
    let sheet_names = workbook.sheet_names().to_vec();

    for name in sheet_names {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            TemplateError::read_error(format!("Failed to read sheet '{}': {}", name, e))
        })?;

        let mut placeholders: BTreeSet<String> = BTreeSet::new();

        for row in range.rows() {
            for cell in row {
                if let Data::String(text) = cell {
                    collect_placeholders(text, &mut placeholders);
                }
            }
        }

        // Shapes are scanned with the same pattern and union into the
        // same per-sheet set.
        if let Some(texts) = drawing_text.remove(&name) {
            for text in &texts {
                collect_placeholders(text, &mut placeholders);
            }
        }

        if !placeholders.is_empty() {
            debug!("found placeholders in sheet '{}': {:?}", name, placeholders);
            found.insert(name, placeholders);
        }
    }

    Ok(found)
}

fn collect_placeholders(text: &str, out: &mut BTreeSet<String>) {
    for m in PLACEHOLDER_PATTERN.find_iter(text) {
        out.insert(m.as_str().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umya_spreadsheet::{new_file, writer};

    fn workbook_bytes(cells: &[(&str, &str)]) -> Vec<u8> {
        let mut book = new_file();
        let sheet = book.get_sheet_mut(&0).expect("new file has a sheet");
        for (coordinate, value) in cells {
            sheet.get_cell_mut(*coordinate).set_value_string(*value);
        }
        let mut cursor = Cursor::new(Vec::new());
        writer::xlsx::write_writer(&book, &mut cursor).expect("failed to write workbook");
        cursor.into_inner()
    }

    #[test]
    fn collects_distinct_placeholders_per_sheet() {
        let bytes = workbook_bytes(&[
            ("A1", "${a}"),
            ("A2", "no placeholder"),
            ("A3", "${a}${b}"),
        ]);

        let map = extract(&bytes).expect("extraction failed");
        let placeholders = map.get("Sheet1").expect("sheet missing from map");
        let expected: BTreeSet<String> = ["${a}", "${b}"].iter().map(|s| s.to_string()).collect();
        assert_eq!(*placeholders, expected);
    }

    #[test]
    fn sheet_without_placeholders_is_omitted() {
        let bytes = workbook_bytes(&[("A1", "plain text"), ("B2", "more text")]);

        let map = extract(&bytes).expect("extraction failed");
        assert!(map.is_empty());
    }

    #[test]
    fn empty_workbook_yields_empty_map() {
        let bytes = workbook_bytes(&[]);

        let map = extract(&bytes).expect("extraction failed");
        assert!(map.is_empty());
    }

    #[test]
    fn malformed_placeholders_are_ignored() {
        let bytes = workbook_bytes(&[("A1", "${unclosed"), ("A2", "$missing{braces}"), ("A3", "${}")]);

        let map = extract(&bytes).expect("extraction failed");
        assert!(map.is_empty());
    }

    #[test]
    fn duplicate_occurrences_collapse() {
        let bytes = workbook_bytes(&[("A1", "${x} and ${x}"), ("B1", "${x}")]);

        let map = extract(&bytes).expect("extraction failed");
        let placeholders = map.get("Sheet1").expect("sheet missing from map");
        assert_eq!(placeholders.len(), 1);
        assert!(placeholders.contains("${x}"));
    }

    #[test]
    fn pattern_allows_any_token_but_closing_brace() {
        let mut out = BTreeSet::new();
        collect_placeholders("Rate: ${chinryou_str}% plus ${fee-2024/税込}", &mut out);
        assert!(out.contains("${chinryou_str}"));
        assert!(out.contains("${fee-2024/税込}"));
    }

    #[test]
    fn corrupt_bytes_report_invalid_format() {
        let err = extract(b"not a zip archive").expect_err("corrupt input must fail");
        assert_eq!(err.error_type, crate::template::TemplateErrorType::InvalidFormat);
    }
}
