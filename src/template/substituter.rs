use std::io::Cursor;
use tracing::warn;
use umya_spreadsheet::{reader, writer, Spreadsheet};

use super::types::{ReplacementTable, TemplateError};

/// Parse a workbook from raw xlsx bytes, keeping formulas and formatting.
pub fn load_workbook(bytes: &[u8]) -> Result<Spreadsheet, TemplateError> {
    reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| TemplateError::invalid_format(format!("Failed to open workbook: {}", e)))
}

/// Replace placeholder occurrences across every sheet, in place.
///
/// For each (block code, placeholder, values) entry, every cell whose text
/// contains the placeholder substring has all occurrences replaced with the
/// first candidate value. Replacement text is never re-scanned, so values
/// containing placeholder syntax do not cascade. An empty candidate list
/// skips the placeholder.
pub fn substitute(book: &mut Spreadsheet, table: &ReplacementTable) {
    for sheet in book.get_sheet_collection_mut() {
        for replacements in table.values() {
            for (placeholder, values) in replacements {
                let Some(replacement) = values.first() else {
                    warn!("no replacement values for '{}', skipping", placeholder);
                    continue;
                };
                for cell in sheet.get_cell_collection_mut() {
                    let current = cell.get_value().to_string();
                    if current.contains(placeholder.as_str()) {
                        cell.set_value_string(current.replace(placeholder.as_str(), replacement));
                    }
                }
            }
        }
    }
}

/// Serialize a workbook back to xlsx bytes.
pub fn serialize(book: &Spreadsheet) -> Result<Vec<u8>, TemplateError> {
    let mut cursor = Cursor::new(Vec::new());
    writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| TemplateError::write_error(format!("Failed to serialize workbook: {}", e)))?;
    Ok(cursor.into_inner())
}
