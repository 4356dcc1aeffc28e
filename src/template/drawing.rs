//! Drawing text scan - locates each sheet's drawing part through the package
//! relationships and collects shape text bodies. Drawings are read-only here.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek};
use zip::ZipArchive;

use super::types::TemplateError;

/// Collect the text of every drawing shape, grouped by sheet name.
///
/// Sheets without a drawing part (or whose shapes carry no text) are absent
/// from the result. Missing or malformed drawing XML is skipped rather than
/// failing the scan; only an unreadable archive is an error.
pub fn scan_drawing_text(bytes: &[u8]) -> Result<HashMap<String, Vec<String>>, TemplateError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        TemplateError::invalid_format(format!("Failed to open workbook archive: {}", e))
    })?;

    let worksheet_rels = parse_worksheet_relationships(&mut archive);
    let sheets = sheet_names_and_paths(&mut archive, &worksheet_rels);

    let mut result = HashMap::new();

    for (name, sheet_path) in sheets {
        let Some(drawing_path) = drawing_target(&mut archive, &sheet_path) else {
            continue;
        };
        let texts = parse_drawing_texts(&mut archive, &drawing_path);
        if !texts.is_empty() {
            result.insert(name, texts);
        }
    }

    Ok(result)
}

/// Map of rId -> worksheet path from xl/_rels/workbook.xml.rels
/// e.g., "rId1" -> "xl/worksheets/sheet1.xml"
fn parse_worksheet_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> HashMap<String, String> {
    let mut rels = HashMap::new();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels; // Relationships file is optional
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            b"Target" => {
                                target = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            b"Type" => {
                                rel_type =
                                    std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            _ => {}
                        }
                    }

                    if rel_type.contains("worksheet") && !id.is_empty() && !target.is_empty() {
                        // Resolve target path relative to xl/
                        let full_path = if let Some(stripped) = target.strip_prefix('/') {
                            stripped.to_string()
                        } else {
                            format!("xl/{target}")
                        };
                        rels.insert(id, full_path);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// Sheet names with their worksheet paths from xl/workbook.xml
fn sheet_names_and_paths<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut sheets = Vec::new();

    let Ok(file) = archive.by_name("xl/workbook.xml") else {
        return sheets;
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = String::new();
                    let mut r_id = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            // r:id attribute (namespace prefixed)
                            key if key.ends_with(b":id") || key == b"id" => {
                                r_id = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            _ => {}
                        }
                    }

                    if !name.is_empty() {
                        let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
                            let idx = sheets.len() + 1;
                            format!("xl/worksheets/sheet{idx}.xml")
                        });
                        sheets.push((name, path));
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    sheets
}

/// Resolve the drawing part referenced by a worksheet, if any, via the
/// worksheet's own relationship file.
fn drawing_target<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Option<String> {
    let (dir, file_name) = sheet_path.rsplit_once('/')?;
    let rels_path = format!("{dir}/_rels/{file_name}.rels");

    let Ok(file) = archive.by_name(&rels_path) else {
        return None; // No relationships means no drawing
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut target_path = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Target" => {
                                target = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            b"Type" => {
                                rel_type =
                                    std::str::from_utf8(&attr.value).unwrap_or("").to_string();
                            }
                            _ => {}
                        }
                    }

                    if rel_type.contains("drawing") && !target.is_empty() {
                        target_path = Some(resolve_relative(dir, &target));
                        break;
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    target_path
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_relative(base_dir: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }
    let mut dir = base_dir;
    let mut rest = target;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
        dir = dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
    }
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{dir}/{rest}")
    }
}

/// Collect the text of each shape (txBody) in a drawing part. Paragraphs
/// within one shape are joined with newlines, matching how a shape's text
/// reads as a whole.
fn parse_drawing_texts<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Vec<String> {
    let Ok(file) = archive.by_name(path) else {
        return Vec::new();
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut texts = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_tx_body = false;
    let mut in_t = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"txBody" => {
                    in_tx_body = true;
                    current.clear();
                }
                b"t" if in_tx_body => {
                    in_t = true;
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"txBody" => {
                    in_tx_body = false;
                    let text = current.trim_end_matches('\n');
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
                b"t" => {
                    in_t = false;
                }
                b"p" if in_tx_body => {
                    current.push('\n');
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    texts
}
