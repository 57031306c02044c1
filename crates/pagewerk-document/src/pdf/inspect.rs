// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-only document inspection: page count, validity, and the /Info
// dictionary.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use lopdf::{Dictionary, Document, Object};
use pagewerk_core::error::Result;
use serde::Serialize;
use tracing::{debug, instrument};

use super::PdfReader;

/// Document information fields plus page count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// ISO 8601 where the PDF date parses, the raw value otherwise.
    pub created: Option<String>,
    pub modified: Option<String>,
    pub page_count: u32,
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> Result<u32> {
    Ok(PdfReader::open(path)?.page_count())
}

/// `true` when `path` opens as a PDF with at least one page.
pub fn is_valid_pdf(path: &Path) -> bool {
    PdfReader::open(path)
        .map(|reader| reader.page_count() > 0)
        .unwrap_or(false)
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_metadata(path: &Path) -> Result<DocumentMetadata> {
    let reader = PdfReader::open(path)?;
    let mut metadata = DocumentMetadata {
        page_count: reader.page_count(),
        ..Default::default()
    };

    if let Some(info) = info_dictionary(reader.document()) {
        let text = |key: &[u8]| info.get(key).ok().and_then(decode_text);
        metadata.title = text(b"Title");
        metadata.author = text(b"Author");
        metadata.subject = text(b"Subject");
        metadata.keywords = text(b"Keywords");
        metadata.creator = text(b"Creator");
        metadata.producer = text(b"Producer");
        metadata.created = text(b"CreationDate").map(|raw| normalize_pdf_date(&raw));
        metadata.modified = text(b"ModDate").map(|raw| normalize_pdf_date(&raw));
    }

    debug!(?metadata, "Metadata extracted");
    Ok(metadata)
}

/// The trailer's /Info, whether stored inline or by reference.
fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise single-byte.
fn decode_text(object: &Object) -> Option<String> {
    let bytes = match object {
        Object::String(bytes, _) => bytes,
        _ => return None,
    };
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };
    let text = text.trim_matches(char::from(0)).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Turn `D:YYYYMMDDHHmmSS+hh'mm'` into RFC 3339.
///
/// Missing trailing fields default per the PDF date rules; an unparseable
/// value is returned unchanged.
fn normalize_pdf_date(raw: &str) -> String {
    parse_pdf_date(raw).unwrap_or_else(|| raw.to_string())
}

fn parse_pdf_date(raw: &str) -> Option<String> {
    let body = raw.trim().strip_prefix("D:").unwrap_or(raw.trim());
    let digits: String = body.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return None;
    }
    let defaults = "00000101000000";
    let mut stamp = digits.chars().take(14).collect::<String>();
    stamp.push_str(&defaults[stamp.len()..]);
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S").ok()?;

    let zone = &body[digits.len()..];
    let offset = match zone.chars().next() {
        None => return Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Some('Z') => FixedOffset::east_opt(0)?,
        Some(sign @ ('+' | '-')) => {
            let parts: Vec<&str> = zone[1..]
                .split('\'')
                .filter(|p| !p.is_empty())
                .collect();
            let hours: i32 = parts.first()?.parse().ok()?;
            let minutes: i32 = parts.get(1).map_or(Ok(0), |m| m.parse()).ok()?;
            let seconds = hours * 3600 + minutes * 60;
            if sign == '+' {
                FixedOffset::east_opt(seconds)?
            } else {
                FixedOffset::west_opt(seconds)?
            }
        }
        Some(_) => return None,
    };
    let stamped: DateTime<FixedOffset> = offset.from_local_datetime(&naive).single()?;
    Some(stamped.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use lopdf::{StringFormat, dictionary};

    use super::*;
    use crate::fixtures;

    #[test]
    fn pdf_dates() {
        assert_eq!(
            normalize_pdf_date("D:20240115103000+01'00'"),
            "2024-01-15T10:30:00+01:00"
        );
        assert_eq!(
            normalize_pdf_date("D:20240115103000Z"),
            "2024-01-15T10:30:00+00:00"
        );
        assert_eq!(normalize_pdf_date("D:2023"), "2023-01-01T00:00:00");
        assert_eq!(normalize_pdf_date("yesterday"), "yesterday");
    }

    #[test]
    fn utf16_text_strings() {
        let title = Object::String(
            vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69],
            StringFormat::Hexadecimal,
        );
        assert_eq!(decode_text(&title).as_deref(), Some("Hi"));
        assert_eq!(decode_text(&Object::Integer(3)), None);
    }

    #[test]
    fn reads_info_dictionary_and_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        fixtures::write_sample_pdf(&path, 2).unwrap();

        let mut doc = Document::load(&path).unwrap();
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
            "Author" => Object::string_literal("Accounts"),
            "CreationDate" => Object::string_literal("D:20230301120000Z"),
        });
        doc.trailer.set("Info", info_id);
        doc.save(&path).unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.page_count, 2);
        assert_eq!(metadata.title.as_deref(), Some("Quarterly report"));
        assert_eq!(metadata.author.as_deref(), Some("Accounts"));
        assert_eq!(metadata.created.as_deref(), Some("2023-03-01T12:00:00+00:00"));
        assert_eq!(metadata.producer, None);
    }

    #[test]
    fn validity_checks() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        fixtures::write_sample_pdf(&good, 1).unwrap();
        fixtures::write_garbage(&bad).unwrap();

        assert!(is_valid_pdf(&good));
        assert!(!is_valid_pdf(&bad));
        assert!(!is_valid_pdf(&dir.path().join("missing.pdf")));
        assert_eq!(page_count(&good).unwrap(), 1);
        assert!(page_count(&bad).is_err());
    }
}
