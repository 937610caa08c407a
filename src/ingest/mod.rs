//! Corpus ingestion: directory walking, file filtering, and JSON text
//! extraction.
//!
//! Per-file problems (unreadable, oversized, unparseable, too short) are
//! recorded and skipped; only a missing root or a fully empty corpus is an
//! error.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::models::{IndexingConfig, Passage};
use crate::services::TextChunker;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "json"];

/// JSON object fields checked in order for the document body.
const JSON_TEXT_FIELDS: &[&str] = &[
    "text",
    "content",
    "body",
    "description",
    "title",
    "name",
    "summary",
];

/// Minimum length for a string value to count as text in the JSON
/// fallback concatenation.
const JSON_FALLBACK_MIN_CHARS: usize = 10;

/// Outcome of a directory scan: the chunked passages plus per-file
/// accounting for the build summary and verbose logging.
pub struct IngestReport {
    pub passages: Vec<Passage>,
    pub files_scanned: u64,
    pub files_indexed: u64,
    pub files_skipped: u64,
    /// Skipped files with the reason, for verbose output.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Walk `root` recursively, read every supported file, and chunk the
/// extracted text into passages.
pub fn load_directory(
    root: &Path,
    chunker: &TextChunker,
    config: &IndexingConfig,
) -> Result<IngestReport, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut report = IngestReport {
        passages: Vec::new(),
        files_scanned: 0,
        files_indexed: 0,
        files_skipped: 0,
        skipped: Vec::new(),
    };

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // An unreadable path mid-walk (broken link, permission
                // denied) skips that path, not the whole build.
                report.files_skipped += 1;
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                report.skipped.push((path, format!("walk error: {e}")));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let Some(extension) = extension else { continue };
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        report.files_scanned += 1;

        match load_file(path, &extension, chunker, config) {
            Ok(mut passages) if !passages.is_empty() => {
                report.passages.append(&mut passages);
                report.files_indexed += 1;
            }
            Ok(_) => {
                report.files_skipped += 1;
                report
                    .skipped
                    .push((path.to_path_buf(), "no indexable content".to_string()));
            }
            Err(reason) => {
                report.files_skipped += 1;
                report.skipped.push((path.to_path_buf(), reason));
            }
        }
    }

    if report.passages.is_empty() {
        return Err(IngestError::NoDocuments(root.display().to_string()));
    }

    Ok(report)
}

/// Load one file into passages. Errors are returned as a human-readable
/// skip reason rather than a typed error.
fn load_file(
    path: &Path,
    extension: &str,
    chunker: &TextChunker,
    config: &IndexingConfig,
) -> Result<Vec<Passage>, String> {
    let metadata = std::fs::metadata(path).map_err(|e| format!("stat failed: {e}"))?;
    if metadata.len() > config.max_file_size {
        return Err(format!(
            "file too large ({} bytes, limit {})",
            metadata.len(),
            config.max_file_size
        ));
    }

    let raw = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    let source = path.display().to_string();

    if extension == "json" {
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| format!("invalid JSON: {e}"))?;
        let Some((text, extra)) = extract_json_text(&value) else {
            return Err("no text field found in JSON".to_string());
        };
        Ok(chunker.chunk(&text, &source, Some(&extra)))
    } else {
        Ok(chunker.chunk(&raw, &source, None))
    }
}

/// Pull the document body out of a JSON value.
///
/// Objects are checked field by field in priority order; when none of the
/// known fields holds text, all string values above a minimum length are
/// concatenated as `key: value` lines. Arrays are extracted element-wise
/// and joined. Short string metadata fields ride along as passage extras.
fn extract_json_text(value: &Value) -> Option<(String, Map<String, Value>)> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some((s.clone(), Map::new())),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| extract_json_text(item).map(|(text, _)| text))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some((parts.join("\n\n"), Map::new()))
            }
        }
        Value::Object(fields) => {
            let mut extra = Map::new();
            for key in ["title", "name", "source", "author"] {
                if let Some(Value::String(s)) = fields.get(key)
                    && !s.is_empty()
                {
                    extra.insert(key.to_string(), Value::String(s.clone()));
                }
            }

            for key in JSON_TEXT_FIELDS {
                if let Some(Value::String(s)) = fields.get(*key)
                    && !s.trim().is_empty()
                {
                    return Some((s.clone(), extra));
                }
            }

            let parts: Vec<String> = fields
                .iter()
                .filter_map(|(key, v)| match v {
                    Value::String(s) if s.chars().count() > JSON_FALLBACK_MIN_CHARS => {
                        Some(format!("{key}: {s}"))
                    }
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some((parts.join("\n"), extra))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn chunker() -> TextChunker {
        TextChunker::new(&IndexingConfig::default()).unwrap()
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_loads_supported_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        let body = "meaningful document content ".repeat(10);
        write_file(dir.path(), "a.txt", &body);
        write_file(dir.path(), "b.md", &body);
        write_file(dir.path(), "c.rs", &body);
        write_file(dir.path(), "d.bin", &body);

        let report = load_directory(dir.path(), &chunker(), &IndexingConfig::default()).unwrap();
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.files_skipped, 0);
        assert_eq!(report.passages.len(), 2);
    }

    #[test]
    fn test_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested").join("deep");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(&sub, "doc.txt", &"nested document body text ".repeat(10));

        let report = load_directory(dir.path(), &chunker(), &IndexingConfig::default()).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert!(report.passages[0].source.contains("deep"));
    }

    #[test]
    fn test_oversized_file_skipped_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "big.txt", &"x".repeat(200));
        write_file(dir.path(), "ok.txt", &"normal sized document content ".repeat(10));

        let config = IndexingConfig {
            max_file_size: 100,
            ..Default::default()
        };
        let report = load_directory(dir.path(), &chunker(), &config).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_skipped, 1);
        assert!(report.skipped[0].1.contains("too large"));
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "ok.txt", &"normal sized document content ".repeat(10));
        std::os::unix::fs::symlink(
            dir.path().join("missing.txt"),
            dir.path().join("dangling.txt"),
        )
        .unwrap();

        let report = load_directory(dir.path(), &chunker(), &IndexingConfig::default()).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_skipped, 1);
        assert!(
            report
                .skipped
                .iter()
                .any(|(path, reason)| path.ends_with("dangling.txt")
                    && reason.contains("walk error"))
        );
    }

    #[test]
    fn test_invalid_json_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "broken.json", "{not valid json");
        write_file(dir.path(), "ok.txt", &"normal sized document content ".repeat(10));

        let report = load_directory(dir.path(), &chunker(), &IndexingConfig::default()).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_skipped, 1);
        assert!(report.skipped[0].1.contains("invalid JSON"));
    }

    #[test]
    fn test_empty_directory_is_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_directory(dir.path(), &chunker(), &IndexingConfig::default());
        assert!(matches!(result, Err(IngestError::NoDocuments(_))));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let result = load_directory(
            Path::new("/nonexistent/corpus"),
            &chunker(),
            &IndexingConfig::default(),
        );
        assert!(matches!(result, Err(IngestError::IoError(_))));
    }

    #[test]
    fn test_json_priority_field_extraction() {
        let value = json!({
            "title": "On Grace",
            "content": "the content field wins over title",
            "summary": "ignored because content comes first"
        });
        let (text, extra) = extract_json_text(&value).unwrap();
        assert_eq!(text, "the content field wins over title");
        assert_eq!(extra.get("title").unwrap(), "On Grace");
    }

    #[test]
    fn test_json_fallback_concatenates_long_strings() {
        let value = json!({
            "alpha": "a string easily over ten characters",
            "beta": "short",
            "count": 42
        });
        let (text, _) = extract_json_text(&value).unwrap();
        assert!(text.contains("alpha: a string easily over ten characters"));
        assert!(!text.contains("beta"));
        assert!(!text.contains("42"));
    }

    #[test]
    fn test_json_array_extracted_element_wise() {
        let value = json!([
            {"text": "first entry body"},
            {"text": "second entry body"}
        ]);
        let (text, _) = extract_json_text(&value).unwrap();
        assert!(text.contains("first entry body"));
        assert!(text.contains("second entry body"));
    }

    #[test]
    fn test_json_without_text_is_skipped() {
        assert!(extract_json_text(&json!({"count": 1, "flag": true})).is_none());
        assert!(extract_json_text(&json!(null)).is_none());
    }

    #[test]
    fn test_json_file_passages_carry_extras() {
        let dir = tempfile::tempdir().unwrap();
        let doc = json!({
            "title": "Doctrine Notes",
            "text": "a body long enough to chunk and index properly ".repeat(10)
        });
        write_file(dir.path(), "doc.json", &doc.to_string());

        let report = load_directory(dir.path(), &chunker(), &IndexingConfig::default()).unwrap();
        assert_eq!(
            report.passages[0].extra.get("title").unwrap(),
            "Doctrine Notes"
        );
    }
}
