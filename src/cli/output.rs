use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{AskResponse, OutputFormat, ScoredPassage};
use crate::services::IndexMetadata;

pub trait Formatter {
    fn format_answer(&self, response: &AskResponse) -> String;
    fn format_retrieval(&self, query: &str, results: &[ScoredPassage], duration_ms: u64)
    -> String;
    fn format_build_stats(&self, stats: &BuildStats) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub files_scanned: u64,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub passages: u64,
    pub vectors: u64,
    pub dimension: usize,
    pub index_mode: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub index_dir: String,
    pub metadata: IndexMetadata,
}

fn preview(content: &str, max_chars: usize) -> String {
    let short: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        format!("{}...", short)
    } else {
        short
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, response: &AskResponse) -> String {
        let mut output = String::new();
        writeln!(output, "{}", response.answer).unwrap();
        writeln!(output).unwrap();

        if !response.sources.is_empty() {
            writeln!(output, "Sources:").unwrap();
            for (i, source) in response.sources.iter().enumerate() {
                writeln!(
                    output,
                    "{}. [Score: {:.3}] {}",
                    i + 1,
                    source.score,
                    source.passage.source
                )
                .unwrap();
                for line in preview(&source.passage.content, 200).lines() {
                    writeln!(output, "   {}", line).unwrap();
                }
            }
            writeln!(output).unwrap();
        }

        let cache_note = if response.cache_hit { " (cached)" } else { "" };
        writeln!(
            output,
            "Confidence: {:.2} | Search: {:.3}s | Total: {:.3}s{}",
            response.confidence, response.search_time, response.total_time, cache_note
        )
        .unwrap();
        output
    }

    fn format_retrieval(
        &self,
        query: &str,
        results: &[ScoredPassage],
        duration_ms: u64,
    ) -> String {
        if results.is_empty() {
            return format!("No passages found for: {}\n", query);
        }

        let mut output = String::new();
        writeln!(output, "Passages for: \"{}\"", query).unwrap();
        writeln!(output, "Found {} passages in {}ms\n", results.len(), duration_ms).unwrap();

        for (i, result) in results.iter().enumerate() {
            writeln!(output, "{}. [Score: {:.3}]", i + 1, result.score).unwrap();
            writeln!(
                output,
                "   Source: {} (chars {}..{})",
                result.passage.source, result.passage.start_pos, result.passage.end_pos
            )
            .unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&result.passage.content, 200).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_build_stats(&self, stats: &BuildStats) -> String {
        let mut output = String::new();
        writeln!(output, "Build Complete").unwrap();
        writeln!(output, "--------------").unwrap();
        writeln!(output, "Files scanned: {}", stats.files_scanned).unwrap();
        writeln!(output, "Files indexed: {}", stats.files_indexed).unwrap();
        writeln!(output, "Files skipped: {}", stats.files_skipped).unwrap();
        writeln!(output, "Passages: {}", stats.passages).unwrap();
        writeln!(output, "Vectors: {} (dim {})", stats.vectors, stats.dimension).unwrap();
        writeln!(output, "Index mode: {}", stats.index_mode).unwrap();
        writeln!(output, "Duration: {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let m = &status.metadata;
        let mut output = String::new();
        writeln!(output, "Index Status").unwrap();
        writeln!(output, "------------").unwrap();
        writeln!(output, "Location:    {}", status.index_dir).unwrap();
        writeln!(output, "Mode:        {}", m.index_mode).unwrap();
        writeln!(output, "Passages:    {}", m.document_count).unwrap();
        writeln!(output, "Vectors:     {} (dim {})", m.total_vectors, m.vector_dimension).unwrap();
        writeln!(output, "Chunking:    {} chars, {} overlap", m.chunk_size, m.overlap).unwrap();
        writeln!(
            output,
            "Files:       {} indexed, {} skipped",
            m.files_indexed, m.files_skipped
        )
        .unwrap();
        writeln!(output, "Created:     {}", m.created_at).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter;

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .map(|s| format!("{}\n", s))
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {}\"}}\n", e))
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, response: &AskResponse) -> String {
        to_json(response)
    }

    fn format_retrieval(
        &self,
        query: &str,
        results: &[ScoredPassage],
        duration_ms: u64,
    ) -> String {
        to_json(&serde_json::json!({
            "query": query,
            "results": results,
            "duration_ms": duration_ms,
        }))
    }

    fn format_build_stats(&self, stats: &BuildStats) -> String {
        to_json(stats)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        to_json(status)
    }

    fn format_message(&self, message: &str) -> String {
        to_json(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        to_json(&serde_json::json!({ "error": error }))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_answer(&self, response: &AskResponse) -> String {
        let mut output = String::new();
        writeln!(output, "## Answer\n").unwrap();
        writeln!(output, "{}\n", response.answer).unwrap();

        if !response.sources.is_empty() {
            writeln!(output, "## Sources\n").unwrap();
            for (i, source) in response.sources.iter().enumerate() {
                writeln!(
                    output,
                    "{}. **{}** (score {:.3})",
                    i + 1,
                    source.passage.source,
                    source.score
                )
                .unwrap();
                writeln!(output, "   > {}", preview(&source.passage.content, 200)).unwrap();
            }
            writeln!(output).unwrap();
        }

        writeln!(
            output,
            "_Confidence {:.2}, search {:.3}s, total {:.3}s{}_",
            response.confidence,
            response.search_time,
            response.total_time,
            if response.cache_hit { ", cached" } else { "" }
        )
        .unwrap();
        output
    }

    fn format_retrieval(
        &self,
        query: &str,
        results: &[ScoredPassage],
        duration_ms: u64,
    ) -> String {
        if results.is_empty() {
            return format!("No passages found for: {}\n", query);
        }

        let mut output = String::new();
        writeln!(output, "# Passages: {}\n", query).unwrap();
        writeln!(output, "{} passages in {}ms\n", results.len(), duration_ms).unwrap();
        for (i, result) in results.iter().enumerate() {
            writeln!(
                output,
                "{}. **{}** (score {:.3})",
                i + 1,
                result.passage.source,
                result.score
            )
            .unwrap();
            writeln!(output, "   > {}", preview(&result.passage.content, 200)).unwrap();
        }
        output
    }

    fn format_build_stats(&self, stats: &BuildStats) -> String {
        let mut output = String::new();
        writeln!(output, "# Build Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Files scanned | {} |", stats.files_scanned).unwrap();
        writeln!(output, "| Files indexed | {} |", stats.files_indexed).unwrap();
        writeln!(output, "| Files skipped | {} |", stats.files_skipped).unwrap();
        writeln!(output, "| Passages | {} |", stats.passages).unwrap();
        writeln!(output, "| Vectors | {} (dim {}) |", stats.vectors, stats.dimension).unwrap();
        writeln!(output, "| Index mode | {} |", stats.index_mode).unwrap();
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let m = &status.metadata;
        let mut output = String::new();
        writeln!(output, "# Index Status\n").unwrap();
        writeln!(output, "| Field | Value |").unwrap();
        writeln!(output, "|-------|-------|").unwrap();
        writeln!(output, "| Location | {} |", status.index_dir).unwrap();
        writeln!(output, "| Mode | {} |", m.index_mode).unwrap();
        writeln!(output, "| Passages | {} |", m.document_count).unwrap();
        writeln!(output, "| Vectors | {} (dim {}) |", m.total_vectors, m.vector_dimension)
            .unwrap();
        writeln!(output, "| Chunking | {} chars, {} overlap |", m.chunk_size, m.overlap).unwrap();
        writeln!(output, "| Created | {} |", m.created_at).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("**Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMode;
    use crate::models::Passage;
    use serde_json::Map;

    fn sample_response() -> AskResponse {
        AskResponse {
            answer: "Grace is unmerited favor.".to_string(),
            sources: vec![ScoredPassage {
                passage: Passage::new(
                    "a passage about grace".to_string(),
                    "doctrine/grace.txt",
                    0,
                    21,
                    0,
                    Map::new(),
                ),
                score: 0.87,
            }],
            search_time: 0.012,
            total_time: 0.900,
            cache_hit: false,
            confidence: 0.95,
        }
    }

    #[test]
    fn test_text_answer_includes_sources_and_confidence() {
        let out = TextFormatter.format_answer(&sample_response());
        assert!(out.contains("Grace is unmerited favor."));
        assert!(out.contains("doctrine/grace.txt"));
        assert!(out.contains("Confidence: 0.95"));
    }

    #[test]
    fn test_text_answer_marks_cache_hit() {
        let mut response = sample_response();
        response.cache_hit = true;
        let out = TextFormatter.format_answer(&response);
        assert!(out.contains("(cached)"));
    }

    #[test]
    fn test_json_answer_round_trips() {
        let out = JsonFormatter.format_answer(&sample_response());
        let parsed: AskResponse = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.answer, "Grace is unmerited favor.");
        assert_eq!(parsed.sources.len(), 1);
    }

    #[test]
    fn test_empty_retrieval_message() {
        let out = TextFormatter.format_retrieval("nothing", &[], 5);
        assert!(out.contains("No passages found"));
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "x".repeat(300);
        let out = preview(&long, 200);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn test_markdown_status_renders_table() {
        let status = StatusInfo {
            index_dir: "/tmp/idx".to_string(),
            metadata: IndexMetadata {
                document_count: 10,
                vector_dimension: 768,
                index_mode: IndexMode::Ivf,
                chunk_size: 512,
                overlap: 50,
                total_vectors: 10,
                files_indexed: 2,
                files_skipped: 0,
                created_at: "2026-01-01T00:00:00Z".to_string(),
            },
        };
        let out = MarkdownFormatter.format_status(&status);
        assert!(out.contains("| Mode | ivf |"));
        assert!(out.contains("| Passages | 10 |"));
    }
}
