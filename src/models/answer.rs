//! Query responses and output formats.

use serde::{Deserialize, Serialize};

use super::passage::Passage;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A retrieved passage paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Full answer to a question, including the retrieval evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<ScoredPassage>,
    /// Seconds spent in embedding + index search.
    pub search_time: f64,
    /// End-to-end seconds including answer generation.
    pub total_time: f64,
    pub cache_hit: bool,
    /// Heuristic in [0, 1]; not a calibrated probability.
    pub confidence: f32,
}

impl AskResponse {
    /// Response used when no passage clears the relevance threshold.
    /// An empty retrieval is a normal outcome, not an error.
    pub fn no_information(search_time: f64, total_time: f64) -> Self {
        Self {
            answer: "Sorry, I could not find relevant information in the knowledge base \
                     for this question. Try different keywords or a more specific question."
                .to_string(),
            sources: Vec::new(),
            search_time,
            total_time,
            cache_hit: false,
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
