pub mod cache;
pub mod chunker;
pub mod confidence;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod generation;

pub use cache::ResponseCache;
pub use chunker::TextChunker;
pub use confidence::confidence_score;
pub use corpus::{CorpusIndex, IndexMetadata};
pub use embedding::{BatchProgress, Embedder, EmbeddingClient};
pub use engine::SearchEngine;
pub use generation::{AnswerClient, AnswerGenerator};
