mod answer;
mod config;
mod passage;

pub use answer::{AskResponse, OutputFormat, ScoredPassage};
pub use config::{
    CacheConfig, Config, DEFAULT_EMBEDDING_URL, DEFAULT_GENERATION_MODEL, DEFAULT_GENERATION_URL,
    EmbeddingConfig, GenerationConfig, IndexingConfig, SearchConfig,
};
pub use passage::Passage;
