use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::index::IndexMode;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_GENERATION_URL: &str = "https://api.openai.com";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("ksearch").join("config.toml"))
    }

    /// Default directory for the persisted index, passage store and metadata.
    pub fn data_dir() -> Option<std::path::PathBuf> {
        dirs::data_dir().map(|p| p.join("ksearch"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Validate cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.overlap >= self.indexing.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.indexing.overlap, self.indexing.chunk_size
            )));
        }
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.indexing.nlist == 0 {
            return Err(ConfigError::ValidationError(
                "nlist must be at least 1".to_string(),
            ));
        }
        if self.indexing.nprobe == 0 {
            return Err(ConfigError::ValidationError(
                "nprobe must be at least 1".to_string(),
            ));
        }
        if self.indexing.pq_subspaces == 0 {
            return Err(ConfigError::ValidationError(
                "pq_subspaces must be at least 1".to_string(),
            ));
        }
        if !(1..=8).contains(&self.indexing.pq_bits) {
            return Err(ConfigError::ValidationError(format!(
                "pq_bits must be between 1 and 8, got {}",
                self.indexing.pq_bits
            )));
        }
        if !(0.0..=1.0).contains(&self.search.relevance_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "relevance_threshold must be between 0.0 and 1.0, got {}",
                self.search.relevance_threshold
            )));
        }
        if self.search.confidence_boost <= 0.0 {
            return Err(ConfigError::ValidationError(
                "confidence_boost must be positive".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_generation_url() -> String {
    DEFAULT_GENERATION_URL.to_string()
}

fn default_generation_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            timeout_secs: default_generation_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Passage window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive passages. Must stay below chunk_size.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Passages with fewer non-padding characters than this are discarded.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub index_mode: IndexMode,

    /// Upper bound on IVF cluster count; clamped further by corpus size.
    #[serde(default = "default_nlist")]
    pub nlist: usize,

    /// Clusters probed per query in IVF mode.
    #[serde(default = "default_nprobe")]
    pub nprobe: usize,

    /// Product-quantization subspace count; must divide the vector dimension.
    #[serde(default = "default_pq_subspaces")]
    pub pq_subspaces: usize,

    /// Bits per PQ code (centroids per subspace = 2^bits, max 8).
    #[serde(default = "default_pq_bits")]
    pub pq_bits: u32,
}

fn default_chunk_size() -> usize {
    512
}

fn default_overlap() -> usize {
    50
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_nlist() -> usize {
    1024
}

fn default_nprobe() -> usize {
    8
}

fn default_pq_subspaces() -> usize {
    16
}

fn default_pq_bits() -> u32 {
    8
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            max_file_size: default_max_file_size(),
            index_mode: IndexMode::default(),
            nlist: default_nlist(),
            nprobe: default_nprobe(),
            pq_subspaces: default_pq_subspaces(),
            pq_bits: default_pq_bits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Candidates scoring below this are dropped before ranking.
    /// Inherited from the reference deployment; not a calibrated value.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Linear scale applied to the mean retrieval score before clamping.
    #[serde(default = "default_confidence_boost")]
    pub confidence_boost: f32,

    /// Responses below this confidence are not written to the cache.
    #[serde(default = "default_cache_confidence_floor")]
    pub cache_confidence_floor: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_relevance_threshold() -> f32 {
    0.3
}

fn default_confidence_boost() -> f32 {
    1.2
}

fn default_cache_confidence_floor() -> f32 {
    0.5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            relevance_threshold: default_relevance_threshold(),
            confidence_boost: default_confidence_boost(),
            cache_confidence_floor: default_cache_confidence_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    2000
}

fn default_cache_ttl_secs() -> u64 {
    24 * 3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.indexing.chunk_size, 512);
        assert_eq!(config.indexing.overlap, 50);
        assert_eq!(config.cache.capacity, 2000);
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let mut config = Config::default();
        config.indexing.chunk_size = 100;
        config.indexing.overlap = 100;
        assert!(config.validate().is_err());

        config.indexing.overlap = 150;
        assert!(config.validate().is_err());

        config.indexing.overlap = 99;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pq_bits_range() {
        let mut config = Config::default();
        config.indexing.pq_bits = 0;
        assert!(config.validate().is_err());
        config.indexing.pq_bits = 9;
        assert!(config.validate().is_err());
        config.indexing.pq_bits = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relevance_threshold_range() {
        let mut config = Config::default();
        config.search.relevance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }
}
