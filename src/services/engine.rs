//! Retrieval orchestration and the question-answering flow.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::SearchError;
use crate::models::{AskResponse, CacheConfig, ScoredPassage, SearchConfig};
use crate::services::cache::ResponseCache;
use crate::services::confidence::confidence_score;
use crate::services::corpus::CorpusIndex;
use crate::services::embedding::Embedder;
use crate::services::generation::AnswerGenerator;

/// Process-scoped search service: one instance owns the shared index,
/// passage store, cache, and collaborator clients, and is handed to every
/// caller explicitly. Constructed once at startup; tests build isolated
/// instances per case.
pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    /// Readers clone the inner `Arc` under a brief read lock and search
    /// lock-free against that immutable snapshot. Rebuilds publish a new
    /// corpus with a single swap under the write lock.
    corpus: RwLock<Arc<CorpusIndex>>,
    cache: ResponseCache<AskResponse>,
    search: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn AnswerGenerator>>,
        corpus: Arc<CorpusIndex>,
        search: SearchConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            corpus: RwLock::new(corpus),
            cache: ResponseCache::new(cache_config),
            search,
        }
    }

    /// Current corpus snapshot. The lock is held only for the clone, never
    /// across embedding or generation calls.
    pub fn corpus_snapshot(&self) -> Arc<CorpusIndex> {
        self.corpus
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Publish a rebuilt corpus. In-flight searches keep the snapshot they
    /// already hold; new searches see the replacement.
    pub fn install_corpus(&self, corpus: Arc<CorpusIndex>) {
        *self.corpus.write().unwrap_or_else(|e| e.into_inner()) = corpus;
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Retrieve the top-k passages relevant to `query`.
    ///
    /// Over-fetches `2k` candidates to compensate for post-filtering, drops
    /// scores below the relevance threshold, skips positions with no
    /// corresponding passage (index and document store out of sync), and
    /// truncates to `k`. An empty result is a normal outcome, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(Vec<ScoredPassage>, Duration), SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".to_string()));
        }
        let start = Instant::now();

        let query_vector = self.embedder.embed_query(query).await?;
        let corpus = self.corpus_snapshot();

        let candidates = corpus.index.search(&query_vector, k * 2)?;

        let mut results = Vec::new();
        for (position, score) in candidates {
            if score < self.search.relevance_threshold {
                continue;
            }
            let Some(passage) = corpus.passage_at(position) else {
                continue;
            };
            results.push(ScoredPassage {
                passage: passage.clone(),
                score,
            });
            if results.len() == k {
                break;
            }
        }

        Ok((results, start.elapsed()))
    }

    /// Retrieve with a caller-supplied deadline. When the deadline elapses
    /// the in-flight work is abandoned and its result discarded.
    pub async fn retrieve_with_deadline(
        &self,
        query: &str,
        k: usize,
        deadline: Duration,
    ) -> Result<(Vec<ScoredPassage>, Duration), SearchError> {
        tokio::time::timeout(deadline, self.retrieve(query, k))
            .await
            .map_err(|_| SearchError::DeadlineExceeded)?
    }

    /// Answer a question: cache read-through, retrieval, answer generation,
    /// confidence scoring, and a confidence-gated cache write. A `deadline`
    /// bounds the retrieval step only; generation runs under the answer
    /// client's own timeout.
    ///
    /// Generation failures degrade to an apologetic answer rather than
    /// propagating; embedding and index failures do propagate.
    pub async fn ask(
        &self,
        question: &str,
        k: usize,
        temperature: f32,
        use_cache: bool,
        deadline: Option<Duration>,
    ) -> Result<AskResponse, SearchError> {
        let start = Instant::now();

        if use_cache
            && let Some(mut cached) = self.cache.get(question)
        {
            cached.cache_hit = true;
            return Ok(cached);
        }

        let (sources, search_elapsed) = match deadline {
            Some(deadline) => self.retrieve_with_deadline(question, k, deadline).await?,
            None => self.retrieve(question, k).await?,
        };
        let search_time = search_elapsed.as_secs_f64();

        if sources.is_empty() {
            return Ok(AskResponse::no_information(
                search_time,
                start.elapsed().as_secs_f64(),
            ));
        }

        let (answer, degraded) = match &self.generator {
            Some(generator) => match generator.generate(question, &sources, temperature).await {
                Ok(answer) => (answer, false),
                Err(e) => (
                    format!("Sorry, an error occurred while generating the answer: {e}"),
                    true,
                ),
            },
            None => (
                "Answer generation is not configured; the retrieved sources are listed below."
                    .to_string(),
                true,
            ),
        };

        let scores: Vec<f32> = sources.iter().map(|s| s.score).collect();
        let confidence = confidence_score(&scores, self.search.confidence_boost);

        let response = AskResponse {
            answer,
            sources,
            search_time,
            total_time: start.elapsed().as_secs_f64(),
            cache_hit: false,
            confidence,
        };

        // Degraded answers are never cached: a transient upstream failure
        // must not be replayed for the cache TTL.
        if use_cache && !degraded && confidence > self.search.cache_confidence_floor {
            self.cache.put(question, response.clone());
        }

        Ok(response)
    }
}
