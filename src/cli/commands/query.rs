//! Query command: retrieval-only or full question answering.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::commands::resolve_index_dir;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{AnswerClient, AnswerGenerator, CorpusIndex, EmbeddingClient, SearchEngine};

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "Question to ask")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of passages to retrieve")]
    pub top_k: Option<usize>,

    #[arg(long, help = "Only retrieve passages, skip answer generation")]
    pub retrieve_only: bool,

    #[arg(long, help = "Bypass the response cache")]
    pub no_cache: bool,

    #[arg(long, help = "Retrieval deadline in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Sampling temperature for answer generation")]
    pub temperature: Option<f32>,

    /// Where the index was written (defaults to the platform data directory)
    #[arg(long)]
    pub index_dir: Option<PathBuf>,
}

pub async fn handle_query(args: QueryArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let top_k = args.top_k.unwrap_or(config.search.top_k);
    if top_k == 0 {
        anyhow::bail!("top_k must be at least 1");
    }
    let temperature = args.temperature.unwrap_or(config.generation.temperature);

    let index_dir = resolve_index_dir(args.index_dir)?;
    let corpus = CorpusIndex::load(&index_dir).with_context(|| {
        format!(
            "failed to load index from {} (run `ksearch build` first)",
            index_dir.display()
        )
    })?;

    if verbose {
        eprintln!(
            "Loaded {} index: {} passages, dim {}",
            corpus.index.mode(),
            corpus.passages.len(),
            corpus.index.dimension()
        );
    }

    let embedder = Arc::new(
        EmbeddingClient::new(&config.embedding).context("failed to create embedding client")?,
    );

    let generator: Option<Arc<dyn AnswerGenerator>> = if args.retrieve_only {
        None
    } else {
        let client =
            AnswerClient::new(&config.generation).context("failed to create answer client")?;
        Some(Arc::new(client))
    };

    let engine = SearchEngine::new(
        embedder,
        generator,
        Arc::new(corpus),
        config.search.clone(),
        &config.cache,
    );

    let deadline = args.timeout.map(Duration::from_secs);

    if args.retrieve_only {
        let (results, elapsed) = match deadline {
            Some(deadline) => {
                engine
                    .retrieve_with_deadline(question, top_k, deadline)
                    .await?
            }
            None => engine.retrieve(question, top_k).await?,
        };

        if verbose {
            eprintln!("Retrieved {} passages in {:?}", results.len(), elapsed);
        }
        print!(
            "{}",
            formatter.format_retrieval(question, &results, elapsed.as_millis() as u64)
        );
        return Ok(());
    }

    let response = engine
        .ask(question, top_k, temperature, !args.no_cache, deadline)
        .await?;

    if verbose {
        eprintln!(
            "Search: {:.3}s, total: {:.3}s, confidence: {:.2}, cache hit: {}",
            response.search_time, response.total_time, response.confidence, response.cache_hit
        );
    }

    print!("{}", formatter.format_answer(&response));

    Ok(())
}
