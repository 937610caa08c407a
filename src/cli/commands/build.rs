//! Build command: ingest documents, embed passages, train and populate
//! the vector index, and persist the corpus.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

use crate::cli::commands::resolve_index_dir;
use crate::cli::output::{BuildStats, get_formatter};
use crate::index::{IndexMode, IvfParams, VectorIndex};
use crate::ingest::load_directory;
use crate::models::{Config, OutputFormat};
use crate::services::{CorpusIndex, EmbeddingClient, TextChunker};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Directory containing the documents to index
    #[arg(required = true)]
    pub path: PathBuf,

    /// Where to write the index (defaults to the platform data directory)
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Index mode override: ivf or flat
    #[arg(long, short = 'm')]
    pub mode: Option<IndexMode>,
}

pub async fn handle_build(args: BuildArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let index_dir = resolve_index_dir(args.index_dir)?;
    let mode = args.mode.unwrap_or(config.indexing.index_mode);

    let chunker = TextChunker::new(&config.indexing)?;
    let report = load_directory(&args.path, &chunker, &config.indexing)
        .with_context(|| format!("failed to load documents from {}", args.path.display()))?;

    if verbose {
        eprintln!(
            "Scanned {} files: {} indexed, {} skipped, {} passages",
            report.files_scanned,
            report.files_indexed,
            report.files_skipped,
            report.passages.len()
        );
        for (path, reason) in &report.skipped {
            eprintln!("  Skipping {}: {}", path.display(), reason);
        }
    }

    let embedding_client =
        EmbeddingClient::new(&config.embedding).context("failed to create embedding client")?;

    let texts: Vec<String> = report.passages.iter().map(|p| p.content.clone()).collect();

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap()
            .progress_chars("#>-"),
    );

    let embeddings = embedding_client
        .embed_with_observer(&texts, |progress| {
            pb.set_position(progress.texts_embedded as u64);
        })
        .await
        .context("embedding failed")?;
    pb.finish_and_clear();

    let dimension = embeddings
        .first()
        .map(|v| v.len())
        .context("embedding server returned no vectors")?;

    let params = IvfParams::from(&config.indexing);
    let mut index = VectorIndex::new(dimension, mode, params).with_context(|| {
        format!("failed to create {mode} index for dimension {dimension}")
    })?;

    if index.needs_training() {
        if verbose {
            eprintln!("Training {} index on {} vectors...", mode, embeddings.len());
        }
        index.train(&embeddings).context("index training failed")?;
    }
    index.add(&embeddings).context("failed to add vectors")?;

    let corpus = CorpusIndex::new(index, report.passages);
    let metadata = corpus.metadata(
        &config.indexing,
        report.files_indexed,
        report.files_skipped,
    );
    corpus
        .save(&index_dir, &metadata)
        .with_context(|| format!("failed to save index to {}", index_dir.display()))?;

    let stats = BuildStats {
        files_scanned: report.files_scanned,
        files_indexed: report.files_indexed,
        files_skipped: report.files_skipped,
        passages: corpus.passages.len() as u64,
        vectors: corpus.index.len() as u64,
        dimension,
        index_mode: mode.to_string(),
        duration_ms: start_time.elapsed().as_millis() as u64,
    };

    print!("{}", formatter.format_build_stats(&stats));

    Ok(())
}
