//! Status command: report on the persisted index.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::commands::resolve_index_dir;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::OutputFormat;
use crate::services::CorpusIndex;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Where the index was written (defaults to the platform data directory)
    #[arg(long)]
    pub index_dir: Option<PathBuf>,
}

pub async fn handle_status(args: StatusArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let index_dir = resolve_index_dir(args.index_dir)?;

    match CorpusIndex::load_metadata(&index_dir) {
        Ok(metadata) => {
            let status = StatusInfo {
                index_dir: index_dir.display().to_string(),
                metadata,
            };
            print!("{}", formatter.format_status(&status));
        }
        Err(_) => {
            print!(
                "{}",
                formatter.format_message(&format!(
                    "No index found at {}. Run `ksearch build <directory>` first.",
                    index_dir.display()
                ))
            );
        }
    }

    Ok(())
}
