mod build;
mod config;
mod query;
mod status;

pub use build::{BuildArgs, handle_build};
pub use config::{ConfigCommand, handle_config};
pub use query::{QueryArgs, handle_query};
pub use status::{StatusArgs, handle_status};

use std::path::PathBuf;

use anyhow::Result;

use crate::models::Config;

/// Resolve the index directory: explicit flag first, then the platform
/// data directory.
pub(crate) fn resolve_index_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    Config::data_dir()
        .map(|p| p.join("index"))
        .ok_or_else(|| anyhow::anyhow!("could not determine data directory; pass --index-dir"))
}
