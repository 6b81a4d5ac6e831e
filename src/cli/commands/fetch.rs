//! Fetch command implementation.

use crate::artifact::{ArtifactStore, LocalArtifactStore};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::io::Write;

/// Resolve a signed link against the local store.
pub async fn run_fetch(url: &str, output: Option<&str>, settings: &Settings) -> Result<()> {
    let store = LocalArtifactStore::from_settings(settings)?;
    let bytes = store
        .fetch(url)
        .await
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.kind(), e))?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)?;
            Output::success(&format!("Wrote {} bytes to {}", bytes.len(), path));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
