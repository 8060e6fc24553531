use std::path::{Path, PathBuf};

use clap::Subcommand;
use socops_core::Channel;
use socops_pipeline::PublishQueue;

use crate::Runtime;

#[derive(Debug, Subcommand)]
pub enum ManifestCommands {
    /// Write `manifest_{week}_{channel}.json` for approved posts
    Export {
        #[arg(long)]
        week: String,
        /// Channel to export (repeatable); all channels when omitted
        #[arg(long = "channel")]
        channels: Vec<String>,
        /// Directory the manifests are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Export one manifest file per requested channel.
///
/// # Errors
///
/// Returns an error for a malformed week or unknown channel, or if a file
/// cannot be written.
pub(crate) async fn run_manifest_export(
    runtime: &Runtime,
    week: &str,
    channels: &[String],
    out_dir: &Path,
) -> anyhow::Result<()> {
    let channels: Vec<String> = if channels.is_empty() {
        Channel::ALL.iter().map(|c| c.as_str().to_string()).collect()
    } else {
        channels.to_vec()
    };

    std::fs::create_dir_all(out_dir)
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", out_dir.display()))?;

    let queue = PublishQueue::new(runtime.store.clone(), runtime.settings.clone());
    for channel in &channels {
        let manifest = queue.export_manifest(week, channel).await?;
        let path = out_dir.join(manifest.file_name());
        let body = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&path, body)
            .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;
        println!("{} post(s) -> {}", manifest.posts.len(), path.display());
    }
    Ok(())
}
