use std::sync::Arc;

use clap::Subcommand;
use socops_genclient::GenerationClient;
use socops_pipeline::{BatchReport, CopyOrchestrator};
use tokio_util::sync::CancellationToken;

use crate::Runtime;

#[derive(Debug, Subcommand)]
pub enum CopyCommands {
    /// Generate copy for every slot of a planned week
    Generate {
        /// ISO week, e.g. 2026-W09
        #[arg(long)]
        week: String,
        /// Generate and print the copy without storing posts or links
        #[arg(long)]
        dry_run: bool,
    },
}

/// Generate the week's copy. Per-slot failures are reported, not returned.
///
/// # Errors
///
/// Returns an error if no generator is configured, the week is malformed or
/// has no plan.
pub(crate) async fn run_copy_generate(
    runtime: &Runtime,
    week: &str,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let client = GenerationClient::new(&runtime.config)
        .map_err(|e| anyhow::anyhow!("cannot build generator client: {e}"))?;
    let orchestrator = CopyOrchestrator::new(
        Arc::new(client),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.settings.clone(),
    );

    let report = orchestrator.generate_week(week, dry_run, cancel).await?;
    print_report(&report, dry_run);
    Ok(())
}

fn print_report(report: &BatchReport, dry_run: bool) {
    if dry_run {
        for copy in &report.previews {
            println!("--- day {} {} ---", copy.day_of_week, copy.slot_label);
            for (channel, variant) in &copy.variants {
                println!("[{channel}] {}", variant.caption);
                if !variant.hashtags.is_empty() {
                    println!("    {}", variant.hashtags.join(" "));
                }
                if let Some(link) = copy.links.get(channel) {
                    println!("    {}", link.full_url);
                }
            }
        }
        println!();
    }

    println!(
        "{}generated {}, failed {}, skipped {}",
        if dry_run { "dry-run: " } else { "" },
        report.generated,
        report.failed,
        report.skipped
    );
    for failure in &report.failures {
        let channel = failure.channel.map_or("-", |c| c.as_str());
        println!(
            "  day {} {} [{channel}]: {}",
            failure.day_of_week, failure.slot_label, failure.reason
        );
    }
}
