use clap::Subcommand;
use socops_core::SocialPost;
use socops_pipeline::GateEngine;
use uuid::Uuid;

use crate::Runtime;

#[derive(Debug, Subcommand)]
pub enum GateCommands {
    /// Run the brand and compliance gates
    Run {
        /// Gate every gateable post of an ISO week
        #[arg(long, conflicts_with = "post", required_unless_present = "post")]
        week: Option<String>,
        /// Gate a single post
        #[arg(long)]
        post: Option<Uuid>,
    },
}

pub(crate) async fn run_gate(
    runtime: &Runtime,
    week: Option<&str>,
    post: Option<Uuid>,
) -> anyhow::Result<()> {
    let engine = GateEngine::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.settings.clone(),
    );

    if let Some(id) = post {
        let gated = engine.run_for_post(id).await?;
        print_verdict(&gated);
        return Ok(());
    }

    let week = week.ok_or_else(|| anyhow::anyhow!("either --week or --post is required"))?;
    let report = engine.run_for_week(week).await?;
    println!(
        "passed {}, failed {}, skipped {}, errors {}",
        report.passed,
        report.failed,
        report.skipped,
        report.errors.len()
    );
    for error in &report.errors {
        println!("  {}: {}", error.post_id, error.reason);
    }
    Ok(())
}

fn print_verdict(post: &SocialPost) {
    let level = |l: Option<socops_core::GateLevel>| l.map_or("-", |l| l.as_str());
    println!(
        "{} {} brand={} compliance={} score={}",
        post.id,
        post.status,
        level(post.brand_gate_level),
        level(post.compliance_gate_level),
        post.quality_score.unwrap_or(0)
    );
    if let Some(summary) = &post.gate_summary {
        for issue in &summary.blocking_issues {
            println!("  blocking: {issue}");
        }
        for warning in &summary.brand.warnings {
            println!("  warning: {}", warning.message);
        }
        for check in summary
            .compliance
            .checks
            .iter()
            .filter(|c| c.level != socops_core::GateLevel::Pass)
        {
            println!("  {} {}: {}", check.level, check.name, check.detail);
        }
    }
}
