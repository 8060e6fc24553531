//! `plan` command handlers.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use socops_core::{calendar::load_calendar, WeeklyPlan};
use socops_pipeline::WeeklyPlanner;

use crate::Runtime;

#[derive(Debug, Subcommand)]
pub enum PlanCommands {
    /// Build (or rebuild) the plan for an ISO week
    Generate {
        /// ISO week, e.g. 2026-W09
        #[arg(long)]
        week: String,
        /// Topic aliases to schedule instead of catalog picks (comma-separated or repeated)
        #[arg(long = "topic", value_delimiter = ',')]
        topics: Vec<String>,
        /// Calendar YAML; defaults to SOCOPS_CALENDAR_PATH, then the built-in week
        #[arg(long)]
        calendar: Option<PathBuf>,
    },
    /// Print a stored plan
    Show {
        #[arg(long)]
        week: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn planner(runtime: &Runtime) -> WeeklyPlanner {
    WeeklyPlanner::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.settings.clone(),
    )
}

pub(crate) async fn run_plan_generate(
    runtime: &Runtime,
    week: &str,
    topics: &[String],
    calendar: Option<&Path>,
) -> anyhow::Result<()> {
    let calendar_path = calendar.or(runtime.config.calendar_path.as_deref());
    let calendar = calendar_path
        .map(|p| {
            load_calendar(p)
                .map_err(|e| anyhow::anyhow!("failed to load calendar {}: {e}", p.display()))
        })
        .transpose()?;
    let priority = (!topics.is_empty()).then_some(topics);

    let plan = planner(runtime)
        .generate_plan(week, priority, calendar)
        .await?;
    print_plan(&plan);
    Ok(())
}

pub(crate) async fn run_plan_show(runtime: &Runtime, week: &str, json: bool) -> anyhow::Result<()> {
    let plan = planner(runtime).get_plan(week).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &WeeklyPlan) {
    println!("Plan {} ({})", plan.week, plan.status);
    println!(
        "posts: {} generated, {} approved, {} published",
        plan.counters.posts_generated, plan.counters.posts_approved, plan.counters.posts_published
    );
    println!();
    println!(
        "{:<4}{:<12}{:<16}{:<30}CHANNELS",
        "DAY", "DATE", "SLOT", "TOPIC"
    );
    for slot in &plan.slots {
        let channels: Vec<&str> = slot
            .brief
            .target_channels
            .iter()
            .map(|c| c.as_str())
            .collect();
        println!(
            "{:<4}{:<12}{:<16}{:<30}{}",
            slot.day_of_week,
            slot.date,
            slot.label(),
            slot.brief.topic.as_deref().unwrap_or("(generic)"),
            channels.join(",")
        );
    }
}
