//! Review queue handlers: list, approve, reject, publish.

use clap::Subcommand;
use socops_core::SocialPost;
use socops_pipeline::{BulkReport, PublishQueue};
use uuid::Uuid;

use crate::Runtime;

#[derive(Debug, Subcommand)]
pub enum PostsCommands {
    /// List a week's posts
    List {
        #[arg(long)]
        week: String,
        /// Only posts in this status (e.g. gate_passed)
        #[arg(long)]
        status: Option<String>,
    },
    /// Approve a post that passed its gates
    Approve {
        id: Uuid,
        /// Reviewer name
        #[arg(long, env = "SOCOPS_APPROVER")]
        by: String,
    },
    /// Send a post back to draft
    Reject { id: Uuid },
    /// Approve several posts, reporting failures per post
    BulkApprove {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<Uuid>,
        #[arg(long, env = "SOCOPS_APPROVER")]
        by: String,
    },
}

fn queue(runtime: &Runtime) -> PublishQueue {
    PublishQueue::new(runtime.store.clone(), runtime.settings.clone())
}

pub(crate) async fn run_posts_list(
    runtime: &Runtime,
    week: &str,
    status: Option<&str>,
) -> anyhow::Result<()> {
    let posts = queue(runtime).list_posts(week, status).await?;
    if posts.is_empty() {
        println!("no posts for {week}; run `copy generate --week {week}` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<4}{:<16}{:<11}{:<13}{:<6}CAPTION",
        "ID", "DAY", "SLOT", "CHANNEL", "STATUS", "SCORE"
    );
    for post in &posts {
        println!(
            "{:<38}{:<4}{:<16}{:<11}{:<13}{:<6}{}",
            post.id,
            post.key.day_of_week,
            post.key.slot_label,
            post.key.primary_channel,
            post.status,
            post.quality_score
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            caption_preview(post)
        );
    }
    Ok(())
}

fn caption_preview(post: &SocialPost) -> String {
    let caption = post
        .primary_variant()
        .map(|v| v.caption.replace('\n', " "))
        .unwrap_or_default();
    if caption.chars().count() > 50 {
        format!("{}...", caption.chars().take(50).collect::<String>())
    } else {
        caption
    }
}

pub(crate) async fn run_posts_approve(runtime: &Runtime, id: Uuid, by: &str) -> anyhow::Result<()> {
    let post = queue(runtime).approve(id, by).await?;
    println!(
        "approved {} by {}",
        post.id,
        post.approved_by.as_deref().unwrap_or(by)
    );
    Ok(())
}

pub(crate) async fn run_posts_reject(runtime: &Runtime, id: Uuid) -> anyhow::Result<()> {
    let post = queue(runtime).reject(id).await?;
    println!("rejected {} (now {})", post.id, post.status);
    Ok(())
}

pub(crate) async fn run_posts_bulk_approve(
    runtime: &Runtime,
    ids: &[Uuid],
    by: &str,
) -> anyhow::Result<()> {
    let report = queue(runtime).bulk_approve(ids, by).await?;
    print_bulk("approved", &report);
    Ok(())
}

pub(crate) async fn run_publish_mark(runtime: &Runtime, ids: &[Uuid]) -> anyhow::Result<()> {
    let report = queue(runtime).mark_published(ids).await;
    print_bulk("published", &report);
    Ok(())
}

fn print_bulk(verb: &str, report: &BulkReport) {
    println!("{verb} {}, failed {}", report.succeeded, report.failed);
    for failure in &report.failures {
        println!("  {}: {}", failure.post_id, failure.reason);
    }
}
