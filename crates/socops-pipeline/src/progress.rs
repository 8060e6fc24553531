use socops_core::ports::PipelineStore;
use socops_core::{IsoWeek, PlanStatus, PostStatus, SocialPost};

use crate::PipelineError;

/// Recompute the week's counters and move the plan to the status its posts
/// imply. Weeks without a stored plan are left alone.
pub(crate) async fn sync_plan_progress(
    store: &dyn PipelineStore,
    week: IsoWeek,
) -> Result<(), PipelineError> {
    let Some(plan) = store.get_plan(week).await? else {
        return Ok(());
    };
    let counters = store.refresh_plan_counters(week).await?;
    let posts = store.list_posts(week, None).await?;
    let next = derive_plan_status(plan.status, &posts);
    if next != plan.status {
        store.set_plan_status(week, next).await?;
        tracing::info!(week = %week, from = %plan.status, to = %next, "plan status changed");
    }
    tracing::debug!(
        week = %week,
        generated = counters.posts_generated,
        approved = counters.posts_approved,
        published = counters.posts_published,
        "plan counters refreshed"
    );
    Ok(())
}

pub(crate) fn derive_plan_status(current: PlanStatus, posts: &[SocialPost]) -> PlanStatus {
    if posts.is_empty() {
        return current;
    }
    if posts.iter().all(|p| p.status == PostStatus::Published) {
        PlanStatus::Completed
    } else if posts
        .iter()
        .all(|p| matches!(p.status, PostStatus::Approved | PostStatus::Published))
    {
        PlanStatus::Approved
    } else {
        PlanStatus::InProgress
    }
}
