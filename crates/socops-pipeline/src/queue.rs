//! Human approval queue and publish manifest export.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use socops_core::manifest::scheduled_time_for_day;
use socops_core::ports::{PipelineStore, StatusUpdate};
use socops_core::{
    append_utm, Channel, IsoWeek, ManifestEntry, PostStatus, PublishManifest, SocialPost,
};
use uuid::Uuid;

use crate::progress::sync_plan_progress;
use crate::{PipelineError, PipelineSettings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    /// In input order.
    pub failures: Vec<BulkFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub post_id: Uuid,
    pub reason: String,
}

pub struct PublishQueue {
    store: Arc<dyn PipelineStore>,
    settings: PipelineSettings,
}

impl PublishQueue {
    #[must_use]
    pub fn new(store: Arc<dyn PipelineStore>, settings: PipelineSettings) -> Self {
        Self { store, settings }
    }

    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] for a malformed week or status filter.
    pub async fn list_posts(
        &self,
        week_iso: &str,
        status: Option<&str>,
    ) -> Result<Vec<SocialPost>, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        let status = status.map(str::parse::<PostStatus>).transpose()?;
        Ok(self.store.list_posts(week, status).await?)
    }

    /// Approve a post that passed its gates.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidTransition`] unless the post is `gate_passed`,
    /// [`PipelineError::NotFound`] if it does not exist.
    pub async fn approve(&self, post_id: Uuid, approved_by: &str) -> Result<SocialPost, PipelineError> {
        let post = self.approve_one(post_id, approved_by).await?;
        self.sync(post.key.week).await;
        Ok(post)
    }

    /// Send a post back to `draft`, clearing its approval.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidTransition`] for published posts,
    /// [`PipelineError::NotFound`] if the post does not exist.
    pub async fn reject(&self, post_id: Uuid) -> Result<SocialPost, PipelineError> {
        let update = StatusUpdate {
            status: PostStatus::Draft,
            approved_by: None,
            approved_at: None,
            published_at: None,
            clear_approval: true,
        };
        let post = self
            .transition(post_id, &PostStatus::rejectable(), &update)
            .await?;
        tracing::info!(post_id = %post_id, "post rejected");
        self.sync(post.key.week).await;
        Ok(post)
    }

    /// Approve each id independently; one failure does not stop the others.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] if `approved_by` is blank.
    pub async fn bulk_approve(
        &self,
        post_ids: &[Uuid],
        approved_by: &str,
    ) -> Result<BulkReport, PipelineError> {
        validate_approver(approved_by)?;
        Ok(self
            .bulk(post_ids, |id| async move { self.approve_one(id, approved_by).await })
            .await)
    }

    /// Move approved posts to `published`, each id independently.
    pub async fn mark_published(&self, post_ids: &[Uuid]) -> BulkReport {
        let now = Utc::now();
        self.bulk(post_ids, |id| async move {
            let update = StatusUpdate {
                status: PostStatus::Published,
                approved_by: None,
                approved_at: None,
                published_at: Some(now),
                clear_approval: false,
            };
            self.transition(id, &PostStatus::sources_of(PostStatus::Published), &update).await
        })
        .await
    }

    /// Project the week's approved posts for `channel` into a manifest.
    /// Reads only; repeated calls on unchanged state return identical output.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] for a malformed week or unknown channel.
    pub async fn export_manifest(
        &self,
        week_iso: &str,
        channel: &str,
    ) -> Result<PublishManifest, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        let channel: Channel = channel.parse()?;
        let posts = self
            .store
            .list_posts(week, Some(PostStatus::Approved))
            .await?;
        let manifest = build_manifest(week, channel, &posts)?;
        tracing::info!(
            week = %week,
            channel = %channel,
            posts = manifest.posts.len(),
            "manifest exported"
        );
        Ok(manifest)
    }

    async fn approve_one(&self, post_id: Uuid, approved_by: &str) -> Result<SocialPost, PipelineError> {
        validate_approver(approved_by)?;
        let update = StatusUpdate {
            status: PostStatus::Approved,
            approved_by: Some(approved_by.trim().to_string()),
            approved_at: Some(Utc::now()),
            published_at: None,
            clear_approval: false,
        };
        let post = self
            .transition(post_id, &PostStatus::sources_of(PostStatus::Approved), &update)
            .await?;
        tracing::info!(post_id = %post_id, approved_by = %approved_by, "post approved");
        Ok(post)
    }

    async fn transition(
        &self,
        post_id: Uuid,
        allowed_from: &[PostStatus],
        update: &StatusUpdate,
    ) -> Result<SocialPost, PipelineError> {
        if let Some(post) = self.store.set_status(post_id, allowed_from, update).await? {
            return Ok(post);
        }
        match self.store.get_post(post_id).await? {
            Some(current) => Err(PipelineError::InvalidTransition {
                id: post_id,
                from: current.status,
                to: update.status,
            }),
            None => Err(PipelineError::post_not_found(post_id)),
        }
    }

    async fn bulk<F, Fut>(&self, post_ids: &[Uuid], op: F) -> BulkReport
    where
        F: Fn(Uuid) -> Fut,
        Fut: std::future::Future<Output = Result<SocialPost, PipelineError>>,
    {
        let max_concurrent = self.settings.max_concurrent_generations.max(1);
        let mut results: Vec<(usize, Uuid, Result<SocialPost, PipelineError>)> =
            stream::iter(post_ids.iter().copied().enumerate())
                .map(|(i, id)| {
                    let fut = op(id);
                    async move { (i, id, fut.await) }
                })
                .buffer_unordered(max_concurrent)
                .collect()
                .await;
        results.sort_by_key(|(i, _, _)| *i);

        let mut report = BulkReport::default();
        let mut weeks = BTreeSet::new();
        for (_, id, result) in results {
            match result {
                Ok(post) => {
                    report.succeeded += 1;
                    weeks.insert(post.key.week);
                }
                Err(e) => {
                    tracing::warn!(post_id = %id, error = %e, "bulk operation failed for post");
                    report.failed += 1;
                    report.failures.push(BulkFailure {
                        post_id: id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        for week in weeks {
            self.sync(week).await;
        }
        report
    }

    async fn sync(&self, week: IsoWeek) {
        if let Err(e) = sync_plan_progress(self.store.as_ref(), week).await {
            tracing::warn!(week = %week, error = %e, "failed to refresh plan progress");
        }
    }
}

fn validate_approver(approved_by: &str) -> Result<(), PipelineError> {
    if approved_by.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "approved_by must be non-empty".to_string(),
        ));
    }
    Ok(())
}

/// Pure projection of approved posts into a channel manifest, ordered by
/// `(day, slot label, post id)`.
///
/// # Errors
///
/// [`PipelineError::InvalidInput`] if a post carries a day outside `1..=7`.
pub fn build_manifest(
    week: IsoWeek,
    channel: Channel,
    posts: &[SocialPost],
) -> Result<PublishManifest, PipelineError> {
    let mut included: Vec<&SocialPost> = posts
        .iter()
        .filter(|p| p.key.week == week && p.status == PostStatus::Approved)
        .filter(|p| p.channels.contains_key(&channel))
        .collect();
    included.sort_by(|a, b| {
        (a.key.day_of_week, &a.key.slot_label, a.id).cmp(&(
            b.key.day_of_week,
            &b.key.slot_label,
            b.id,
        ))
    });

    let mut entries = Vec::with_capacity(included.len());
    for post in &included {
        let Some(variant) = post.channels.get(&channel) else {
            continue;
        };
        let link = match post.utm_for(channel) {
            Some(params) => append_utm(&post.link_url, params),
            None => post.link_url.clone(),
        };
        entries.push(ManifestEntry {
            post_id: post.id,
            scheduled_date: week.date_for_day(post.key.day_of_week)?,
            scheduled_time: scheduled_time_for_day(post.key.day_of_week),
            caption: variant.caption.clone(),
            hashtags: variant.hashtags.clone(),
            link,
            format: variant.format.clone(),
            visual_brief: variant
                .visual_brief
                .clone()
                .or_else(|| post.visual_brief.clone()),
        });
    }

    let generated_at = included
        .iter()
        .filter_map(|p| p.approved_at)
        .max()
        .unwrap_or_else(|| week_start(week));

    Ok(PublishManifest {
        week_iso: week,
        channel,
        generated_at,
        posts: entries,
    })
}

fn week_start(week: IsoWeek) -> DateTime<Utc> {
    Utc.from_utc_datetime(&week.monday().and_time(NaiveTime::MIN))
}
