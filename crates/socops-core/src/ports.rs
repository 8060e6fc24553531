//! Narrow interfaces to the pipeline's collaborators.
//!
//! Implementations are injected as `Arc<dyn …>`: `socops-db` provides the
//! Postgres-backed store, rule repository and catalog, `socops-genclient`
//! provides the HTTP content generator.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::{Channel, PlanStatus, PostStatus};
use crate::gate::{GateLevel, GateSummary};
use crate::plan::{PlanCounters, WeeklyPlan};
use crate::post::{NewSocialPost, SocialPost};
use crate::rules::BrandRule;
use crate::utm::UtmLink;
use crate::week::IsoWeek;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("{service} timed out after {after:?}")]
    Timeout { service: String, after: Duration },

    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse { service: String, reason: String },
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// e.g. `social_instagram`.
    pub content_type: String,
    pub prompt: String,
    pub tone: String,
    pub language: String,
    pub max_length: usize,
    pub temperature: f32,
    pub context: serde_json::Value,
    pub use_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GeneratedContent, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A catalog topic the planner may schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCandidate {
    pub id: i64,
    pub alias: String,
    pub name: String,
    pub category: String,
    /// Canonical storefront path, e.g. `/pieces/disque-frein`.
    pub source_path: String,
    pub price_from: Option<Decimal>,
    /// Monthly sessions for traffic candidates, missing-content score for
    /// coverage-gap candidates.
    pub signal: i64,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn resolve_alias(&self, alias: &str) -> Result<Option<TopicCandidate>, StoreError>;

    /// Best-performing topics, highest traffic first.
    async fn high_traffic_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError>;

    /// Topics with the least content coverage, largest gap first.
    async fn coverage_gap_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules that are global or scoped to `channel`.
    async fn active_rules(&self, channel: Channel) -> Result<Vec<BrandRule>, StoreError>;
}

// ---------------------------------------------------------------------------
// Pipeline store
// ---------------------------------------------------------------------------

/// Result of writing a post by its natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(Uuid),
    Updated(Uuid),
    /// The existing post is approved or published and was left untouched.
    Locked { id: Uuid, status: PostStatus },
}

impl UpsertOutcome {
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            UpsertOutcome::Inserted(id)
            | UpsertOutcome::Updated(id)
            | UpsertOutcome::Locked { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub status: PostStatus,
    pub brand_level: GateLevel,
    pub compliance_level: GateLevel,
    pub summary: GateSummary,
    pub quality_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: PostStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// Reset `approved_by`/`approved_at` to null.
    pub clear_approval: bool,
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Insert or overwrite the plan for `plan.week`. Counters already stored
    /// for the week are kept; the returned plan carries them.
    async fn upsert_plan(&self, plan: &WeeklyPlan) -> Result<WeeklyPlan, StoreError>;

    async fn get_plan(&self, week: IsoWeek) -> Result<Option<WeeklyPlan>, StoreError>;

    async fn set_plan_status(&self, week: IsoWeek, status: PlanStatus) -> Result<(), StoreError>;

    /// Recompute the plan counters from the week's posts.
    async fn refresh_plan_counters(&self, week: IsoWeek) -> Result<PlanCounters, StoreError>;

    /// Write a post by natural key. Only posts in a regenerable status are
    /// overwritten; the write resets them to `generated`.
    async fn upsert_post(&self, post: &NewSocialPost) -> Result<UpsertOutcome, StoreError>;

    async fn get_post(&self, id: Uuid) -> Result<Option<SocialPost>, StoreError>;

    async fn list_posts(
        &self,
        week: IsoWeek,
        status: Option<PostStatus>,
    ) -> Result<Vec<SocialPost>, StoreError>;

    /// Store a gate verdict if the post is still in a gateable status.
    /// `None` means no row matched.
    async fn save_gate_result(
        &self,
        id: Uuid,
        outcome: &GateOutcome,
    ) -> Result<Option<SocialPost>, StoreError>;

    /// Compare-and-set status change: applied only when the current status is
    /// one of `allowed_from`. `None` means no row matched.
    async fn set_status(
        &self,
        id: Uuid,
        allowed_from: &[PostStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SocialPost>, StoreError>;

    /// Topic ids of posts approved or published since `since`.
    async fn recently_posted_topic_ids(&self, since: DateTime<Utc>)
        -> Result<Vec<i64>, StoreError>;

    /// Record a generated link. Registering the same link twice is a no-op.
    async fn register_utm_link(&self, link: &UtmLink) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_outcome_exposes_id() {
        let id = Uuid::new_v4();
        assert_eq!(UpsertOutcome::Inserted(id).id(), id);
        assert_eq!(
            UpsertOutcome::Locked {
                id,
                status: PostStatus::Approved
            }
            .id(),
            id
        );
    }

    #[test]
    fn timeout_message_names_service() {
        let err = UpstreamError::Timeout {
            service: "generator".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "generator timed out after 30s");
    }
}
