//! [`PgStore`]: the Postgres adapter behind the pipeline ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use socops_core::ports::{
    CatalogSource, GateOutcome, PipelineStore, RuleRepository, StatusUpdate, StoreError,
    TopicCandidate, UpsertOutcome,
};
use socops_core::{
    BrandRule, Channel, IsoWeek, NewSocialPost, PlanCounters, PlanStatus, PostStatus, SocialPost,
    UtmLink, WeeklyPlan,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{plans, posts, rules, topics, utm_links};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn upsert_plan(&self, plan: &WeeklyPlan) -> Result<WeeklyPlan, StoreError> {
        Ok(plans::upsert_plan(&self.pool, plan).await?)
    }

    async fn get_plan(&self, week: IsoWeek) -> Result<Option<WeeklyPlan>, StoreError> {
        Ok(plans::get_plan(&self.pool, week).await?)
    }

    async fn set_plan_status(&self, week: IsoWeek, status: PlanStatus) -> Result<(), StoreError> {
        if plans::set_plan_status(&self.pool, week, status).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "plan",
                id: week.to_string(),
            })
        }
    }

    async fn refresh_plan_counters(&self, week: IsoWeek) -> Result<PlanCounters, StoreError> {
        Ok(plans::refresh_plan_counters(&self.pool, week).await?)
    }

    async fn upsert_post(&self, post: &NewSocialPost) -> Result<UpsertOutcome, StoreError> {
        Ok(posts::upsert_post(&self.pool, post).await?)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<SocialPost>, StoreError> {
        Ok(posts::get_post(&self.pool, id).await?)
    }

    async fn list_posts(
        &self,
        week: IsoWeek,
        status: Option<PostStatus>,
    ) -> Result<Vec<SocialPost>, StoreError> {
        Ok(posts::list_posts(&self.pool, week, status).await?)
    }

    async fn save_gate_result(
        &self,
        id: Uuid,
        outcome: &GateOutcome,
    ) -> Result<Option<SocialPost>, StoreError> {
        Ok(posts::save_gate_result(&self.pool, id, outcome).await?)
    }

    async fn set_status(
        &self,
        id: Uuid,
        allowed_from: &[PostStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SocialPost>, StoreError> {
        Ok(posts::set_status(&self.pool, id, allowed_from, update).await?)
    }

    async fn recently_posted_topic_ids(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        Ok(posts::recently_posted_topic_ids(&self.pool, since).await?)
    }

    async fn register_utm_link(&self, link: &UtmLink) -> Result<(), StoreError> {
        let inserted = utm_links::register_utm_link(&self.pool, link).await?;
        if !inserted {
            tracing::debug!(url = %link.full_url, "utm link already registered");
        }
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for PgStore {
    async fn active_rules(&self, channel: Channel) -> Result<Vec<BrandRule>, StoreError> {
        Ok(rules::active_rules(&self.pool, channel).await?)
    }
}

#[async_trait]
impl CatalogSource for PgStore {
    async fn resolve_alias(&self, alias: &str) -> Result<Option<TopicCandidate>, StoreError> {
        Ok(topics::resolve_alias(&self.pool, alias).await?)
    }

    async fn high_traffic_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError> {
        Ok(topics::high_traffic_topics(&self.pool, limit).await?)
    }

    async fn coverage_gap_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError> {
        Ok(topics::coverage_gap_topics(&self.pool, limit).await?)
    }
}
