//! In-memory implementations of the pipeline ports.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use socops_core::ports::{
    CatalogSource, ContentGenerator, GateOutcome, GeneratedContent, GenerationRequest,
    PipelineStore, RuleRepository, StatusUpdate, StoreError, TopicCandidate, UpsertOutcome,
    UpstreamError,
};
use socops_core::{
    BrandRule, Channel, ChannelVariant, IsoWeek, NewSocialPost, Pillar, PlanCounters, PlanStatus,
    PostKey, PostStatus, SocialPost, UtmLink, UtmParams, WeeklyPlan,
};
use socops_pipeline::PipelineSettings;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    plans: HashMap<IsoWeek, WeeklyPlan>,
    plan_writes: usize,
    posts: Vec<SocialPost>,
    links: Vec<UtmLink>,
    recent_topic_ids: Vec<i64>,
    recent_since: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_recent_topics(ids: &[i64]) -> Arc<Self> {
        let store = Self::default();
        store.state.lock().unwrap().recent_topic_ids = ids.to_vec();
        Arc::new(store)
    }

    pub fn plan_count(&self) -> usize {
        self.state.lock().unwrap().plans.len()
    }

    pub fn plan_writes(&self) -> usize {
        self.state.lock().unwrap().plan_writes
    }

    pub fn plan(&self, week: IsoWeek) -> Option<WeeklyPlan> {
        self.state.lock().unwrap().plans.get(&week).cloned()
    }

    pub fn posts(&self) -> Vec<SocialPost> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn post(&self, id: Uuid) -> SocialPost {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("post exists")
    }

    pub fn links(&self) -> Vec<UtmLink> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn recent_since(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().recent_since
    }

    pub fn insert_post(&self, post: SocialPost) -> Uuid {
        let id = post.id;
        self.state.lock().unwrap().posts.push(post);
        id
    }
}

fn counters_for(posts: &[SocialPost], week: IsoWeek) -> PlanCounters {
    let in_week: Vec<&SocialPost> = posts.iter().filter(|p| p.key.week == week).collect();
    let count = |f: &dyn Fn(&SocialPost) -> bool| {
        i64::try_from(in_week.iter().filter(|p| f(p)).count()).unwrap()
    };
    PlanCounters {
        posts_generated: count(&|_| true),
        posts_approved: count(&|p| {
            matches!(p.status, PostStatus::Approved | PostStatus::Published)
        }),
        posts_published: count(&|p| p.status == PostStatus::Published),
    }
}

#[async_trait]
impl PipelineStore for FakeStore {
    async fn upsert_plan(&self, plan: &WeeklyPlan) -> Result<WeeklyPlan, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.plan_writes += 1;
        let mut stored = plan.clone();
        stored.status = PlanStatus::Draft;
        if let Some(existing) = state.plans.get(&plan.week) {
            stored.counters = existing.counters;
        }
        state.plans.insert(plan.week, stored.clone());
        Ok(stored)
    }

    async fn get_plan(&self, week: IsoWeek) -> Result<Option<WeeklyPlan>, StoreError> {
        Ok(self.state.lock().unwrap().plans.get(&week).cloned())
    }

    async fn set_plan_status(&self, week: IsoWeek, status: PlanStatus) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.plans.get_mut(&week) {
            Some(plan) => {
                plan.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "plan",
                id: week.to_string(),
            }),
        }
    }

    async fn refresh_plan_counters(&self, week: IsoWeek) -> Result<PlanCounters, StoreError> {
        let mut state = self.state.lock().unwrap();
        let counters = counters_for(&state.posts, week);
        if let Some(plan) = state.plans.get_mut(&week) {
            plan.counters = counters;
        }
        Ok(counters)
    }

    async fn upsert_post(&self, post: &NewSocialPost) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state.posts.iter_mut().find(|p| p.key == post.key) {
            if !PostStatus::regenerable().contains(&existing.status) {
                return Ok(UpsertOutcome::Locked {
                    id: existing.id,
                    status: existing.status,
                });
            }
            existing.pillar = post.pillar;
            existing.topic_id = post.topic_id;
            existing.topic_alias.clone_from(&post.topic_alias);
            existing.channels.clone_from(&post.channels);
            existing.utm.clone_from(&post.utm);
            existing.link_url.clone_from(&post.link_url);
            existing.visual_brief.clone_from(&post.visual_brief);
            existing.status = PostStatus::Generated;
            existing.brand_gate_level = None;
            existing.compliance_gate_level = None;
            existing.gate_summary = None;
            existing.quality_score = None;
            existing.updated_at = now;
            return Ok(UpsertOutcome::Updated(existing.id));
        }
        let id = Uuid::new_v4();
        state.posts.push(SocialPost {
            id,
            key: post.key.clone(),
            pillar: post.pillar,
            topic_id: post.topic_id,
            topic_alias: post.topic_alias.clone(),
            channels: post.channels.clone(),
            status: PostStatus::Generated,
            brand_gate_level: None,
            compliance_gate_level: None,
            gate_summary: None,
            quality_score: None,
            utm: post.utm.clone(),
            link_url: post.link_url.clone(),
            visual_brief: post.visual_brief.clone(),
            approved_by: None,
            approved_at: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        });
        Ok(UpsertOutcome::Inserted(id))
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<SocialPost>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_posts(
        &self,
        week: IsoWeek,
        status: Option<PostStatus>,
    ) -> Result<Vec<SocialPost>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut posts: Vec<SocialPost> = state
            .posts
            .iter()
            .filter(|p| p.key.week == week && status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            (a.key.day_of_week, &a.key.slot_label).cmp(&(b.key.day_of_week, &b.key.slot_label))
        });
        Ok(posts)
    }

    async fn save_gate_result(
        &self,
        id: Uuid,
        outcome: &GateOutcome,
    ) -> Result<Option<SocialPost>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|p| p.id == id && PostStatus::gateable().contains(&p.status))
        else {
            return Ok(None);
        };
        post.status = outcome.status;
        post.brand_gate_level = Some(outcome.brand_level);
        post.compliance_gate_level = Some(outcome.compliance_level);
        post.gate_summary = Some(outcome.summary.clone());
        post.quality_score = Some(outcome.quality_score);
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_status(
        &self,
        id: Uuid,
        allowed_from: &[PostStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SocialPost>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|p| p.id == id && allowed_from.contains(&p.status))
        else {
            return Ok(None);
        };
        post.status = update.status;
        if update.clear_approval {
            post.approved_by = None;
            post.approved_at = None;
        }
        if update.approved_by.is_some() {
            post.approved_by.clone_from(&update.approved_by);
        }
        if update.approved_at.is_some() {
            post.approved_at = update.approved_at;
        }
        if update.published_at.is_some() {
            post.published_at = update.published_at;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn recently_posted_topic_ids(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.recent_since = Some(since);
        Ok(state.recent_topic_ids.clone())
    }

    async fn register_utm_link(&self, link: &UtmLink) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.links.contains(link) {
            state.links.push(link.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCatalog {
    pub high_traffic: Vec<TopicCandidate>,
    pub coverage_gaps: Vec<TopicCandidate>,
    pub fail: bool,
}

pub fn candidate(id: i64, alias: &str) -> TopicCandidate {
    TopicCandidate {
        id,
        alias: alias.to_string(),
        name: alias.replace('-', " "),
        category: "freinage".to_string(),
        source_path: format!("/pieces/{alias}"),
        price_from: None,
        signal: 1_000 - id,
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn resolve_alias(&self, alias: &str) -> Result<Option<TopicCandidate>, StoreError> {
        if self.fail {
            return Err(StoreError::Backend("catalog offline".to_string()));
        }
        Ok(self
            .high_traffic
            .iter()
            .chain(&self.coverage_gaps)
            .find(|c| c.alias == alias)
            .cloned())
    }

    async fn high_traffic_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError> {
        if self.fail {
            return Err(StoreError::Backend("catalog offline".to_string()));
        }
        Ok(self.high_traffic.iter().take(limit).cloned().collect())
    }

    async fn coverage_gap_topics(&self, limit: usize) -> Result<Vec<TopicCandidate>, StoreError> {
        if self.fail {
            return Err(StoreError::Backend("catalog offline".to_string()));
        }
        Ok(self.coverage_gaps.iter().take(limit).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRules {
    pub rules: Vec<BrandRule>,
    pub delay: Option<Duration>,
}

impl FakeRules {
    pub fn new(rules: Vec<BrandRule>) -> Arc<Self> {
        Arc::new(Self { rules, delay: None })
    }
}

#[async_trait]
impl RuleRepository for FakeRules {
    async fn active_rules(&self, channel: Channel) -> Result<Vec<BrandRule>, StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .rules
            .iter()
            .filter(|r| r.applies_to(channel))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

type Responder = dyn Fn(&GenerationRequest) -> Result<String, UpstreamError> + Send + Sync;

pub struct FakeGenerator {
    respond: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn new(
        respond: impl Fn(&GenerationRequest) -> Result<String, UpstreamError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with a well-formed caption for the requested channel.
    pub fn ok() -> Arc<Self> {
        Self::new(|req| Ok(sample_output(&req.content_type)))
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(|req| Ok(sample_output(&req.content_type))),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn sample_output(content_type: &str) -> String {
    format!(
        r##"{{"caption":"Découvrez nos disques de frein ({content_type})","hashtags":["#frein","#auto","#entretien"],"visual_brief":"Disque sur établi"}}"##
    )
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(request).map(|content| GeneratedContent { content })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn week() -> IsoWeek {
    IsoWeek::parse("2026-W09").unwrap()
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        site_base_url: "https://www.example-pieces.fr".to_string(),
        generator_timeout: Duration::from_millis(200),
        rule_fetch_timeout: Duration::from_millis(200),
        max_concurrent_generations: 4,
        ..PipelineSettings::default()
    }
}

pub fn utm(channel: Channel) -> UtmParams {
    UtmParams {
        campaign: "mktg_2026w09_catalogue_disque-frein".to_string(),
        content: format!("{channel}_post_c76e1c57"),
        source: channel.to_string(),
        medium: "social".to_string(),
    }
}

pub fn variant(caption: &str, hashtags: &[&str]) -> ChannelVariant {
    ChannelVariant {
        caption: caption.to_string(),
        hashtags: hashtags.iter().map(|t| (*t).to_string()).collect(),
        format: Some("post".to_string()),
        ..ChannelVariant::default()
    }
}

/// A post for `day` with one Instagram variant.
pub fn post(day: u8, status: PostStatus, caption: &str, hashtags: &[&str]) -> SocialPost {
    let now = Utc::now();
    let mut channels = BTreeMap::new();
    let mut v = variant(caption, hashtags);
    v.utm = Some(utm(Channel::Instagram));
    channels.insert(Channel::Instagram, v);
    SocialPost {
        id: Uuid::new_v4(),
        key: PostKey {
            week: week(),
            day_of_week: day,
            slot_label: "catalogue-12h".to_string(),
            primary_channel: Channel::Instagram,
        },
        pillar: Pillar::Catalogue,
        topic_id: Some(1),
        topic_alias: Some("disque-frein".to_string()),
        channels,
        status,
        brand_gate_level: None,
        compliance_gate_level: None,
        gate_summary: None,
        quality_score: None,
        utm: Some(utm(Channel::Instagram)),
        link_url: "https://www.example-pieces.fr/pieces/disque-frein".to_string(),
        visual_brief: Some("Disque sur établi".to_string()),
        approved_by: None,
        approved_at: None,
        published_at: None,
        created_at: now,
        updated_at: now,
    }
}
