//! Live integration tests for socops-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They are ignored by default; run them with
//! `DATABASE_URL` set and `--ignored`.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use socops_core::ports::{
    CatalogSource, GateOutcome, PipelineStore, RuleRepository, StatusUpdate, StoreError,
    UpsertOutcome,
};
use socops_core::{
    BrandResult, BrandRule, CalendarConfig, Channel, ChannelVariant, ComplianceResult, GateLevel,
    GateSummary, IsoWeek, NewSocialPost, Pillar, PlanCounters, PlanStatus, PostKey, PostStatus,
    RulePayload, RuleScope, RuleType, Severity, UtmLink, UtmParams, WeeklyPlan,
};
use socops_db::{
    list_links_for_campaign, list_rules, register_utm_link, seed_rules, upsert_topic, NewTopic,
    PgStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn week() -> IsoWeek {
    IsoWeek::parse("2026-W09").expect("valid week")
}

fn empty_plan() -> WeeklyPlan {
    WeeklyPlan {
        week: week(),
        slots: vec![],
        topics: vec![],
        calendar: CalendarConfig::default(),
        status: PlanStatus::Draft,
        counters: PlanCounters::default(),
    }
}

fn utm(channel: Channel) -> UtmParams {
    UtmParams {
        campaign: "mktg_2026w09_catalogue_disque-frein".to_string(),
        content: format!("{channel}_carrousel_9f8ad7aa"),
        source: channel.as_str().to_string(),
        medium: "social".to_string(),
    }
}

fn new_post(day: u8, caption: &str, topic_id: Option<i64>) -> NewSocialPost {
    let mut channels = BTreeMap::new();
    channels.insert(
        Channel::Instagram,
        ChannelVariant {
            caption: caption.to_string(),
            hashtags: vec!["#frein".to_string()],
            utm: Some(utm(Channel::Instagram)),
            ..ChannelVariant::default()
        },
    );
    NewSocialPost {
        key: PostKey {
            week: week(),
            day_of_week: day,
            slot_label: "catalogue-12h".to_string(),
            primary_channel: Channel::Instagram,
        },
        pillar: Pillar::Catalogue,
        topic_id,
        topic_alias: Some("disque-frein".to_string()),
        channels,
        utm: Some(utm(Channel::Instagram)),
        link_url: "https://www.example-pieces.fr/pieces/disque-frein".to_string(),
        visual_brief: None,
    }
}

fn passing_outcome() -> GateOutcome {
    GateOutcome {
        status: PostStatus::GatePassed,
        brand_level: GateLevel::Pass,
        compliance_level: GateLevel::Pass,
        summary: GateSummary {
            brand: BrandResult {
                violations: vec![],
                warnings: vec![],
                suggestions: vec![],
                level: GateLevel::Pass,
            },
            compliance: ComplianceResult {
                checks: vec![],
                level: GateLevel::Pass,
            },
            can_approve: true,
            blocking_issues: vec![],
        },
        quality_score: 100,
    }
}

fn approval(by: &str) -> StatusUpdate {
    StatusUpdate {
        status: PostStatus::Approved,
        approved_by: Some(by.to_string()),
        approved_at: Some(Utc::now()),
        published_at: None,
        clear_approval: false,
    }
}

fn competitors(scope: RuleScope) -> BrandRule {
    BrandRule {
        id: None,
        rule_type: RuleType::ForbiddenWord,
        scope,
        severity: Severity::Block,
        version: 1,
        is_active: true,
        payload: RulePayload::Competitors {
            names: vec!["Oscaro".to_string()],
        },
    }
}

async fn insert_topic(pool: &sqlx::PgPool, alias: &str, sessions: i64) -> i64 {
    upsert_topic(
        pool,
        &NewTopic {
            alias,
            name: alias,
            category: "freinage",
            source_path: &format!("/pieces/{alias}"),
            price_from: Some(Decimal::new(2490, 2)),
            monthly_sessions: sessions,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("upsert_topic failed for '{alias}': {e}"))
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn plan_upsert_is_idempotent_and_keeps_counters(pool: sqlx::PgPool) {
    let store = PgStore::new(pool.clone());
    store.upsert_plan(&empty_plan()).await.expect("first upsert");
    store.upsert_post(&new_post(1, "Découvrez.", None)).await.expect("post");
    store.refresh_plan_counters(week()).await.expect("counters");
    store
        .set_plan_status(week(), PlanStatus::InProgress)
        .await
        .expect("status");

    let again = store.upsert_plan(&empty_plan()).await.expect("second upsert");

    assert_eq!(again.status, PlanStatus::Draft);
    assert_eq!(again.counters.posts_generated, 1);
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weekly_plans")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(rows, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn set_plan_status_on_missing_week_is_not_found(pool: sqlx::PgPool) {
    let err = PgStore::new(pool)
        .set_plan_status(week(), PlanStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "plan", .. }));
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn regenerating_a_post_keeps_its_id_and_clears_the_gate(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let first = store
        .upsert_post(&new_post(1, "Première version.", None))
        .await
        .expect("insert");
    assert!(matches!(first, UpsertOutcome::Inserted(_)));
    store
        .save_gate_result(first.id(), &passing_outcome())
        .await
        .expect("gate")
        .expect("gateable");

    let second = store
        .upsert_post(&new_post(1, "Deuxième version.", None))
        .await
        .expect("update");

    assert_eq!(second, UpsertOutcome::Updated(first.id()));
    let post = store.get_post(first.id()).await.expect("get").expect("row");
    assert_eq!(post.status, PostStatus::Generated);
    assert!(post.gate_summary.is_none());
    assert!(post.quality_score.is_none());
    assert_eq!(post.primary_variant().unwrap().caption, "Deuxième version.");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn approved_posts_are_locked_against_regeneration(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let id = store
        .upsert_post(&new_post(1, "Validée.", None))
        .await
        .expect("insert")
        .id();
    store.save_gate_result(id, &passing_outcome()).await.expect("gate");
    store
        .set_status(id, &[PostStatus::GatePassed], &approval("marie"))
        .await
        .expect("approve")
        .expect("matched");

    let outcome = store
        .upsert_post(&new_post(1, "Écrasée ?", None))
        .await
        .expect("upsert");

    assert_eq!(
        outcome,
        UpsertOutcome::Locked {
            id,
            status: PostStatus::Approved
        }
    );
    let post = store.get_post(id).await.expect("get").expect("row");
    assert_eq!(post.primary_variant().unwrap().caption, "Validée.");
    assert_eq!(post.approved_by.as_deref(), Some("marie"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn status_updates_are_compare_and_set(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let id = store
        .upsert_post(&new_post(3, "Découvrez.", None))
        .await
        .expect("insert")
        .id();

    let not_gated = store
        .set_status(id, &[PostStatus::GatePassed], &approval("marie"))
        .await
        .expect("query");
    assert!(not_gated.is_none());

    store.save_gate_result(id, &passing_outcome()).await.expect("gate");
    store
        .set_status(id, &[PostStatus::GatePassed], &approval("marie"))
        .await
        .expect("approve")
        .expect("matched");

    let rejected = store
        .set_status(
            id,
            &PostStatus::rejectable(),
            &StatusUpdate {
                status: PostStatus::Draft,
                approved_by: None,
                approved_at: None,
                published_at: None,
                clear_approval: true,
            },
        )
        .await
        .expect("reject")
        .expect("matched");
    assert_eq!(rejected.status, PostStatus::Draft);
    assert!(rejected.approved_by.is_none());
    assert!(rejected.approved_at.is_none());

    let regated = store
        .save_gate_result(id, &passing_outcome())
        .await
        .expect("query");
    assert!(regated.is_none(), "drafts are not gateable");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn list_posts_orders_by_day_and_filters_status(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    for day in [5, 1, 3] {
        store
            .upsert_post(&new_post(day, "Découvrez.", None))
            .await
            .expect("insert");
    }
    let monday = store.list_posts(week(), None).await.expect("list")[0].id;
    store.save_gate_result(monday, &passing_outcome()).await.expect("gate");

    let all = store.list_posts(week(), None).await.expect("list");
    let days: Vec<u8> = all.iter().map(|p| p.key.day_of_week).collect();
    assert_eq!(days, vec![1, 3, 5]);

    let passed = store
        .list_posts(week(), Some(PostStatus::GatePassed))
        .await
        .expect("list");
    assert_eq!(passed.len(), 1);
    assert_eq!(passed[0].id, monday);
    assert_eq!(passed[0].quality_score, Some(100));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn recently_posted_topics_only_count_approved_or_published(pool: sqlx::PgPool) {
    let store = PgStore::new(pool.clone());
    let approved_topic = insert_topic(&pool, "disque-frein", 900).await;
    let generated_topic = insert_topic(&pool, "plaquette-frein", 800).await;

    let id = store
        .upsert_post(&new_post(1, "Découvrez.", Some(approved_topic)))
        .await
        .expect("insert")
        .id();
    store.save_gate_result(id, &passing_outcome()).await.expect("gate");
    store
        .set_status(id, &[PostStatus::GatePassed], &approval("marie"))
        .await
        .expect("approve");
    store
        .upsert_post(&new_post(3, "Découvrez.", Some(generated_topic)))
        .await
        .expect("insert");

    let recent = store
        .recently_posted_topic_ids(Utc::now() - Duration::days(28))
        .await
        .expect("query");
    assert_eq!(recent, vec![approved_topic]);

    let none = store
        .recently_posted_topic_ids(Utc::now() + Duration::days(1))
        .await
        .expect("query");
    assert!(none.is_empty());
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn seeded_rules_are_scoped_by_channel(pool: sqlx::PgPool) {
    let rules = vec![
        competitors(RuleScope::All),
        BrandRule {
            payload: RulePayload::HashtagCount { min: 3, max: 8 },
            rule_type: RuleType::RequiredElement,
            severity: Severity::Warn,
            ..competitors(RuleScope::Channel(Channel::Youtube))
        },
    ];
    assert_eq!(seed_rules(&pool, &rules).await.expect("seed"), 2);
    assert_eq!(seed_rules(&pool, &rules).await.expect("reseed"), 2);
    assert_eq!(list_rules(&pool).await.expect("list").len(), 2);

    let store = PgStore::new(pool);
    let instagram = store.active_rules(Channel::Instagram).await.expect("rules");
    let youtube = store.active_rules(Channel::Youtube).await.expect("rules");

    assert_eq!(instagram.len(), 1);
    assert_eq!(instagram[0].rule_key(), "competitors");
    assert!(instagram[0].id.is_some());
    let keys: Vec<&str> = youtube.iter().map(BrandRule::rule_key).collect();
    assert_eq!(keys, vec!["competitors", "hashtag_count"]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn corrupt_rule_row_fails_the_read(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO brand_rules (rule_type, scope, rule_key, payload, severity) \
         VALUES ('required_element', 'all', 'hashtag_count', '{\"min\": 9, \"max\": 1}', 'warn')",
    )
    .execute(&pool)
    .await
    .expect("insert");

    let err = PgStore::new(pool)
        .active_rules(Channel::Instagram)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(msg) if msg.contains("brand_rules")));
}

// ---------------------------------------------------------------------------
// Catalog and links
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn catalog_tiers_rank_topics(pool: sqlx::PgPool) {
    let busy = insert_topic(&pool, "disque-frein", 5_000).await;
    let quiet = insert_topic(&pool, "balais-essuie-glace", 300).await;
    let store = PgStore::new(pool);

    let traffic = store.high_traffic_topics(10).await.expect("traffic");
    let ids: Vec<i64> = traffic.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![busy, quiet]);

    let id = store
        .upsert_post(&new_post(1, "Découvrez.", Some(busy)))
        .await
        .expect("insert")
        .id();
    store.save_gate_result(id, &passing_outcome()).await.expect("gate");

    let gaps = store.coverage_gap_topics(10).await.expect("gaps");
    let ids: Vec<i64> = gaps.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![quiet, busy]);
    assert_eq!(gaps[1].signal, 2_500);

    let resolved = store
        .resolve_alias("  Disque-Frein ")
        .await
        .expect("resolve")
        .expect("match");
    assert_eq!(resolved.id, busy);
    assert!(store.resolve_alias("inconnu").await.expect("resolve").is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres (DATABASE_URL)"]
async fn utm_links_register_once(pool: sqlx::PgPool) {
    let params = utm(Channel::Instagram);
    let link = UtmLink {
        base_url: "https://www.example-pieces.fr".to_string(),
        path: "/pieces/disque-frein".to_string(),
        full_url: format!(
            "https://www.example-pieces.fr/pieces/disque-frein?{}",
            params.query_string()
        ),
        params,
    };

    assert!(register_utm_link(&pool, &link).await.expect("first"));
    assert!(!register_utm_link(&pool, &link).await.expect("second"));
    PgStore::new(pool.clone())
        .register_utm_link(&link)
        .await
        .expect("port call is a no-op");

    let links = list_links_for_campaign(&pool, &link.params.campaign)
        .await
        .expect("list");
    assert_eq!(links, vec![link]);
}
