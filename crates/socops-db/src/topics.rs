//! Catalog reads over `seo_topics`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use socops_core::ports::TopicCandidate;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `seo_topics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicRow {
    pub id: i64,
    pub alias: String,
    pub name: String,
    pub category: String,
    pub source_path: String,
    pub price_from: Option<Decimal>,
    pub monthly_sessions: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TopicRow> for TopicCandidate {
    fn from(row: TopicRow) -> Self {
        TopicCandidate {
            id: row.id,
            alias: row.alias,
            name: row.name,
            category: row.category,
            source_path: row.source_path,
            price_from: row.price_from,
            signal: row.monthly_sessions,
        }
    }
}

/// Fields accepted when loading a topic into the catalog.
#[derive(Debug, Clone)]
pub struct NewTopic<'a> {
    pub alias: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub source_path: &'a str,
    pub price_from: Option<Decimal>,
    pub monthly_sessions: i64,
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Look up an active topic by alias. Matching ignores case and surrounding
/// whitespace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn resolve_alias(pool: &PgPool, alias: &str) -> Result<Option<TopicCandidate>, DbError> {
    let row = sqlx::query_as::<_, TopicRow>(
        "SELECT id, alias, name, category, source_path, price_from, monthly_sessions, \
                is_active, created_at, updated_at \
         FROM seo_topics WHERE lower(alias) = lower($1) AND is_active",
    )
    .bind(alias.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(TopicCandidate::from))
}

/// Active topics by monthly sessions, highest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn high_traffic_topics(
    pool: &PgPool,
    limit: usize,
) -> Result<Vec<TopicCandidate>, DbError> {
    let rows = sqlx::query_as::<_, TopicRow>(
        "SELECT id, alias, name, category, source_path, price_from, monthly_sessions, \
                is_active, created_at, updated_at \
         FROM seo_topics WHERE is_active \
         ORDER BY monthly_sessions DESC, id \
         LIMIT $1",
    )
    .bind(limit_param(limit))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TopicCandidate::from).collect())
}

#[derive(Debug, sqlx::FromRow)]
struct GapRow {
    #[sqlx(flatten)]
    topic: TopicRow,
    gap_score: i64,
}

/// Active topics with the fewest posts written about them.
///
/// Topics are ranked by how many non-draft posts reference them, fewest
/// first, then by traffic. The candidate's `signal` is the traffic divided
/// by one plus that post count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn coverage_gap_topics(
    pool: &PgPool,
    limit: usize,
) -> Result<Vec<TopicCandidate>, DbError> {
    let rows = sqlx::query_as::<_, GapRow>(
        "SELECT t.id, t.alias, t.name, t.category, t.source_path, t.price_from, \
                t.monthly_sessions, t.is_active, t.created_at, t.updated_at, \
                t.monthly_sessions / (1 + COUNT(p.id)) AS gap_score \
         FROM seo_topics t \
         LEFT JOIN social_posts p ON p.topic_id = t.id AND p.status <> 'draft' \
         WHERE t.is_active \
         GROUP BY t.id \
         ORDER BY COUNT(p.id) ASC, t.monthly_sessions DESC, t.id \
         LIMIT $1",
    )
    .bind(limit_param(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TopicCandidate {
            signal: row.gap_score,
            ..TopicCandidate::from(row.topic)
        })
        .collect())
}

/// Insert or refresh a catalog topic keyed by alias. Returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_topic(pool: &PgPool, topic: &NewTopic<'_>) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO seo_topics (alias, name, category, source_path, price_from, monthly_sessions) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (alias) DO UPDATE SET \
             name             = EXCLUDED.name, \
             category         = EXCLUDED.category, \
             source_path      = EXCLUDED.source_path, \
             price_from       = EXCLUDED.price_from, \
             monthly_sessions = EXCLUDED.monthly_sessions, \
             is_active        = TRUE, \
             updated_at       = NOW() \
         RETURNING id",
    )
    .bind(topic.alias.trim())
    .bind(topic.name)
    .bind(topic.category)
    .bind(topic.source_path)
    .bind(topic.price_from)
    .bind(topic.monthly_sessions)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
