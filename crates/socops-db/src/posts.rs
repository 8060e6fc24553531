//! Database operations for `social_posts`.
//!
//! Status changes are compare-and-set: every update names the statuses it
//! may start from and returns `None` when the row was not in one of them.

use chrono::{DateTime, Utc};
use socops_core::ports::{GateOutcome, StatusUpdate, UpsertOutcome};
use socops_core::{
    Channel, GateLevel, IsoWeek, NewSocialPost, Pillar, PostKey, PostStatus, SocialPost, UtmParams,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{decode, encode, parse_column, DbError};

const TABLE: &str = "social_posts";

/// A row from the `social_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub week_iso: String,
    pub day_of_week: i16,
    pub slot_label: String,
    pub primary_channel: String,
    pub pillar: String,
    pub topic_id: Option<i64>,
    pub topic_alias: Option<String>,
    /// `{channel: ChannelVariant}` document.
    pub channels: serde_json::Value,
    pub status: String,
    pub brand_gate_level: Option<String>,
    pub compliance_gate_level: Option<String>,
    pub gate_summary: Option<serde_json::Value>,
    pub quality_score: Option<i16>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub link_url: String,
    pub visual_brief: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    fn utm(&self) -> Option<UtmParams> {
        let columns = [
            &self.utm_campaign,
            &self.utm_content,
            &self.utm_source,
            &self.utm_medium,
        ];
        if columns.iter().all(|c| c.is_none()) {
            return None;
        }
        Some(UtmParams {
            campaign: self.utm_campaign.clone().unwrap_or_default(),
            content: self.utm_content.clone().unwrap_or_default(),
            source: self.utm_source.clone().unwrap_or_default(),
            medium: self.utm_medium.clone().unwrap_or_default(),
        })
    }
}

impl TryFrom<PostRow> for SocialPost {
    type Error = DbError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let utm = row.utm();
        let day_of_week = u8::try_from(row.day_of_week).map_err(|e| DbError::Decode {
            table: TABLE,
            id: id.to_string(),
            reason: format!("day_of_week {}: {e}", row.day_of_week),
        })?;
        let gate_level = |raw: Option<&String>| {
            raw.map(|s| parse_column::<GateLevel>(TABLE, id, s))
                .transpose()
        };
        let quality_score = row
            .quality_score
            .map(|s| {
                u8::try_from(s).map_err(|e| DbError::Decode {
                    table: TABLE,
                    id: id.to_string(),
                    reason: format!("quality_score {s}: {e}"),
                })
            })
            .transpose()?;

        Ok(SocialPost {
            id,
            key: PostKey {
                week: parse_column::<IsoWeek>(TABLE, id, &row.week_iso)?,
                day_of_week,
                slot_label: row.slot_label,
                primary_channel: parse_column::<Channel>(TABLE, id, &row.primary_channel)?,
            },
            pillar: parse_column::<Pillar>(TABLE, id, &row.pillar)?,
            topic_id: row.topic_id,
            topic_alias: row.topic_alias,
            channels: decode(TABLE, id, row.channels)?,
            status: parse_column::<PostStatus>(TABLE, id, &row.status)?,
            brand_gate_level: gate_level(row.brand_gate_level.as_ref())?,
            compliance_gate_level: gate_level(row.compliance_gate_level.as_ref())?,
            gate_summary: row
                .gate_summary
                .map(|v| decode(TABLE, id, v))
                .transpose()?,
            quality_score,
            utm,
            link_url: row.link_url,
            visual_brief: row.visual_brief,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const POST_COLUMNS: &str = "id, week_iso, day_of_week, slot_label, primary_channel, pillar, \
     topic_id, topic_alias, channels, status, brand_gate_level, compliance_gate_level, \
     gate_summary, quality_score, utm_campaign, utm_content, utm_source, utm_medium, \
     link_url, visual_brief, approved_by, approved_at, published_at, created_at, updated_at";

fn statuses(list: &[PostStatus]) -> Vec<String> {
    list.iter().map(|s| s.as_str().to_string()).collect()
}

/// Insert a freshly generated post or overwrite the copy of the post with
/// the same natural key.
///
/// Only posts that are still regenerable are overwritten, and they go back
/// to `generated` with their gate results cleared. Approved and published
/// posts are reported as [`UpsertOutcome::Locked`] and left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn upsert_post(pool: &PgPool, post: &NewSocialPost) -> Result<UpsertOutcome, DbError> {
    let utm = post.utm.as_ref();
    let upserted: Option<(Uuid, bool)> = sqlx::query_as(
        "INSERT INTO social_posts \
             (id, week_iso, day_of_week, slot_label, primary_channel, pillar, topic_id, \
              topic_alias, channels, status, utm_campaign, utm_content, utm_source, \
              utm_medium, link_url, visual_brief) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'generated', $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (week_iso, day_of_week, slot_label, primary_channel) DO UPDATE SET \
             pillar                = EXCLUDED.pillar, \
             topic_id              = EXCLUDED.topic_id, \
             topic_alias           = EXCLUDED.topic_alias, \
             channels              = EXCLUDED.channels, \
             status                = 'generated', \
             brand_gate_level      = NULL, \
             compliance_gate_level = NULL, \
             gate_summary          = NULL, \
             quality_score         = NULL, \
             utm_campaign          = EXCLUDED.utm_campaign, \
             utm_content           = EXCLUDED.utm_content, \
             utm_source            = EXCLUDED.utm_source, \
             utm_medium            = EXCLUDED.utm_medium, \
             link_url              = EXCLUDED.link_url, \
             visual_brief          = EXCLUDED.visual_brief, \
             updated_at            = NOW() \
         WHERE social_posts.status = ANY($16) \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(Uuid::new_v4())
    .bind(post.key.week.to_string())
    .bind(i16::from(post.key.day_of_week))
    .bind(&post.key.slot_label)
    .bind(post.key.primary_channel.as_str())
    .bind(post.pillar.as_str())
    .bind(post.topic_id)
    .bind(&post.topic_alias)
    .bind(encode("post channels", &post.channels)?)
    .bind(utm.map(|u| u.campaign.as_str()))
    .bind(utm.map(|u| u.content.as_str()))
    .bind(utm.map(|u| u.source.as_str()))
    .bind(utm.map(|u| u.medium.as_str()))
    .bind(&post.link_url)
    .bind(&post.visual_brief)
    .bind(statuses(&PostStatus::regenerable()))
    .fetch_optional(pool)
    .await?;

    match upserted {
        Some((id, true)) => Ok(UpsertOutcome::Inserted(id)),
        Some((id, false)) => Ok(UpsertOutcome::Updated(id)),
        None => {
            let (id, status): (Uuid, String) = sqlx::query_as(
                "SELECT id, status FROM social_posts \
                 WHERE week_iso = $1 AND day_of_week = $2 AND slot_label = $3 \
                   AND primary_channel = $4",
            )
            .bind(post.key.week.to_string())
            .bind(i16::from(post.key.day_of_week))
            .bind(&post.key.slot_label)
            .bind(post.key.primary_channel.as_str())
            .fetch_one(pool)
            .await?;
            Ok(UpsertOutcome::Locked {
                id,
                status: parse_column(TABLE, id, &status)?,
            })
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::Decode`] for a
/// corrupt row.
pub async fn get_post(pool: &PgPool, id: Uuid) -> Result<Option<SocialPost>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM social_posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(SocialPost::try_from).transpose()
}

/// Posts of a week in schedule order, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::Decode`] for a
/// corrupt row.
pub async fn list_posts(
    pool: &PgPool,
    week: IsoWeek,
    status: Option<PostStatus>,
) -> Result<Vec<SocialPost>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM social_posts \
         WHERE week_iso = $1 AND ($2::text IS NULL OR status = $2) \
         ORDER BY day_of_week, slot_label, primary_channel, id"
    ))
    .bind(week.to_string())
    .bind(status.map(PostStatus::as_str))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SocialPost::try_from).collect()
}

/// Store a gate verdict if the post is still gateable.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn save_gate_result(
    pool: &PgPool,
    id: Uuid,
    outcome: &GateOutcome,
) -> Result<Option<SocialPost>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "UPDATE social_posts SET \
             status                = $2, \
             brand_gate_level      = $3, \
             compliance_gate_level = $4, \
             gate_summary          = $5, \
             quality_score         = $6, \
             updated_at            = NOW() \
         WHERE id = $1 AND status = ANY($7) \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(id)
    .bind(outcome.status.as_str())
    .bind(outcome.brand_level.as_str())
    .bind(outcome.compliance_level.as_str())
    .bind(encode("gate summary", &outcome.summary)?)
    .bind(i16::from(outcome.quality_score))
    .bind(statuses(&PostStatus::gateable()))
    .fetch_optional(pool)
    .await?;
    row.map(SocialPost::try_from).transpose()
}

/// Move a post to `update.status` if its current status is in
/// `allowed_from`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    allowed_from: &[PostStatus],
    update: &StatusUpdate,
) -> Result<Option<SocialPost>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "UPDATE social_posts SET \
             status       = $2, \
             approved_by  = CASE WHEN $3::boolean THEN NULL \
                                 ELSE COALESCE($4::text, approved_by) END, \
             approved_at  = CASE WHEN $3::boolean THEN NULL \
                                 ELSE COALESCE($5::timestamptz, approved_at) END, \
             published_at = COALESCE($6::timestamptz, published_at), \
             updated_at   = NOW() \
         WHERE id = $1 AND status = ANY($7) \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(id)
    .bind(update.status.as_str())
    .bind(update.clear_approval)
    .bind(&update.approved_by)
    .bind(update.approved_at)
    .bind(update.published_at)
    .bind(statuses(allowed_from))
    .fetch_optional(pool)
    .await?;
    row.map(SocialPost::try_from).transpose()
}

/// Topic ids of posts approved or published since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recently_posted_topic_ids(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT topic_id FROM social_posts \
         WHERE topic_id IS NOT NULL \
           AND status IN ('approved', 'published') \
           AND COALESCE(published_at, approved_at, updated_at) >= $1 \
         ORDER BY topic_id",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
