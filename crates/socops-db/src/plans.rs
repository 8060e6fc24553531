//! Database operations for `weekly_plans`.

use chrono::{DateTime, Utc};
use socops_core::{IsoWeek, PlanCounters, PlanStatus, WeeklyPlan};
use sqlx::PgPool;

use crate::{decode, encode, parse_column, DbError};

const TABLE: &str = "weekly_plans";

/// A row from the `weekly_plans` table. Slots, topics and calendar are
/// stored as JSONB documents.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRow {
    pub id: i64,
    pub week_iso: String,
    pub slots: serde_json::Value,
    pub topics: serde_json::Value,
    pub calendar: serde_json::Value,
    pub status: String,
    pub posts_generated: i64,
    pub posts_approved: i64,
    pub posts_published: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for WeeklyPlan {
    type Error = DbError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let id = row.week_iso.clone();
        Ok(WeeklyPlan {
            week: parse_column::<IsoWeek>(TABLE, &id, &row.week_iso)?,
            slots: decode(TABLE, &id, row.slots)?,
            topics: decode(TABLE, &id, row.topics)?,
            calendar: decode(TABLE, &id, row.calendar)?,
            status: parse_column::<PlanStatus>(TABLE, &id, &row.status)?,
            counters: PlanCounters {
                posts_generated: row.posts_generated,
                posts_approved: row.posts_approved,
                posts_published: row.posts_published,
            },
        })
    }
}

const SELECT_PLAN: &str = "SELECT id, week_iso, slots, topics, calendar, status, \
        posts_generated, posts_approved, posts_published, created_at, updated_at \
     FROM weekly_plans";

/// Upserts the plan for `plan.week`.
///
/// Conflicts on `week_iso` overwrite slots, topics and calendar and reset
/// the status to `draft`; the stored counters are left as they are.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_plan(pool: &PgPool, plan: &WeeklyPlan) -> Result<WeeklyPlan, DbError> {
    let row = sqlx::query_as::<_, PlanRow>(
        "INSERT INTO weekly_plans (week_iso, slots, topics, calendar, status) \
         VALUES ($1, $2, $3, $4, 'draft') \
         ON CONFLICT (week_iso) DO UPDATE SET \
             slots      = EXCLUDED.slots, \
             topics     = EXCLUDED.topics, \
             calendar   = EXCLUDED.calendar, \
             status     = 'draft', \
             updated_at = NOW() \
         RETURNING id, week_iso, slots, topics, calendar, status, \
                   posts_generated, posts_approved, posts_published, created_at, updated_at",
    )
    .bind(plan.week.to_string())
    .bind(encode("plan slots", &plan.slots)?)
    .bind(encode("plan topics", &plan.topics)?)
    .bind(encode("plan calendar", &plan.calendar)?)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Fetch the plan for a week, if one was generated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::Decode`] if the
/// stored documents no longer parse.
pub async fn get_plan(pool: &PgPool, week: IsoWeek) -> Result<Option<WeeklyPlan>, DbError> {
    let row = sqlx::query_as::<_, PlanRow>(&format!("{SELECT_PLAN} WHERE week_iso = $1"))
        .bind(week.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(WeeklyPlan::try_from).transpose()
}

/// Returns `true` if a plan row was updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_plan_status(
    pool: &PgPool,
    week: IsoWeek,
    status: PlanStatus,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE weekly_plans SET status = $2, updated_at = NOW() WHERE week_iso = $1",
    )
    .bind(week.to_string())
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Recount the week's posts and store the counters on its plan.
///
/// The counts are returned even when the week has no plan row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn refresh_plan_counters(pool: &PgPool, week: IsoWeek) -> Result<PlanCounters, DbError> {
    let (generated, approved, published): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), \
                COUNT(*) FILTER (WHERE status IN ('approved', 'published')), \
                COUNT(*) FILTER (WHERE status = 'published') \
         FROM social_posts WHERE week_iso = $1",
    )
    .bind(week.to_string())
    .fetch_one(pool)
    .await?;

    sqlx::query(
        "UPDATE weekly_plans SET \
             posts_generated = $2, \
             posts_approved  = $3, \
             posts_published = $4, \
             updated_at      = NOW() \
         WHERE week_iso = $1",
    )
    .bind(week.to_string())
    .bind(generated)
    .bind(approved)
    .bind(published)
    .execute(pool)
    .await?;

    Ok(PlanCounters {
        posts_generated: generated,
        posts_approved: approved,
        posts_published: published,
    })
}
