//! Registry of generated campaign links.

use chrono::{DateTime, Utc};
use socops_core::{UtmLink, UtmParams};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UtmLinkRow {
    pub id: i64,
    pub base_url: String,
    pub path: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub full_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<UtmLinkRow> for UtmLink {
    fn from(row: UtmLinkRow) -> Self {
        UtmLink {
            base_url: row.base_url,
            path: row.path,
            params: UtmParams {
                campaign: row.utm_campaign,
                content: row.utm_content,
                source: row.utm_source,
                medium: row.utm_medium,
            },
            full_url: row.full_url,
        }
    }
}

/// Record a link. Returns `false` when the same link was already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn register_utm_link(pool: &PgPool, link: &UtmLink) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO utm_links \
             (base_url, path, utm_campaign, utm_content, utm_source, utm_medium, full_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT ON CONSTRAINT uq_utm_links_params DO NOTHING",
    )
    .bind(&link.base_url)
    .bind(&link.path)
    .bind(&link.params.campaign)
    .bind(&link.params.content)
    .bind(&link.params.source)
    .bind(&link.params.medium)
    .bind(&link.full_url)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_links_for_campaign(
    pool: &PgPool,
    campaign: &str,
) -> Result<Vec<UtmLink>, DbError> {
    let rows = sqlx::query_as::<_, UtmLinkRow>(
        "SELECT id, base_url, path, utm_campaign, utm_content, utm_source, utm_medium, \
                full_url, created_at \
         FROM utm_links WHERE utm_campaign = $1 \
         ORDER BY utm_source, utm_content, id",
    )
    .bind(campaign)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(UtmLink::from).collect())
}
