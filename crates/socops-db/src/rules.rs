//! Database operations for `brand_rules`.

use chrono::{DateTime, Utc};
use socops_core::{BrandRule, Channel, RulePayload, RuleScope, RuleType, Severity};
use sqlx::PgPool;

use crate::{parse_column, DbError};

const TABLE: &str = "brand_rules";

/// A row from the `brand_rules` table. The payload is typed by `rule_key`
/// when the row is converted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRuleRow {
    pub id: i64,
    pub rule_type: String,
    pub scope: String,
    pub rule_key: String,
    pub payload: serde_json::Value,
    pub severity: String,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BrandRuleRow> for BrandRule {
    type Error = DbError;

    fn try_from(row: BrandRuleRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let payload =
            RulePayload::from_json(&row.rule_key, row.payload).map_err(|e| DbError::Decode {
                table: TABLE,
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(BrandRule {
            id: Some(id),
            rule_type: parse_column::<RuleType>(TABLE, id, &row.rule_type)?,
            scope: parse_column::<RuleScope>(TABLE, id, &row.scope)?,
            severity: parse_column::<Severity>(TABLE, id, &row.severity)?,
            version: row.version,
            is_active: row.is_active,
            payload,
        })
    }
}

const SELECT_RULE: &str = "SELECT id, rule_type, scope, rule_key, payload, severity, version, \
        is_active, created_at, updated_at \
     FROM brand_rules";

/// Active rules that are global or scoped to `channel`, ordered by rule key
/// then scope.
///
/// A row whose payload no longer validates fails the whole read.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::Decode`] for an
/// invalid row.
pub async fn active_rules(pool: &PgPool, channel: Channel) -> Result<Vec<BrandRule>, DbError> {
    let rows = sqlx::query_as::<_, BrandRuleRow>(&format!(
        "{SELECT_RULE} WHERE is_active AND scope IN ('all', $1) ORDER BY rule_key, scope, id"
    ))
    .bind(channel.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(BrandRule::try_from).collect()
}

/// Every stored rule, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::Decode`] for an
/// invalid row.
pub async fn list_rules(pool: &PgPool) -> Result<Vec<BrandRule>, DbError> {
    let rows = sqlx::query_as::<_, BrandRuleRow>(&format!(
        "{SELECT_RULE} ORDER BY rule_key, scope, id"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(BrandRule::try_from).collect()
}

/// Insert or replace the rule stored under `(rule_key, scope)` and return
/// its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_rule<'e, E>(executor: E, rule: &BrandRule) -> Result<i64, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO brand_rules (rule_type, scope, rule_key, payload, severity, version, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (rule_key, scope) DO UPDATE SET \
             rule_type  = EXCLUDED.rule_type, \
             payload    = EXCLUDED.payload, \
             severity   = EXCLUDED.severity, \
             version    = EXCLUDED.version, \
             is_active  = EXCLUDED.is_active, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(rule.rule_type.as_str())
    .bind(rule.scope.as_str())
    .bind(rule.rule_key())
    .bind(rule.payload.to_json())
    .bind(rule.severity.as_str())
    .bind(rule.version)
    .bind(rule.is_active)
    .fetch_one(executor)
    .await?;
    Ok(id)
}
