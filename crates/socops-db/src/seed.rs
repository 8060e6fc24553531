use socops_core::BrandRule;
use sqlx::PgPool;

use crate::rules::upsert_rule;
use crate::DbError;

/// Upsert a validated rule set into `brand_rules`.
///
/// Returns the number of rules written. All upserts run inside a single
/// transaction; if any of them fails the whole set is rolled back. Rules
/// stored in the database but absent from `rules` are left as they are.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_rules(pool: &PgPool, rules: &[BrandRule]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for rule in rules {
        let id = upsert_rule(&mut *tx, rule).await?;
        tracing::debug!(rule_id = id, rule_key = rule.rule_key(), scope = %rule.scope, "rule seeded");
        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
