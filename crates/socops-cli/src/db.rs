use std::path::{Path, PathBuf};

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Load brand rules from YAML into `brand_rules`
    SeedRules {
        /// Rules file; defaults to SOCOPS_RULES_PATH
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    socops_db::ping(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = socops_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Validate every rule in `path` and upsert them in one transaction.
///
/// # Errors
///
/// Returns an error if the file is unreadable, any rule fails validation, or
/// the upsert fails. Nothing is written unless every rule is valid.
pub(crate) async fn run_db_seed_rules(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let rules = socops_core::load_rules(path)
        .map_err(|e| anyhow::anyhow!("failed to load rules from {}: {e}", path.display()))?;
    let count = socops_db::seed_rules(pool, &rules).await?;
    tracing::info!(count, path = %path.display(), "brand rules seeded");
    println!("seeded {count} rule(s) from {}", path.display());
    Ok(())
}
