//! Offline tests for socops-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use socops_core::{AppConfig, Environment, UtmLink};
use socops_db::{PoolConfig, UtmLinkRow};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        site_base_url: "https://www.example-pieces.fr".to_string(),
        rules_path: PathBuf::from("./config/brand_rules.yaml"),
        calendar_path: None,
        content_language: "fr".to_string(),
        generator_url: None,
        generator_api_key: None,
        generator_timeout_secs: 30,
        generator_max_retries: 2,
        generator_backoff_base_ms: 500,
        max_concurrent_generations: 10,
        rule_fetch_timeout_secs: 5,
        anti_dup_window_days: 28,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn utm_link_row_converts_to_link() {
    let row = UtmLinkRow {
        id: 3,
        base_url: "https://www.example-pieces.fr".to_string(),
        path: "/pieces/disque-frein".to_string(),
        utm_campaign: "mktg_2026w09_catalogue_disque-frein".to_string(),
        utm_content: "instagram_carrousel_9f8ad7aa".to_string(),
        utm_source: "instagram".to_string(),
        utm_medium: "social".to_string(),
        full_url: "https://www.example-pieces.fr/pieces/disque-frein?utm_campaign=x".to_string(),
        created_at: Utc::now(),
    };

    let link = UtmLink::from(row);
    assert_eq!(link.path, "/pieces/disque-frein");
    assert_eq!(link.params.content, "instagram_carrousel_9f8ad7aa");
    assert_eq!(link.params.medium, "social");
}
