//! Weekly social content pipeline: plan, generate, gate, approve, export.
//!
//! Every stage talks to the outside world through the traits in
//! [`socops_core::ports`], so the same code runs against Postgres in
//! production and in-memory fakes in tests.

pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod planner;
pub mod queue;

mod progress;

use std::time::Duration;

use socops_core::AppConfig;

pub use error::PipelineError;
pub use gate::{evaluate, GateEngine, GateRunReport};
pub use orchestrator::{BatchReport, CopyOrchestrator, SlotCopy, SlotFailure};
pub use planner::WeeklyPlanner;
pub use queue::{BulkReport, PublishQueue};

/// Runtime knobs shared by the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Storefront origin campaign links point at.
    pub site_base_url: String,
    pub content_language: String,
    pub generator_timeout: Duration,
    pub max_concurrent_generations: usize,
    pub rule_fetch_timeout: Duration,
    pub anti_dup_window_days: u32,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            site_base_url: config.site_base_url.clone(),
            content_language: config.content_language.clone(),
            generator_timeout: Duration::from_secs(config.generator_timeout_secs),
            max_concurrent_generations: config.max_concurrent_generations.max(1),
            rule_fetch_timeout: Duration::from_secs(config.rule_fetch_timeout_secs),
            anti_dup_window_days: config.anti_dup_window_days,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            site_base_url: "http://localhost:3000".to_string(),
            content_language: "fr".to_string(),
            generator_timeout: Duration::from_secs(30),
            max_concurrent_generations: 10,
            rule_fetch_timeout: Duration::from_secs(5),
            anti_dup_window_days: 28,
        }
    }
}
