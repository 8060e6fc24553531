//! Domain model for the social content operations pipeline.
//!
//! Everything here is pure data plus the deterministic helpers the pipeline
//! stages share (ISO week arithmetic, UTM links, rule payloads). The traits in
//! [`ports`] are the seams through which the pipeline reaches the store, the
//! catalog and the content-generation provider.

pub mod app_config;
pub mod calendar;
pub mod config;
pub mod content;
pub mod gate;
pub mod manifest;
pub mod plan;
pub mod ports;
pub mod post;
pub mod rules;
pub mod utm;
pub mod week;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use calendar::{CalendarConfig, CalendarSlot};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{
    Channel, CtaType, Objective, Pillar, PlanStatus, PostStatus, SelectionReason,
};
pub use gate::{
    BrandFinding, BrandResult, ComplianceCheck, ComplianceResult, GateLevel, GateSummary,
};
pub use manifest::{ManifestEntry, PublishManifest};
pub use plan::{DaySlot, PlanCounters, PostBrief, SelectedTopic, WeeklyPlan};
pub use post::{ChannelVariant, NewSocialPost, PostKey, SocialPost};
pub use rules::{
    load_rules, AnglicismPattern, BrandRule, RuleError, RulePayload, RuleScope, RuleType, Severity,
};
pub use utm::{append_utm, build_utm_link, UtmLink, UtmParams, UtmRequest};
pub use week::IsoWeek;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid ISO week '{0}': expected YYYY-Www")]
    InvalidWeek(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unknown pillar: {0}")]
    UnknownPillar(String),

    #[error("unknown post status: {0}")]
    UnknownStatus(String),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("day of week must be within 1..=7, got {0}")]
    InvalidDay(u8),

    #[error("invalid calendar: {0}")]
    InvalidCalendar(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),
}
