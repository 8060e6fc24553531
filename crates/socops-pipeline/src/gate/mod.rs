//! Brand and compliance gates.
//!
//! [`evaluate`] is a pure function of the post's primary-channel copy and the
//! rule set; [`GateEngine`] fetches the rules, evaluates and stores the
//! verdict with a compare-and-set on the post status.

mod brand;
mod compliance;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use socops_core::ports::{GateOutcome, PipelineStore, RuleRepository};
use socops_core::{
    BrandRule, Channel, GateLevel, GateSummary, IsoWeek, PostStatus, RuleScope, SocialPost,
};
use uuid::Uuid;

use crate::{PipelineError, PipelineSettings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRunReport {
    pub passed: usize,
    pub failed: usize,
    /// Posts not in a gateable status.
    pub skipped: usize,
    pub errors: Vec<GateRunError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRunError {
    pub post_id: Uuid,
    pub reason: String,
}

/// One rule per `rule_key`: a channel-scoped rule shadows global rules with
/// the same key.
fn most_specific_per_key(rules: Vec<&BrandRule>) -> Vec<&BrandRule> {
    let scoped: HashSet<&str> = rules
        .iter()
        .filter(|r| matches!(r.scope, RuleScope::Channel(_)))
        .map(|r| r.rule_key())
        .collect();
    rules
        .into_iter()
        .filter(|r| matches!(r.scope, RuleScope::Channel(_)) || !scoped.contains(r.rule_key()))
        .collect()
}

/// Evaluate `post` against `rules`. Rules that do not apply to the post's
/// primary channel are ignored, and the input order of `rules` does not
/// affect the result.
#[must_use]
pub fn evaluate(post: &SocialPost, rules: &[BrandRule]) -> GateSummary {
    let channel = post.primary_channel();
    let mut applicable: Vec<&BrandRule> = most_specific_per_key(
        rules.iter().filter(|r| r.applies_to(channel)).collect(),
    );
    applicable.sort_by(|a, b| {
        (a.rule_key(), a.scope.as_str(), a.id, a.version).cmp(&(
            b.rule_key(),
            b.scope.as_str(),
            b.id,
            b.version,
        ))
    });

    let variant = post.primary_variant();
    let text = variant
        .map(|v| match &v.title {
            Some(title) => format!("{title}\n{}", v.caption),
            None => v.caption.clone(),
        })
        .unwrap_or_default();

    let brand = brand::check(&text, &applicable);
    let compliance = compliance::check(channel, variant, post.utm_for(channel), &applicable);

    let can_approve = brand.level != GateLevel::Fail && compliance.level != GateLevel::Fail;
    let blocking_issues = brand
        .violations
        .iter()
        .map(|v| v.message.clone())
        .chain(
            compliance
                .checks
                .iter()
                .filter(|c| c.level == GateLevel::Fail)
                .map(|c| format!("{}: {}", c.name, c.detail)),
        )
        .collect();

    GateSummary {
        brand,
        compliance,
        can_approve,
        blocking_issues,
    }
}

pub struct GateEngine {
    store: Arc<dyn PipelineStore>,
    rules: Arc<dyn RuleRepository>,
    settings: PipelineSettings,
}

impl GateEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn PipelineStore>,
        rules: Arc<dyn RuleRepository>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            rules,
            settings,
        }
    }

    /// Gate a single post and return it with its stored verdict.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFound`] if the post does not exist.
    /// - [`PipelineError::InvalidTransition`] if it is not `generated`,
    ///   `gate_passed` or `gate_failed`.
    /// - [`PipelineError::UpstreamUnavailable`] if the rules cannot be fetched
    ///   in time.
    pub async fn run_for_post(&self, post_id: Uuid) -> Result<SocialPost, PipelineError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| PipelineError::post_not_found(post_id))?;
        if !PostStatus::gateable().contains(&post.status) {
            return Err(PipelineError::InvalidTransition {
                id: post_id,
                from: post.status,
                to: PostStatus::GatePassed,
            });
        }
        let rules = self.fetch_rules(post.primary_channel()).await?;
        self.gate(&post, &rules).await
    }

    /// Gate every gateable post of the week. Other posts are skipped and
    /// per-post failures are collected in the report.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for a malformed week and
    /// [`PipelineError::Store`] if the week's posts cannot be listed.
    pub async fn run_for_week(&self, week_iso: &str) -> Result<GateRunReport, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        let posts = self.store.list_posts(week, None).await?;

        let mut report = GateRunReport::default();
        let mut rule_cache: HashMap<Channel, Result<Vec<BrandRule>, String>> = HashMap::new();

        for post in posts {
            if !PostStatus::gateable().contains(&post.status) {
                tracing::debug!(post_id = %post.id, status = %post.status, "not gateable, skipping");
                report.skipped += 1;
                continue;
            }

            let channel = post.primary_channel();
            if !rule_cache.contains_key(&channel) {
                let fetched = self.fetch_rules(channel).await.map_err(|e| e.to_string());
                rule_cache.insert(channel, fetched);
            }
            let rules = match rule_cache.get(&channel) {
                Some(Ok(rules)) => rules,
                Some(Err(reason)) => {
                    report.errors.push(GateRunError {
                        post_id: post.id,
                        reason: reason.clone(),
                    });
                    continue;
                }
                None => continue,
            };

            match self.gate(&post, rules).await {
                Ok(gated) if gated.status == PostStatus::GatePassed => report.passed += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "gate run failed for post");
                    report.errors.push(GateRunError {
                        post_id: post.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            week = %week,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors.len(),
            "gate run finished"
        );
        Ok(report)
    }

    async fn gate(&self, post: &SocialPost, rules: &[BrandRule]) -> Result<SocialPost, PipelineError> {
        let summary = evaluate(post, rules);
        let status = if summary.can_approve {
            PostStatus::GatePassed
        } else {
            PostStatus::GateFailed
        };
        let outcome = GateOutcome {
            status,
            brand_level: summary.brand.level,
            compliance_level: summary.compliance.level,
            quality_score: summary.quality_score(),
            summary,
        };

        let Some(saved) = self.store.save_gate_result(post.id, &outcome).await? else {
            let current = self
                .store
                .get_post(post.id)
                .await?
                .ok_or_else(|| PipelineError::post_not_found(post.id))?;
            return Err(PipelineError::InvalidTransition {
                id: post.id,
                from: current.status,
                to: status,
            });
        };

        for issue in &outcome.summary.blocking_issues {
            tracing::debug!(post_id = %post.id, issue = %issue, "blocking issue");
        }
        tracing::info!(
            post_id = %post.id,
            status = %status,
            brand = %outcome.brand_level,
            compliance = %outcome.compliance_level,
            quality_score = outcome.quality_score,
            "post gated"
        );
        Ok(saved)
    }

    async fn fetch_rules(&self, channel: Channel) -> Result<Vec<BrandRule>, PipelineError> {
        let timeout = self.settings.rule_fetch_timeout;
        match tokio::time::timeout(timeout, self.rules.active_rules(channel)).await {
            Ok(Ok(rules)) => Ok(rules),
            Ok(Err(e)) => {
                tracing::warn!(channel = %channel, error = %e, "rule fetch failed");
                Err(PipelineError::UpstreamUnavailable(format!(
                    "rules for {channel}: {e}"
                )))
            }
            Err(_) => {
                tracing::warn!(channel = %channel, "rule fetch timed out");
                Err(PipelineError::UpstreamUnavailable(format!(
                    "rules for {channel}: timed out after {timeout:?}"
                )))
            }
        }
    }
}
