//! Multi-channel copy generation.
//!
//! One slot fans out to each of its target channels; a batch fans out over
//! slots with bounded concurrency. Failures stay local to the channel or slot
//! that produced them and are reported, never propagated.

pub mod normalize;
pub mod templates;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use socops_core::ports::{
    ContentGenerator, GenerationRequest, PipelineStore, RuleRepository, UpsertOutcome,
};
use socops_core::{
    build_utm_link, Channel, ChannelVariant, DaySlot, IsoWeek, NewSocialPost, PostKey,
    RulePayload, UtmLink, UtmRequest,
};
use tokio_util::sync::CancellationToken;

use crate::progress::sync_plan_progress;
use crate::{PipelineError, PipelineSettings};

use self::normalize::parse_generated;
use self::templates::{render_prompt, template_for};

/// Copy produced for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCopy {
    pub day_of_week: u8,
    pub slot_label: String,
    pub primary_channel: Channel,
    pub variants: BTreeMap<Channel, ChannelVariant>,
    /// Campaign link for every target channel, generated or not.
    pub links: BTreeMap<Channel, UtmLink>,
    pub failures: Vec<ChannelFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFailure {
    pub day_of_week: u8,
    pub slot_label: String,
    /// Set when a single channel failed inside an otherwise generated slot.
    pub channel: Option<Channel>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<SlotFailure>,
    /// Generated copy, kept only for dry runs.
    pub previews: Vec<SlotCopy>,
}

enum SlotOutcome {
    Generated(SlotCopy),
    Failed(String),
    Skipped(String),
}

pub struct CopyOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    store: Arc<dyn PipelineStore>,
    rules: Arc<dyn RuleRepository>,
    settings: PipelineSettings,
}

impl CopyOrchestrator {
    #[must_use]
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        store: Arc<dyn PipelineStore>,
        rules: Arc<dyn RuleRepository>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            store,
            rules,
            settings,
        }
    }

    /// Generate copy for every target channel of `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the slot has no target
    /// channels and [`PipelineError::UpstreamUnavailable`] if no channel
    /// produced copy. Partial failures are listed in [`SlotCopy::failures`].
    pub async fn generate_for_slot(
        &self,
        slot: &DaySlot,
        week: IsoWeek,
    ) -> Result<SlotCopy, PipelineError> {
        let guidelines = self.load_guidelines(&slot.brief.target_channels).await;
        self.slot_copy(slot, week, &guidelines, &CancellationToken::new())
            .await
    }

    /// Generate and store the copy for the stored plan of `week_iso`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for a malformed week and
    /// [`PipelineError::NotFound`] when the week has no plan.
    pub async fn generate_week(
        &self,
        week_iso: &str,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        let plan = self
            .store
            .get_plan(week)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                entity: "plan",
                id: week.to_string(),
            })?;
        Ok(self
            .generate_batch(week, &plan.slots, dry_run, cancel)
            .await)
    }

    /// Generate copy for `slots` with at most `max_concurrent_generations`
    /// slots in flight. Unless `dry_run`, each generated slot is stored as a
    /// `generated` post and its links are registered.
    ///
    /// Once `cancel` fires no new slot or channel is started. Slots that did
    /// not get to run, or had channels left unfinished, are counted as
    /// skipped and nothing is stored for them.
    pub async fn generate_batch(
        &self,
        week: IsoWeek,
        slots: &[DaySlot],
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let channels: Vec<Channel> = {
            let mut all: Vec<Channel> = slots
                .iter()
                .flat_map(|s| s.brief.target_channels.iter().copied())
                .collect();
            all.sort();
            all.dedup();
            all
        };
        let guidelines = self.load_guidelines(&channels).await;
        let max_concurrent = self.settings.max_concurrent_generations.max(1);

        let outcomes: Vec<(&DaySlot, SlotOutcome)> = stream::iter(slots)
            .map(|slot| {
                let guidelines = &guidelines;
                async move {
                    let outcome = self
                        .process_slot(slot, week, guidelines, dry_run, cancel)
                        .await;
                    (slot, outcome)
                }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (slot, outcome) in outcomes {
            match outcome {
                SlotOutcome::Generated(copy) => {
                    report.generated += 1;
                    report
                        .failures
                        .extend(copy.failures.iter().map(|f| SlotFailure {
                            day_of_week: copy.day_of_week,
                            slot_label: copy.slot_label.clone(),
                            channel: Some(f.channel),
                            reason: f.reason.clone(),
                        }));
                    if dry_run {
                        report.previews.push(copy);
                    }
                }
                SlotOutcome::Failed(reason) => {
                    tracing::error!(
                        week = %week,
                        day = slot.day_of_week,
                        slot = %slot.label(),
                        error = %reason,
                        "slot generation failed"
                    );
                    report.failed += 1;
                    report.failures.push(SlotFailure {
                        day_of_week: slot.day_of_week,
                        slot_label: slot.label(),
                        channel: None,
                        reason,
                    });
                }
                SlotOutcome::Skipped(reason) => {
                    tracing::info!(
                        week = %week,
                        day = slot.day_of_week,
                        slot = %slot.label(),
                        reason = %reason,
                        "slot skipped"
                    );
                    report.skipped += 1;
                }
            }
        }
        report.failures.sort_by(|a, b| {
            (a.day_of_week, &a.slot_label, a.channel).cmp(&(b.day_of_week, &b.slot_label, b.channel))
        });
        report
            .previews
            .sort_by(|a, b| (a.day_of_week, &a.slot_label).cmp(&(b.day_of_week, &b.slot_label)));

        if !dry_run && report.generated > 0 {
            if let Err(e) = sync_plan_progress(self.store.as_ref(), week).await {
                tracing::warn!(week = %week, error = %e, "failed to refresh plan progress");
            }
        }

        tracing::info!(
            week = %week,
            dry_run,
            generated = report.generated,
            failed = report.failed,
            skipped = report.skipped,
            "copy batch finished"
        );
        report
    }

    async fn process_slot(
        &self,
        slot: &DaySlot,
        week: IsoWeek,
        guidelines: &HashMap<Channel, Vec<String>>,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> SlotOutcome {
        if cancel.is_cancelled() {
            return SlotOutcome::Skipped("cancelled".to_string());
        }
        let copy = match self.slot_copy(slot, week, guidelines, cancel).await {
            Ok(copy) => copy,
            Err(PipelineError::Cancelled) => {
                return SlotOutcome::Skipped("cancelled before every channel finished".to_string());
            }
            Err(_) if cancel.is_cancelled() => {
                return SlotOutcome::Skipped("cancelled".to_string());
            }
            Err(e) => return SlotOutcome::Failed(e.to_string()),
        };
        if dry_run {
            return SlotOutcome::Generated(copy);
        }
        match self.persist(slot, week, &copy).await {
            Ok(UpsertOutcome::Locked { id, status }) => SlotOutcome::Skipped(format!(
                "post {id} is {status} and was not overwritten"
            )),
            Ok(_) => SlotOutcome::Generated(copy),
            Err(e) => SlotOutcome::Failed(e.to_string()),
        }
    }

    async fn slot_copy(
        &self,
        slot: &DaySlot,
        week: IsoWeek,
        guidelines: &HashMap<Channel, Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<SlotCopy, PipelineError> {
        let Some(primary_channel) = slot.primary_channel() else {
            return Err(PipelineError::InvalidInput(format!(
                "slot {} on day {} has no target channels",
                slot.label(),
                slot.day_of_week
            )));
        };

        let mut copy = SlotCopy {
            day_of_week: slot.day_of_week,
            slot_label: slot.label(),
            primary_channel,
            variants: BTreeMap::new(),
            links: BTreeMap::new(),
            failures: Vec::new(),
        };

        for &channel in &slot.brief.target_channels {
            let template = template_for(slot.pillar, channel);
            let link = build_utm_link(
                &self.settings.site_base_url,
                &UtmRequest {
                    path: &slot.brief.source_path,
                    week,
                    pillar: slot.pillar,
                    topic_alias: slot.brief.topic_alias.as_deref().unwrap_or("general"),
                    channel,
                    format: Some(template.format),
                    variant: None,
                },
            );

            // Partial copy must never replace a stored post.
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let notes = guidelines.get(&channel).map_or(&[][..], Vec::as_slice);
            let request = GenerationRequest {
                content_type: channel.content_type(),
                prompt: render_prompt(&template, channel, &slot.brief, &link.full_url, notes),
                tone: template.tone.to_string(),
                language: self.settings.content_language.clone(),
                max_length: template.max_length,
                temperature: template.temperature,
                context: generation_context(slot, week, channel, &link),
                use_cache: false,
            };

            match self.generate_channel(&request).await {
                Ok(mut variant) => {
                    variant.utm = Some(link.params.clone());
                    variant.format = variant.format.or_else(|| Some(template.format.to_string()));
                    copy.variants.insert(channel, variant);
                }
                Err(reason) => {
                    tracing::warn!(
                        week = %week,
                        day = slot.day_of_week,
                        channel = %channel,
                        error = %reason,
                        "channel generation failed"
                    );
                    copy.failures.push(ChannelFailure { channel, reason });
                }
            }
            copy.links.insert(channel, link);
        }

        if copy.variants.is_empty() {
            let reasons: Vec<String> = copy
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.channel, f.reason))
                .collect();
            return Err(PipelineError::UpstreamUnavailable(reasons.join("; ")));
        }
        Ok(copy)
    }

    async fn generate_channel(&self, request: &GenerationRequest) -> Result<ChannelVariant, String> {
        let timeout = self.settings.generator_timeout;
        let content = match tokio::time::timeout(timeout, self.generator.generate(request)).await {
            Ok(Ok(generated)) => generated.content,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => return Err(format!("generator timed out after {timeout:?}")),
        };
        parse_generated(&content).map_err(|e| e.to_string())
    }

    async fn persist(
        &self,
        slot: &DaySlot,
        week: IsoWeek,
        copy: &SlotCopy,
    ) -> Result<UpsertOutcome, PipelineError> {
        let primary_link = copy.links.get(&copy.primary_channel);
        let primary_variant = copy.variants.get(&copy.primary_channel);

        let post = NewSocialPost {
            key: PostKey {
                week,
                day_of_week: slot.day_of_week,
                slot_label: copy.slot_label.clone(),
                primary_channel: copy.primary_channel,
            },
            pillar: slot.pillar,
            topic_id: slot.brief.topic_id,
            topic_alias: slot.brief.topic_alias.clone(),
            channels: copy.variants.clone(),
            utm: primary_link.map(|l| l.params.clone()),
            link_url: primary_link
                .map(|l| format!("{}{}", l.base_url, l.path))
                .unwrap_or_default(),
            visual_brief: primary_variant
                .and_then(|v| v.visual_brief.clone())
                .or_else(|| Some(slot.brief.visual_direction.clone())),
        };

        let outcome = self.store.upsert_post(&post).await?;
        if let UpsertOutcome::Locked { id, status } = outcome {
            tracing::warn!(post_id = %id, status = %status, "post is locked, copy discarded");
            return Ok(outcome);
        }

        for (channel, link) in &copy.links {
            if !copy.variants.contains_key(channel) {
                continue;
            }
            if let Err(e) = self.store.register_utm_link(link).await {
                tracing::warn!(
                    post_id = %outcome.id(),
                    channel = %channel,
                    error = %e,
                    "failed to register campaign link"
                );
            }
        }
        tracing::debug!(post_id = %outcome.id(), slot = %copy.slot_label, "post stored");
        Ok(outcome)
    }

    /// Tone notes from `guidelines` rules, per channel. Rule lookups are
    /// bounded by the rule fetch timeout and degrade to no notes.
    async fn load_guidelines(&self, channels: &[Channel]) -> HashMap<Channel, Vec<String>> {
        let timeout = self.settings.rule_fetch_timeout;
        let mut out = HashMap::new();
        for &channel in channels {
            let rules = match tokio::time::timeout(timeout, self.rules.active_rules(channel)).await
            {
                Ok(Ok(rules)) => rules,
                Ok(Err(e)) => {
                    tracing::warn!(channel = %channel, error = %e, "guidelines unavailable");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(channel = %channel, "guidelines lookup timed out");
                    continue;
                }
            };
            let notes: Vec<String> = rules
                .into_iter()
                .filter(|r| r.applies_to(channel))
                .filter_map(|r| match r.payload {
                    RulePayload::Guidelines { notes } => Some(notes),
                    _ => None,
                })
                .flatten()
                .collect();
            out.insert(channel, notes);
        }
        out
    }
}

fn generation_context(
    slot: &DaySlot,
    week: IsoWeek,
    channel: Channel,
    link: &UtmLink,
) -> serde_json::Value {
    serde_json::json!({
        "week": week.to_string(),
        "date": slot.date.to_string(),
        "pillar": slot.pillar,
        "channel": channel,
        "topic": slot.brief.topic,
        "topic_alias": slot.brief.topic_alias,
        "angle": slot.brief.angle,
        "objective": slot.brief.objective,
        "cta_type": slot.brief.cta_type,
        "selling_points": slot.brief.selling_points,
        "visual_direction": slot.brief.visual_direction,
        "price_hint": slot.brief.price_hint.map(|p| p.to_string()),
        "link": link.full_url,
    })
}
