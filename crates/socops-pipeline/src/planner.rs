//! Weekly plan generation: topic selection and slot briefs.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use socops_core::ports::{CatalogSource, PipelineStore, TopicCandidate};
use socops_core::{
    CalendarConfig, CalendarSlot, DaySlot, IsoWeek, Pillar, PlanCounters, PlanStatus, PostBrief,
    SelectedTopic, SelectionReason, WeeklyPlan,
};

use crate::{PipelineError, PipelineSettings};

/// Candidates fetched per tier, relative to the number of slots.
const CANDIDATES_PER_SLOT: usize = 3;
const MIN_CANDIDATES: usize = 10;

pub struct WeeklyPlanner {
    store: Arc<dyn PipelineStore>,
    catalog: Arc<dyn CatalogSource>,
    settings: PipelineSettings,
}

impl WeeklyPlanner {
    #[must_use]
    pub fn new(
        store: Arc<dyn PipelineStore>,
        catalog: Arc<dyn CatalogSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            settings,
        }
    }

    /// Build and store the plan for `week_iso`.
    ///
    /// Manual `priority_topics` are used as given, in order. Without them the
    /// catalog supplies high-traffic then coverage-gap topics, skipping those
    /// posted within the anti-duplication window unless there are not enough
    /// fresh ones. Regenerating a week overwrites its plan and resets it to
    /// `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for a malformed week or
    /// calendar, and [`PipelineError::Store`] if the plan cannot be stored.
    /// Catalog failures degrade to generic briefs.
    pub async fn generate_plan(
        &self,
        week_iso: &str,
        priority_topics: Option<&[String]>,
        calendar: Option<CalendarConfig>,
    ) -> Result<WeeklyPlan, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        let calendar = calendar.unwrap_or_default();
        calendar.validate()?;
        let slot_count = calendar.slots.len();

        let manual: Vec<&str> = priority_topics
            .unwrap_or_default()
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let topics = if manual.is_empty() {
            self.auto_select(week, slot_count).await?
        } else {
            self.resolve_manual(&manual).await
        };

        if topics.is_empty() {
            tracing::warn!(week = %week, "no topics available, plan uses generic briefs");
        }

        let mut slots = Vec::with_capacity(slot_count);
        for (i, cal_slot) in calendar.ordered_slots().into_iter().enumerate() {
            let topic = if topics.is_empty() {
                None
            } else {
                Some(&topics[i % topics.len()])
            };
            slots.push(DaySlot {
                day_of_week: cal_slot.day,
                date: week.date_for_day(cal_slot.day)?,
                pillar: cal_slot.pillar,
                optimal_hour: cal_slot.hour,
                brief: build_brief(cal_slot, topic),
            });
        }

        let plan = WeeklyPlan {
            week,
            slots,
            topics,
            calendar,
            status: PlanStatus::Draft,
            counters: PlanCounters::default(),
        };
        let stored = self.store.upsert_plan(&plan).await?;

        tracing::info!(
            week = %week,
            slots = stored.slots.len(),
            topics = stored.topics.len(),
            "weekly plan stored"
        );
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for a malformed week and
    /// [`PipelineError::NotFound`] if no plan exists for it.
    pub async fn get_plan(&self, week_iso: &str) -> Result<WeeklyPlan, PipelineError> {
        let week = IsoWeek::parse(week_iso)?;
        self.store
            .get_plan(week)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                entity: "plan",
                id: week.to_string(),
            })
    }

    async fn resolve_manual(&self, aliases: &[&str]) -> Vec<SelectedTopic> {
        let mut topics = Vec::with_capacity(aliases.len());
        for &alias in aliases {
            let resolved = match self.catalog.resolve_alias(alias).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(alias, error = %e, "catalog lookup failed, using bare alias");
                    None
                }
            };
            topics.push(match resolved {
                Some(candidate) => selected(candidate, SelectionReason::Manual),
                None => SelectedTopic {
                    topic_id: None,
                    alias: alias.to_string(),
                    name: alias.to_string(),
                    reason: SelectionReason::Manual,
                    category: None,
                    source_path: None,
                    price_from: None,
                },
            });
        }
        topics
    }

    async fn auto_select(
        &self,
        week: IsoWeek,
        slot_count: usize,
    ) -> Result<Vec<SelectedTopic>, PipelineError> {
        let limit = (slot_count * CANDIDATES_PER_SLOT).max(MIN_CANDIDATES);

        let high_traffic = self
            .catalog
            .high_traffic_topics(limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(week = %week, error = %e, "high-traffic topics unavailable");
                Vec::new()
            });
        let coverage_gaps = self
            .catalog
            .coverage_gap_topics(limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(week = %week, error = %e, "coverage-gap topics unavailable");
                Vec::new()
            });

        let mut seen = HashSet::new();
        let candidates: Vec<(TopicCandidate, SelectionReason)> = high_traffic
            .into_iter()
            .map(|c| (c, SelectionReason::HighTraffic))
            .chain(
                coverage_gaps
                    .into_iter()
                    .map(|c| (c, SelectionReason::LowCoverage)),
            )
            .filter(|(c, _)| seen.insert(c.id))
            .collect();

        let since = window_start(week, self.settings.anti_dup_window_days);
        let recent: HashSet<i64> = self
            .store
            .recently_posted_topic_ids(since)
            .await?
            .into_iter()
            .collect();

        Ok(pick_topics(candidates, &recent, slot_count))
    }
}

/// Fresh candidates first; recently posted ones only fill remaining slots,
/// both in candidate order.
fn pick_topics(
    candidates: Vec<(TopicCandidate, SelectionReason)>,
    recent: &HashSet<i64>,
    slot_count: usize,
) -> Vec<SelectedTopic> {
    let (fresh, reused): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|(c, _)| !recent.contains(&c.id));

    let reuse_needed = slot_count.saturating_sub(fresh.len());
    if reuse_needed > 0 && !reused.is_empty() {
        tracing::debug!(
            fresh = fresh.len(),
            reused = reuse_needed.min(reused.len()),
            "not enough fresh topics, reusing recent ones"
        );
    }

    fresh
        .into_iter()
        .take(slot_count)
        .chain(reused.into_iter().take(reuse_needed))
        .map(|(c, reason)| selected(c, reason))
        .collect()
}

/// Start of the anti-duplication window: `days` before Monday 00:00 UTC.
fn window_start(week: IsoWeek, days: u32) -> chrono::DateTime<Utc> {
    let monday = Utc.from_utc_datetime(&week.monday().and_time(NaiveTime::MIN));
    monday - ChronoDuration::days(i64::from(days))
}

fn selected(candidate: TopicCandidate, reason: SelectionReason) -> SelectedTopic {
    SelectedTopic {
        topic_id: Some(candidate.id),
        alias: candidate.alias,
        name: candidate.name,
        reason,
        category: Some(candidate.category),
        source_path: Some(candidate.source_path),
        price_from: candidate.price_from,
    }
}

fn build_brief(slot: &CalendarSlot, topic: Option<&SelectedTopic>) -> PostBrief {
    let pillar = slot.pillar;
    let Some(topic) = topic else {
        return PostBrief {
            topic: None,
            topic_id: None,
            topic_alias: None,
            angle: generic_angle(pillar).to_string(),
            source_category: "general".to_string(),
            source_path: "/".to_string(),
            target_channels: slot.channels.clone(),
            objective: pillar.default_objective(),
            cta_type: pillar.default_cta(),
            selling_points: base_selling_points(pillar),
            visual_direction: visual_direction(pillar).to_string(),
            price_hint: None,
        };
    };

    let mut selling_points = base_selling_points(pillar);
    if let Some(price) = topic.price_from {
        selling_points.insert(0, format!("À partir de {price} €"));
    }

    PostBrief {
        topic: Some(topic.name.clone()),
        topic_id: topic.topic_id,
        topic_alias: Some(topic.alias.clone()),
        angle: topic_angle(pillar, &topic.name),
        source_category: topic
            .category
            .clone()
            .unwrap_or_else(|| "manual".to_string()),
        source_path: topic.source_path.clone().unwrap_or_else(|| "/".to_string()),
        target_channels: slot.channels.clone(),
        objective: pillar.default_objective(),
        cta_type: pillar.default_cta(),
        selling_points,
        visual_direction: visual_direction(pillar).to_string(),
        price_hint: topic.price_from,
    }
}

fn topic_angle(pillar: Pillar, name: &str) -> String {
    match pillar {
        Pillar::Catalogue => format!("Mise en avant de la gamme {name}"),
        Pillar::Conseil => format!("Conseils d'entretien : {name}"),
        Pillar::Confiance => format!("Pourquoi nous confier vos {name}"),
        Pillar::Promo => format!("Offre du moment sur {name}"),
    }
}

fn generic_angle(pillar: Pillar) -> &'static str {
    match pillar {
        Pillar::Catalogue => "Tour d'horizon du catalogue",
        Pillar::Conseil => "Astuce d'entretien de la semaine",
        Pillar::Confiance => "Avis clients et garanties",
        Pillar::Promo => "Les bonnes affaires de la semaine",
    }
}

fn base_selling_points(pillar: Pillar) -> Vec<String> {
    let points: &[&str] = match pillar {
        Pillar::Catalogue => &["Pièces d'origine ou équivalentes", "Compatibilité vérifiée"],
        Pillar::Conseil => &["Explications pas à pas", "Outils nécessaires listés"],
        Pillar::Confiance => &["Livraison rapide", "Retours gratuits sous 30 jours"],
        Pillar::Promo => &["Prix réduits pour une durée limitée", "Stock disponible"],
    };
    points.iter().map(|p| (*p).to_string()).collect()
}

fn visual_direction(pillar: Pillar) -> &'static str {
    match pillar {
        Pillar::Catalogue => "Photo produit détourée sur fond clair",
        Pillar::Conseil => "Gros plan atelier, mains en action",
        Pillar::Confiance => "Visuel chaleureux avec citation client",
        Pillar::Promo => "Bandeau prix contrasté, produit au premier plan",
    }
}
