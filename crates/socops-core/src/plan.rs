use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarConfig;
use crate::content::{Channel, CtaType, Objective, Pillar, PlanStatus, SelectionReason};
use crate::week::IsoWeek;

/// A topic chosen for the week, with the tier it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTopic {
    /// Catalog id. `None` for manual aliases the catalog could not resolve.
    pub topic_id: Option<i64>,
    pub alias: String,
    pub name: String,
    pub reason: SelectionReason,
    /// Catalog category, e.g. `freinage`.
    pub category: Option<String>,
    /// Canonical storefront path, e.g. `/pieces/disque-frein`.
    pub source_path: Option<String>,
    pub price_from: Option<Decimal>,
}

/// What one slot's content should communicate. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostBrief {
    /// `None` for generic briefs emitted when no topic was available.
    pub topic: Option<String>,
    pub topic_id: Option<i64>,
    pub topic_alias: Option<String>,
    pub angle: String,
    pub source_category: String,
    pub source_path: String,
    pub target_channels: Vec<Channel>,
    pub objective: Objective,
    pub cta_type: CtaType,
    pub selling_points: Vec<String>,
    pub visual_direction: String,
    pub price_hint: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlot {
    /// 1 = Monday .. 7 = Sunday.
    pub day_of_week: u8,
    pub date: NaiveDate,
    pub pillar: Pillar,
    pub optimal_hour: u8,
    pub brief: PostBrief,
}

impl DaySlot {
    /// Slot label used in the post natural key, e.g. `catalogue-12h`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{:02}h", self.pillar, self.optimal_hour)
    }

    /// First target channel; `None` only for malformed briefs.
    #[must_use]
    pub fn primary_channel(&self) -> Option<Channel> {
        self.brief.target_channels.first().copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounters {
    pub posts_generated: i64,
    pub posts_approved: i64,
    pub posts_published: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub week: IsoWeek,
    pub slots: Vec<DaySlot>,
    pub topics: Vec<SelectedTopic>,
    pub calendar: CalendarConfig,
    pub status: PlanStatus,
    pub counters: PlanCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief() -> PostBrief {
        PostBrief {
            topic: Some("Disque de frein".to_string()),
            topic_id: Some(12),
            topic_alias: Some("disque-frein".to_string()),
            angle: "showcase".to_string(),
            source_category: "gamme".to_string(),
            source_path: "/pieces/disque-frein".to_string(),
            target_channels: vec![Channel::Instagram, Channel::Facebook],
            objective: Objective::Conversion,
            cta_type: CtaType::ShopNow,
            selling_points: vec![],
            visual_direction: "studio".to_string(),
            price_hint: None,
        }
    }

    #[test]
    fn slot_label_pads_hour() {
        let slot = DaySlot {
            day_of_week: 1,
            date: NaiveDate::from_ymd_opt(2026, 2, 23).unwrap(),
            pillar: Pillar::Catalogue,
            optimal_hour: 9,
            brief: brief(),
        };
        assert_eq!(slot.label(), "catalogue-09h");
        assert_eq!(slot.primary_channel(), Some(Channel::Instagram));
    }
}
