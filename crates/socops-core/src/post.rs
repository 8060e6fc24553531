use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{Channel, Pillar, PostStatus};
use crate::gate::{GateLevel, GateSummary};
use crate::utm::UtmParams;
use crate::week::IsoWeek;

/// Natural key of a post: one row per (week, day, slot, primary channel).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostKey {
    pub week: IsoWeek,
    pub day_of_week: u8,
    pub slot_label: String,
    pub primary_channel: Channel,
}

/// Normalized copy for one channel. Optional fields are resolved once when
/// the generator output is parsed, never re-interpreted downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVariant {
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Post format, e.g. `carrousel`, `reel`, `short`.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub visual_brief: Option<String>,
    /// The channel's own campaign parameters.
    #[serde(default)]
    pub utm: Option<UtmParams>,
}

/// Fields written when a slot's copy is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSocialPost {
    pub key: PostKey,
    pub pillar: Pillar,
    pub topic_id: Option<i64>,
    pub topic_alias: Option<String>,
    pub channels: BTreeMap<Channel, ChannelVariant>,
    /// Campaign parameters of the primary channel.
    pub utm: Option<UtmParams>,
    /// Canonical storefront URL, without campaign parameters.
    pub link_url: String,
    pub visual_brief: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: Uuid,
    pub key: PostKey,
    pub pillar: Pillar,
    pub topic_id: Option<i64>,
    pub topic_alias: Option<String>,
    pub channels: BTreeMap<Channel, ChannelVariant>,
    pub status: PostStatus,
    pub brand_gate_level: Option<GateLevel>,
    pub compliance_gate_level: Option<GateLevel>,
    pub gate_summary: Option<GateSummary>,
    pub quality_score: Option<u8>,
    pub utm: Option<UtmParams>,
    pub link_url: String,
    pub visual_brief: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SocialPost {
    #[must_use]
    pub fn primary_channel(&self) -> Channel {
        self.key.primary_channel
    }

    /// Variant for the primary channel, the one the gates evaluate.
    #[must_use]
    pub fn primary_variant(&self) -> Option<&ChannelVariant> {
        self.channels.get(&self.key.primary_channel)
    }

    /// Campaign parameters for `channel`: the variant's own. Only the
    /// primary channel falls back to the post-level parameters, which were
    /// built for it.
    #[must_use]
    pub fn utm_for(&self, channel: Channel) -> Option<&UtmParams> {
        let own = self.channels.get(&channel).and_then(|v| v.utm.as_ref());
        if channel == self.primary_channel() {
            own.or(self.utm.as_ref())
        } else {
            own
        }
    }
}
