//! Closed vocabularies shared by every pipeline stage.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Social network a post variant is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Instagram,
    Facebook,
    Youtube,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Instagram, Channel::Facebook, Channel::Youtube];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Instagram => "instagram",
            Channel::Facebook => "facebook",
            Channel::Youtube => "youtube",
        }
    }

    /// Content type understood by the generation provider, e.g. `social_instagram`.
    #[must_use]
    pub fn content_type(self) -> String {
        format!("social_{}", self.as_str())
    }

    /// Platform ceiling on caption length, used when no `length_limits` rule
    /// is configured for the channel.
    #[must_use]
    pub fn default_caption_limit(self) -> usize {
        match self {
            Channel::Instagram => 2_200,
            Channel::Facebook => 63_206,
            Channel::Youtube => 5_000,
        }
    }

    /// Platform ceiling on titles. Only YouTube posts carry a title.
    #[must_use]
    pub fn default_title_limit(self) -> Option<usize> {
        match self {
            Channel::Youtube => Some(100),
            Channel::Instagram | Channel::Facebook => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(Channel::Instagram),
            "facebook" => Ok(Channel::Facebook),
            "youtube" => Ok(Channel::Youtube),
            _ => Err(CoreError::UnknownChannel(s.to_string())),
        }
    }
}

/// Content theme of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    /// Product range showcase.
    Catalogue,
    /// Maintenance and repair advice.
    Conseil,
    /// Trust: reviews, guarantees, delivery.
    Confiance,
    Promo,
}

impl Pillar {
    pub const ROTATION: [Pillar; 4] = [
        Pillar::Catalogue,
        Pillar::Conseil,
        Pillar::Promo,
        Pillar::Confiance,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pillar::Catalogue => "catalogue",
            Pillar::Conseil => "conseil",
            Pillar::Confiance => "confiance",
            Pillar::Promo => "promo",
        }
    }

    #[must_use]
    pub fn default_objective(self) -> Objective {
        match self {
            Pillar::Catalogue | Pillar::Promo => Objective::Conversion,
            Pillar::Conseil | Pillar::Confiance => Objective::Traffic,
        }
    }

    #[must_use]
    pub fn default_cta(self) -> CtaType {
        match self {
            Pillar::Catalogue | Pillar::Promo => CtaType::ShopNow,
            Pillar::Conseil => CtaType::ReadGuide,
            Pillar::Confiance => CtaType::LearnMore,
        }
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Pillar {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catalogue" => Ok(Pillar::Catalogue),
            "conseil" => Ok(Pillar::Conseil),
            "confiance" => Ok(Pillar::Confiance),
            "promo" => Ok(Pillar::Promo),
            _ => Err(CoreError::UnknownPillar(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    Traffic,
    Conversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaType {
    ShopNow,
    LearnMore,
    Contact,
    ReadGuide,
}

impl CtaType {
    /// French call-to-action wording handed to the generator.
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            CtaType::ShopNow => "Commandez maintenant",
            CtaType::LearnMore => "En savoir plus",
            CtaType::Contact => "Contactez-nous",
            CtaType::ReadGuide => "Lisez notre guide",
        }
    }
}

/// Why a topic was picked for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Manual,
    HighTraffic,
    LowCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    InProgress,
    Approved,
    Completed,
}

impl PlanStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Approved => "approved",
            PlanStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PlanStatus::Draft),
            "in_progress" => Ok(PlanStatus::InProgress),
            "approved" => Ok(PlanStatus::Approved),
            "completed" => Ok(PlanStatus::Completed),
            _ => Err(CoreError::UnknownVariant {
                kind: "plan status",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle of a [`crate::SocialPost`].
///
/// ```text
/// draft -> generated -> gate_passed | gate_failed -> approved -> published
///            ^______________ reject (any non-terminal) ______|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Generated,
    GatePassed,
    GateFailed,
    Approved,
    Published,
}

impl PostStatus {
    pub const ALL: [PostStatus; 6] = [
        PostStatus::Draft,
        PostStatus::Generated,
        PostStatus::GatePassed,
        PostStatus::GateFailed,
        PostStatus::Approved,
        PostStatus::Published,
    ];

    /// Every status the lifecycle allows to move to `next`.
    #[must_use]
    pub fn sources_of(next: PostStatus) -> Vec<PostStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }

    /// Statuses a regeneration may overwrite.
    #[must_use]
    pub fn regenerable() -> Vec<PostStatus> {
        Self::sources_of(PostStatus::Generated)
    }

    /// Statuses the gate engine may (re-)evaluate.
    #[must_use]
    pub fn gateable() -> Vec<PostStatus> {
        Self::sources_of(PostStatus::GatePassed)
    }

    /// Statuses a human rejection may send back to `draft`.
    #[must_use]
    pub fn rejectable() -> Vec<PostStatus> {
        Self::sources_of(PostStatus::Draft)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Generated => "generated",
            PostStatus::GatePassed => "gate_passed",
            PostStatus::GateFailed => "gate_failed",
            PostStatus::Approved => "approved",
            PostStatus::Published => "published",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == PostStatus::Published
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `draft -> draft` is allowed so a repeated rejection is a no-op rather
    /// than an error. Regenerating copy puts any not-yet-approved post back
    /// to `generated`, so it has to pass the gates again.
    #[must_use]
    pub fn can_transition_to(self, next: PostStatus) -> bool {
        use PostStatus::{Approved, Draft, GateFailed, GatePassed, Generated, Published};
        match (self, next) {
            (Draft | Generated | GatePassed | GateFailed, Generated)
            | (Generated | GatePassed | GateFailed, GatePassed | GateFailed)
            | (GatePassed, Approved)
            | (Approved, Published) => true,
            (from, Draft) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "generated" => Ok(PostStatus::Generated),
            "gate_passed" => Ok(PostStatus::GatePassed),
            "gate_failed" => Ok(PostStatus::GateFailed),
            "approved" => Ok(PostStatus::Approved),
            "published" => Ok(PostStatus::Published),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}
