//! Posting calendar: which days of the week get a slot, with which pillar,
//! at which hour and on which channels.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::content::{Channel, Pillar};
use crate::manifest::optimal_hour_for_day;
use crate::{ConfigError, CoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSlot {
    /// 1 = Monday .. 7 = Sunday.
    pub day: u8,
    pub pillar: Pillar,
    pub hour: u8,
    /// First entry is the primary channel of the resulting post.
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub slots: Vec<CalendarSlot>,
}

impl Default for CalendarConfig {
    /// Four posting days (Mon, Wed, Fri, Sun) rotating through the pillars.
    fn default() -> Self {
        Self::for_days(&[1, 3, 5, 7])
    }
}

impl CalendarConfig {
    /// Build a calendar for the given days, cycling pillars in
    /// [`Pillar::ROTATION`] order and taking hours from the per-day table.
    #[must_use]
    pub fn for_days(days: &[u8]) -> Self {
        let slots = days
            .iter()
            .enumerate()
            .map(|(i, &day)| {
                let pillar = Pillar::ROTATION[i % Pillar::ROTATION.len()];
                CalendarSlot {
                    day,
                    pillar,
                    hour: optimal_hour_for_day(day).unwrap_or(12),
                    channels: default_channels(pillar),
                }
            })
            .collect();
        Self { slots }
    }

    /// Slots sorted by day, i.e. calendar order.
    #[must_use]
    pub fn ordered_slots(&self) -> Vec<&CalendarSlot> {
        let mut slots: Vec<&CalendarSlot> = self.slots.iter().collect();
        slots.sort_by_key(|s| s.day);
        slots
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCalendar`] for empty calendars, days outside
    /// `1..=7`, repeated days, hours above 23, or slots without channels.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.slots.is_empty() {
            return Err(CoreError::InvalidCalendar(
                "calendar has no posting days".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if !(1..=7).contains(&slot.day) {
                return Err(CoreError::InvalidCalendar(format!(
                    "day {} is outside 1..=7",
                    slot.day
                )));
            }
            if !seen.insert(slot.day) {
                return Err(CoreError::InvalidCalendar(format!(
                    "day {} appears more than once",
                    slot.day
                )));
            }
            if slot.hour > 23 {
                return Err(CoreError::InvalidCalendar(format!(
                    "hour {} on day {} is outside 0..=23",
                    slot.hour, slot.day
                )));
            }
            if slot.channels.is_empty() {
                return Err(CoreError::InvalidCalendar(format!(
                    "day {} has no target channels",
                    slot.day
                )));
            }
        }
        Ok(())
    }
}

/// Channel fan-out per pillar. Advice content also goes to YouTube.
#[must_use]
pub fn default_channels(pillar: Pillar) -> Vec<Channel> {
    match pillar {
        Pillar::Conseil => vec![Channel::Instagram, Channel::Facebook, Channel::Youtube],
        Pillar::Catalogue | Pillar::Confiance | Pillar::Promo => {
            vec![Channel::Instagram, Channel::Facebook]
        }
    }
}

/// Load and validate a calendar from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_calendar(path: &Path) -> Result<CalendarConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let calendar: CalendarConfig = serde_yaml::from_str(&content)?;
    calendar
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(calendar)
}
