use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::Channel;
use crate::week::IsoWeek;

/// Posting hour for a day of the week (1 = Monday), from audience analytics.
#[must_use]
pub fn optimal_hour_for_day(day: u8) -> Option<u8> {
    match day {
        1 | 3 => Some(12),
        2 | 4 => Some(18),
        5 => Some(17),
        6 => Some(10),
        7 => Some(11),
        _ => None,
    }
}

/// `HH:MM` for the per-day table, noon for days outside it.
#[must_use]
pub fn scheduled_time_for_day(day: u8) -> String {
    format!("{:02}:00", optimal_hour_for_day(day).unwrap_or(12))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub post_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    /// Canonical URL with the channel's campaign parameters.
    pub link: String,
    pub format: Option<String>,
    pub visual_brief: Option<String>,
}

/// Hand-off artifact for the scheduling tool of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishManifest {
    pub week_iso: IsoWeek,
    pub channel: Channel,
    pub generated_at: DateTime<Utc>,
    pub posts: Vec<ManifestEntry>,
}

impl PublishManifest {
    /// `manifest_2026-W09_instagram.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("manifest_{}_{}.json", self.week_iso, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_table_matches_posting_grid() {
        let hours: Vec<Option<u8>> = (1..=7).map(optimal_hour_for_day).collect();
        assert_eq!(
            hours,
            vec![
                Some(12),
                Some(18),
                Some(12),
                Some(18),
                Some(17),
                Some(10),
                Some(11)
            ]
        );
        assert_eq!(optimal_hour_for_day(0), None);
        assert_eq!(optimal_hour_for_day(8), None);
    }

    #[test]
    fn scheduled_time_is_zero_padded() {
        assert_eq!(scheduled_time_for_day(6), "10:00");
        assert_eq!(scheduled_time_for_day(5), "17:00");
    }

    #[test]
    fn file_name_uses_week_and_channel() {
        let manifest = PublishManifest {
            week_iso: IsoWeek::parse("2026-W09").unwrap(),
            channel: Channel::Instagram,
            generated_at: DateTime::<Utc>::UNIX_EPOCH,
            posts: vec![],
        };
        assert_eq!(manifest.file_name(), "manifest_2026-W09_instagram.json");
    }
}
