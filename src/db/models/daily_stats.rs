//! Per-date usage statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// One row of `daily_stats`. Counters only ever grow within a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub day_name: String,
    pub month_name: String,
    pub reels_watched: u64,
    pub ads_skipped: u64,
    pub time_saved_secs: u64,
    pub total_scrolls: u64,
    pub auto_scrolled: u64,
    pub instagram_watched: u64,
    pub instagram_ads_skipped: u64,
    pub youtube_watched: u64,
    pub youtube_ads_skipped: u64,
    pub linkedin_watched: u64,
    pub linkedin_ads_skipped: u64,
    pub snapchat_watched: u64,
    pub snapchat_ads_skipped: u64,
    pub snapchat_auto_scrolled: u64,
    pub snapchat_time_spent_secs: u64,
}

impl DailyStats {
    /// Zeroed record for `date`; also the fallback when storage is unreadable.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            day_name: day_name(date),
            month_name: month_name(date),
            reels_watched: 0,
            ads_skipped: 0,
            time_saved_secs: 0,
            total_scrolls: 0,
            auto_scrolled: 0,
            instagram_watched: 0,
            instagram_ads_skipped: 0,
            youtube_watched: 0,
            youtube_ads_skipped: 0,
            linkedin_watched: 0,
            linkedin_ads_skipped: 0,
            snapchat_watched: 0,
            snapchat_ads_skipped: 0,
            snapchat_auto_scrolled: 0,
            snapchat_time_spent_secs: 0,
        }
    }

    pub fn watched(&self, platform: Platform) -> u64 {
        match platform {
            Platform::Instagram => self.instagram_watched,
            Platform::YouTube => self.youtube_watched,
            Platform::LinkedIn => self.linkedin_watched,
            Platform::Snapchat => self.snapchat_watched,
        }
    }

    pub fn ads_skipped_for(&self, platform: Platform) -> u64 {
        match platform {
            Platform::Instagram => self.instagram_ads_skipped,
            Platform::YouTube => self.youtube_ads_skipped,
            Platform::LinkedIn => self.linkedin_ads_skipped,
            Platform::Snapchat => self.snapchat_ads_skipped,
        }
    }
}

/// Totals across every stored day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllTimeStats {
    pub total_reels: u64,
    pub total_ads_skipped: u64,
    pub total_time_saved_secs: u64,
    pub total_snapchat_stories: u64,
    pub total_snapchat_time_secs: u64,
}

/// English weekday name, e.g. "Monday".
pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// English month name, e.g. "October".
pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_names() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();
        let record = DailyStats::empty(date);
        assert_eq!(record.day_name, "Monday");
        assert_eq!(record.month_name, "October");
        assert_eq!(record.watched(Platform::Snapchat), 0);
    }
}
