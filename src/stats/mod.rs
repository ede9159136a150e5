//! Usage statistics: the storage contract and the facade handlers talk to.

mod memory;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub use crate::db::models::{AllTimeStats, DailyStats};
use crate::platform::Platform;
use crate::{log_debug, log_error};
pub use memory::MemoryStatsStore;

const ENABLE_LOGS: bool = true;

/// Average length of a short video; what skipping one outright saves.
pub const AVERAGE_REEL_DURATION_SECS: u64 = 30;

/// Additive change to one platform's columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDelta {
    pub watched: u64,
    pub ads_skipped: u64,
    /// Only tracked for Snapchat.
    pub auto_scrolled: u64,
    /// Only tracked for Snapchat.
    pub time_spent_secs: u64,
}

/// Additive change to the cross-platform columns. `total_scrolls` grows with
/// `watched`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateDelta {
    pub watched: u64,
    pub ads_skipped: u64,
    pub time_saved_secs: u64,
    pub auto_scrolled: u64,
}

/// Narrow persistence contract for daily statistics.
///
/// Increments are applied by the store itself and create the date's record
/// when it is missing, so concurrent writers never lose updates.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Insert-if-absent; never resets an existing record.
    async fn ensure_record(&self, date: NaiveDate) -> Result<DailyStats>;

    async fn increment_platform_stats(
        &self,
        date: NaiveDate,
        platform: Platform,
        delta: PlatformDelta,
    ) -> Result<()>;

    async fn increment_aggregate(&self, date: NaiveDate, delta: AggregateDelta) -> Result<()>;

    async fn get_record(&self, date: NaiveDate) -> Result<Option<DailyStats>>;

    /// Every record, newest first.
    async fn list_records(&self) -> Result<Vec<DailyStats>>;

    /// Records with `from <= date <= to`, newest first.
    async fn list_records_between(&self, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<DailyStats>>;

    async fn all_time_totals(&self) -> Result<AllTimeStats>;
}

/// What a single successful scroll contributes to the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAttribution {
    pub ad_skipped: bool,
    /// Pacing interval in effect for the scroll.
    pub interval: Duration,
    /// Time spent on the item, when the platform tracks it.
    pub time_spent: Option<Duration>,
}

/// Seconds the user saved by not watching the item to the end.
pub fn time_saved_secs(ad_skipped: bool, interval: Duration) -> u64 {
    if ad_skipped {
        AVERAGE_REEL_DURATION_SECS
    } else {
        AVERAGE_REEL_DURATION_SECS.saturating_sub(interval.as_secs())
    }
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Facade over a [`StatsStore`] that derives "today" from the wall clock on
/// every call and turns storage failures into logged fallbacks.
#[derive(Clone)]
pub struct StatsRepository {
    store: Arc<dyn StatsStore>,
    clock: Clock,
}

impl StatsRepository {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self::with_clock(store, || Local::now().date_naive())
    }

    pub fn with_clock<C>(store: Arc<dyn StatsStore>, clock: C) -> Self
    where
        C: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        Self {
            store,
            clock: Arc::new(clock),
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Today's record, created if needed. Falls back to a zeroed record.
    pub async fn ensure_today_record(&self) -> DailyStats {
        let today = self.today();
        match self.store.ensure_record(today).await {
            Ok(record) => record,
            Err(err) => {
                log_error!("failed to ensure stats record for {today}: {err:#}");
                DailyStats::empty(today)
            }
        }
    }

    /// Today's record as stored, or a zeroed one when absent or unreadable.
    pub async fn today_record(&self) -> DailyStats {
        let today = self.today();
        match self.store.get_record(today).await {
            Ok(Some(record)) => record,
            Ok(None) => DailyStats::empty(today),
            Err(err) => {
                log_error!("failed to read stats for {today}: {err:#}");
                DailyStats::empty(today)
            }
        }
    }

    /// Attributes one scroll to today's record. Returns whether both the
    /// platform and aggregate increments were stored.
    pub async fn record_scroll(&self, platform: Platform, attribution: ScrollAttribution) -> bool {
        let today = self.today();
        let ads = u64::from(attribution.ad_skipped);
        let time_spent_secs = attribution
            .time_spent
            .map(|spent| spent.as_secs())
            .unwrap_or(0);

        let platform_delta = PlatformDelta {
            watched: 1,
            ads_skipped: ads,
            auto_scrolled: 1,
            time_spent_secs,
        };
        let aggregate_delta = AggregateDelta {
            watched: 1,
            ads_skipped: ads,
            time_saved_secs: time_saved_secs(attribution.ad_skipped, attribution.interval),
            auto_scrolled: 1,
        };

        let platform_ok = match self
            .store
            .increment_platform_stats(today, platform, platform_delta)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                log_error!("failed to record {platform} scroll: {err:#}");
                false
            }
        };

        let aggregate_ok = match self.store.increment_aggregate(today, aggregate_delta).await {
            Ok(()) => true,
            Err(err) => {
                log_error!("failed to record aggregate scroll: {err:#}");
                false
            }
        };

        log_debug!(
            "attributed {platform} scroll on {today} (ad_skipped={})",
            attribution.ad_skipped
        );
        platform_ok && aggregate_ok
    }

    pub async fn all_records(&self) -> Vec<DailyStats> {
        self.store.list_records().await.unwrap_or_else(|err| {
            log_error!("failed to list stats records: {err:#}");
            Vec::new()
        })
    }

    pub async fn records_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyStats> {
        self.store
            .list_records_between(from, to)
            .await
            .unwrap_or_else(|err| {
                log_error!("failed to list stats between {from} and {to}: {err:#}");
                Vec::new()
            })
    }

    pub async fn all_time(&self) -> AllTimeStats {
        self.store.all_time_totals().await.unwrap_or_else(|err| {
            log_error!("failed to compute all-time stats: {err:#}");
            AllTimeStats::default()
        })
    }
}
