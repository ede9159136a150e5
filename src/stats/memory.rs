use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AggregateDelta, AllTimeStats, DailyStats, PlatformDelta, StatsStore};
use crate::platform::Platform;

/// Volatile [`StatsStore`] for tests and runs without a database.
///
/// Reads and writes can be switched to fail, to exercise fallbacks.
#[derive(Default)]
pub struct MemoryStatsStore {
    records: Mutex<BTreeMap<NaiveDate, DailyStats>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.records().len()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<NaiveDate, DailyStats>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated stats read failure");
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated stats write failure");
        }
        Ok(())
    }

    fn update(&self, date: NaiveDate, apply: impl FnOnce(&mut DailyStats)) {
        let mut records = self.records();
        let record = records
            .entry(date)
            .or_insert_with(|| DailyStats::empty(date));
        apply(record);
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn ensure_record(&self, date: NaiveDate) -> Result<DailyStats> {
        self.check_writes()?;
        let mut records = self.records();
        Ok(records
            .entry(date)
            .or_insert_with(|| DailyStats::empty(date))
            .clone())
    }

    async fn increment_platform_stats(
        &self,
        date: NaiveDate,
        platform: Platform,
        delta: PlatformDelta,
    ) -> Result<()> {
        self.check_writes()?;
        self.update(date, |record| match platform {
            Platform::Instagram => {
                record.instagram_watched += delta.watched;
                record.instagram_ads_skipped += delta.ads_skipped;
            }
            Platform::YouTube => {
                record.youtube_watched += delta.watched;
                record.youtube_ads_skipped += delta.ads_skipped;
            }
            Platform::LinkedIn => {
                record.linkedin_watched += delta.watched;
                record.linkedin_ads_skipped += delta.ads_skipped;
            }
            Platform::Snapchat => {
                record.snapchat_watched += delta.watched;
                record.snapchat_ads_skipped += delta.ads_skipped;
                record.snapchat_auto_scrolled += delta.auto_scrolled;
                record.snapchat_time_spent_secs += delta.time_spent_secs;
            }
        });
        Ok(())
    }

    async fn increment_aggregate(&self, date: NaiveDate, delta: AggregateDelta) -> Result<()> {
        self.check_writes()?;
        self.update(date, |record| {
            record.reels_watched += delta.watched;
            record.total_scrolls += delta.watched;
            record.ads_skipped += delta.ads_skipped;
            record.time_saved_secs += delta.time_saved_secs;
            record.auto_scrolled += delta.auto_scrolled;
        });
        Ok(())
    }

    async fn get_record(&self, date: NaiveDate) -> Result<Option<DailyStats>> {
        self.check_reads()?;
        Ok(self.records().get(&date).cloned())
    }

    async fn list_records(&self) -> Result<Vec<DailyStats>> {
        self.check_reads()?;
        Ok(self.records().values().rev().cloned().collect())
    }

    async fn list_records_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>> {
        self.check_reads()?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .records()
            .range(from..=to)
            .rev()
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn all_time_totals(&self) -> Result<AllTimeStats> {
        self.check_reads()?;
        Ok(self
            .records()
            .values()
            .fold(AllTimeStats::default(), |mut totals, record| {
                totals.total_reels += record.reels_watched;
                totals.total_ads_skipped += record.ads_skipped;
                totals.total_time_saved_secs += record.time_saved_secs;
                totals.total_snapchat_stories += record.snapchat_watched;
                totals.total_snapchat_time_secs += record.snapchat_time_spent_secs;
                totals
            }))
    }
}
