use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, to_i64, to_u64},
    models::{
        daily_stats::{day_name, month_name},
        AllTimeStats, DailyStats,
    },
};
use crate::platform::Platform;
use crate::stats::{AggregateDelta, PlatformDelta, StatsStore};

const SELECT_COLUMNS: &str = "date, day_name, month_name, reels_watched, ads_skipped,
    time_saved_secs, total_scrolls, auto_scrolled,
    instagram_watched, instagram_ads_skipped, youtube_watched, youtube_ads_skipped,
    linkedin_watched, linkedin_ads_skipped, snapchat_watched, snapchat_ads_skipped,
    snapchat_auto_scrolled, snapchat_time_spent_secs";

fn counter(row: &Row, field: &str) -> Result<u64> {
    let value: i64 = row.get(field)?;
    to_u64(value, field)
}

fn row_to_daily_stats(row: &Row) -> Result<DailyStats> {
    let date: String = row.get("date")?;

    Ok(DailyStats {
        date: parse_date(&date, "date")?,
        day_name: row.get("day_name")?,
        month_name: row.get("month_name")?,
        reels_watched: counter(row, "reels_watched")?,
        ads_skipped: counter(row, "ads_skipped")?,
        time_saved_secs: counter(row, "time_saved_secs")?,
        total_scrolls: counter(row, "total_scrolls")?,
        auto_scrolled: counter(row, "auto_scrolled")?,
        instagram_watched: counter(row, "instagram_watched")?,
        instagram_ads_skipped: counter(row, "instagram_ads_skipped")?,
        youtube_watched: counter(row, "youtube_watched")?,
        youtube_ads_skipped: counter(row, "youtube_ads_skipped")?,
        linkedin_watched: counter(row, "linkedin_watched")?,
        linkedin_ads_skipped: counter(row, "linkedin_ads_skipped")?,
        snapchat_watched: counter(row, "snapchat_watched")?,
        snapchat_ads_skipped: counter(row, "snapchat_ads_skipped")?,
        snapchat_auto_scrolled: counter(row, "snapchat_auto_scrolled")?,
        snapchat_time_spent_secs: counter(row, "snapchat_time_spent_secs")?,
    })
}

/// `(watched, ads_skipped)` column names for a platform.
fn platform_columns(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::Instagram => ("instagram_watched", "instagram_ads_skipped"),
        Platform::YouTube => ("youtube_watched", "youtube_ads_skipped"),
        Platform::LinkedIn => ("linkedin_watched", "linkedin_ads_skipped"),
        Platform::Snapchat => ("snapchat_watched", "snapchat_ads_skipped"),
    }
}

fn insert_if_absent(conn: &Connection, date: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO daily_stats (date, day_name, month_name)
         VALUES (?1, ?2, ?3)",
        params![format_date(date), day_name(date), month_name(date)],
    )
    .context("failed to insert daily stats record")?;
    Ok(())
}

fn select_record(conn: &Connection, date: NaiveDate) -> Result<Option<DailyStats>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM daily_stats WHERE date = ?1"
    ))?;
    let raw = stmt
        .query_row(params![format_date(date)], |row| Ok(row_to_daily_stats(row)))
        .optional()?;
    raw.transpose()
}

fn collect_records(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<DailyStats>> {
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(row_to_daily_stats(row)?);
    }
    Ok(records)
}

impl Database {
    pub async fn ensure_daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        self.execute(move |conn| {
            insert_if_absent(conn, date)?;
            select_record(conn, date)?
                .with_context(|| format!("daily stats for {date} missing after insert"))
        })
        .await
    }

    pub async fn increment_platform_stats_for(
        &self,
        date: NaiveDate,
        platform: Platform,
        delta: PlatformDelta,
    ) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            insert_if_absent(&tx, date)?;

            let (watched_col, ads_col) = platform_columns(platform);
            tx.execute(
                &format!(
                    "UPDATE daily_stats
                     SET {watched_col} = {watched_col} + ?1,
                         {ads_col} = {ads_col} + ?2
                     WHERE date = ?3"
                ),
                params![
                    to_i64(delta.watched)?,
                    to_i64(delta.ads_skipped)?,
                    format_date(date),
                ],
            )
            .with_context(|| format!("failed to increment {platform} stats"))?;

            if platform == Platform::Snapchat {
                tx.execute(
                    "UPDATE daily_stats
                     SET snapchat_auto_scrolled = snapchat_auto_scrolled + ?1,
                         snapchat_time_spent_secs = snapchat_time_spent_secs + ?2
                     WHERE date = ?3",
                    params![
                        to_i64(delta.auto_scrolled)?,
                        to_i64(delta.time_spent_secs)?,
                        format_date(date),
                    ],
                )
                .context("failed to increment snapchat time spent")?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn increment_aggregate_stats(
        &self,
        date: NaiveDate,
        delta: AggregateDelta,
    ) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            insert_if_absent(&tx, date)?;
            tx.execute(
                "UPDATE daily_stats
                 SET reels_watched = reels_watched + ?1,
                     total_scrolls = total_scrolls + ?1,
                     ads_skipped = ads_skipped + ?2,
                     time_saved_secs = time_saved_secs + ?3,
                     auto_scrolled = auto_scrolled + ?4
                 WHERE date = ?5",
                params![
                    to_i64(delta.watched)?,
                    to_i64(delta.ads_skipped)?,
                    to_i64(delta.time_saved_secs)?,
                    to_i64(delta.auto_scrolled)?,
                    format_date(date),
                ],
            )
            .context("failed to increment aggregate stats")?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>> {
        self.execute(move |conn| select_record(conn, date)).await
    }

    pub async fn list_daily_stats(&self) -> Result<Vec<DailyStats>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM daily_stats ORDER BY date DESC"
            ))?;
            let mut rows = stmt.query([])?;
            collect_records(&mut rows)
        })
        .await
    }

    pub async fn list_daily_stats_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM daily_stats
                 WHERE date BETWEEN ?1 AND ?2
                 ORDER BY date DESC"
            ))?;
            let mut rows = stmt.query(params![format_date(from), format_date(to)])?;
            collect_records(&mut rows)
        })
        .await
    }

    pub async fn get_all_time_stats(&self) -> Result<AllTimeStats> {
        self.execute(|conn| {
            let totals = conn.query_row(
                "SELECT COALESCE(SUM(reels_watched), 0),
                        COALESCE(SUM(ads_skipped), 0),
                        COALESCE(SUM(time_saved_secs), 0),
                        COALESCE(SUM(snapchat_watched), 0),
                        COALESCE(SUM(snapchat_time_spent_secs), 0)
                 FROM daily_stats",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )?;

            Ok(AllTimeStats {
                total_reels: to_u64(totals.0, "total_reels")?,
                total_ads_skipped: to_u64(totals.1, "total_ads_skipped")?,
                total_time_saved_secs: to_u64(totals.2, "total_time_saved_secs")?,
                total_snapchat_stories: to_u64(totals.3, "total_snapchat_stories")?,
                total_snapchat_time_secs: to_u64(totals.4, "total_snapchat_time_secs")?,
            })
        })
        .await
    }
}

#[async_trait]
impl StatsStore for Database {
    async fn ensure_record(&self, date: NaiveDate) -> Result<DailyStats> {
        self.ensure_daily_stats(date).await
    }

    async fn increment_platform_stats(
        &self,
        date: NaiveDate,
        platform: Platform,
        delta: PlatformDelta,
    ) -> Result<()> {
        self.increment_platform_stats_for(date, platform, delta).await
    }

    async fn increment_aggregate(&self, date: NaiveDate, delta: AggregateDelta) -> Result<()> {
        self.increment_aggregate_stats(date, delta).await
    }

    async fn get_record(&self, date: NaiveDate) -> Result<Option<DailyStats>> {
        self.get_daily_stats(date).await
    }

    async fn list_records(&self) -> Result<Vec<DailyStats>> {
        self.list_daily_stats().await
    }

    async fn list_records_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>> {
        self.list_daily_stats_between(from, to).await
    }

    async fn all_time_totals(&self) -> Result<AllTimeStats> {
        self.get_all_time_stats().await
    }
}
