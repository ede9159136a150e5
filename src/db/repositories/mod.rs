pub mod daily_stats;
