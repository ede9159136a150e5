pub mod daily_stats;

pub use daily_stats::{AllTimeStats, DailyStats};
