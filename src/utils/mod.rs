pub mod logging;

pub use logging::debug_dumps_enabled;
