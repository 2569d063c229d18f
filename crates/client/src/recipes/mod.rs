//! Ready-made combinations of strategies and lifecycle hooks.

pub mod offline_fallback;
pub mod warm;

pub use offline_fallback::OfflineFallback;
pub use warm::{WarmReport, warm_strategy_cache};
