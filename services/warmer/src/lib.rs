//! Cache warming and statistic computation.
//!
//! Expensive remote computations are independent, so they are warmed in
//! parallel across a bounded pool of tasks. Once warm, the final statistics
//! are pure cache reads plus local arithmetic.

pub mod config;
pub mod output;
pub mod plan;
pub mod warming;

pub use config::{open_store, CacheBackend, StoreConfig};
pub use output::{write_stat, StatMetadata};
pub use plan::WarmPlan;
pub use warming::{CacheWarmer, WarmResult, WarmSummary};
