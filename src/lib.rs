// Library interface for readyrs
// The CLI and the integration tests go through these modules

pub mod baseline;
pub mod cache;
pub mod config;
pub mod correlation;
pub mod efficiency;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod notify;
pub mod plan;
pub mod readiness;
pub mod report;
pub mod scoring;
pub mod source;
pub mod stats;
pub mod store;
pub mod trends;
pub mod verdict;
pub mod weekly;

// Re-export commonly used types for convenience
pub use baseline::{Baseline, BaselineCalculator, BaselineConfig, BaselineSet, WeekBoundary};
pub use cache::CachedSource;
pub use config::AppConfig;
pub use efficiency::{EfficiencyAnalyzer, EfficiencyConfig, EfficiencyReport};
pub use error::{ConnectivityError, ReadyRsError, Result};
pub use history::RideLoad;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use notify::{LogSink, NotificationSink, TelegramSink};
pub use plan::{SessionReview, WeekPlan};
pub use readiness::{Digest, EngineConfig, Horizons, ReadinessEngine, ReadinessResult, ReadinessService};
pub use scoring::{ScoreCard, ScoringPolicy, ScoringStrategy};
pub use source::{FileSource, IntervalsClient, WellnessSource};
pub use store::WellnessStore;
pub use trends::{Alert, Severity, TrendDetector};
pub use verdict::{Verdict, VerdictThresholds};
