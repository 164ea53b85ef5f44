//! # Wattbind Core Library
//!
//! Core business logic for the Wattbind dormitory electricity bot. The
//! CLI binary is a thin command surface over this library; a chat
//! adapter can sit on the same seams.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite-backed reading history and binding/schedule
//!   tables, TOML-based configuration
//! - **Prediction**: recharge-boundary segmentation plus least-squares
//!   trend fitting over the latest discharge segment
//! - **Scheduler**: one independent daily job per binding, keyed by the
//!   binding's surrogate id
//! - **Upstream**: form-POST client for the campus balance API
//! - **Notify**: messaging dispatch behind the [`Messenger`] trait
//!
//! ## Key Components
//!
//! - [`HistoryDb`]: append-only per-room reading log with dedup
//! - [`predict_depletion`]: series -> latest segment -> zero crossing
//! - [`RateLimiter`]: per-identity sliding-window query throttle
//! - [`NotificationScheduler`]: daily query-and-notify jobs

pub mod error;
pub mod identity;
pub mod notify;
pub mod prediction;
pub mod query;
pub mod rate_limit;
pub mod scheduler;
pub mod storage;
pub mod upstream;

pub use error::{ConfigError, CoreError, StorageError, UpstreamError, ValidationError};
pub use identity::ChatIdentity;
pub use notify::{HttpMessenger, Messenger};
pub use prediction::{
    fit, predict_depletion, segment, segment_consumption, PredictionResult, Segment,
    SegmentConsumption,
};
pub use query::{query_room, RoomStatus};
pub use rate_limit::RateLimiter;
pub use scheduler::{format_notification, parse_hhmm, run_scheduled_query, NotificationScheduler};
pub use storage::{
    Binding, BindingDb, Config, HistoryDb, MessengerConfig, RateLimitConfig, Reading, RoomKey,
    ScheduleEntry, UpstreamConfig,
};
pub use upstream::{Building, CampusApi};
