//! Webpushr notifications: payloads, audiences and delivery.

pub mod audience;
pub mod client;
pub mod payload;
pub mod retry;

pub use audience::Audience;
pub use client::{DeliveryClient, DeliveryOutcome, Endpoint};
pub use payload::{send_gate, NotificationPayload};
pub use retry::{backoff_delay, RetryPolicy};

/// Why a file produced no delivery calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `send_now` / `send_notification` is present and false.
    OptedOut,
    /// Content files send only when explicitly asked to.
    NotOptedIn,
    /// Path is outside the watched directories.
    UnwatchedCategory,
    /// `audience: segment` without `segment_tag` or `segment`.
    MissingSegmentTag,
    /// `audience: specific` without any subscriber ids.
    NoSubscribers,
    UnknownAudience(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OptedOut => write!(f, "send flag is false"),
            SkipReason::NotOptedIn => write!(f, "send_notification/send_now not set"),
            SkipReason::UnwatchedCategory => write!(f, "not a notification, news or places file"),
            SkipReason::MissingSegmentTag => write!(f, "audience is segment but no segment_tag"),
            SkipReason::NoSubscribers => write!(f, "audience is specific but no subscribers"),
            SkipReason::UnknownAudience(a) => write!(f, "unknown audience '{}'", a),
        }
    }
}
