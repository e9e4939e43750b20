//! Well-known keys shared with the ingestion side.

use chrono::Utc;

/// Raw killmail payloads waiting to be matched.
pub const PROCESSING_QUEUE: &str = "zrule::killmail::processing";

/// Encoded dispatchables waiting to be sent.
pub const MATCHED_QUEUE: &str = "zrule::killmail::matched";

pub const STOP_FLAG: &str = "zrule::queue::stop";
pub const RESTART_TRACKER_FLAG: &str = "zrule::tracker::restart";

/// Insertion score: current time in nanoseconds.
pub fn now_score() -> f64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default() as f64
}
