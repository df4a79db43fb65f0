use std::time::Duration;

pub const STUN_SERVER: &str = "stun:stun.l.google.com:19302";

pub const DEFAULT_SIGNALING_SERVER_URL: &str = "ws://127.0.0.1:9001/ws";

/// Probability above which a local frame counts as sensitive.
pub const DEFAULT_SENSITIVE_THRESHOLD: f32 = 0.6;

/// Classifier labels whose probability is compared against the threshold.
pub const SENSITIVE_LABELS: [&str; 2] = ["Porn", "Sexy"];

pub const DEFAULT_CLASSIFICATION_INTERVAL: Duration = Duration::from_secs(1);
