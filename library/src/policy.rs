use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLASSIFICATION_INTERVAL, DEFAULT_SENSITIVE_THRESHOLD, DEFAULT_SIGNALING_SERVER_URL,
    SENSITIVE_LABELS, STUN_SERVER,
};

/// Specifies what kind of peer connection to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionType {
    /// Within local network
    Local,
    /// Setup with STUN server, WAN capabilities but can fail
    Stun { urls: String },
}

impl Default for ConnectionType {
    fn default() -> Self {
        Self::Stun {
            urls: STUN_SERVER.to_owned(),
        }
    }
}

/// Knobs of a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Address of the rendezvous server's WebSocket endpoint.
    pub signaling_server_url: String,
    pub connection_type: ConnectionType,
    /// Look for a new stranger after the current one leaves or is cut off.
    /// Can be toggled at runtime with [`Client::set_auto_reconnect`](crate::Client::set_auto_reconnect).
    pub auto_reconnect: bool,
    /// Frames scoring strictly above this are cut off.
    pub sensitive_threshold: f32,
    /// How often the local frame is classified while connected.
    pub classification_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_server_url: DEFAULT_SIGNALING_SERVER_URL.to_owned(),
            connection_type: ConnectionType::default(),
            auto_reconnect: false,
            sensitive_threshold: DEFAULT_SENSITIVE_THRESHOLD,
            classification_interval: DEFAULT_CLASSIFICATION_INTERVAL,
        }
    }
}

/// One label of a classifier result, shaped like `nsfwjs` predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    pub probability: f32,
}

impl Prediction {
    #[must_use]
    pub fn new(class_name: impl Into<String>, probability: f32) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// Highest probability among the sensitive labels, `0.0` when none is present.
#[must_use]
pub fn sensitive_score(predictions: &[Prediction]) -> f32 {
    predictions
        .iter()
        .filter(|prediction| SENSITIVE_LABELS.contains(&prediction.class_name.as_str()))
        .map(|prediction| prediction.probability)
        .fold(0.0, f32::max)
}

#[must_use]
pub fn is_sensitive(predictions: &[Prediction], threshold: f32) -> bool {
    sensitive_score(predictions) > threshold
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_sensitive_labels_count() {
        let predictions = [
            Prediction::new("Neutral", 0.9),
            Prediction::new("Drawing", 0.95),
            Prediction::new("Sexy", 0.2),
        ];
        assert!((sensitive_score(&predictions) - 0.2).abs() < f32::EPSILON);
        assert!(!is_sensitive(&predictions, DEFAULT_SENSITIVE_THRESHOLD));
    }

    #[test]
    fn porn_above_threshold_is_sensitive() {
        let predictions = [Prediction::new("Neutral", 0.2), Prediction::new("Porn", 0.75)];
        assert!(is_sensitive(&predictions, DEFAULT_SENSITIVE_THRESHOLD));
    }

    #[test]
    fn threshold_is_exclusive() {
        let predictions = [Prediction::new("Sexy", DEFAULT_SENSITIVE_THRESHOLD)];
        assert!(!is_sensitive(&predictions, DEFAULT_SENSITIVE_THRESHOLD));
    }

    #[test]
    fn no_predictions_score_zero() {
        assert!(sensitive_score(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn predictions_read_classifier_json() {
        let predictions: Vec<Prediction> =
            serde_json::from_str(r#"[{"className":"Porn","probability":0.75}]"#).unwrap();
        assert_eq!(predictions, vec![Prediction::new("Porn", 0.75)]);
    }
}
