/*!
JSON encoding of [`SignalMessage`].

```text
{ "type": <kind>, "data"?: <payload>, "recipientSessionId"?: string, "senderSessionId"?: string }
```
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{MessageKind, Signal, SignalMessage};
use crate::SessionId;

/// Reasons a frame could not be turned into a [`SignalMessage`] or back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Not JSON, not an object, or an unknown `type`.
    #[error("malformed signaling frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The kind requires a `data` field that is absent.
    #[error("`{0}` message is missing its data")]
    MissingData(MessageKind),
    /// `data` is present but has the wrong shape for the kind.
    #[error("`{kind}` message carries invalid data: {source}")]
    InvalidData {
        /// Kind of the offending message.
        kind: MessageKind,
        /// Underlying deserialization failure.
        source: serde_json::Error,
    },
}

/// Envelope exactly as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Frame {
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient_session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender_session_id: Option<SessionId>,
}

/// Serialize a message into a text frame.
///
/// # Errors
/// Fails only if a payload cannot be represented as JSON.
pub fn encode(message: &SignalMessage) -> Result<String, CodecError> {
    let data = match message.signal {
        Signal::Start
        | Signal::Found
        | Signal::Disconnect
        | Signal::Sensitive => None,
        // end-of-candidates travels as an explicit `null`
        Signal::Candidate(ref candidate) => Some(serde_json::to_value(candidate)?),
        Signal::Offer(ref description) | Signal::Answer(ref description) => {
            Some(serde_json::to_value(description)?)
        }
        Signal::Text(ref text) => Some(Value::String(text.clone())),
    };
    let frame = Frame {
        kind: message.kind(),
        data,
        recipient_session_id: message.recipient_session_id.clone(),
        sender_session_id: message.sender_session_id.clone(),
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Parse a text frame, checking that the payload matches the kind.
///
/// # Errors
/// Unknown kinds, invalid JSON and missing or mistyped `data` are rejected.
pub fn decode(frame: &str) -> Result<SignalMessage, CodecError> {
    let Frame {
        kind,
        data,
        recipient_session_id,
        sender_session_id,
    } = serde_json::from_str(frame)?;

    let signal = match kind {
        MessageKind::Start => Signal::Start,
        MessageKind::Found => Signal::Found,
        MessageKind::Disconnect => Signal::Disconnect,
        MessageKind::Sensitive => Signal::Sensitive,
        // `null` and a missing field both mean end-of-candidates
        MessageKind::Candidate => Signal::Candidate(match data {
            Some(value) => payload(kind, value)?,
            None => None,
        }),
        MessageKind::Offer => Signal::Offer(payload(kind, required(kind, data)?)?),
        MessageKind::Answer => Signal::Answer(payload(kind, required(kind, data)?)?),
        MessageKind::Text => Signal::Text(payload(kind, required(kind, data)?)?),
    };

    Ok(SignalMessage {
        signal,
        recipient_session_id,
        sender_session_id,
    })
}

fn required(kind: MessageKind, data: Option<Value>) -> Result<Value, CodecError> {
    data.ok_or(CodecError::MissingData(kind))
}

fn payload<T: for<'de> Deserialize<'de>>(kind: MessageKind, value: Value) -> Result<T, CodecError> {
    serde_json::from_value(value).map_err(|source| CodecError::InvalidData { kind, source })
}
