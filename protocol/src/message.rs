/*!
Signaling messages exchanged between clients through the rendezvous server.

Pairing happens in two phases, `start` then `found`, before any session
description is produced. The party that receives `found` creates the offer,
the party that receives `offer` creates the answer.
*/

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::common::{IceCandidate, SessionDescription};
use crate::SessionId;

/// Value of the `type` field of the wire envelope.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Client wants to be paired; relayed by the server to a waiting client.
    Start,
    /// Passive party confirms it is still available.
    Found,
    /// Network candidate, or end-of-candidates.
    Candidate,
    /// `SDP` offer.
    Offer,
    /// `SDP` answer.
    Answer,
    /// Tear down the call.
    Disconnect,
    /// Remote party was cut off for sharing sensitive content.
    Sensitive,
    /// Chat text.
    Text,
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::Start => "start",
            Self::Found => "found",
            Self::Candidate => "candidate",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Disconnect => "disconnect",
            Self::Sensitive => "sensitive",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// Message kind together with the payload that kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Request pairing. Never carries a recipient when sent by a client.
    Start,
    /// Availability confirmation sent back to the party whose `start` was relayed.
    Found,
    /// Proposed candidate of one party, `None` marks the end of gathering.
    Candidate(Option<IceCandidate>),
    /// Offer produced by the party that received `found`.
    Offer(SessionDescription),
    /// Answer produced by the party that received `offer`.
    Answer(SessionDescription),
    /// The sender left the call.
    Disconnect,
    /// The sender's classifier flagged the sender's own video.
    Sensitive,
    /// Chat line.
    Text(String),
}

impl Signal {
    /// Wire kind of this signal.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match *self {
            Self::Start => MessageKind::Start,
            Self::Found => MessageKind::Found,
            Self::Candidate(_) => MessageKind::Candidate,
            Self::Offer(_) => MessageKind::Offer,
            Self::Answer(_) => MessageKind::Answer,
            Self::Disconnect => MessageKind::Disconnect,
            Self::Sensitive => MessageKind::Sensitive,
            Self::Text(_) => MessageKind::Text,
        }
    }
}

/// Envelope that travels over the signaling channel.
///
/// `sender_session_id` is written by the rendezvous server when relaying,
/// whatever a client put there is overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    /// Kind and payload.
    pub signal: Signal,
    /// Addressee, absent only for the initial unpaired `start`.
    pub recipient_session_id: Option<SessionId>,
    /// Origin, filled in by the server on delivery.
    pub sender_session_id: Option<SessionId>,
}

impl SignalMessage {
    /// Unaddressed message, only meaningful for [`Signal::Start`].
    #[must_use]
    pub const fn new(signal: Signal) -> Self {
        Self {
            signal,
            recipient_session_id: None,
            sender_session_id: None,
        }
    }

    /// Message addressed to `recipient`.
    #[must_use]
    pub const fn to(recipient: SessionId, signal: Signal) -> Self {
        Self {
            signal,
            recipient_session_id: Some(recipient),
            sender_session_id: None,
        }
    }

    /// Copy of the message as delivered by the server on behalf of `sender`.
    #[must_use]
    pub fn relayed_from(mut self, sender: SessionId) -> Self {
        self.sender_session_id = Some(sender);
        self
    }

    /// Wire kind of the carried signal.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.signal.kind()
    }

    /// Origin of a relayed message.
    #[must_use]
    pub const fn sender(&self) -> Option<&SessionId> {
        self.sender_session_id.as_ref()
    }

    /// Addressee of the message.
    #[must_use]
    pub const fn recipient(&self) -> Option<&SessionId> {
        self.recipient_session_id.as_ref()
    }
}
