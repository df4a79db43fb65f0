/*!
Helper crate that declares the wire protocol shared between [stranger-chat](../stranger_chat/index.html)
clients and [stranger-chat-signaling-server](../stranger_chat_signaling_server/index.html).

Every frame is a JSON object of the form
`{ "type": <kind>, "data"?: <payload>, "recipientSessionId"?: string, "senderSessionId"?: string }`.
[`codec::encode`] and [`codec::decode`] convert between that form and [`SignalMessage`],
rejecting frames whose payload does not fit their kind.
*/

#![warn(missing_docs)]

pub mod codec;
mod common;
mod message;

pub use codec::{decode, encode, CodecError};
pub use common::{IceCandidate, SdpType, SessionDescription, SessionId};
pub use message::{MessageKind, Signal, SignalMessage};
