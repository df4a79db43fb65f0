/*!
This crate pairs anonymous strangers for one-to-one `WebRTC` audio and video calls,
with a text side-channel and a sensitive content cutoff.

# Overview

A [`Client`] talks to an instance of the
[accompanying rendezvous server](https://docs.rs/stranger-chat-signaling-server) over a
[`SignalingChannel`]. Calling [`Client::start`] announces that the client is looking
for someone, the server relays that to another waiting client, the two exchange
session descriptions and candidates, and media then flows directly between them.

The state machine is independent of the browser. Media capture and the peer
connection sit behind [`MediaEngine`] and [`PeerTransport`], which the `web`
module implements with `getUserMedia` and `RTCPeerConnection` when compiled to
`wasm32`, and which tests replace with in-memory fakes.

Either side can end the call at any time, with [`Client::disconnect`], by closing
the page, or because a classifier flagged the local video, see
[`Client::review_predictions`]. With [`ClientConfig::auto_reconnect`] set,
the client looks for the next stranger as soon as the previous one is gone.
*/

#![allow(
    clippy::module_name_repetitions,
    clippy::future_not_send, // false positive in WASM (single threaded) context
)]
// clippy WARN level lints
#![warn(
    // missing_docs,
    clippy::cargo,
    clippy::pedantic,
    // clippy::nursery,
    clippy::dbg_macro,
    clippy::unwrap_used,
    clippy::integer_division,
    clippy::large_include_file,
    clippy::map_err_ignore,
    // clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::todo,
    clippy::undocumented_unsafe_blocks,
    clippy::unimplemented,
    clippy::unreachable
)]
// clippy WARN level lints, that can be upgraded to DENY if preferred
#![warn(
    clippy::float_cmp_const,
    clippy::as_conversions,
    clippy::assertions_on_result_states,
    clippy::clone_on_ref_ptr,
    clippy::empty_drop,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::indexing_slicing,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::string_slice,
    clippy::try_err
)]
// clippy DENY level lints, they always have a quick fix that should be preferred
#![deny(
    clippy::wildcard_imports,
    clippy::multiple_inherent_impl,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_name_method,
    clippy::self_named_module_files,
    clippy::shadow_unrelated,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::unnecessary_self_imports,
    clippy::unneeded_field_pattern,
    clippy::verbose_file_reads
)]

mod channel;
pub mod constants;
mod error;
pub mod one_to_one;
mod peer_session;
mod policy;
mod transport;
mod utils;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use channel::{MessageHandler, SignalingChannel};
pub use error::{Error, Result};
pub use one_to_one::{Client, ClientEvent, ConnectionState, TextMessage, Warning};
pub use peer_session::PeerSession;
pub use policy::{is_sensitive, sensitive_score, ClientConfig, ConnectionType, Prediction};
pub use stranger_chat_protocol::{
    IceCandidate, SdpType, SessionDescription, SessionId, Signal, SignalMessage,
};
pub use transport::{LocalCandidateCallback, MediaEngine, PeerTransport, RemoteStreamCallback};
