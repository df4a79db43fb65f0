use stranger_chat_protocol::CodecError;

/// Everything that can go wrong while pairing with a stranger.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local camera or microphone is denied or unavailable.
    #[error("local media unavailable: {0}")]
    MediaAccess(String),
    /// Session description could not be produced or applied.
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    /// Signaling channel is closed or unreachable.
    #[error("signaling channel error: {0}")]
    Channel(String),
    /// A browser API is missing or threw.
    #[error("browser API failure: {0}")]
    Browser(String),
    /// Frame could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Operation needs a stranger on the other end.
    #[error("not paired with anyone")]
    NotPaired,
    /// Peer session was closed while the operation was pending.
    #[error("peer session is already closed")]
    SessionClosed,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
