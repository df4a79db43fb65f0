/*!
Seams towards the media stack.

The signaling state machine never touches audio, video or network traversal
itself. It drives these two traits, which the `web` module implements on top of
`RTCPeerConnection` and `getUserMedia` and which tests replace with in-memory
fakes.
*/

use stranger_chat_protocol::{IceCandidate, SessionDescription};

/// Called for every local candidate, `None` once gathering is complete.
pub type LocalCandidateCallback = Box<dyn FnMut(Option<IceCandidate>)>;

/// Called when a remote media track becomes active.
pub type RemoteStreamCallback<S> = Box<dyn FnMut(S)>;

/// Opaque point-to-point media transport for exactly one remote party.
#[allow(async_fn_in_trait)]
pub trait PeerTransport {
    /// Handle to a bundle of audio and video tracks.
    type Stream;

    /// Bind locally captured tracks for outbound transport.
    ///
    /// # Errors
    /// [`Error::Negotiation`](crate::Error::Negotiation) if the tracks cannot be added.
    fn attach_local_media(&self, stream: &Self::Stream) -> crate::Result<()>;

    /// Produce an offer and install it as the local description.
    ///
    /// # Errors
    /// [`Error::Negotiation`](crate::Error::Negotiation) in an invalid transport state.
    async fn create_offer(&self) -> crate::Result<SessionDescription>;

    /// Produce an answer and install it as the local description.
    ///
    /// # Errors
    /// [`Error::Negotiation`](crate::Error::Negotiation) when no remote offer was applied yet.
    async fn create_answer(&self) -> crate::Result<SessionDescription>;

    /// # Errors
    /// [`Error::Negotiation`](crate::Error::Negotiation) on malformed or incompatible descriptions.
    async fn apply_remote_description(&self, description: &SessionDescription)
        -> crate::Result<()>;

    /// Accepts candidates before or after the remote description.
    ///
    /// # Errors
    /// Only when the underlying engine rejects the candidate outright.
    async fn add_remote_candidate(&self, candidate: Option<&IceCandidate>) -> crate::Result<()>;

    /// Register the callback fired for each locally discovered candidate.
    fn on_local_candidate(&self, callback: LocalCandidateCallback);

    /// Release all underlying resources.
    fn close(&self);
}

/// Factory for transports plus local media acquisition.
#[allow(async_fn_in_trait)]
pub trait MediaEngine {
    /// Handle to captured or received media.
    type Stream: Clone + 'static;
    /// Transport created per session.
    type Transport: PeerTransport<Stream = Self::Stream> + 'static;

    /// Capture local audio and video.
    ///
    /// # Errors
    /// [`Error::MediaAccess`](crate::Error::MediaAccess) when capture is denied or unavailable.
    async fn acquire_local_media(&self) -> crate::Result<Self::Stream>;

    /// Stop capturing, turning the camera and microphone off.
    fn stop_local_media(&self, stream: &Self::Stream);

    /// Instantiate a fresh transport whose remote tracks are handed to `on_remote_stream`.
    ///
    /// # Errors
    /// [`Error::Negotiation`](crate::Error::Negotiation) if the engine refuses to create one.
    fn create_transport(
        &self,
        on_remote_stream: RemoteStreamCallback<Self::Stream>,
    ) -> crate::Result<Self::Transport>;
}
