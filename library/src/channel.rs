use stranger_chat_protocol::SignalMessage;

/// Callback receiving every decoded inbound frame, in arrival order.
pub type MessageHandler = Box<dyn FnMut(SignalMessage)>;

/// Duplex message transport to the rendezvous server.
///
/// The channel is opened once per client and is expected to be connected
/// before the first [`Client::start`](crate::Client::start).
/// Reconnecting a dropped transport is the embedder's job.
pub trait SignalingChannel {
    /// Fire-and-forget send, there is no acknowledgement and no retry.
    ///
    /// # Errors
    /// [`Error::Channel`](crate::Error::Channel) when the transport is closed,
    /// [`Error::Codec`](crate::Error::Codec) if the frame cannot be encoded.
    fn send(&self, message: &SignalMessage) -> crate::Result<()>;

    /// Install the single inbound handler, replacing the previous one.
    fn on_message(&self, handler: MessageHandler);
}
