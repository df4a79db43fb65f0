use std::rc::Rc;

use log::{debug, info};
use stranger_chat_protocol::{Signal, SignalMessage};

use crate::channel::SignalingChannel;
use crate::one_to_one::{Client, ClientEvent, Subscription};
use crate::transport::{LocalCandidateCallback, MediaEngine, RemoteStreamCallback};

/// Route messages from the signaling channel to the session behind `subscription`.
///
/// Replaces whatever handler was installed before.
pub(super) fn subscribe<C, E>(client: &Client<C, E>, subscription: Subscription)
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    let shared = Rc::downgrade(&client.shared);
    client.shared.channel.on_message(Box::new(move |message| {
        if let Some(current) = Client::upgrade(&shared) {
            current.dispatch(subscription, message);
        }
    }));
}

/// Detach the state machine from the signaling channel.
pub(super) fn revoke<C, E>(client: &Client<C, E>)
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    client.shared.channel.on_message(Box::new(|message| {
        debug!("no active session, dropping `{}` message", message.kind());
    }));
}

/// Forward locally gathered candidates to whoever the session is paired with.
pub(super) fn local_candidate_callback<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
) -> LocalCandidateCallback
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    let shared = Rc::downgrade(&client.shared);
    Box::new(move |candidate| {
        let Some(current) = Client::upgrade(&shared) else {
            return;
        };
        let Some(remote) = current.view(subscription).and_then(|view| view.remote) else {
            debug!("local candidate gathered with nobody paired, dropping it");
            return;
        };
        current.send(SignalMessage::to(remote, Signal::Candidate(candidate)));
    })
}

pub(super) fn remote_stream_callback<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
) -> RemoteStreamCallback<E::Stream>
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    let shared = Rc::downgrade(&client.shared);
    Box::new(move |stream| {
        let Some(current) = Client::upgrade(&shared) else {
            return;
        };
        if !current.is_current(subscription) {
            debug!("remote stream of an ended session, ignoring it");
            return;
        }
        info!("remote stream is active");
        current.emit(ClientEvent::RemoteStream(stream));
    })
}
