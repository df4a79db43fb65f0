use log::{debug, error, info, warn};
use stranger_chat_protocol::{IceCandidate, SessionDescription, SessionId, Signal, SignalMessage};

use crate::channel::SignalingChannel;
use crate::one_to_one::{
    Client, ClientEvent, Phase, SessionView, Subscription, Teardown, TextMessage, Warning,
};
use crate::transport::{MediaEngine, PeerTransport};
use crate::Error;

type View<E> = SessionView<<E as MediaEngine>::Transport>;

/// One step of pairing and negotiation, driven by a message relayed from the
/// stranger through the rendezvous server.
///
/// Messages that do not fit the session's current phase, or come from anyone
/// but the paired stranger, are dropped.
pub(super) async fn handle_signal_message<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
    message: SignalMessage,
) where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    let kind = message.kind();
    let Some(view) = client.view(subscription) else {
        debug!("session ended, dropping `{}` message", kind);
        return;
    };
    let SignalMessage {
        signal,
        sender_session_id,
        ..
    } = message;
    let Some(sender) = sender_session_id else {
        warn!("`{}` message without a sender, dropping it", kind);
        return;
    };

    match signal {
        Signal::Start => on_start(client, subscription, &view, sender),
        Signal::Found => on_found(client, subscription, &view, sender).await,
        Signal::Offer(offer) => on_offer(client, subscription, &view, sender, &offer).await,
        Signal::Answer(answer) => on_answer(client, subscription, &view, &sender, &answer).await,
        Signal::Candidate(candidate) => on_candidate(&view, &sender, candidate.as_ref()).await,
        Signal::Disconnect if is_paired_with(&view, &sender) => {
            info!("stranger {} disconnected", sender);
            client.end_session(Teardown::Remote);
            client.rearm(Teardown::Remote).await;
        }
        Signal::Sensitive if is_paired_with(&view, &sender) => {
            warn!("stranger {} was cut off for sensitive content", sender);
            client.emit(ClientEvent::Warning(Warning::StrangerSharedSensitiveContent));
        }
        Signal::Text(text) if is_paired_with(&view, &sender) => {
            let line = TextMessage::remote(text);
            client.shared.state.borrow_mut().messages.push(line.clone());
            client.emit(ClientEvent::Message(line));
        }
        Signal::Disconnect | Signal::Sensitive | Signal::Text(_) => {
            debug!("`{}` message from {} who is not our stranger", kind, sender);
        }
    }
}

fn is_paired_with<T: PeerTransport>(
    view: &SessionView<T>,
    sender: &SessionId,
) -> bool {
    view.remote.as_ref() == Some(sender)
}

/// Someone else is looking, tell them we are here and wait for their offer.
fn on_start<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
    view: &View<E>,
    sender: SessionId,
) where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    if view.phase != Phase::Waiting {
        debug!("already paired, ignoring start from {}", sender);
        return;
    }
    info!("stranger {} is looking, answering with found", sender);
    if client.commit(subscription, Phase::Found, &sender) {
        client.send(SignalMessage::to(sender, Signal::Found));
    }
}

/// Our `start` was picked up, we make the offer.
async fn on_found<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
    view: &View<E>,
    sender: SessionId,
) where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    if view.phase != Phase::Waiting {
        debug!("already paired, ignoring found from {}", sender);
        return;
    }
    info!("paired with {}, creating offer", sender);
    if !client.commit(subscription, Phase::Offering, &sender) {
        return;
    }
    match view.peer.create_offer().await {
        Ok(offer) if client.is_current(subscription) => {
            client.send(SignalMessage::to(sender, Signal::Offer(offer)));
            debug!("sent an offer successfully");
        }
        Ok(_) => debug!("session ended while creating the offer"),
        Err(err) => fail(client, subscription, &err),
    }
}

async fn on_offer<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
    view: &View<E>,
    sender: SessionId,
    offer: &SessionDescription,
) where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    let expected = match view.phase {
        Phase::Waiting => true,
        Phase::Found => is_paired_with(view, &sender),
        Phase::Offering | Phase::Answering | Phase::Connected => false,
    };
    if !expected {
        debug!("unexpected offer from {} in {:?}, dropping it", sender, view.phase);
        return;
    }
    if !client.commit(subscription, Phase::Answering, &sender) {
        return;
    }

    let answer = match view.peer.apply_remote_description(offer).await {
        Ok(()) => view.peer.create_answer().await,
        Err(err) => Err(err),
    };
    match answer {
        Ok(answer) if client.is_current(subscription) => {
            client.send(SignalMessage::to(sender.clone(), Signal::Answer(answer)));
            if client.commit(subscription, Phase::Connected, &sender) {
                info!("answered {}, connected", sender);
            }
        }
        Ok(_) => debug!("session ended while answering"),
        Err(err) => fail(client, subscription, &err),
    }
}

async fn on_answer<C, E>(
    client: &Client<C, E>,
    subscription: Subscription,
    view: &View<E>,
    sender: &SessionId,
    answer: &SessionDescription,
) where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    if view.phase != Phase::Offering || !is_paired_with(view, sender) {
        debug!("unexpected answer from {} in {:?}, dropping it", sender, view.phase);
        return;
    }
    match view.peer.apply_remote_description(answer).await {
        Ok(()) => {
            if client.commit(subscription, Phase::Connected, sender) {
                info!("received answer from {}, connected", sender);
            }
        }
        Err(err) => fail(client, subscription, &err),
    }
}

async fn on_candidate<T: PeerTransport>(
    view: &SessionView<T>,
    sender: &SessionId,
    candidate: Option<&IceCandidate>,
) {
    if !is_paired_with(view, sender) {
        debug!("candidate from {} who is not our stranger", sender);
        return;
    }
    match view.peer.add_remote_candidate(candidate).await {
        Ok(()) => debug!("added remote candidate {:?}", candidate),
        Err(Error::SessionClosed) => debug!("session closed before the candidate was added"),
        Err(err) => warn!("failed to add remote candidate: {}", err),
    }
}

/// Negotiation broke down. Tear the session down but do not look for a new stranger.
fn fail<C, E>(client: &Client<C, E>, subscription: Subscription, err: &Error)
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    if let Error::SessionClosed = err {
        debug!("session closed during negotiation");
        return;
    }
    error!("negotiation failed: {}", err);
    if client.is_current(subscription) {
        client.end_session(Teardown::Failure);
    }
}
