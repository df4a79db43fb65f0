/*!
Signaling state machine pairing the local client with one stranger.

# Protocol

```text
 A (offerer)              rendezvous               B (answerer, waiting)
   start ------------------->  relays A's start --------> record A
   record B  <--------------------------------------- found
   createOffer, offer ------------------------------>  apply, createAnswer
   apply  <------------------------------------------ answer    [Connected]
 [Connected]
```

Whichever party receives `found` makes the offer, whichever receives `offer`
answers. Candidates flow both ways as soon as a remote id is known.

# Example

```ignore
use stranger_chat::{Client, ClientConfig};

let client = Client::new(channel, engine, ClientConfig::default(), |event| {
    log::info!("client event: {:?}", event);
});
client.start().await?;
```
*/

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use stranger_chat_protocol::{SessionId, Signal, SignalMessage};

use crate::channel::SignalingChannel;
use crate::peer_session::PeerSession;
use crate::policy::{is_sensitive, ClientConfig, Prediction};
use crate::transport::{MediaEngine, PeerTransport};
use crate::utils::spawn_local;
use crate::Error;

mod callbacks;
mod signal_handler;

/// Connection state as seen by the user interface.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// One line of the conversation.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub from_remote: bool,
    pub text: String,
}

impl TextMessage {
    #[must_use]
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            from_remote: false,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            from_remote: true,
            text: text.into(),
        }
    }
}

/// Things the user should be told about.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Warning {
    /// Local video was flagged and the call was cut off.
    SensitiveContentDetected,
    /// The stranger's own classifier cut them off.
    StrangerSharedSensitiveContent,
    /// Camera or microphone could not be opened.
    MediaUnavailable,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<S> {
    StateChanged(ConnectionState),
    /// Locally captured media, for the self view.
    LocalStream(S),
    /// Stranger's media became active.
    RemoteStream(S),
    /// The session ended, the remote view should be cleared.
    RemoteStreamEnded,
    /// A line was appended to [`Client::messages`].
    Message(TextMessage),
    /// The conversation was reset.
    MessagesCleared,
    Warning(Warning),
}

/// Token tying callbacks and queued messages to the session that created them.
///
/// Only the token of the live session is honoured, everything carrying an older
/// one is dropped before it can touch state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Subscription(u64);

/// Negotiation progress within [`ConnectionState::Connecting`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    /// `start` sent, nobody paired yet.
    Waiting,
    /// Relayed `start` answered with `found`, awaiting the offer.
    Found,
    /// `found` received, offer produced or in flight, awaiting the answer.
    Offering,
    /// Offer received, answer in flight.
    Answering,
    Connected,
}

/// Why a session is being torn down.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Teardown {
    /// User pressed disconnect.
    Local,
    /// A new `start` replaces the session.
    Restart,
    /// Stranger announced `disconnect`.
    Remote,
    /// Local video was flagged.
    Cutoff,
    /// Session descriptions could not be exchanged.
    Failure,
    /// Page or process is going away.
    Unload,
}

impl Teardown {
    /// Whether the stranger has to be told with a `disconnect`.
    const fn notifies_remote(self) -> bool {
        !matches!(self, Self::Remote)
    }

    /// Whether auto-reconnect may kick in afterwards.
    const fn rearms(self) -> bool {
        matches!(self, Self::Remote | Self::Cutoff)
    }
}

struct Session<E: MediaEngine> {
    subscription: Subscription,
    phase: Phase,
    remote: Option<SessionId>,
    peer: Rc<PeerSession<E::Transport>>,
    /// Captured tracks, stopped when the session ends.
    local_stream: Option<E::Stream>,
}

struct State<E: MediaEngine> {
    session: Option<Session<E>>,
    messages: Vec<TextMessage>,
}

/// Snapshot of the live session handed to async steps, so no borrow is held across `.await`.
struct SessionView<T: PeerTransport> {
    phase: Phase,
    remote: Option<SessionId>,
    peer: Rc<PeerSession<T>>,
}

struct Shared<C, E: MediaEngine> {
    channel: C,
    engine: E,
    config: ClientConfig,
    auto_reconnect: Cell<bool>,
    on_event: Box<dyn Fn(ClientEvent<E::Stream>)>,
    state: RefCell<State<E>>,
    inbox: RefCell<VecDeque<(Subscription, SignalMessage)>>,
    draining: Cell<bool>,
    next_subscription: Cell<u64>,
}

/// Client side of a one-to-one call with a stranger.
///
/// At most one session is alive at a time and it exclusively owns its
/// [`PeerSession`]. Every transition happens in a single synchronous step;
/// async negotiation steps re-check their [`Subscription`] after each `.await`
/// and give up silently if the session they belong to is gone.
///
/// This is a pointer to the underlying resource and can be cloned freely.
pub struct Client<C, E: MediaEngine> {
    shared: Rc<Shared<C, E>>,
}

impl<C, E: MediaEngine> Clone for Client<C, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C, E> Client<C, E>
where
    C: SignalingChannel + 'static,
    E: MediaEngine + 'static,
{
    /// Creates a disconnected client. Nothing is sent until [`Client::start`].
    pub fn new(
        channel: C,
        engine: E,
        config: ClientConfig,
        on_event: impl Fn(ClientEvent<E::Stream>) + 'static,
    ) -> Self {
        let auto_reconnect = Cell::new(config.auto_reconnect);
        Self {
            shared: Rc::new(Shared {
                channel,
                engine,
                config,
                auto_reconnect,
                on_event: Box::new(on_event),
                state: RefCell::new(State {
                    session: None,
                    messages: Vec::new(),
                }),
                inbox: RefCell::new(VecDeque::new()),
                draining: Cell::new(false),
                next_subscription: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        match self.shared.state.borrow().session {
            None => ConnectionState::Disconnected,
            Some(Session {
                phase: Phase::Connected,
                ..
            }) => ConnectionState::Connected,
            Some(_) => ConnectionState::Connecting,
        }
    }

    /// Id of the stranger, `None` while unpaired.
    #[must_use]
    pub fn remote_session_id(&self) -> Option<SessionId> {
        self.shared
            .state
            .borrow()
            .session
            .as_ref()
            .and_then(|session| session.remote.clone())
    }

    /// Conversation with the current stranger, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<TextMessage> {
        self.shared.state.borrow().messages.clone()
    }

    #[must_use]
    pub fn auto_reconnect(&self) -> bool {
        self.shared.auto_reconnect.get()
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.shared.auto_reconnect.set(enabled);
    }

    /// Look for a stranger.
    ///
    /// A live session is torn down first, its peer session closed exactly once.
    /// The client is `Connecting` from the moment this is called.
    ///
    /// # Errors
    /// [`Error::MediaAccess`] when local capture fails, the client is then back
    /// to `Disconnected` and nothing was sent. Transport creation errors are
    /// returned the same way.
    pub async fn start(&self) -> crate::Result<()> {
        self.end_session(Teardown::Restart);

        let subscription = self.next_subscription();
        let peer = match PeerSession::create(
            &self.shared.engine,
            callbacks::remote_stream_callback(self, subscription),
        ) {
            Ok(peer) => Rc::new(peer),
            Err(err) => {
                error!("failed to create peer session: {}", err);
                return Err(err);
            }
        };
        peer.on_local_candidate(callbacks::local_candidate_callback(self, subscription));

        self.shared.state.borrow_mut().session = Some(Session {
            subscription,
            phase: Phase::Waiting,
            remote: None,
            peer: Rc::clone(&peer),
            local_stream: None,
        });
        callbacks::subscribe(self, subscription);
        info!("session {:?} started, acquiring local media", subscription);
        self.emit(ClientEvent::StateChanged(ConnectionState::Connecting));

        let stream = match self.shared.engine.acquire_local_media().await {
            Ok(stream) => stream,
            Err(err) => {
                error!("failed to acquire local media: {}", err);
                if self.is_current(subscription) {
                    self.end_session(Teardown::Local);
                }
                self.emit(ClientEvent::Warning(Warning::MediaUnavailable));
                return Err(err);
            }
        };
        if !self.is_current(subscription) {
            debug!("session {:?} was abandoned while acquiring media", subscription);
            self.shared.engine.stop_local_media(&stream);
            return Ok(());
        }
        if let Some(session) = self.shared.state.borrow_mut().session.as_mut() {
            session.local_stream = Some(stream.clone());
        }
        if let Err(err) = peer.attach_local_media(&stream) {
            error!("failed to attach local media: {}", err);
            self.end_session(Teardown::Failure);
            return Err(err);
        }
        self.emit(ClientEvent::LocalStream(stream));

        self.send(SignalMessage::new(Signal::Start));
        Ok(())
    }

    /// Leave the current call and tell the stranger with a `disconnect`.
    ///
    /// Does nothing until a stranger is paired: the rendezvous server keeps an
    /// unpaired client in its waiting slot, so the session stays ready to
    /// answer the next relayed `start`.
    pub fn disconnect(&self) {
        if self.remote_session_id().is_none() {
            debug!("disconnect requested with nobody paired");
            return;
        }
        self.end_session(Teardown::Local);
    }

    /// Append `text` to the conversation and send it to the stranger.
    ///
    /// # Errors
    /// [`Error::NotPaired`] when there is nobody to talk to.
    pub fn send_text(&self, text: &str) -> crate::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let remote = self.remote_session_id().ok_or(Error::NotPaired)?;
        let message = TextMessage::local(text);
        self.shared.state.borrow_mut().messages.push(message.clone());
        self.emit(ClientEvent::Message(message));
        self.send(SignalMessage::to(remote, Signal::Text(text.to_owned())));
        Ok(())
    }

    /// Cut off the call because the local video was flagged.
    ///
    /// Sends `sensitive` and then `disconnect` to the stranger, tears the
    /// session down and raises [`Warning::SensitiveContentDetected`].
    /// Without a paired stranger this does nothing.
    pub async fn report_sensitive_content(&self) {
        let Some(remote) = self.remote_session_id() else {
            debug!("sensitive content reported with nobody paired");
            return;
        };
        warn!("sensitive content detected, cutting off {}", remote);
        self.send(SignalMessage::to(remote, Signal::Sensitive));
        self.end_session(Teardown::Cutoff);
        self.emit(ClientEvent::Warning(Warning::SensitiveContentDetected));
        self.rearm(Teardown::Cutoff).await;
    }

    /// Feed one classifier result for the local frame.
    ///
    /// Returns `true` if it triggered a cutoff. Results are ignored unless the
    /// client is `Connected`.
    pub async fn review_predictions(&self, predictions: &[Prediction]) -> bool {
        if self.connection_state() != ConnectionState::Connected {
            return false;
        }
        if !is_sensitive(predictions, self.shared.config.sensitive_threshold) {
            return false;
        }
        self.report_sensitive_content().await;
        true
    }

    /// Best-effort cleanup when the page or process terminates. Never fails.
    pub fn unload(&self) {
        if self.end_session(Teardown::Unload) {
            info!("session closed on unload");
        }
    }

    /// Process one inbound message for the live session.
    ///
    /// Goes through the same queue as messages from the signaling channel:
    /// if an earlier message is still being handled this returns right away
    /// and the message is handled after it. Messages whose preconditions do
    /// not hold are logged and dropped.
    pub async fn handle_message(&self, message: SignalMessage) {
        let Some(subscription) = self.current_subscription() else {
            debug!("no active session, dropping `{}` message", message.kind());
            return;
        };
        if let Signal::Candidate(_) = message.signal {
            signal_handler::handle_signal_message(self, subscription, message).await;
            return;
        }
        self.shared
            .inbox
            .borrow_mut()
            .push_back((subscription, message));
        if !self.shared.draining.replace(true) {
            self.drain_inbox().await;
        }
    }

    /// Queue an inbound message, serialising its handling with earlier ones.
    ///
    /// Candidates skip the queue, they commute with description exchange.
    pub(crate) fn dispatch(&self, subscription: Subscription, message: SignalMessage) {
        if !self.is_current(subscription) {
            debug!("revoked subscription, dropping `{}` message", message.kind());
            return;
        }
        if let Signal::Candidate(_) = message.signal {
            let client = self.clone();
            spawn_local(async move {
                signal_handler::handle_signal_message(&client, subscription, message).await;
            });
            return;
        }

        self.shared
            .inbox
            .borrow_mut()
            .push_back((subscription, message));
        if self.shared.draining.replace(true) {
            return;
        }
        let client = self.clone();
        spawn_local(async move { client.drain_inbox().await });
    }

    async fn drain_inbox(&self) {
        loop {
            let next = self.shared.inbox.borrow_mut().pop_front();
            let Some((subscription, message)) = next else {
                break;
            };
            signal_handler::handle_signal_message(self, subscription, message).await;
        }
        self.shared.draining.set(false);
    }

    fn send(&self, message: SignalMessage) {
        debug!(
            "sending `{}` message to {:?}",
            message.kind(),
            message.recipient()
        );
        if let Err(err) = self.shared.channel.send(&message) {
            warn!("failed to send `{}` message: {}", message.kind(), err);
        }
    }

    fn emit(&self, event: ClientEvent<E::Stream>) {
        (self.shared.on_event)(event);
    }

    fn next_subscription(&self) -> Subscription {
        let id = self.shared.next_subscription.get().wrapping_add(1);
        self.shared.next_subscription.set(id);
        Subscription(id)
    }

    fn current_subscription(&self) -> Option<Subscription> {
        self.shared
            .state
            .borrow()
            .session
            .as_ref()
            .map(|session| session.subscription)
    }

    fn is_current(&self, subscription: Subscription) -> bool {
        self.current_subscription() == Some(subscription)
    }

    fn view(&self, subscription: Subscription) -> Option<SessionView<E::Transport>> {
        let state = self.shared.state.borrow();
        let session = state.session.as_ref()?;
        (session.subscription == subscription).then(|| SessionView {
            phase: session.phase,
            remote: session.remote.clone(),
            peer: Rc::clone(&session.peer),
        })
    }

    /// Mutate the live session if it is still the one behind `subscription`.
    fn commit(&self, subscription: Subscription, phase: Phase, remote: &SessionId) -> bool {
        let changed_state = {
            let mut state = self.shared.state.borrow_mut();
            let Some(session) = state.session.as_mut() else {
                return false;
            };
            if session.subscription != subscription {
                return false;
            }
            let was_connected = session.phase == Phase::Connected;
            session.phase = phase;
            session.remote = Some(remote.clone());
            was_connected != (phase == Phase::Connected)
        };
        if changed_state {
            self.emit(ClientEvent::StateChanged(self.connection_state()));
        }
        true
    }

    /// Tear the live session down. Returns `false` if there was none.
    fn end_session(&self, reason: Teardown) -> bool {
        let Some(session) = self.shared.state.borrow_mut().session.take() else {
            return false;
        };
        callbacks::revoke(self);

        if reason.notifies_remote() {
            if let Some(remote) = &session.remote {
                self.send(SignalMessage::to(remote.clone(), Signal::Disconnect));
            }
        }
        session.peer.close();
        if let Some(stream) = &session.local_stream {
            self.shared.engine.stop_local_media(stream);
        }
        self.shared.state.borrow_mut().messages.clear();
        info!(
            "session {:?} with {:?} ended: {:?}",
            session.subscription, session.remote, reason
        );

        self.emit(ClientEvent::RemoteStreamEnded);
        self.emit(ClientEvent::MessagesCleared);
        self.emit(ClientEvent::StateChanged(ConnectionState::Disconnected));
        true
    }

    /// Re-issue `start` after a remote-initiated teardown if the policy asks for it.
    async fn rearm(&self, reason: Teardown) {
        if !reason.rearms() || !self.auto_reconnect() {
            return;
        }
        info!("auto-reconnect: looking for another stranger");
        if let Err(err) = self.start().await {
            warn!("auto-reconnect failed: {}", err);
        }
    }

    fn upgrade(shared: &Weak<Shared<C, E>>) -> Option<Self> {
        shared.upgrade().map(|shared| Self { shared })
    }
}
