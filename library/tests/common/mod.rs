//! In-memory stand-ins for the signaling channel and the media stack.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stranger_chat::{
    Client, ClientConfig, ClientEvent, ConnectionState, Error, IceCandidate, LocalCandidateCallback,
    MediaEngine, MessageHandler, PeerTransport, RemoteStreamCallback, SessionDescription,
    SessionId, Signal, SignalMessage, SignalingChannel,
};

/// Local media handed out by [`FakeEngine`].
pub const LOCAL_STREAM: u32 = 1;

pub type TestClient = Client<FakeChannel, FakeEngine>;
pub type EventLog = Rc<RefCell<Vec<ClientEvent<u32>>>>;

#[derive(Default)]
pub struct ChannelState {
    sent: RefCell<Vec<SignalMessage>>,
    handler: RefCell<Option<MessageHandler>>,
    closed: Cell<bool>,
}

/// Records outbound messages and lets tests push inbound ones through the
/// installed handler.
#[derive(Clone, Default)]
pub struct FakeChannel(Rc<ChannelState>);

impl FakeChannel {
    pub fn take_sent(&self) -> Vec<SignalMessage> {
        self.0.sent.take()
    }

    pub fn sent_count(&self) -> usize {
        self.0.sent.borrow().len()
    }

    pub fn close(&self) {
        self.0.closed.set(true);
    }

    /// Hand `message` to whatever handler is installed right now.
    pub fn deliver(&self, message: SignalMessage) {
        let mut handler = self.0.handler.borrow_mut().take();
        if let Some(handler) = handler.as_mut() {
            handler(message);
        }
        let mut slot = self.0.handler.borrow_mut();
        if slot.is_none() {
            *slot = handler;
        }
    }
}

impl SignalingChannel for FakeChannel {
    fn send(&self, message: &SignalMessage) -> stranger_chat::Result<()> {
        if self.0.closed.get() {
            return Err(Error::Channel("closed".to_owned()));
        }
        self.0.sent.borrow_mut().push(message.clone());
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.0.handler.borrow_mut() = Some(handler);
    }
}

#[derive(Default)]
pub struct TransportState {
    pub closes: Cell<u32>,
    pub offers: Cell<u32>,
    pub answers: Cell<u32>,
    pub attached: RefCell<Vec<u32>>,
    pub remote_descriptions: RefCell<Vec<SessionDescription>>,
    pub candidates: RefCell<Vec<Option<IceCandidate>>>,
    /// Whether every earlier transport was closed when this one was created.
    pub created_after_close: Cell<bool>,
    local_candidate: RefCell<Option<LocalCandidateCallback>>,
    remote_stream: RefCell<Option<RemoteStreamCallback<u32>>>,
}

impl TransportState {
    pub fn emit_local_candidate(&self, candidate: Option<IceCandidate>) {
        if let Some(callback) = self.local_candidate.borrow_mut().as_mut() {
            callback(candidate);
        }
    }

    pub fn emit_remote_stream(&self, stream: u32) {
        if let Some(callback) = self.remote_stream.borrow_mut().as_mut() {
            callback(stream);
        }
    }
}

#[derive(Default)]
pub struct EngineState {
    pub deny_media: Cell<bool>,
    /// Suspend once inside `acquire_local_media`.
    pub suspend_media: Cell<bool>,
    /// Streams handed back through `stop_local_media`.
    pub stopped: RefCell<Vec<u32>>,
    pub reject_descriptions: Cell<bool>,
    /// Suspend once inside `create_offer`, so other work can interleave.
    pub suspend_offers: Cell<bool>,
    pub transports: RefCell<Vec<Rc<TransportState>>>,
}

#[derive(Clone, Default)]
pub struct FakeEngine(pub Rc<EngineState>);

impl FakeEngine {
    pub fn transport(&self, index: usize) -> Rc<TransportState> {
        Rc::clone(&self.0.transports.borrow()[index])
    }

    pub fn last_transport(&self) -> Rc<TransportState> {
        let transports = self.0.transports.borrow();
        Rc::clone(transports.last().expect("no transport created yet"))
    }

    pub fn transport_count(&self) -> usize {
        self.0.transports.borrow().len()
    }
}

pub struct FakeTransport {
    state: Rc<TransportState>,
    engine: Rc<EngineState>,
}

impl PeerTransport for FakeTransport {
    type Stream = u32;

    fn attach_local_media(&self, stream: &u32) -> stranger_chat::Result<()> {
        self.state.attached.borrow_mut().push(*stream);
        Ok(())
    }

    async fn create_offer(&self) -> stranger_chat::Result<SessionDescription> {
        self.state.offers.set(self.state.offers.get() + 1);
        if self.engine.suspend_offers.get() {
            tokio::task::yield_now().await;
        }
        Ok(SessionDescription::offer(format!(
            "offer-{}",
            self.state.offers.get()
        )))
    }

    async fn create_answer(&self) -> stranger_chat::Result<SessionDescription> {
        if self.state.remote_descriptions.borrow().is_empty() {
            return Err(Error::Negotiation("no remote offer".to_owned()));
        }
        self.state.answers.set(self.state.answers.get() + 1);
        Ok(SessionDescription::answer("answer"))
    }

    async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> stranger_chat::Result<()> {
        if self.engine.reject_descriptions.get() {
            return Err(Error::Negotiation("incompatible description".to_owned()));
        }
        self.state
            .remote_descriptions
            .borrow_mut()
            .push(description.clone());
        Ok(())
    }

    async fn add_remote_candidate(
        &self,
        candidate: Option<&IceCandidate>,
    ) -> stranger_chat::Result<()> {
        self.state.candidates.borrow_mut().push(candidate.cloned());
        Ok(())
    }

    fn on_local_candidate(&self, callback: LocalCandidateCallback) {
        *self.state.local_candidate.borrow_mut() = Some(callback);
    }

    fn close(&self) {
        self.state.closes.set(self.state.closes.get() + 1);
    }
}

impl MediaEngine for FakeEngine {
    type Stream = u32;
    type Transport = FakeTransport;

    async fn acquire_local_media(&self) -> stranger_chat::Result<u32> {
        if self.0.deny_media.get() {
            return Err(Error::MediaAccess("permission denied".to_owned()));
        }
        if self.0.suspend_media.get() {
            tokio::task::yield_now().await;
        }
        Ok(LOCAL_STREAM)
    }

    fn stop_local_media(&self, stream: &u32) {
        self.0.stopped.borrow_mut().push(*stream);
    }

    fn create_transport(
        &self,
        on_remote_stream: RemoteStreamCallback<u32>,
    ) -> stranger_chat::Result<FakeTransport> {
        let state = Rc::new(TransportState::default());
        let all_closed = self
            .0
            .transports
            .borrow()
            .iter()
            .all(|transport| transport.closes.get() > 0);
        state.created_after_close.set(all_closed);
        *state.remote_stream.borrow_mut() = Some(on_remote_stream);
        self.0.transports.borrow_mut().push(Rc::clone(&state));
        Ok(FakeTransport {
            state,
            engine: Rc::clone(&self.0),
        })
    }
}

/// One client together with its fakes, as seen by the rendezvous server.
pub struct Peer {
    pub id: SessionId,
    pub client: TestClient,
    pub channel: FakeChannel,
    pub engine: FakeEngine,
    pub events: EventLog,
}

impl Peer {
    pub fn new(id: &str) -> Self {
        Self::with_config(id, ClientConfig::default())
    }

    pub fn with_config(id: &str, config: ClientConfig) -> Self {
        let channel = FakeChannel::default();
        let engine = FakeEngine::default();
        let events: EventLog = Rc::default();
        let sink = Rc::clone(&events);
        let client = Client::new(channel.clone(), engine.clone(), config, move |event| {
            sink.borrow_mut().push(event);
        });
        Self {
            id: SessionId::from(id),
            client,
            channel,
            engine,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.client.connection_state()
    }

    pub fn take_sent(&self) -> Vec<SignalMessage> {
        self.channel.take_sent()
    }

    pub fn take_events(&self) -> Vec<ClientEvent<u32>> {
        self.events.take()
    }

    pub fn count_events(&self, predicate: impl Fn(&ClientEvent<u32>) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    /// Feed a message from `sender` straight into the state machine.
    pub async fn receive(&self, sender: &str, signal: Signal) {
        let message = SignalMessage::to(self.id.clone(), signal).relayed_from(SessionId::from(sender));
        self.client.handle_message(message).await;
    }
}

/// Deliver everything `from` sent to `to`, stamping the sender like the
/// rendezvous server does. Returns the number of messages relayed.
pub async fn relay(from: &Peer, to: &Peer) -> usize {
    let messages = from.take_sent();
    let count = messages.len();
    for message in messages {
        assert!(
            message.recipient().map_or(true, |recipient| *recipient == to.id),
            "{:?} is not addressed to {}",
            message,
            to.id
        );
        to.client
            .handle_message(message.relayed_from(from.id.clone()))
            .await;
    }
    count
}

/// Relay in both directions until neither side has anything left to say.
pub async fn exchange(a: &Peer, b: &Peer) {
    for _ in 0..16 {
        if relay(a, b).await + relay(b, a).await == 0 {
            return;
        }
    }
    panic!("peers kept talking");
}

/// `b` waits first, then `a` starts and is matched with it.
pub async fn pair(a: &Peer, b: &Peer) {
    b.client.start().await.unwrap();
    // the rendezvous server parks the first start
    assert_eq!(b.take_sent(), vec![SignalMessage::new(Signal::Start)]);
    a.client.start().await.unwrap();
    exchange(a, b).await;
}

pub async fn paired() -> (Peer, Peer) {
    let a = Peer::new("A");
    let b = Peer::new("B");
    pair(&a, &b).await;
    (a, b)
}

pub fn candidate(line: &str) -> IceCandidate {
    IceCandidate {
        candidate: line.to_owned(),
        sdp_mid: Some("0".to_owned()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}
