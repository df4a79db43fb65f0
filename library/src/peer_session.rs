use std::cell::Cell;
use std::rc::Rc;

use log::debug;
use stranger_chat_protocol::{IceCandidate, SessionDescription};

use crate::transport::{LocalCandidateCallback, MediaEngine, PeerTransport, RemoteStreamCallback};
use crate::Error;

/// Wrapper around one [`PeerTransport`] for one candidate remote party.
///
/// Once closed, every operation fails with [`Error::SessionClosed`] and
/// callbacks registered through the session are never invoked again,
/// even if the underlying engine still fires them.
pub struct PeerSession<T: PeerTransport> {
    transport: T,
    closed: Rc<Cell<bool>>,
}

impl<T: PeerTransport> PeerSession<T> {
    /// Instantiate a fresh transport through `engine`.
    ///
    /// # Errors
    /// Propagates the engine's refusal to create a transport.
    pub fn create<E>(
        engine: &E,
        mut on_remote_stream: RemoteStreamCallback<T::Stream>,
    ) -> crate::Result<Self>
    where
        E: MediaEngine<Transport = T, Stream = T::Stream>,
        T::Stream: 'static,
    {
        let closed = Rc::new(Cell::new(false));
        let transport = {
            let closed = Rc::clone(&closed);
            engine.create_transport(Box::new(move |stream| {
                if closed.get() {
                    debug!("remote stream arrived for a closed peer session");
                } else {
                    on_remote_stream(stream);
                }
            }))?
        };
        Ok(Self { transport, closed })
    }

    /// # Errors
    /// [`Error::SessionClosed`] after [`PeerSession::close`], otherwise the transport's error.
    pub fn attach_local_media(&self, stream: &T::Stream) -> crate::Result<()> {
        self.ensure_open()?;
        self.transport.attach_local_media(stream)
    }

    /// # Errors
    /// [`Error::SessionClosed`] if the session is closed before or during the call.
    pub async fn create_offer(&self) -> crate::Result<SessionDescription> {
        self.ensure_open()?;
        let offer = self.transport.create_offer().await?;
        self.ensure_open()?;
        Ok(offer)
    }

    /// # Errors
    /// [`Error::SessionClosed`] if the session is closed before or during the call.
    pub async fn create_answer(&self) -> crate::Result<SessionDescription> {
        self.ensure_open()?;
        let answer = self.transport.create_answer().await?;
        self.ensure_open()?;
        Ok(answer)
    }

    /// # Errors
    /// [`Error::SessionClosed`] if the session is closed before or during the call.
    pub async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> crate::Result<()> {
        self.ensure_open()?;
        self.transport.apply_remote_description(description).await?;
        self.ensure_open()
    }

    /// # Errors
    /// [`Error::SessionClosed`] after close, otherwise the transport's error.
    pub async fn add_remote_candidate(&self, candidate: Option<&IceCandidate>) -> crate::Result<()> {
        self.ensure_open()?;
        self.transport.add_remote_candidate(candidate).await
    }

    pub fn on_local_candidate(&self, mut callback: LocalCandidateCallback) {
        let closed = Rc::clone(&self.closed);
        self.transport.on_local_candidate(Box::new(move |candidate| {
            if !closed.get() {
                callback(candidate);
            }
        }));
    }

    /// Returns `true` only for the call that actually closed the session.
    pub fn close(&self) -> bool {
        if self.closed.replace(true) {
            return false;
        }
        self.transport.close();
        true
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn ensure_open(&self) -> crate::Result<()> {
        if self.closed.get() {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl<T: PeerTransport> Drop for PeerSession<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod test {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        closes: Cell<u32>,
        local_candidate: RefCell<Option<LocalCandidateCallback>>,
        remote_stream: RefCell<Option<RemoteStreamCallback<u8>>>,
    }

    struct RecordingTransport(Rc<Recorder>);

    impl PeerTransport for RecordingTransport {
        type Stream = u8;

        fn attach_local_media(&self, _stream: &u8) -> crate::Result<()> {
            Ok(())
        }

        async fn create_offer(&self) -> crate::Result<SessionDescription> {
            Ok(SessionDescription::offer("v=0"))
        }

        async fn create_answer(&self) -> crate::Result<SessionDescription> {
            Err(Error::Negotiation("no remote offer".to_owned()))
        }

        async fn apply_remote_description(&self, _: &SessionDescription) -> crate::Result<()> {
            Ok(())
        }

        async fn add_remote_candidate(&self, _: Option<&IceCandidate>) -> crate::Result<()> {
            Ok(())
        }

        fn on_local_candidate(&self, callback: LocalCandidateCallback) {
            *self.0.local_candidate.borrow_mut() = Some(callback);
        }

        fn close(&self) {
            self.0.closes.set(self.0.closes.get() + 1);
        }
    }

    struct RecordingEngine(Rc<Recorder>);

    impl MediaEngine for RecordingEngine {
        type Stream = u8;
        type Transport = RecordingTransport;

        async fn acquire_local_media(&self) -> crate::Result<u8> {
            Ok(1)
        }

        fn stop_local_media(&self, _stream: &u8) {}

        fn create_transport(
            &self,
            on_remote_stream: RemoteStreamCallback<u8>,
        ) -> crate::Result<RecordingTransport> {
            *self.0.remote_stream.borrow_mut() = Some(on_remote_stream);
            Ok(RecordingTransport(Rc::clone(&self.0)))
        }
    }

    fn session() -> (PeerSession<RecordingTransport>, Rc<Recorder>, Rc<RefCell<Vec<u8>>>) {
        let recorder = Rc::new(Recorder::default());
        let streams = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&streams);
        let session = PeerSession::create(
            &RecordingEngine(Rc::clone(&recorder)),
            Box::new(move |stream| sink.borrow_mut().push(stream)),
        )
        .unwrap();
        (session, recorder, streams)
    }

    #[test]
    fn close_is_idempotent() {
        let (session, recorder, _) = session();
        assert!(session.close());
        assert!(!session.close());
        drop(session);
        assert_eq!(recorder.closes.get(), 1);
    }

    #[test]
    fn dropping_an_open_session_closes_the_transport() {
        let (session, recorder, _) = session();
        drop(session);
        assert_eq!(recorder.closes.get(), 1);
    }

    #[test]
    fn callbacks_are_silenced_after_close() {
        let (session, recorder, streams) = session();
        let candidates = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&candidates);
        session.on_local_candidate(Box::new(move |candidate| sink.borrow_mut().push(candidate)));

        let fire_candidate = |recorder: &Recorder| {
            if let Some(callback) = recorder.local_candidate.borrow_mut().as_mut() {
                callback(None);
            }
        };
        let fire_stream = |recorder: &Recorder| {
            if let Some(callback) = recorder.remote_stream.borrow_mut().as_mut() {
                callback(7);
            }
        };

        fire_candidate(&recorder);
        fire_stream(&recorder);
        session.close();
        fire_candidate(&recorder);
        fire_stream(&recorder);

        assert_eq!(candidates.borrow().len(), 1);
        assert_eq!(*streams.borrow(), vec![7]);
    }

    #[tokio::test]
    async fn operations_fail_after_close() {
        let (session, _, _) = session();
        assert!(session.create_offer().await.is_ok());
        session.close();
        assert!(matches!(session.create_offer().await, Err(Error::SessionClosed)));
        assert!(matches!(
            session.add_remote_candidate(None).await,
            Err(Error::SessionClosed)
        ));
        assert!(matches!(session.attach_local_media(&1), Err(Error::SessionClosed)));
    }

    #[tokio::test]
    async fn answer_without_offer_is_a_negotiation_error() {
        let (session, _, _) = session();
        assert!(matches!(
            session.create_answer().await,
            Err(Error::Negotiation(_))
        ));
    }
}
