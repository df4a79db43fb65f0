use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};
use stranger_chat_protocol::{IceCandidate, SdpType, SessionDescription};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    MediaStream, MediaStreamConstraints, MediaStreamTrack, RtcIceCandidateInit, RtcPeerConnection,
    RtcPeerConnectionIceEvent, RtcSdpType, RtcTrackEvent,
};

use crate::transport::{LocalCandidateCallback, MediaEngine, PeerTransport, RemoteStreamCallback};
use crate::web::utils::{
    create_peer_connection, create_sdp_answer, create_sdp_offer, describe, set_remote_description,
};
use crate::{ConnectionType, Error};

/// Camera, microphone and `RTCPeerConnection` of the current page.
#[derive(Debug, Clone)]
pub struct BrowserMediaEngine {
    connection_type: ConnectionType,
}

impl BrowserMediaEngine {
    #[must_use]
    pub const fn new(connection_type: ConnectionType) -> Self {
        Self { connection_type }
    }
}

impl MediaEngine for BrowserMediaEngine {
    type Stream = MediaStream;
    type Transport = RtcTransport;

    async fn acquire_local_media(&self) -> crate::Result<MediaStream> {
        let media_access = |err: JsValue| Error::MediaAccess(describe(&err));
        let window =
            web_sys::window().ok_or_else(|| Error::Browser("no window available".to_owned()))?;
        let media_devices = window.navigator().media_devices().map_err(media_access)?;

        let mut constraints = MediaStreamConstraints::new();
        constraints.audio(&JsValue::TRUE).video(&JsValue::TRUE);
        let stream = media_devices
            .get_user_media_with_constraints(&constraints)
            .map_err(media_access)?;
        let stream = JsFuture::from(stream).await.map_err(media_access)?;
        stream.dyn_into::<MediaStream>().map_err(media_access)
    }

    fn stop_local_media(&self, stream: &MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        debug!("local media stopped");
    }

    fn create_transport(
        &self,
        on_remote_stream: RemoteStreamCallback<MediaStream>,
    ) -> crate::Result<RtcTransport> {
        RtcTransport::new(&self.connection_type, on_remote_stream)
    }
}

/// [`PeerTransport`] backed by one `RTCPeerConnection`.
///
/// Remote candidates arriving before the remote description are held back and
/// applied right after it, browsers reject them otherwise.
pub struct RtcTransport {
    peer_connection: RtcPeerConnection,
    _on_track: Closure<dyn FnMut(RtcTrackEvent)>,
    on_ice_candidate: RefCell<Option<Closure<dyn FnMut(RtcPeerConnectionIceEvent)>>>,
    has_remote_description: Cell<bool>,
    pending_candidates: RefCell<Vec<Option<IceCandidate>>>,
}

impl RtcTransport {
    fn new(
        connection_type: &ConnectionType,
        on_remote_stream: RemoteStreamCallback<MediaStream>,
    ) -> crate::Result<Self> {
        let peer_connection = create_peer_connection(connection_type)
            .map_err(|err| Error::Negotiation(describe(&err)))?;

        let on_remote_stream = Rc::new(RefCell::new(on_remote_stream));
        let delivered = Rc::new(Cell::new(false));
        let on_track: Box<dyn FnMut(RtcTrackEvent)> = Box::new(move |ev: RtcTrackEvent| {
            let Ok(stream) = ev.streams().get(0).dyn_into::<MediaStream>() else {
                warn!("remote track arrived without a stream");
                return;
            };
            let deliver = {
                let on_remote_stream = Rc::clone(&on_remote_stream);
                let delivered = Rc::clone(&delivered);
                move || {
                    if !delivered.replace(true) {
                        (on_remote_stream.borrow_mut())(stream.clone());
                    }
                }
            };
            let track: MediaStreamTrack = ev.track();
            if track.muted() {
                debug!("remote {} track is muted, waiting for media", track.kind());
                let on_unmute: Box<dyn FnMut()> = Box::new(deliver);
                let on_unmute = Closure::wrap(on_unmute);
                track.set_onunmute(Some(on_unmute.as_ref().unchecked_ref()));
                on_unmute.forget();
            } else {
                deliver();
            }
        });
        let on_track = Closure::wrap(on_track);
        peer_connection.set_ontrack(Some(on_track.as_ref().unchecked_ref()));

        Ok(Self {
            peer_connection,
            _on_track: on_track,
            on_ice_candidate: RefCell::new(None),
            has_remote_description: Cell::new(false),
            pending_candidates: RefCell::new(Vec::new()),
        })
    }

    async fn add_candidate(&self, candidate: Option<&IceCandidate>) -> crate::Result<()> {
        let rtc_candidate = candidate.map(|candidate| {
            let mut rtc_candidate = RtcIceCandidateInit::new(&candidate.candidate);
            rtc_candidate.sdp_mid(candidate.sdp_mid.as_deref());
            rtc_candidate.sdp_m_line_index(candidate.sdp_m_line_index);
            rtc_candidate
        });
        JsFuture::from(
            self.peer_connection
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(rtc_candidate.as_ref()),
        )
        .await
        .map_err(|err| Error::Negotiation(format!("failed to add candidate: {}", describe(&err))))?;
        Ok(())
    }
}

impl PeerTransport for RtcTransport {
    type Stream = MediaStream;

    fn attach_local_media(&self, stream: &MediaStream) -> crate::Result<()> {
        for track in stream.get_tracks().iter() {
            let track = track
                .dyn_into::<MediaStreamTrack>()
                .map_err(|err| Error::Negotiation(describe(&err)))?;
            self.peer_connection.add_track_0(&track, stream);
        }
        Ok(())
    }

    async fn create_offer(&self) -> crate::Result<SessionDescription> {
        let sdp = create_sdp_offer(&self.peer_connection)
            .await
            .map_err(|err| Error::Negotiation(describe(&err)))?;
        Ok(SessionDescription::offer(sdp))
    }

    async fn create_answer(&self) -> crate::Result<SessionDescription> {
        let sdp = create_sdp_answer(&self.peer_connection)
            .await
            .map_err(|err| Error::Negotiation(describe(&err)))?;
        Ok(SessionDescription::answer(sdp))
    }

    async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> crate::Result<()> {
        let sdp_type = match description.sdp_type {
            SdpType::Offer => RtcSdpType::Offer,
            SdpType::Answer => RtcSdpType::Answer,
        };
        set_remote_description(&self.peer_connection, sdp_type, &description.sdp)
            .await
            .map_err(|err| {
                Error::Negotiation(format!("failed to set remote description: {}", describe(&err)))
            })?;
        self.has_remote_description.set(true);

        let pending = self.pending_candidates.take();
        if !pending.is_empty() {
            debug!("applying {} held back candidates", pending.len());
        }
        for candidate in pending {
            if let Err(err) = self.add_candidate(candidate.as_ref()).await {
                warn!("{}", err);
            }
        }
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: Option<&IceCandidate>) -> crate::Result<()> {
        if !self.has_remote_description.get() {
            self.pending_candidates.borrow_mut().push(candidate.cloned());
            return Ok(());
        }
        self.add_candidate(candidate).await
    }

    fn on_local_candidate(&self, mut callback: LocalCandidateCallback) {
        let on_ice_candidate: Box<dyn FnMut(RtcPeerConnectionIceEvent)> =
            Box::new(move |ev: RtcPeerConnectionIceEvent| {
                let candidate = ev.candidate().map(|candidate| IceCandidate {
                    candidate: candidate.candidate(),
                    sdp_mid: candidate.sdp_mid(),
                    sdp_m_line_index: candidate.sdp_m_line_index(),
                    username_fragment: None,
                });
                debug!("local candidate: {:?}", candidate);
                callback(candidate);
            });
        let on_ice_candidate = Closure::wrap(on_ice_candidate);
        self.peer_connection
            .set_onicecandidate(Some(on_ice_candidate.as_ref().unchecked_ref()));
        drop(self.on_ice_candidate.borrow_mut().replace(on_ice_candidate));
    }

    fn close(&self) {
        self.peer_connection.set_ontrack(None);
        self.peer_connection.set_onicecandidate(None);
        self.peer_connection.close();
        info!("peer connection closed");
    }
}

impl Drop for RtcTransport {
    fn drop(&mut self) {
        // handlers must be detached before their closures are freed
        self.peer_connection.set_ontrack(None);
        self.peer_connection.set_onicecandidate(None);
    }
}
