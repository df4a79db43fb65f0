//! Test suite for the Web and headless browsers.

#![cfg(target_arch = "wasm32")]

use stranger_chat::web::{BrowserMediaEngine, WebSocketChannel};
use stranger_chat::{ConnectionType, Error, PeerSession, SdpType};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn invalid_signaling_url_is_a_channel_error() {
    let result = WebSocketChannel::new("definitely not a url");
    assert!(matches!(result, Err(Error::Channel(_))));
}

#[wasm_bindgen_test]
fn channel_is_not_open_right_away() {
    let channel = WebSocketChannel::new("ws://127.0.0.1:9001/ws").unwrap();
    assert!(!channel.is_open());
}

#[wasm_bindgen_test]
async fn local_offer_is_produced_by_a_fresh_transport() {
    let engine = BrowserMediaEngine::new(ConnectionType::Local);
    let session = PeerSession::create(&engine, Box::new(|_| {})).unwrap();

    let offer = session.create_offer().await.unwrap();
    assert!(offer.sdp.starts_with("v=0"));

    assert!(session.close());
    assert!(!session.close());
}

#[wasm_bindgen_test]
async fn two_transports_negotiate_directly() {
    let engine = BrowserMediaEngine::new(ConnectionType::Local);
    let offerer = PeerSession::create(&engine, Box::new(|_| {})).unwrap();
    let answerer = PeerSession::create(&engine, Box::new(|_| {})).unwrap();
    // early candidates are held back until the remote description arrives
    answerer.add_remote_candidate(None).await.unwrap();

    let offer = offerer.create_offer().await.unwrap();
    answerer.apply_remote_description(&offer).await.unwrap();
    let answer = answerer.create_answer().await.unwrap();
    offerer.apply_remote_description(&answer).await.unwrap();

    assert_eq!(offer.sdp_type, SdpType::Offer);
    assert_eq!(answer.sdp_type, SdpType::Answer);
    assert!(!offerer.is_closed());
}

#[wasm_bindgen_test]
async fn answer_without_offer_is_a_negotiation_error() {
    let engine = BrowserMediaEngine::new(ConnectionType::Local);
    let session = PeerSession::create(&engine, Box::new(|_| {})).unwrap();

    assert!(matches!(
        session.create_answer().await,
        Err(Error::Negotiation(_))
    ));
}
