use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{RtcConfiguration, RtcPeerConnection, RtcSdpType, RtcSessionDescriptionInit};

use crate::ConnectionType;

/// Human readable form of a rejected promise or thrown exception.
pub(crate) fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .unwrap_or_else(|| format!("{:?}", error))
}

pub(crate) fn create_peer_connection(
    connection_type: &ConnectionType,
) -> Result<RtcPeerConnection, JsValue> {
    match *connection_type {
        ConnectionType::Local => RtcPeerConnection::new(),
        ConnectionType::Stun { ref urls } => {
            let ice_servers = Array::new();
            {
                let server_entry = Object::new();

                Reflect::set(&server_entry, &"urls".into(), &urls.into())?;

                ice_servers.push(&*server_entry);
            }

            let mut rtc_configuration = RtcConfiguration::new();
            rtc_configuration.ice_servers(&ice_servers);

            RtcPeerConnection::new_with_configuration(&rtc_configuration)
        }
    }
}

/// Create an offer and install it as the local description, returning its SDP.
pub(crate) async fn create_sdp_offer(peer_connection: &RtcPeerConnection) -> Result<String, JsValue> {
    let offer = JsFuture::from(peer_connection.create_offer())
        .await
        .map_err(|error| {
            JsValue::from_str(&format!("failed to create an SDP offer: {}", describe(&error)))
        })?;
    let offer = sdp_of(&offer)?;
    set_local_description(peer_connection, RtcSdpType::Offer, &offer).await?;
    Ok(offer)
}

/// Create an answer to the already applied remote offer and install it locally.
pub(crate) async fn create_sdp_answer(
    peer_connection: &RtcPeerConnection,
) -> Result<String, JsValue> {
    let answer = JsFuture::from(peer_connection.create_answer())
        .await
        .map_err(|error| {
            JsValue::from_str(&format!("failed to create an SDP answer: {}", describe(&error)))
        })?;
    let answer = sdp_of(&answer)?;
    set_local_description(peer_connection, RtcSdpType::Answer, &answer).await?;
    Ok(answer)
}

pub(crate) async fn set_remote_description(
    peer_connection: &RtcPeerConnection,
    sdp_type: RtcSdpType,
    sdp: &str,
) -> Result<(), JsValue> {
    let mut remote_session_description = RtcSessionDescriptionInit::new(sdp_type);
    remote_session_description.sdp(sdp);
    JsFuture::from(peer_connection.set_remote_description(&remote_session_description)).await?;
    Ok(())
}

async fn set_local_description(
    peer_connection: &RtcPeerConnection,
    sdp_type: RtcSdpType,
    sdp: &str,
) -> Result<(), JsValue> {
    let mut local_session_description = RtcSessionDescriptionInit::new(sdp_type);
    local_session_description.sdp(sdp);
    JsFuture::from(peer_connection.set_local_description(&local_session_description))
        .await
        .map_err(|error| {
            JsValue::from_str(&format!(
                "failed to set local description: {}",
                describe(&error)
            ))
        })?;
    Ok(())
}

fn sdp_of(description: &JsValue) -> Result<String, JsValue> {
    Reflect::get(description, &JsValue::from_str("sdp"))?
        .as_string()
        .ok_or_else(|| JsValue::from_str("session description without sdp"))
}
