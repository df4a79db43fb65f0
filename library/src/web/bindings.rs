use std::cell::RefCell;

use js_sys::{Function, Object, Promise, Reflect};
use log::{error, info};
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsError, JsValue};
use wasm_bindgen_futures::future_to_promise;
use web_sys::MediaStream;

use crate::utils::set_panic_hook;
use crate::web::callbacks::{set_window_on_beforeunload, ContentMonitor};
use crate::web::{BrowserClient, BrowserMediaEngine, WebSocketChannel};
use crate::{Client, ClientConfig, ClientEvent, SessionId, Warning};

/// Install `wasm-logger` at debug level. Call once before creating a [`StrangerChat`].
#[wasm_bindgen(js_name = initLogger)]
pub fn init_logger() {
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
}

/// Page level handle to the stranger chat.
///
/// Every state change is reported to the `on_event` function given to the
/// constructor as a plain object with a `type` field.
#[wasm_bindgen]
pub struct StrangerChat {
    client: BrowserClient,
    channel: WebSocketChannel,
    monitor: RefCell<Option<ContentMonitor>>,
}

#[wasm_bindgen]
impl StrangerChat {
    /// Connect to the rendezvous server at `signaling_server_url`, or the default address.
    ///
    /// # Errors
    /// If the `WebSocket` cannot be created.
    #[wasm_bindgen(constructor)]
    pub fn new(
        signaling_server_url: Option<String>,
        on_event: Function,
    ) -> Result<StrangerChat, JsError> {
        set_panic_hook();

        let mut config = ClientConfig::default();
        if let Some(url) = signaling_server_url {
            config.signaling_server_url = url;
        }
        let channel = WebSocketChannel::new(&config.signaling_server_url)?;
        let engine = BrowserMediaEngine::new(config.connection_type.clone());
        let client = Client::new(channel.clone(), engine, config, move |event| {
            if let Err(err) = on_event.call1(&JsValue::NULL, &event_to_js(&event)) {
                error!("event handler threw: {:?}", err);
            }
        });
        set_window_on_beforeunload(client.clone())?;
        info!("stranger chat ready");

        Ok(Self {
            client,
            channel,
            monitor: RefCell::new(None),
        })
    }

    /// Look for a stranger, resolving once `start` was sent.
    pub fn start(&self) -> Promise {
        let client = self.client.clone();
        let channel = self.channel.clone();
        future_to_promise(async move {
            channel.opened().await.map_err(to_js)?;
            client.start().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    /// # Errors
    /// When nobody is paired.
    #[wasm_bindgen(js_name = sendText)]
    pub fn send_text(&self, text: &str) -> Result<(), JsError> {
        Ok(self.client.send_text(text)?)
    }

    #[wasm_bindgen(js_name = reportSensitiveContent)]
    pub fn report_sensitive_content(&self) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            client.report_sensitive_content().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(getter, js_name = autoReconnect)]
    pub fn auto_reconnect(&self) -> bool {
        self.client.auto_reconnect()
    }

    #[wasm_bindgen(setter, js_name = autoReconnect)]
    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.client.set_auto_reconnect(enabled);
    }

    /// One of `"disconnected"`, `"connecting"` or `"connected"`.
    #[wasm_bindgen(getter, js_name = connectionState)]
    pub fn connection_state(&self) -> String {
        self.client.connection_state().to_string()
    }

    #[wasm_bindgen(getter, js_name = remoteSessionId)]
    pub fn remote_session_id(&self) -> Option<String> {
        self.client.remote_session_id().map(SessionId::into_inner)
    }

    /// Conversation so far as `[{ fromRemote, text }]`.
    ///
    /// # Errors
    /// If the messages cannot be converted.
    pub fn messages(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.client.messages())?)
    }

    /// Start classifying the local video with `classify` while connected.
    ///
    /// `classify` is called without arguments and returns, possibly through a
    /// promise, an array of `{ className, probability }`. Replaces any previous monitor.
    ///
    /// # Errors
    /// If the interval cannot be scheduled.
    #[wasm_bindgen(js_name = monitorContent)]
    pub fn monitor_content(&self, classify: Function) -> Result<(), JsError> {
        let interval = self.client.config().classification_interval;
        let monitor = ContentMonitor::start(self.client.clone(), classify, interval)?;
        drop(self.monitor.borrow_mut().replace(monitor));
        Ok(())
    }

    #[wasm_bindgen(js_name = stopMonitoring)]
    pub fn stop_monitoring(&self) {
        drop(self.monitor.borrow_mut().take());
    }
}

fn to_js(err: crate::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn event_to_js(event: &ClientEvent<MediaStream>) -> JsValue {
    let object = Object::new();
    let set = |key: &str, value: &JsValue| {
        if Reflect::set(&object, &key.into(), value).is_err() {
            error!("failed to build `{}` event field", key);
        }
    };
    let kind = match *event {
        ClientEvent::StateChanged(state) => {
            set("state", &state.to_string().into());
            "stateChanged"
        }
        ClientEvent::LocalStream(ref stream) => {
            set("stream", stream);
            "localStream"
        }
        ClientEvent::RemoteStream(ref stream) => {
            set("stream", stream);
            "remoteStream"
        }
        ClientEvent::RemoteStreamEnded => "remoteStreamEnded",
        ClientEvent::Message(ref message) => {
            set("fromRemote", &message.from_remote.into());
            set("text", &message.text.as_str().into());
            "message"
        }
        ClientEvent::MessagesCleared => "messagesCleared",
        ClientEvent::Warning(warning) => {
            let warning = match warning {
                Warning::SensitiveContentDetected => "sensitiveContentDetected",
                Warning::StrangerSharedSensitiveContent => "strangerSharedSensitiveContent",
                Warning::MediaUnavailable => "mediaUnavailable",
            };
            set("warning", &warning.into());
            "warning"
        }
    };
    set("type", &kind.into());
    object.into()
}
