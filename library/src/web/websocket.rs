use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use log::{debug, error, warn};
use stranger_chat_protocol::{decode, encode, SignalMessage};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use crate::channel::{MessageHandler, SignalingChannel};
use crate::web::utils::describe;
use crate::Error;

type OnMessage = Closure<dyn FnMut(MessageEvent)>;

/// [`SignalingChannel`] over a browser `WebSocket` carrying JSON text frames.
///
/// Clones share the same socket and handler.
#[derive(Clone)]
pub struct WebSocketChannel {
    websocket: WebSocket,
    on_message: Rc<RefCell<Option<OnMessage>>>,
}

impl WebSocketChannel {
    /// Open a connection to the rendezvous server.
    ///
    /// # Errors
    /// [`Error::Channel`] if the URL is rejected by the browser.
    pub fn new(signaling_server_url: &str) -> crate::Result<Self> {
        let websocket = WebSocket::new(signaling_server_url).map_err(|err| {
            Error::Channel(format!(
                "failed to create connection with signaling server on {}: {}",
                signaling_server_url,
                describe(&err)
            ))
        })?;

        let on_close: Box<dyn FnMut(CloseEvent)> = Box::new(|event: CloseEvent| {
            warn!(
                "signaling connection closed: code {}, reason {:?}",
                event.code(),
                event.reason()
            );
        });
        let on_close = Closure::wrap(on_close);
        websocket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();

        Ok(Self {
            websocket,
            on_message: Rc::new(RefCell::new(None)),
        })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.websocket.ready_state() == WebSocket::OPEN
    }

    /// Resolves once the socket is open.
    ///
    /// # Errors
    /// [`Error::Channel`] if the connection fails before opening.
    pub async fn opened(&self) -> crate::Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let websocket = self.websocket.clone();
        let promise = Promise::new(&mut |resolve, reject| {
            websocket.set_onopen(Some(&resolve));
            websocket.set_onerror(Some(&reject));
        });
        let result = JsFuture::from(promise).await;
        self.websocket.set_onopen(None);
        self.websocket.set_onerror(None);
        result
            .map(drop)
            .map_err(|err| Error::Channel(format!("signaling connection failed: {}", describe(&err))))
    }
}

impl SignalingChannel for WebSocketChannel {
    fn send(&self, message: &SignalMessage) -> crate::Result<()> {
        if !self.is_open() {
            return Err(Error::Channel("signaling connection is not open".to_owned()));
        }
        let frame = encode(message)?;
        self.websocket
            .send_with_str(&frame)
            .map_err(|err| Error::Channel(format!("failed to send frame: {}", describe(&err))))
    }

    fn on_message(&self, mut handler: MessageHandler) {
        let on_message: Box<dyn FnMut(MessageEvent)> = Box::new(move |ev: MessageEvent| {
            let Some(frame) = ev.data().as_string() else {
                error!("received a non-text frame from the signaling server");
                return;
            };
            match decode(&frame) {
                Ok(message) => {
                    debug!("received `{}` message", message.kind());
                    handler(message);
                }
                Err(err) => warn!("dropping frame: {}", err),
            }
        });
        let on_message = Closure::wrap(on_message);
        self.websocket
            .set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        // the previous closure is only released once the socket no longer refers to it
        drop(self.on_message.borrow_mut().replace(on_message));
    }
}
