/*!
Browser implementations of the media and signaling seams, plus a JavaScript facing
[`StrangerChat`] object that wires them to a [`Client`](crate::Client).
*/

mod bindings;
mod callbacks;
mod media;
mod utils;
mod websocket;

pub use bindings::{init_logger, StrangerChat};
pub use media::{BrowserMediaEngine, RtcTransport};
pub use websocket::WebSocketChannel;

/// Client running in a browser page.
pub type BrowserClient = crate::Client<WebSocketChannel, BrowserMediaEngine>;
