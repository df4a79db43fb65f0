use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::{Function, Promise};
use log::{debug, error, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Event;

use crate::utils::spawn_local;
use crate::web::utils::describe;
use crate::web::BrowserClient;
use crate::{ConnectionState, Error, Prediction};

/// Leave the call when the page is closed or reloaded.
pub(crate) fn set_window_on_beforeunload(client: BrowserClient) -> crate::Result<()> {
    let window =
        web_sys::window().ok_or_else(|| Error::Browser("no window available".to_owned()))?;
    let on_beforeunload: Box<dyn FnMut(Event)> = Box::new(move |_| client.unload());
    let on_beforeunload = Closure::wrap(on_beforeunload);
    window
        .add_event_listener_with_callback("beforeunload", on_beforeunload.as_ref().unchecked_ref())
        .map_err(|err| Error::Browser(describe(&err)))?;
    on_beforeunload.forget();
    Ok(())
}

/// Periodic classification of the local video while connected.
pub(crate) struct ContentMonitor {
    handle: i32,
    _on_tick: Closure<dyn FnMut()>,
}

impl ContentMonitor {
    /// Calls `classify` every `interval`. It must return predictions or a
    /// promise of them, shaped like `[{ className, probability }]`.
    ///
    /// A tick is skipped while the previous classification is still running.
    pub(crate) fn start(
        client: BrowserClient,
        classify: Function,
        interval: Duration,
    ) -> crate::Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| Error::Browser("no window available".to_owned()))?;
        let in_flight = Rc::new(Cell::new(false));
        let on_tick: Box<dyn FnMut()> = Box::new(move || {
            if client.connection_state() != ConnectionState::Connected || in_flight.get() {
                return;
            }
            let predictions = match classify.call0(&JsValue::NULL) {
                Ok(predictions) => Promise::resolve(&predictions),
                Err(err) => {
                    error!("classifier threw: {}", describe(&err));
                    return;
                }
            };
            in_flight.set(true);
            let reviewer = client.clone();
            let in_flight = Rc::clone(&in_flight);
            spawn_local(async move {
                match JsFuture::from(predictions).await {
                    Ok(value) => match serde_wasm_bindgen::from_value::<Vec<Prediction>>(value) {
                        Ok(predictions) => {
                            if reviewer.review_predictions(&predictions).await {
                                debug!("classifier triggered a cutoff");
                            }
                        }
                        Err(err) => warn!("unexpected classifier output: {}", err),
                    },
                    Err(err) => error!("classification failed: {}", describe(&err)),
                }
                in_flight.set(false);
            });
        });
        let on_tick = Closure::wrap(on_tick);
        let millis = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
        let handle = window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                on_tick.as_ref().unchecked_ref(),
                millis,
            )
            .map_err(|err| Error::Browser(describe(&err)))?;
        Ok(Self {
            handle,
            _on_tick: on_tick,
        })
    }
}

impl Drop for ContentMonitor {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}
