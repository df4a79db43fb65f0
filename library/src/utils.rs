use std::future::Future;

#[cfg(target_arch = "wasm32")]
pub(crate) fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Run a future on the current thread's executor.
#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn_local<F: Future<Output = ()> + 'static>(future: F) {
    wasm_bindgen_futures::spawn_local(future);
}

/// Run a future on the current thread's executor.
///
/// Outside the browser the client has to live inside a `tokio::task::LocalSet`.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn_local<F: Future<Output = ()> + 'static>(future: F) {
    drop(tokio::task::spawn_local(future));
}
