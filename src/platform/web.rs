//! Browser glue
//!
//! Timers, input listeners, synthetic events, spec fetching and the
//! telemetry beacon. Everything here is thin; behavior lives in the engine.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Event, EventTarget, Headers, KeyboardEvent, KeyboardEventInit, PointerEvent, PointerEventInit,
    Request, RequestCache, RequestInit, Response,
};

use crate::replay::{EdgeKind, RawInput, Scheduler, SyntheticInput, TimerId};
use crate::telemetry::{FlushReason, LogSink, TelemetrySink, TelemetrySnapshot};

fn js_err(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Page query string, including the leading `?`
pub fn location_search() -> String {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

/// `window.setTimeout` backed scheduler
#[derive(Debug, Default, Clone, Copy)]
pub struct WebScheduler;

impl Scheduler for WebScheduler {
    fn set_timeout(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId {
        let Some(window) = web_sys::window() else {
            log::error!("No window, timer dropped");
            return 0;
        };
        let closure = Closure::once_into_js(move || callback());
        let delay = delay_ms.min(i32::MAX as u64) as i32;
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.unchecked_ref(),
            delay,
        ) {
            Ok(handle) => handle as TimerId,
            Err(e) => {
                log::error!("setTimeout failed: {}", js_err(e));
                0
            }
        }
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(id as i32);
        }
    }
}

/// Dispatches synthetic DOM events on the document
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSynthetic;

impl WebSynthetic {
    fn dispatch(event: &Event) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Err(e) = document.dispatch_event(event) {
            log::debug!("Synthetic dispatch failed: {}", js_err(e));
        }
    }
}

impl SyntheticInput for WebSynthetic {
    fn key(&mut self, kind: EdgeKind, code: &str, key: &str) {
        let init = KeyboardEventInit::new();
        init.set_code(code);
        init.set_key(key);
        init.set_bubbles(true);
        let name = match kind {
            EdgeKind::Down => "keydown",
            EdgeKind::Up => "keyup",
        };
        match KeyboardEvent::new_with_keyboard_event_init_dict(name, &init) {
            Ok(event) => Self::dispatch(&event),
            Err(e) => log::debug!("KeyboardEvent construction failed: {}", js_err(e)),
        }
    }

    fn pointer(&mut self, kind: EdgeKind, pos: Vec2) {
        let init = PointerEventInit::new();
        init.set_client_x(pos.x as i32);
        init.set_client_y(pos.y as i32);
        init.set_bubbles(true);
        let name = match kind {
            EdgeKind::Down => "pointerdown",
            EdgeKind::Up => "pointerup",
        };
        match PointerEvent::new_with_event_init_dict(name, &init) {
            Ok(event) => Self::dispatch(&event),
            Err(e) => log::debug!("PointerEvent construction failed: {}", js_err(e)),
        }
    }
}

type Listener = (&'static str, Closure<dyn FnMut(Event)>);

/// Raw input handler: the edge and its wall-clock timestamp
pub type InputHandler = Rc<RefCell<dyn FnMut(RawInput<'_>, u64)>>;

/// Keyboard, pointer and touch listeners on the window. Detaches on drop.
pub struct WindowInput {
    target: Option<EventTarget>,
    listeners: Vec<Listener>,
}

impl WindowInput {
    pub fn attach(handler: InputHandler) -> Self {
        let mut input = Self {
            target: None,
            listeners: Vec::new(),
        };
        let Some(window) = web_sys::window() else {
            return input;
        };
        let target: EventTarget = window.into();

        let edges = [
            ("keydown", EdgeKind::Down),
            ("keyup", EdgeKind::Up),
            ("pointerdown", EdgeKind::Down),
            ("pointerup", EdgeKind::Up),
            ("touchstart", EdgeKind::Down),
            ("touchend", EdgeKind::Up),
        ];

        for (name, kind) in edges {
            let handler = handler.clone();
            let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let key_code = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::code);
                let raw = match (name, key_code.as_deref()) {
                    (_, Some(code)) => RawInput::Key { code, kind },
                    ("touchstart" | "touchend", None) => RawInput::Touch(kind),
                    _ => RawInput::Pointer(kind),
                };
                (handler.borrow_mut())(raw, js_sys::Date::now() as u64);
            });
            if let Err(e) =
                target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            {
                log::warn!("Failed to attach {} listener: {}", name, js_err(e));
                continue;
            }
            input.listeners.push((name, closure));
        }
        input.target = Some(target);
        input
    }

    pub fn detach(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };
        for (name, closure) in self.listeners.drain(..) {
            let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for WindowInput {
    fn drop(&mut self) {
        self.detach();
    }
}

/// GET a JSON document, bypassing the HTTP cache
pub async fn fetch_json(url: &str) -> Result<serde_json::Value, String> {
    let window = web_sys::window().ok_or("no window")?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_cache(RequestCache::NoStore);
    let request = Request::new_with_str_and_init(url, &init).map_err(js_err)?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_err)?;
    let response: Response = response.dyn_into().map_err(js_err)?;
    if !response.ok() {
        return Err(format!("{} returned {}", url, response.status()));
    }

    let body = JsFuture::from(response.text().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    let body = body.as_string().ok_or("response body is not text")?;
    serde_json::from_str(&body).map_err(|e| e.to_string())
}

/// Telemetry endpoint baked in at build time
pub const TELEMETRY_URL: Option<&str> = option_env!("SPEC_RUNNER_TELEMETRY_URL");

/// POSTs snapshots as JSON. Lifecycle flushes go through `sendBeacon` so
/// they survive unload. Without an endpoint, snapshots go to the log.
#[derive(Debug, Clone, Copy)]
pub struct BeaconSink {
    endpoint: Option<&'static str>,
}

impl BeaconSink {
    pub fn from_env() -> Self {
        if TELEMETRY_URL.is_none() {
            log::info!("[Telemetry] No SPEC_RUNNER_TELEMETRY_URL configured, using console output");
        }
        Self {
            endpoint: TELEMETRY_URL,
        }
    }

    fn post(endpoint: &str, body: &str) -> Result<js_sys::Promise, String> {
        let window = web_sys::window().ok_or("no window")?;
        let headers = Headers::new().map_err(js_err)?;
        headers.set("Content-Type", "application/json").map_err(js_err)?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(body));
        let request = Request::new_with_str_and_init(endpoint, &init).map_err(js_err)?;
        Ok(window.fetch_with_request(&request))
    }
}

impl TelemetrySink for BeaconSink {
    fn send(&self, snapshot: &TelemetrySnapshot, reason: FlushReason) {
        let Some(endpoint) = self.endpoint else {
            LogSink.send(snapshot, reason);
            return;
        };
        let body = match serde_json::to_string(snapshot) {
            Ok(body) => body,
            Err(e) => {
                log::error!("[Telemetry] Failed to serialize snapshot: {}", e);
                return;
            }
        };

        if reason == FlushReason::Lifecycle {
            let queued = web_sys::window()
                .map(|w| w.navigator())
                .and_then(|n| n.send_beacon_with_opt_str(endpoint, Some(&body)).ok())
                .unwrap_or(false);
            if queued {
                log::info!("[Telemetry] Beacon queued: {}", reason.as_str());
            } else {
                log::error!("[Telemetry] Failed to queue beacon");
                log::info!("[Telemetry] Data (fallback to console): {}", body);
            }
            return;
        }

        match Self::post(endpoint, &body) {
            Ok(promise) => {
                let reason = reason.as_str();
                wasm_bindgen_futures::spawn_local(async move {
                    match JsFuture::from(promise).await {
                        Ok(_) => log::info!("[Telemetry] Data sent successfully: {}", reason),
                        Err(e) => {
                            log::error!("[Telemetry] Failed to send data: {}", js_err(e));
                            log::info!("[Telemetry] Data (fallback to console): {}", body);
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("[Telemetry] Failed to send data: {}", e);
                log::info!("[Telemetry] Data (fallback to console): {}", body);
            }
        }
    }
}

/// Call `on_hide` when the tab is hidden or the page is being unloaded
pub fn on_page_hidden(on_hide: impl FnMut() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let on_hide = Rc::new(RefCell::new(on_hide));

    // Visibility change (tab switch, minimize)
    {
        let on_hide = on_hide.clone();
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                (on_hide.borrow_mut())();
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // Page unload
    {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            (on_hide.borrow_mut())();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
