//! # ARView WASM Application
//!
//! Binds `arview-core` to a `<model-viewer>` element and executes the core's
//! effects in the browser: haptics, downloads, timers and AR activation.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web arview-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { ArViewApp } from './pkg/arview_app.js';
//!
//! await init();
//! const app = new ArViewApp('product-viewer');
//! app.setOnChange((snapshot) => render(JSON.parse(snapshot)));
//!
//! arButton.onclick = () => app.requestAr();
//! captureButton.onclick = () => app.capture();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod platform;
mod viewer;

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use arview_core::{
    detect, Action, ArSupportProbe, CaptureService, Customization, DeviceProfile, Effect,
    FrameSource, ModelViewer, ShellConfig, ViewerArStatus, ViewerShell,
};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{CustomEvent, Event, HtmlElement};

use platform::{now_utc, schedule_timeout, BrowserDownloads, BrowserHaptics, XrProbe};
use viewer::ModelViewerElement;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    tracing::info!("ARView WASM initialized");
}

/// State shared between the app handle, event listeners and timers.
struct AppInner {
    shell: RefCell<ViewerShell>,
    viewer: ModelViewerElement,
    haptics: BrowserHaptics,
    capture: CaptureService,
    on_change: RefCell<Option<js_sys::Function>>,
}

impl AppInner {
    /// Dispatch an action, run its effects and notify the page.
    fn dispatch(self: &Rc<Self>, action: Action) {
        // The shell borrow ends with this statement; effects may dispatch again.
        let effects = self.shell.borrow_mut().dispatch(action);
        self.run_effects(effects);
        self.notify();
    }

    fn run_effects(self: &Rc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Haptic(pattern) => self.haptics.pulse(pattern),
                Effect::ActivateAr => {
                    if let Err(e) = self.viewer.activate_ar() {
                        tracing::warn!("AR activation failed: {e}");
                        self.dispatch(Action::ArStatusReported(ViewerArStatus::Failed));
                    }
                }
                Effect::ApplyCustomization(customization) => {
                    self.apply_customization(&customization);
                }
                Effect::ShowQrCode => {
                    if let Err(e) = self.viewer.show_qr_code() {
                        tracing::warn!("QR code handoff failed: {e}");
                    }
                }
                Effect::ScheduleStatusClear {
                    generation,
                    delay_ms,
                } => {
                    let weak = Rc::downgrade(self);
                    let scheduled = schedule_timeout(delay_ms, move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.dispatch(Action::StatusClearElapsed { generation });
                        }
                    });
                    if let Err(e) = scheduled {
                        tracing::warn!("Status clear timer not scheduled: {e}");
                    }
                }
                Effect::ScheduleNoticeClear {
                    generation,
                    delay_ms,
                } => {
                    let weak = Rc::downgrade(self);
                    let scheduled = schedule_timeout(delay_ms, move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.dispatch(Action::NoticeClearElapsed { generation });
                        }
                    });
                    if let Err(e) = scheduled {
                        tracing::warn!("Notice clear timer not scheduled: {e}");
                    }
                }
            }
        }
    }

    fn apply_customization(self: &Rc<Self>, customization: &Customization) {
        let (sources, ar_modes) = {
            let shell = self.shell.borrow();
            (shell.model_sources(), shell.state().config.ar_modes.clone())
        };
        if let Err(e) = self.viewer.set_sources(&sources, &ar_modes) {
            tracing::warn!("Failed to update model sources: {e}");
        }

        match self.viewer.apply_customization(customization) {
            Some(dimensions) => self.dispatch(Action::DimensionsReported {
                dimensions,
                scale: customization.scale,
            }),
            None => tracing::debug!("No measurable model, dimensions pending"),
        }
    }

    fn notify(&self) {
        let Some(callback) = self.on_change.borrow().clone() else {
            return;
        };
        let snapshot = self.snapshot_json();
        if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&snapshot)) {
            tracing::warn!("onChange callback threw: {:?}", e);
        }
    }

    fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.shell.borrow().snapshot()).unwrap_or_default()
    }
}

type Listener = Closure<dyn FnMut(Event)>;

/// The ARView application for WASM.
#[wasm_bindgen]
pub struct ArViewApp {
    inner: Rc<AppInner>,
    listeners: Vec<(&'static str, Listener)>,
}

#[wasm_bindgen]
impl ArViewApp {
    /// Create the application attached to the `<model-viewer>` with the given ID.
    ///
    /// Customization comes from the page query string. Configuration is read
    /// from the element's `data-config` attribute (JSON) when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    #[wasm_bindgen(constructor)]
    pub fn new(viewer_id: &str) -> Result<ArViewApp, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object"))?;

        let element = document
            .get_element_by_id(viewer_id)
            .ok_or_else(|| JsValue::from_str(&format!("Viewer element '{viewer_id}' not found")))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| JsValue::from_str("Viewer element is not an HTML element"))?;

        let config = element
            .get_attribute("data-config")
            .map_or_else(ShellConfig::default, |json| {
                ShellConfig::from_json(&json).unwrap_or_else(|e| {
                    tracing::warn!("Invalid data-config, using defaults: {e}");
                    ShellConfig::default()
                })
            });
        let query = window.location().search().unwrap_or_default();
        let user_agent = window.navigator().user_agent().unwrap_or_default();

        // Render optimistically; AR support is filled in when the probe resolves.
        let shell = ViewerShell::new(
            config,
            Customization::from_query(&query),
            DeviceProfile::optimistic(&user_agent),
        );

        let viewer = ModelViewerElement::new(element);
        if let Err(e) = viewer.set_sources(&shell.model_sources(), &shell.state().config.ar_modes) {
            tracing::warn!("Failed to set model sources: {e}");
        }

        let inner = Rc::new(AppInner {
            shell: RefCell::new(shell),
            viewer,
            haptics: BrowserHaptics,
            capture: CaptureService::default(),
            on_change: RefCell::new(None),
        });

        let mut app = Self {
            inner,
            listeners: Vec::new(),
        };
        app.listen("load", |inner, _| {
            inner.viewer.capture_natural_size();
            inner.dispatch(Action::ModelLoaded);
        })?;
        app.listen("error", |inner, _| {
            inner.viewer.clear_natural_size();
            inner.dispatch(Action::ModelUnloaded);
        })?;
        app.listen("ar-status", |inner, event| {
            let status = event
                .dyn_ref::<CustomEvent>()
                .and_then(|e| js_sys::Reflect::get(&e.detail(), &JsValue::from_str("status")).ok())
                .and_then(|s| s.as_string());
            match status.as_deref().map(str::parse::<ViewerArStatus>) {
                Some(Ok(status)) => inner.dispatch(Action::ArStatusReported(status)),
                Some(Err(e)) => tracing::warn!("Ignoring AR status: {e}"),
                None => tracing::warn!("ar-status event without a status"),
            }
        })?;

        spawn_capability_detection(Rc::downgrade(&app.inner), user_agent);
        Ok(app)
    }

    /// Register a callback receiving the snapshot JSON after every change.
    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, callback: js_sys::Function) {
        *self.inner.on_change.borrow_mut() = Some(callback);
        self.inner.notify();
    }

    /// Get the current render snapshot as JSON.
    #[wasm_bindgen(js_name = getSnapshotJson)]
    #[must_use]
    pub fn get_snapshot_json(&self) -> String {
        self.inner.snapshot_json()
    }

    /// The user pressed "View in AR".
    #[wasm_bindgen(js_name = requestAr)]
    pub fn request_ar(&self) {
        self.inner.dispatch(Action::ArEntryRequested);
    }

    /// The user answered the AR confirmation prompt.
    #[wasm_bindgen(js_name = confirmAr)]
    pub fn confirm_ar(&self, accepted: bool) {
        let action = if accepted {
            Action::ArConfirmed {
                can_activate: self.inner.viewer.can_activate_ar(),
            }
        } else {
            Action::ArDeclined
        };
        self.inner.dispatch(action);
    }

    /// Dismiss the current notice.
    #[wasm_bindgen(js_name = dismissNotice)]
    pub fn dismiss_notice(&self) {
        self.inner.dispatch(Action::NoticeDismissed);
    }

    /// Replace the customization from a query string (`?color=...&scale=...`).
    #[wasm_bindgen(js_name = setCustomizationQuery)]
    pub fn set_customization_query(&self, query: &str) {
        self.inner
            .dispatch(Action::CustomizationChanged(Customization::from_query(query)));
    }

    /// Capture the current frame and download it as PNG.
    ///
    /// Resolves to the file name on success. Failures are reported through
    /// the snapshot's capture message; the promise then rejects with the
    /// error text.
    pub fn capture(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        let ticket = inner.shell.borrow_mut().begin_capture();
        inner.notify();

        wasm_bindgen_futures::future_to_promise(async move {
            let frame: &dyn FrameSource = &inner.viewer;
            let outcome = inner
                .capture
                .capture(Some(frame), &BrowserDownloads, now_utc())
                .await
                .map_err(|e| e.to_string());

            let reply = match &outcome {
                Ok(artifact) => Ok(JsValue::from_str(&artifact.file_name)),
                Err(e) => Err(JsValue::from_str(e)),
            };
            inner.dispatch(Action::CaptureFinished { ticket, outcome });
            reply
        })
    }
}

impl ArViewApp {
    fn listen(
        &mut self,
        event_name: &'static str,
        handler: impl Fn(&Rc<AppInner>, &Event) + 'static,
    ) -> Result<(), JsValue> {
        let weak: Weak<AppInner> = Rc::downgrade(&self.inner);
        let closure: Listener = Closure::new(move |event: Event| {
            if let Some(inner) = weak.upgrade() {
                handler(&inner, &event);
            }
        });
        self.inner
            .viewer
            .element()
            .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
        self.listeners.push((event_name, closure));
        Ok(())
    }
}

impl Drop for ArViewApp {
    fn drop(&mut self) {
        let element = self.inner.viewer.element();
        for (event_name, closure) in &self.listeners {
            if let Err(e) = element
                .remove_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())
            {
                tracing::warn!("Failed to remove {event_name} listener: {:?}", e);
            }
        }
    }
}

fn spawn_capability_detection(inner: Weak<AppInner>, user_agent: String) {
    wasm_bindgen_futures::spawn_local(async move {
        let probe = XrProbe::from_navigator();
        let profile = detect(&user_agent, probe.as_ref().map(|p| p as &dyn ArSupportProbe)).await;
        if let Some(inner) = inner.upgrade() {
            inner.dispatch(Action::CapabilitiesDetected(profile));
        }
    });
}
