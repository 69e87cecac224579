//! `<model-viewer>` element adapter.
//!
//! Only the element's public API is used: attributes, `model.materials`,
//! `getDimensions()`, `canActivateAR`, `activateAR()` and `toBlob()`.

use std::cell::{Cell, RefCell};

use arview_core::{
    ArViewError, ArViewResult, Customization, Dimensions, FrameSource, ModelSources, ModelViewer,
};
use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, CustomEvent, CustomEventInit, HtmlElement};

use crate::platform::js_error;

/// Event dispatched on the element when a desktop user asks for AR.
pub(crate) const SHOW_QR_EVENT: &str = "arview-show-qr";

pub(crate) struct ModelViewerElement {
    element: HtmlElement,
    /// Bounding box at scale 1, captured on load.
    natural: RefCell<Option<Dimensions>>,
    /// Scale last written to the `scale` attribute.
    applied_scale: Cell<f64>,
}

impl ModelViewerElement {
    pub(crate) fn new(element: HtmlElement) -> Self {
        Self {
            element,
            natural: RefCell::new(None),
            applied_scale: Cell::new(1.0),
        }
    }

    pub(crate) fn element(&self) -> &HtmlElement {
        &self.element
    }

    fn get(&self, name: &str) -> Option<JsValue> {
        Reflect::get(&self.element, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }

    fn call(target: &JsValue, name: &str, args: &Array) -> ArViewResult<JsValue> {
        let method = Reflect::get(target, &JsValue::from_str(name))
            .map_err(|e| js_error(name, &e))?
            .dyn_into::<Function>()
            .map_err(|_| ArViewError::Platform(format!("{name} is not a function")))?;
        Reflect::apply(&method, target, args).map_err(|e| js_error(name, &e))
    }

    /// Point the element at the model URLs and enable AR.
    pub(crate) fn set_sources(&self, sources: &ModelSources, ar_modes: &str) -> ArViewResult<()> {
        for (name, value) in [
            ("src", sources.src.as_str()),
            ("ios-src", sources.ios_src.as_str()),
            ("ar", ""),
            ("ar-modes", ar_modes),
        ] {
            self.element
                .set_attribute(name, value)
                .map_err(|e| js_error("setAttribute failed", &e))?;
        }
        Ok(())
    }

    /// Record the model's unscaled size. Call on every `load` event.
    pub(crate) fn capture_natural_size(&self) {
        let measured = Self::call(&self.element, "getDimensions", &Array::new())
            .ok()
            .and_then(|v| read_vector(&v));
        let scale = self.applied_scale.get();
        *self.natural.borrow_mut() = measured.map(|d| d.scaled(1.0 / scale));
        tracing::debug!(natural = ?self.natural.borrow(), "Model size captured");
    }

    /// Forget the model size after a load error.
    pub(crate) fn clear_natural_size(&self) {
        *self.natural.borrow_mut() = None;
    }

    /// Ask the page to show its QR-code handoff for the current URL.
    pub(crate) fn show_qr_code(&self) -> ArViewResult<()> {
        let href = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default();
        let init = CustomEventInit::new();
        init.set_bubbles(true);
        init.set_detail(&JsValue::from_str(&href));
        let event = CustomEvent::new_with_event_init_dict(SHOW_QR_EVENT, &init)
            .map_err(|e| js_error("CustomEvent failed", &e))?;
        self.element
            .dispatch_event(&event)
            .map_err(|e| js_error("dispatchEvent failed", &e))?;
        Ok(())
    }

    fn apply_materials(&self, customization: &Customization) {
        let Some(materials) = self
            .get("model")
            .and_then(|model| Reflect::get(&model, &JsValue::from_str("materials")).ok())
            .and_then(|m| m.dyn_into::<Array>().ok())
        else {
            return;
        };

        let color = customization.base_color_factor();
        let pbr_factors = customization.material.pbr_factors();

        for material in materials.iter() {
            let Ok(pbr) = Reflect::get(&material, &JsValue::from_str("pbrMetallicRoughness")) else {
                continue;
            };
            if let Some(rgba) = color {
                let factor: Array = rgba.iter().map(|c| JsValue::from(*c)).collect();
                if let Err(e) = Self::call(&pbr, "setBaseColorFactor", &Array::of1(&factor)) {
                    tracing::warn!("Failed to set base color: {e}");
                }
            }
            if let Some((metallic, roughness)) = pbr_factors {
                let results = [
                    Self::call(&pbr, "setMetallicFactor", &Array::of1(&metallic.into())),
                    Self::call(&pbr, "setRoughnessFactor", &Array::of1(&roughness.into())),
                ];
                for result in results {
                    if let Err(e) = result {
                        tracing::warn!("Failed to set material factor: {e}");
                    }
                }
            }
        }
    }
}

fn read_vector(value: &JsValue) -> Option<Dimensions> {
    let axis = |name: &str| {
        Reflect::get(value, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_f64())
    };
    Some(Dimensions::new(axis("x")?, axis("y")?, axis("z")?))
}

#[async_trait(?Send)]
impl FrameSource for ModelViewerElement {
    async fn to_png(&self) -> ArViewResult<Vec<u8>> {
        let options = Object::new();
        Reflect::set(
            &options,
            &JsValue::from_str("mimeType"),
            &JsValue::from_str("image/png"),
        )
        .map_err(|e| js_error("toBlob options", &e))?;

        let promise: Promise = Self::call(&self.element, "toBlob", &Array::of1(&options))?
            .dyn_into()
            .map_err(|_| ArViewError::Capture("toBlob did not return a promise".into()))?;
        let blob: Blob = JsFuture::from(promise)
            .await
            .map_err(|e| ArViewError::Capture(js_error("toBlob rejected", &e).to_string()))?
            .dyn_into()
            .map_err(|_| ArViewError::Capture("toBlob did not produce a Blob".into()))?;
        let buffer = JsFuture::from(blob.array_buffer())
            .await
            .map_err(|e| ArViewError::Capture(js_error("arrayBuffer rejected", &e).to_string()))?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

impl ModelViewer for ModelViewerElement {
    fn can_activate_ar(&self) -> bool {
        self.get("canActivateAR")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn activate_ar(&self) -> ArViewResult<()> {
        if !self.can_activate_ar() {
            return Err(ArViewError::ArUnavailable);
        }
        // The returned promise is ignored; failures arrive as an `ar-status` event.
        Self::call(&self.element, "activateAR", &Array::new()).map(|_| ())
    }

    fn apply_customization(&self, customization: &Customization) -> Option<Dimensions> {
        self.get("model")?;
        self.apply_materials(customization);

        // The model keeps its last valid scale and has no measurable size.
        if !customization.has_valid_scale() {
            tracing::warn!(scale = customization.scale, "Scale not applied to viewer");
            return None;
        }
        let s = customization.scale;
        if let Err(e) = self.element.set_attribute("scale", &format!("{s} {s} {s}")) {
            tracing::warn!("Failed to set scale: {:?}", e);
        } else {
            self.applied_scale.set(s);
        }

        let natural = (*self.natural.borrow())?;
        Some(natural.scaled(s))
    }
}
