//! Interactive preview of an image field
//!
//! Applies a `PreviewPlan` to a DOM container. PDF values are turned into
//! an image by a caller-supplied rasterizer; results are cached per value
//! so re-renders of the same field do not rasterize again.

use embed_core::{ImageSource, PreviewPlan, RenderMode, Schema};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Document, Event, HtmlElement, HtmlImageElement};

struct PreviewState {
    placeholder: Option<String>,
    rasterizer: Option<js_sys::Function>,
    rasterized: HashMap<String, String>,
    /// Listeners attached by the latest render; replacing them drops the old ones
    listeners: Vec<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
pub struct ImagePreview {
    state: Rc<RefCell<PreviewState>>,
}

#[wasm_bindgen]
impl ImagePreview {
    /// `placeholder` is shown as the container background while the field is empty
    #[wasm_bindgen(constructor)]
    pub fn new(placeholder: Option<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(PreviewState {
                placeholder,
                rasterizer: None,
                rasterized: HashMap::new(),
                listeners: Vec::new(),
            })),
        }
    }

    /// Set the PDF rasterizer
    /// Callback signature: (dataUrl: string) => Promise<string>
    #[wasm_bindgen(js_name = setRasterizer)]
    pub fn set_rasterizer(&self, rasterizer: js_sys::Function) {
        self.state.borrow_mut().rasterizer = Some(rasterizer);
    }

    #[wasm_bindgen(js_name = getCachedCount)]
    pub fn get_cached_count(&self) -> usize {
        self.state.borrow().rasterized.len()
    }

    #[wasm_bindgen(js_name = clearCache)]
    pub fn clear_cache(&self) {
        self.state.borrow_mut().rasterized.clear();
    }

    /// Render `value` into `container`.
    ///
    /// `mode` is `"designer"`, `"form"` or `"viewer"`. `on_change` is called
    /// with `""` when the user removes the image. The returned promise
    /// resolves once the image is in place.
    pub fn render(
        &self,
        value: String,
        schema_json: &str,
        container: HtmlElement,
        mode: &str,
        on_change: js_sys::Function,
    ) -> Result<js_sys::Promise, JsValue> {
        let schema: Schema = serde_json::from_str(schema_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid schema: {}", e)))?;
        let mode = parse_mode(mode).map_err(|e| JsValue::from_str(&e))?;

        let plan = {
            let state = self.state.borrow();
            PreviewPlan::build(&value, &schema, mode, state.placeholder.as_deref())
        };
        let state = Rc::clone(&self.state);

        Ok(future_to_promise(async move {
            apply_plan(&state, &plan, &container, on_change).await?;
            Ok(JsValue::UNDEFINED)
        }))
    }
}

pub(crate) fn parse_mode(mode: &str) -> Result<RenderMode, String> {
    serde_json::from_value(serde_json::Value::String(mode.to_string()))
        .map_err(|_| format!("Unknown render mode: {}", mode))
}

fn document() -> Result<Document, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
    window
        .document()
        .ok_or_else(|| JsValue::from_str("No document object available"))
}

async fn apply_plan(
    state: &Rc<RefCell<PreviewState>>,
    plan: &PreviewPlan,
    container: &HtmlElement,
    on_change: js_sys::Function,
) -> Result<(), JsValue> {
    // Resolve the image source first so a slow rasterizer leaves the old
    // preview in place until the new one is ready.
    let src = match &plan.image {
        Some(source) => Some(image_src(state, source).await?),
        None => None,
    };

    let document = document()?;
    let mut listeners = Vec::new();

    container.set_inner_html("");
    let style = container.style();
    style.set_property("position", "relative")?;
    match &plan.background {
        Some(url) => {
            style.set_property("background-image", &format!("url(\"{}\")", url))?;
            style.set_property("background-size", "contain")?;
            style.set_property("background-repeat", "no-repeat")?;
            style.set_property("background-position", "center")?;
        }
        None => {
            style.remove_property("background-image")?;
        }
    }

    if let Some(src) = src {
        let img: HtmlImageElement = document.create_element("img")?.dyn_into()?;
        img.set_src(&src);
        let img_style = img.style();
        img_style.set_property("width", "100%")?;
        img_style.set_property("height", "100%")?;
        img_style.set_property("object-fit", "contain")?;
        container.append_child(&img)?;
    }

    if plan.remove_button {
        let button = document.create_element("button")?;
        button.set_text_content(Some("x"));
        button.set_class_name("embed-remove-button");
        if let Some(html_element) = button.dyn_ref::<HtmlElement>() {
            let style = html_element.style();
            style.set_property("position", "absolute")?;
            style.set_property("top", "0")?;
            style.set_property("left", "0")?;

            let on_remove = Closure::wrap(Box::new(move |_event: Event| {
                let _ = on_change.call1(&JsValue::NULL, &JsValue::from_str(""));
            }) as Box<dyn FnMut(_)>);
            html_element.set_onclick(Some(on_remove.as_ref().unchecked_ref()));
            listeners.push(on_remove);
        }
        container.append_child(&button)?;
    }

    if plan.stop_click_propagation {
        let stop = Closure::wrap(Box::new(|event: Event| {
            event.stop_propagation();
        }) as Box<dyn FnMut(_)>);
        container.set_onclick(Some(stop.as_ref().unchecked_ref()));
        listeners.push(stop);
    } else {
        container.set_onclick(None);
    }

    state.borrow_mut().listeners = listeners;
    Ok(())
}

async fn image_src(
    state: &Rc<RefCell<PreviewState>>,
    source: &ImageSource,
) -> Result<String, JsValue> {
    let value = match source {
        ImageSource::Direct(src) => return Ok(src.clone()),
        ImageSource::RasterizePdf(value) => value,
    };

    let rasterizer = {
        let state = state.borrow();
        if let Some(cached) = state.rasterized.get(value) {
            return Ok(cached.clone());
        }
        state
            .rasterizer
            .clone()
            .ok_or_else(|| JsValue::from_str("No PDF rasterizer configured"))?
    };

    let promise: js_sys::Promise = rasterizer
        .call1(&JsValue::NULL, &JsValue::from_str(value))?
        .dyn_into()?;
    let result = JsFuture::from(promise).await?;
    let src = result
        .as_string()
        .ok_or_else(|| JsValue::from_str("Rasterizer did not return a string"))?;

    state
        .borrow_mut()
        .rasterized
        .insert(value.clone(), src.clone());
    Ok(src)
}
