//! WASM bindings for image field embedding
//!
//! The designer page keeps its template in a `DesignerSession` and draws
//! field previews through `ImagePreview`. Generation runs in Rust; the page
//! only handles DOM events, the PDF rasterizer and file transport.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { DesignerSession, ImagePreview } from './pkg/embed_web_wasm.js';
//!
//! await init();
//!
//! const session = new DesignerSession();
//! session.loadBasePdf(bytes);
//! session.addDefaultSchema(0, "logo", "image");
//! session.setInput("logo", imageDataUrl);
//! const { fileName, data } = session.save("invoice");
//!
//! const preview = new ImagePreview(placeholderUrl);
//! preview.setRasterizer((dataUrl) => pdfToImage(dataUrl));
//! await preview.render(value, schemaJson, container, "designer", onChange);
//! ```

pub mod preview;
pub mod session;

use embed_core::{codec, GenerateJob, Schema, SchemaType};
use wasm_bindgen::prelude::*;

pub use preview::ImagePreview;
pub use session::DesignerSession;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Encode a PDF buffer as a `data:application/pdf;base64,` string
#[wasm_bindgen(js_name = encodeBuffer)]
pub fn encode_buffer(bytes: Option<Vec<u8>>) -> String {
    codec::encode(bytes.as_deref())
}

/// Decode any base64 data URL back to bytes
#[wasm_bindgen(js_name = decodeDataUrl)]
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, JsValue> {
    codec::decode(data_url).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Generate a PDF from a `{ template, inputs }` JSON job
#[wasm_bindgen(js_name = generatePdf)]
pub fn generate_pdf(job_json: &str) -> Result<Vec<u8>, JsValue> {
    GenerateJob::from_json(job_json)
        .and_then(|job| job.run())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Prop-panel defaults for `"image"` or `"readOnlyImage"`
#[wasm_bindgen(js_name = defaultSchema)]
pub fn default_schema(schema_type: &str) -> Result<JsValue, JsValue> {
    let schema_type = parse_schema_type(schema_type).map_err(|e| JsValue::from_str(&e))?;
    let schema = Schema::default_for(schema_type);
    serde_wasm_bindgen::to_value(&schema)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn parse_schema_type(name: &str) -> Result<SchemaType, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("Unknown schema type: {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_type() {
        assert_eq!(parse_schema_type("image").unwrap(), SchemaType::Image);
        assert_eq!(
            parse_schema_type("readOnlyImage").unwrap(),
            SchemaType::ReadOnlyImage
        );
        assert!(parse_schema_type("text").is_err());
    }

    #[test]
    fn test_encode_buffer_absent() {
        assert_eq!(encode_buffer(None), "data:application/pdf;base64,");
    }
}
