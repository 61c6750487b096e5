//! Designer session
//!
//! Holds one template and its sample inputs in Rust memory. Every
//! operation goes through an explicit session object, so several
//! independent designers can live on one page.

use crate::parse_schema_type;
use embed_core::{codec, generate, get_page_count, BasePdf, Schema, Template};
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

/// A4 in millimetres
const BLANK_WIDTH_MM: f64 = 210.0;
const BLANK_HEIGHT_MM: f64 = 297.0;

/// Payload handed to the file transport for download or upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFile {
    pub file_name: String,
    pub data: String,
}

#[wasm_bindgen]
pub struct DesignerSession {
    template: Template,
    base_page_count: Option<usize>,
    inputs: BTreeMap<String, String>,
}

impl Default for DesignerSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl DesignerSession {
    /// Start with a blank A4 template
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            template: Template::new(BasePdf::Blank {
                width: BLANK_WIDTH_MM,
                height: BLANK_HEIGHT_MM,
            }),
            base_page_count: None,
            inputs: BTreeMap::new(),
        }
    }

    /// Use `bytes` as the base PDF. Returns its page count.
    #[wasm_bindgen(js_name = loadBasePdf)]
    pub fn load_base_pdf(&mut self, bytes: &[u8]) -> Result<u32, JsValue> {
        self.load_base_pdf_internal(bytes)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Add or replace a field from its JSON schema
    #[wasm_bindgen(js_name = addSchema)]
    pub fn add_schema(
        &mut self,
        page: usize,
        name: &str,
        schema_json: &str,
    ) -> Result<(), JsValue> {
        let schema: Schema = serde_json::from_str(schema_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid schema: {}", e)))?;
        self.add_schema_internal(page, name, schema)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Add a field with the default schema for its type
    #[wasm_bindgen(js_name = addDefaultSchema)]
    pub fn add_default_schema(
        &mut self,
        page: usize,
        name: &str,
        schema_type: &str,
    ) -> Result<(), JsValue> {
        let schema_type = parse_schema_type(schema_type).map_err(|e| JsValue::from_str(&e))?;
        self.add_schema_internal(page, name, Schema::default_for(schema_type))
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = removeSchema)]
    pub fn remove_schema(&mut self, page: usize, name: &str) -> Result<(), JsValue> {
        self.remove_schema_internal(page, name)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Set a field's value. An empty string clears the field.
    #[wasm_bindgen(js_name = setInput)]
    pub fn set_input(&mut self, name: &str, value: &str) {
        self.inputs.insert(name.to_string(), value.to_string());
    }

    #[wasm_bindgen(js_name = getInput)]
    pub fn get_input(&self, name: &str) -> Option<String> {
        self.inputs.get(name).cloned()
    }

    /// The template as JSON
    #[wasm_bindgen(js_name = getTemplate)]
    pub fn get_template(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.template)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = getFieldCount)]
    pub fn get_field_count(&self) -> usize {
        self.template.schemas.iter().map(BTreeMap::len).sum()
    }

    /// Generate the document and return `{ fileName, data }`
    pub fn save(&self, name: &str) -> Result<JsValue, JsValue> {
        let saved = self.save_internal(name).map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&saved)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl DesignerSession {
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Internal method to load a base PDF (testable without JsValue)
    pub fn load_base_pdf_internal(&mut self, bytes: &[u8]) -> Result<u32, String> {
        let page_count = get_page_count(bytes).map_err(|e| e.to_string())?;
        if page_count == 0 {
            return Err("Base PDF has no pages".to_string());
        }

        self.template.base_pdf = BasePdf::DataUrl(codec::encode(Some(bytes)));
        // Fields on pages the new base lacks cannot be drawn
        self.template.schemas.truncate(page_count as usize);
        self.base_page_count = Some(page_count as usize);
        Ok(page_count)
    }

    pub fn add_schema_internal(
        &mut self,
        page: usize,
        name: &str,
        schema: Schema,
    ) -> Result<(), String> {
        if name.is_empty() {
            return Err("Field name must not be empty".to_string());
        }
        if let Some(count) = self.base_page_count {
            if page >= count {
                return Err(format!(
                    "Page {} is out of range (base PDF has {} pages)",
                    page, count
                ));
            }
        }
        self.template.set_schema(page, name, schema);
        Ok(())
    }

    pub fn remove_schema_internal(&mut self, page: usize, name: &str) -> Result<(), String> {
        self.template
            .remove_schema(page, name)
            .ok_or_else(|| format!("No field {} on page {}", name, page))?;
        // Fields with the same name on other pages share one input
        let still_used = self
            .template
            .schemas
            .iter()
            .any(|page_schemas| page_schemas.contains_key(name));
        if !still_used {
            self.inputs.remove(name);
        }
        Ok(())
    }

    pub fn save_internal(&self, name: &str) -> Result<SavedFile, String> {
        let inputs = vec![self.inputs.clone()];
        let bytes = generate(&self.template, &inputs).map_err(|e| e.to_string())?;
        Ok(SavedFile {
            file_name: format!("{}.pdf", name),
            data: codec::encode(Some(bytes.as_slice())),
        })
    }
}
