//! Schema and template model
//!
//! A schema describes where one placeable object sits on a page. All
//! geometry is in millimetres with a top-left origin, matching the designer.

use crate::codec::{self, PNG_MIME};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_OPACITY: f64 = 1.0;
pub const DEFAULT_WIDTH: f64 = 40.0;
pub const DEFAULT_HEIGHT: f64 = 40.0;

const PLACEHOLDER_PNG: &[u8] = include_bytes!("../assets/placeholder.png");

lazy_static! {
    /// Built-in placeholder image shown by new image fields
    pub static ref DEFAULT_VALUE: String = codec::encode_with_mime(PNG_MIME, PLACEHOLDER_PNG);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaType {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "readOnlyImage")]
    ReadOnlyImage,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Image => "image",
            SchemaType::ReadOnlyImage => "readOnlyImage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Clockwise degrees. `None` disables rotation in the designer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_value: Option<String>,
}

fn default_width() -> f64 {
    DEFAULT_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_HEIGHT
}

fn default_opacity() -> f64 {
    DEFAULT_OPACITY
}

impl Schema {
    /// The prop-panel defaults for a freshly dropped field
    pub fn default_for(schema_type: SchemaType) -> Self {
        let mut schema = Self {
            schema_type,
            position: Position::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            rotate: Some(0.0),
            opacity: DEFAULT_OPACITY,
            read_only: false,
            read_only_value: None,
        };
        if schema_type == SchemaType::ReadOnlyImage {
            schema.read_only = true;
            schema.read_only_value = Some(DEFAULT_VALUE.clone());
        }
        schema
    }

    /// Value used when generating: the fixed value for read-only fields,
    /// otherwise whatever the caller supplied.
    pub fn effective_value<'a>(&'a self, input: Option<&'a str>) -> Option<&'a str> {
        if self.read_only {
            self.read_only_value.as_deref().or(input)
        } else {
            input
        }
    }
}

/// Where the designer is hosting a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Designer,
    Form,
    Viewer,
}

pub fn is_editable(mode: RenderMode, schema: &Schema) -> bool {
    match mode {
        RenderMode::Designer => true,
        RenderMode::Form => !schema.read_only,
        RenderMode::Viewer => false,
    }
}

/// The document the schemas are laid over
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BasePdf {
    /// `data:application/pdf;base64,...`
    DataUrl(String),
    /// Blank pages of the given size in millimetres
    Blank { width: f64, height: f64 },
}

/// One schema map per base page, keyed by field name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub base_pdf: BasePdf,
    #[serde(default)]
    pub schemas: Vec<BTreeMap<String, Schema>>,
}

impl Template {
    pub fn new(base_pdf: BasePdf) -> Self {
        Self {
            base_pdf,
            schemas: Vec::new(),
        }
    }

    /// Insert or replace a field, growing the page list as needed
    pub fn set_schema(&mut self, page: usize, name: &str, schema: Schema) {
        if self.schemas.len() <= page {
            self.schemas.resize_with(page + 1, BTreeMap::new);
        }
        self.schemas[page].insert(name.to_string(), schema);
    }

    pub fn remove_schema(&mut self, page: usize, name: &str) -> Option<Schema> {
        self.schemas.get_mut(page)?.remove(name)
    }
}

/// One record of field values per generated copy
pub type Inputs = Vec<BTreeMap<String, String>>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_deserializes_with_defaults() {
        let json = r#"{"type":"image","position":{"x":10,"y":20}}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.schema_type, SchemaType::Image);
        assert_eq!(schema.position, Position { x: 10.0, y: 20.0 });
        assert_eq!(schema.width, 40.0);
        assert_eq!(schema.height, 40.0);
        assert_eq!(schema.opacity, DEFAULT_OPACITY);
        assert_eq!(schema.rotate, None);
        assert!(!schema.read_only);
    }

    #[test]
    fn test_read_only_schema_json_shape() {
        let json = r#"{"type":"readOnlyImage","position":{"x":0,"y":0},"width":30,"height":20,"opacity":0.5,"readOnly":true,"readOnlyValue":"data:image/png;base64,AA=="}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.schema_type, SchemaType::ReadOnlyImage);
        assert!(schema.read_only);
        assert_eq!(
            schema.read_only_value.as_deref(),
            Some("data:image/png;base64,AA==")
        );

        let back = serde_json::to_value(&schema).unwrap();
        assert_eq!(back["type"], "readOnlyImage");
        assert_eq!(back["readOnly"], true);
    }

    #[test]
    fn test_default_schemas() {
        let image = Schema::default_for(SchemaType::Image);
        assert_eq!(image.rotate, Some(0.0));
        assert!(image.read_only_value.is_none());

        let read_only = Schema::default_for(SchemaType::ReadOnlyImage);
        assert!(read_only.read_only);
        assert_eq!(read_only.read_only_value.as_deref(), Some(DEFAULT_VALUE.as_str()));
        assert_eq!(read_only.width, image.width);
    }

    #[test]
    fn test_default_value_is_png_data_url() {
        assert!(DEFAULT_VALUE.starts_with("data:image/png;base64,iVBORw0KGgo"));
        let bytes = codec::decode(&DEFAULT_VALUE).unwrap();
        assert_eq!(bytes, PLACEHOLDER_PNG);
    }

    #[test]
    fn test_effective_value() {
        let image = Schema::default_for(SchemaType::Image);
        assert_eq!(image.effective_value(Some("x")), Some("x"));
        assert_eq!(image.effective_value(None), None);

        let read_only = Schema::default_for(SchemaType::ReadOnlyImage);
        assert_eq!(
            read_only.effective_value(Some("x")),
            Some(DEFAULT_VALUE.as_str())
        );
    }

    #[test]
    fn test_is_editable() {
        let image = Schema::default_for(SchemaType::Image);
        let read_only = Schema::default_for(SchemaType::ReadOnlyImage);
        assert!(is_editable(RenderMode::Designer, &read_only));
        assert!(is_editable(RenderMode::Form, &image));
        assert!(!is_editable(RenderMode::Form, &read_only));
        assert!(!is_editable(RenderMode::Viewer, &image));
    }

    #[test]
    fn test_base_pdf_untagged() {
        let blank: BasePdf = serde_json::from_str(r#"{"width":210,"height":297}"#).unwrap();
        assert_eq!(
            blank,
            BasePdf::Blank {
                width: 210.0,
                height: 297.0
            }
        );
        let url: BasePdf = serde_json::from_str(r#""data:application/pdf;base64,""#).unwrap();
        assert!(matches!(url, BasePdf::DataUrl(_)));
    }

    #[test]
    fn test_template_set_and_remove_schema() {
        let mut template = Template::new(BasePdf::Blank {
            width: 210.0,
            height: 297.0,
        });
        template.set_schema(1, "logo", Schema::default_for(SchemaType::Image));
        assert_eq!(template.schemas.len(), 2);
        assert!(template.schemas[0].is_empty());
        assert!(template.remove_schema(1, "logo").is_some());
        assert!(template.remove_schema(5, "logo").is_none());
    }
}
