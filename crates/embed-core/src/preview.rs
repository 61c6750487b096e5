//! What the on-screen preview of a field should show
//!
//! Planning is pure so it can be tested without a DOM; the browser widget
//! only applies the plan.

use crate::schema::{is_editable, RenderMode, Schema, DEFAULT_VALUE};
use crate::value::ValueKind;
use serde::Serialize;

/// Where the foreground image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "src", rename_all = "camelCase")]
pub enum ImageSource {
    /// Usable as an `<img>` source as-is
    Direct(String),
    /// A PDF that must be rasterized before display
    RasterizePdf(String),
}

impl ImageSource {
    pub fn value(&self) -> &str {
        match self {
            ImageSource::Direct(src) | ImageSource::RasterizePdf(src) => src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPlan {
    /// Container background, shown only while the field is empty
    pub background: Option<String>,
    pub image: Option<ImageSource>,
    pub remove_button: bool,
    pub stop_click_propagation: bool,
}

impl PreviewPlan {
    pub fn build(
        value: &str,
        schema: &Schema,
        mode: RenderMode,
        placeholder: Option<&str>,
    ) -> Self {
        let editable = is_editable(mode, schema);

        let image = match ValueKind::sniff(value) {
            ValueKind::Empty => None,
            ValueKind::Pdf => Some(ImageSource::RasterizePdf(value.to_string())),
            _ => Some(ImageSource::Direct(value.to_string())),
        };
        let background = match image {
            None => placeholder.map(str::to_string),
            Some(_) => None,
        };

        Self {
            background,
            remove_button: image.is_some() && editable && value != DEFAULT_VALUE.as_str(),
            image,
            stop_click_propagation: editable,
        }
    }
}
