//! Image and PDF-page embedding for PDF templates
//!
//! Fields carrying a PNG, a JPEG or a single-page PDF (as base64 data URLs)
//! are embedded once per generation pass, aspect-fitted into their box and
//! drawn onto the output pages with lopdf. The same values drive an
//! on-screen preview, planned here and applied by the browser crate.

pub mod cache;
pub mod codec;
pub mod coords;
pub mod document;
pub mod error;
pub mod generate;
pub mod layout;
pub mod plugin;
pub mod preview;
pub mod render;
pub mod schema;
pub mod value;

pub use cache::{EmbedCache, EmbedKey};
pub use codec::{decode, encode};
pub use coords::{from_output_space, to_output_space, OutputBox};
pub use document::{EmbedHandle, OutputDocument};
pub use error::EmbedError;
pub use generate::{generate, GenerateJob};
pub use layout::{fit, FittedBox, NaturalSize};
pub use plugin::{plugin_for, ImagePlugin};
pub use preview::{ImageSource, PreviewPlan};
pub use render::{render, Rendered};
pub use schema::{
    is_editable, BasePdf, Inputs, Position, RenderMode, Schema, SchemaType, Template,
    DEFAULT_VALUE,
};
pub use value::{is_pdf, ObjectValue, ValueKind};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, EmbedError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| EmbedError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
