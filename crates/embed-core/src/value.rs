//! Classification of field values
//!
//! A value is inspected once at the boundary; everything downstream matches
//! on [`ObjectValue`] instead of re-checking string prefixes.

use crate::codec;
use crate::error::EmbedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

/// What a value string holds, without decoding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Empty,
    Raster(RasterFormat),
    Pdf,
    Unrecognized,
}

impl ValueKind {
    pub fn sniff(value: &str) -> Self {
        if value.is_empty() {
            ValueKind::Empty
        } else if is_pdf(value) {
            ValueKind::Pdf
        } else if value.starts_with("data:image/png;") {
            ValueKind::Raster(RasterFormat::Png)
        } else if value.starts_with("data:image/") {
            // every other image payload goes down the JPEG path
            ValueKind::Raster(RasterFormat::Jpeg)
        } else {
            ValueKind::Unrecognized
        }
    }

    pub fn is_drawable(&self) -> bool {
        matches!(self, ValueKind::Raster(_) | ValueKind::Pdf)
    }
}

/// A decoded value ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectValue {
    Empty,
    RasterImage { format: RasterFormat, bytes: Vec<u8> },
    EmbeddablePdf { bytes: Vec<u8> },
    Unrecognized,
}

impl ObjectValue {
    /// Classify and decode. Malformed base64 behind a recognised prefix is
    /// an error, not a silent skip.
    pub fn classify(value: &str) -> Result<Self, EmbedError> {
        Ok(match ValueKind::sniff(value) {
            ValueKind::Empty => ObjectValue::Empty,
            ValueKind::Unrecognized => ObjectValue::Unrecognized,
            ValueKind::Raster(format) => ObjectValue::RasterImage {
                format,
                bytes: codec::decode(value)?,
            },
            ValueKind::Pdf => ObjectValue::EmbeddablePdf {
                bytes: codec::decode(value)?,
            },
        })
    }
}

/// The PDF-detection predicate
pub fn is_pdf(value: &str) -> bool {
    value.starts_with("data:application/pdf;")
}
