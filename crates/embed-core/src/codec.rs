//! Binary <-> data URL codec
//!
//! Generated documents leave the engine as `data:application/pdf;base64,...`
//! strings, which can be dropped into an `href`, a JSON body or an HTML
//! attribute without further escaping. Image and PDF values arrive in the
//! same shape.

use crate::error::EmbedError;
use base64::{engine::general_purpose::STANDARD, Engine};

pub const PDF_MIME: &str = "application/pdf";
pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

const BASE64_MARKER: &str = ";base64,";

/// A data URL split into its MIME tag and (still encoded) payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Decode the base64 payload
    pub fn bytes(&self) -> Result<Vec<u8>, EmbedError> {
        STANDARD
            .decode(self.payload.trim())
            .map_err(|e| EmbedError::DecodeError(format!("Invalid base64 payload: {}", e)))
    }
}

/// Encode a PDF buffer as a data URL. `None` encodes like an empty buffer.
pub fn encode(buffer: Option<&[u8]>) -> String {
    encode_with_mime(PDF_MIME, buffer.unwrap_or_default())
}

/// Encode bytes under an arbitrary MIME tag
pub fn encode_with_mime(mime: &str, bytes: &[u8]) -> String {
    format!("data:{}{}{}", mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Split a data URL without decoding it
pub fn parse(data_url: &str) -> Result<DataUrl<'_>, EmbedError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| EmbedError::DecodeError("Missing data: scheme".into()))?;
    let (mime, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| EmbedError::DecodeError("Data URL is not base64 encoded".into()))?;
    Ok(DataUrl { mime, payload })
}

/// Recover the bytes behind any base64 data URL
pub fn decode(data_url: &str) -> Result<Vec<u8>, EmbedError> {
    parse(data_url)?.bytes()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: decode(encode(B)) == B for every buffer, including empty
        #[test]
        fn roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
            let url = encode(Some(bytes.as_slice()));
            prop_assert!(url.starts_with("data:application/pdf;base64,"));
            prop_assert_eq!(decode(&url).unwrap(), bytes);
        }

        /// Property: encoding is deterministic
        #[test]
        fn deterministic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(encode(Some(bytes.as_slice())), encode(Some(bytes.as_slice())));
        }
    }
}
