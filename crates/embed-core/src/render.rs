//! Per-schema rendering into an output document
//!
//! Rendering is split into two phases. [`resolve`] turns a value into an
//! embed handle, going through the cache; [`draw`] lays the handle out in
//! the schema's box and paints it. [`render`] runs both.

use crate::cache::{EmbedCache, EmbedKey};
use crate::coords::{to_output_space, OutputBox};
use crate::document::{EmbedHandle, OutputDocument};
use crate::error::EmbedError;
use crate::layout::fit;
use crate::schema::Schema;
use crate::value::{ObjectValue, RasterFormat, ValueKind};
use std::rc::Rc;
use tracing::debug;

/// Outcome of rendering one schema
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Empty or unrecognised value; nothing was drawn
    Skipped,
    Drawn(OutputBox),
}

/// Find or create the embed handle for `value`.
///
/// Returns `None` for values that render as a no-op. The payload is only
/// decoded on a cache miss.
pub fn resolve(
    value: &str,
    schema: &Schema,
    document: &mut OutputDocument,
    cache: &mut EmbedCache,
) -> Result<Option<Rc<EmbedHandle>>, EmbedError> {
    if !ValueKind::sniff(value).is_drawable() {
        return Ok(None);
    }

    let key = EmbedKey::new(schema.schema_type, value);
    if let Some(handle) = cache.get(&key) {
        debug!(schema_type = schema.schema_type.as_str(), "Embed cache hit");
        return Ok(Some(handle));
    }

    let handle = match ObjectValue::classify(value)? {
        ObjectValue::Empty | ObjectValue::Unrecognized => return Ok(None),
        ObjectValue::RasterImage {
            format: RasterFormat::Png,
            bytes,
        } => EmbedHandle::Image(document.embed_png(&bytes)?),
        ObjectValue::RasterImage {
            format: RasterFormat::Jpeg,
            bytes,
        } => EmbedHandle::Image(document.embed_jpeg(&bytes)?),
        ObjectValue::EmbeddablePdf { bytes } => EmbedHandle::Page(document.embed_pdf_page(&bytes)?),
    };
    debug!(
        schema_type = schema.schema_type.as_str(),
        entries = cache.len() + 1,
        "Embed cache miss, object embedded"
    );

    Ok(Some(cache.set(key, Rc::new(handle))))
}

/// Fit `handle` into the schema's box and draw it on `page`
pub fn draw(
    handle: &EmbedHandle,
    schema: &Schema,
    page: usize,
    document: &mut OutputDocument,
) -> Result<OutputBox, EmbedError> {
    let fitted = fit(
        schema.width,
        schema.height,
        handle.natural_size(),
        schema.position,
    )?;
    let page_height = document.page_height(page)?;
    let geometry = to_output_space(&fitted, schema.rotate, schema.opacity, page_height);

    match handle {
        EmbedHandle::Image(image) => document.draw_image(page, image, &geometry)?,
        EmbedHandle::Page(embedded) => document.draw_page(page, embedded, &geometry)?,
    }
    debug!(
        page,
        x = geometry.x,
        y = geometry.y,
        width = geometry.width,
        height = geometry.height,
        "Drew object"
    );
    Ok(geometry)
}

/// Render one schema's value onto `page`
pub fn render(
    value: &str,
    schema: &Schema,
    page: usize,
    document: &mut OutputDocument,
    cache: &mut EmbedCache,
) -> Result<Rendered, EmbedError> {
    match resolve(value, schema, document, cache)? {
        Some(handle) => Ok(Rendered::Drawn(draw(&handle, schema, page, document)?)),
        None => Ok(Rendered::Skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, JPEG_MIME, PNG_MIME};
    use crate::coords::mm_to_pt;
    use crate::document::test_support::*;
    use crate::schema::{Position, SchemaType};

    fn document() -> OutputDocument {
        let mut document = OutputDocument::new();
        document.add_blank_page(mm_to_pt(210.0), mm_to_pt(297.0));
        document
    }

    fn png_value(width: u32, height: u32) -> String {
        codec::encode_with_mime(PNG_MIME, &create_test_png(width, height, true))
    }

    #[test]
    fn test_empty_value_is_noop() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let schema = Schema::default_for(SchemaType::Image);

        let result = render("", &schema, 0, &mut document, &mut cache).unwrap();
        assert_eq!(result, Rendered::Skipped);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unrecognized_value_is_noop() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let schema = Schema::default_for(SchemaType::Image);

        let result = render("not a data url", &schema, 0, &mut document, &mut cache).unwrap();
        assert_eq!(result, Rendered::Skipped);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_wide_image_is_centered_vertically() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let schema = Schema::default_for(SchemaType::Image);

        let Rendered::Drawn(geometry) =
            render(&png_value(80, 40), &schema, 0, &mut document, &mut cache).unwrap()
        else {
            panic!("expected a draw");
        };
        assert!((geometry.width - mm_to_pt(40.0)).abs() < 1e-9);
        assert!((geometry.height - mm_to_pt(20.0)).abs() < 1e-9);
        // top edge sits 10mm below the page top
        let top = geometry.y + geometry.height;
        assert!((top - mm_to_pt(297.0 - 10.0)).abs() < 1e-9);
        assert_eq!(schema.position, Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_same_value_embeds_once() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let schema = Schema::default_for(SchemaType::Image);
        let value = png_value(4, 4);

        let first = resolve(&value, &schema, &mut document, &mut cache)
            .unwrap()
            .unwrap();
        let second = resolve(&value, &schema, &mut document, &mut cache)
            .unwrap()
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_schema_type_separates_cache_entries() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let value = png_value(4, 4);

        render(
            &value,
            &Schema::default_for(SchemaType::Image),
            0,
            &mut document,
            &mut cache,
        )
        .unwrap();
        render(
            &value,
            &Schema::default_for(SchemaType::ReadOnlyImage),
            0,
            &mut document,
            &mut cache,
        )
        .unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_jpeg_value_uses_image_path() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let value = codec::encode_with_mime(JPEG_MIME, &create_test_jpeg(100, 200, 3));
        let schema = Schema::default_for(SchemaType::Image);

        let handle = resolve(&value, &schema, &mut document, &mut cache)
            .unwrap()
            .unwrap();
        assert!(matches!(*handle, EmbedHandle::Image(_)));
        let geometry = draw(&handle, &schema, 0, &mut document).unwrap();
        assert!((geometry.height - mm_to_pt(40.0)).abs() < 1e-9);
        assert!((geometry.width - mm_to_pt(20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_pdf_value_uses_page_path() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let value = codec::encode(Some(create_test_pdf(1, 200, 100).as_slice()));
        let schema = Schema::default_for(SchemaType::Image);

        let handle = resolve(&value, &schema, &mut document, &mut cache)
            .unwrap()
            .unwrap();
        assert!(matches!(*handle, EmbedHandle::Page(_)));
        let geometry = draw(&handle, &schema, 0, &mut document).unwrap();
        assert!((geometry.width - mm_to_pt(40.0)).abs() < 1e-9);
        assert!((geometry.height - mm_to_pt(20.0)).abs() < 1e-9);

        let bytes = document.save().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_malformed_payload_fails() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let schema = Schema::default_for(SchemaType::Image);
        let value = codec::encode_with_mime(PNG_MIME, b"definitely not a png");

        assert!(matches!(
            render(&value, &schema, 0, &mut document, &mut cache),
            Err(EmbedError::DecodeError(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_sized_box_fails() {
        let mut document = document();
        let mut cache = EmbedCache::new();
        let mut schema = Schema::default_for(SchemaType::Image);
        schema.height = 0.0;

        assert!(matches!(
            render(&png_value(4, 4), &schema, 0, &mut document, &mut cache),
            Err(EmbedError::DegenerateGeometry(_))
        ));
    }
}
