//! Field plugins
//!
//! Both image field types share one implementation; they differ only in
//! their default schema and in how the cache keys their values.

use crate::cache::EmbedCache;
use crate::document::OutputDocument;
use crate::error::EmbedError;
use crate::preview::PreviewPlan;
use crate::render::{self, Rendered};
use crate::schema::{RenderMode, Schema, SchemaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlugin {
    schema_type: SchemaType,
}

impl ImagePlugin {
    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    pub fn default_schema(&self) -> Schema {
        Schema::default_for(self.schema_type)
    }

    /// Draw `value` for `schema` onto `page`
    pub fn render(
        &self,
        value: &str,
        schema: &Schema,
        page: usize,
        document: &mut OutputDocument,
        cache: &mut EmbedCache,
    ) -> Result<Rendered, EmbedError> {
        render::render(value, schema, page, document, cache)
    }

    pub fn preview(
        &self,
        value: &str,
        schema: &Schema,
        mode: RenderMode,
        placeholder: Option<&str>,
    ) -> PreviewPlan {
        PreviewPlan::build(value, schema, mode, placeholder)
    }
}

pub fn plugin_for(schema_type: SchemaType) -> ImagePlugin {
    ImagePlugin { schema_type }
}
