//! Document generation
//!
//! One call is one generation pass: a fresh output document and embed
//! cache, dropped when the call returns.

use crate::cache::EmbedCache;
use crate::codec;
use crate::coords::mm_to_pt;
use crate::document::OutputDocument;
use crate::error::EmbedError;
use crate::plugin::plugin_for;
use crate::render::Rendered;
use crate::schema::{BasePdf, Inputs, Template};
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

enum BaseDocument {
    Pdf(Document),
    Blank { width: f64, height: f64, pages: usize },
}

impl BaseDocument {
    fn load(template: &Template) -> Result<Self, EmbedError> {
        match &template.base_pdf {
            BasePdf::DataUrl(data_url) => {
                let bytes = codec::decode(data_url)?;
                let doc = Document::load_mem(&bytes)
                    .map_err(|e| EmbedError::ParseError(e.to_string()))?;
                let page_count = doc.get_pages().len();
                if template.schemas.len() > page_count {
                    return Err(EmbedError::InvalidTemplate(format!(
                        "Template has schemas for {} pages but the base PDF has {}",
                        template.schemas.len(),
                        page_count
                    )));
                }
                Ok(BaseDocument::Pdf(doc))
            }
            BasePdf::Blank { width, height } => {
                let valid = |v: f64| v.is_finite() && v > 0.0;
                if !valid(*width) || !valid(*height) {
                    return Err(EmbedError::InvalidTemplate(format!(
                        "Blank page size must be positive, got {} x {}",
                        width, height
                    )));
                }
                Ok(BaseDocument::Blank {
                    width: mm_to_pt(*width),
                    height: mm_to_pt(*height),
                    pages: template.schemas.len().max(1),
                })
            }
        }
    }

    fn append_to(&self, output: &mut OutputDocument) -> Result<Vec<usize>, EmbedError> {
        match self {
            BaseDocument::Pdf(doc) => output.import_pages(doc),
            BaseDocument::Blank {
                width,
                height,
                pages,
            } => Ok((0..*pages)
                .map(|_| output.add_blank_page(*width, *height))
                .collect()),
        }
    }
}

/// A template together with the records to fill it with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateJob {
    pub template: Template,
    #[serde(default)]
    pub inputs: Inputs,
}

impl GenerateJob {
    pub fn from_json(json: &str) -> Result<Self, EmbedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn run(&self) -> Result<Vec<u8>, EmbedError> {
        generate(&self.template, &self.inputs)
    }
}

/// Generate one copy of the base document per input record with every
/// schema drawn on its page. An empty input list still yields one copy.
pub fn generate(template: &Template, inputs: &Inputs) -> Result<Vec<u8>, EmbedError> {
    let base = BaseDocument::load(template)?;
    let mut output = OutputDocument::new();
    let mut cache = EmbedCache::new();

    let no_values = BTreeMap::new();
    let records: Vec<&BTreeMap<String, String>> = if inputs.is_empty() {
        vec![&no_values]
    } else {
        inputs.iter().collect()
    };

    let mut drawn = 0usize;
    for (copy, record) in records.iter().enumerate() {
        let pages = base.append_to(&mut output)?;

        for (schemas, page) in template.schemas.iter().zip(pages) {
            for (name, schema) in schemas {
                let input = record.get(name).map(String::as_str);
                let Some(value) = schema.effective_value(input) else {
                    warn!(field = %name, copy, "No input for field, skipping");
                    continue;
                };

                let plugin = plugin_for(schema.schema_type);
                if let Rendered::Drawn(_) =
                    plugin.render(value, schema, page, &mut output, &mut cache)?
                {
                    drawn += 1;
                }
            }
        }
    }

    info!(
        copies = records.len(),
        pages = output.page_count(),
        drawn,
        embedded = cache.len(),
        "Generated document"
    );
    output.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PNG_MIME;
    use crate::document::test_support::*;
    use crate::schema::{Position, Schema, SchemaType, DEFAULT_VALUE};

    fn png_value() -> String {
        codec::encode_with_mime(PNG_MIME, &create_test_png(8, 4, false))
    }

    fn blank_template() -> Template {
        let mut template = Template::new(BasePdf::Blank {
            width: 210.0,
            height: 297.0,
        });
        let mut schema = Schema::default_for(SchemaType::Image);
        schema.position = Position { x: 20.0, y: 30.0 };
        template.set_schema(0, "logo", schema);
        template
    }

    fn count_images(bytes: &[u8]) -> usize {
        let doc = Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_generate_blank_with_image() {
        let template = blank_template();
        let inputs = vec![BTreeMap::from([("logo".to_string(), png_value())])];
        let bytes = generate(&template, &inputs).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(count_images(&bytes), 1);
    }

    #[test]
    fn test_one_copy_per_input_with_shared_embed() {
        let template = blank_template();
        let value = png_value();
        let inputs = vec![
            BTreeMap::from([("logo".to_string(), value.clone())]),
            BTreeMap::from([("logo".to_string(), value)]),
        ];
        let bytes = generate(&template, &inputs).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert_eq!(count_images(&bytes), 1);
    }

    #[test]
    fn test_empty_inputs_yield_one_copy() {
        let bytes = generate(&blank_template(), &Vec::new()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(count_images(&bytes), 0);
    }

    #[test]
    fn test_read_only_field_draws_fixed_value() {
        let mut template = Template::new(BasePdf::Blank {
            width: 100.0,
            height: 100.0,
        });
        template.set_schema(0, "stamp", Schema::default_for(SchemaType::ReadOnlyImage));

        let bytes = generate(&template, &Vec::new()).unwrap();
        assert!(!DEFAULT_VALUE.is_empty());
        assert_eq!(count_images(&bytes), 1);
    }

    #[test]
    fn test_base_pdf_pages_are_kept() {
        let base = codec::encode(Some(create_test_pdf(2, 300, 400).as_slice()));
        let mut template = Template::new(BasePdf::DataUrl(base));
        template.set_schema(1, "logo", Schema::default_for(SchemaType::Image));
        let inputs = vec![BTreeMap::from([("logo".to_string(), png_value())])];

        let bytes = generate(&template, &inputs).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert_eq!(count_images(&bytes), 1);
    }

    #[test]
    fn test_too_many_schema_pages_rejected() {
        let base = codec::encode(Some(create_test_pdf(1, 300, 400).as_slice()));
        let mut template = Template::new(BasePdf::DataUrl(base));
        template.set_schema(3, "logo", Schema::default_for(SchemaType::Image));

        assert!(matches!(
            generate(&template, &Vec::new()),
            Err(EmbedError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_broken_value_fails_whole_pass() {
        let template = blank_template();
        let inputs = vec![BTreeMap::from([(
            "logo".to_string(),
            "data:image/png;base64,!!!".to_string(),
        )])];
        assert!(generate(&template, &inputs).is_err());
    }

    #[test]
    fn test_blank_size_must_be_positive() {
        let template = Template::new(BasePdf::Blank {
            width: 0.0,
            height: 297.0,
        });
        assert!(matches!(
            generate(&template, &Vec::new()),
            Err(EmbedError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_template_from_json() {
        let json = r#"{"basePdf":{"width":210,"height":297},"schemas":[{"logo":{"type":"image","position":{"x":10,"y":10},"width":50,"height":30}}]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        let inputs = vec![BTreeMap::from([("logo".to_string(), png_value())])];
        assert!(generate(&template, &inputs).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn test_job_json_without_inputs() {
        let job = GenerateJob::from_json(
            r#"{"template":{"basePdf":{"width":100,"height":50},"schemas":[]}}"#,
        )
        .unwrap();
        assert!(job.inputs.is_empty());
        let doc = Document::load_mem(&job.run().unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_job_json_rejects_unknown_type() {
        let result = GenerateJob::from_json(
            r#"{"template":{"basePdf":{"width":100,"height":50},"schemas":[{"a":{"type":"text"}}]}}"#,
        );
        assert!(matches!(result, Err(EmbedError::SerializationError(_))));
    }
}
