//! Output document backed by lopdf
//!
//! Owns the PDF being generated. Objects are embedded once as XObjects and
//! can then be drawn any number of times. Draw operations are buffered per
//! page and written as a single extra content stream on save, with the
//! original content wrapped in `q`/`Q` so its graphics state cannot leak
//! into ours.

use crate::coords::OutputBox;
use crate::error::EmbedError;
use crate::layout::NaturalSize;
use flate2::{write::ZlibEncoder, Compression};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// US Letter in points, used when a page carries no MediaBox at all
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

#[derive(Debug, Clone, PartialEq)]
pub struct ImageHandle {
    session: u64,
    xobject: ObjectId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageHandle {
    session: u64,
    xobject: ObjectId,
    /// [x, y, width, height] of the embedded page's MediaBox
    pub media_box: [f64; 4],
}

impl PageHandle {
    /// Form XObject bounding box as corners
    pub fn bbox(&self) -> [f64; 4] {
        bbox_corners(&self.media_box)
    }
}

/// Reference to an object already inserted into an [`OutputDocument`]
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedHandle {
    Image(ImageHandle),
    Page(PageHandle),
}

impl EmbedHandle {
    pub fn session(&self) -> u64 {
        match self {
            EmbedHandle::Image(h) => h.session,
            EmbedHandle::Page(h) => h.session,
        }
    }

    pub fn natural_size(&self) -> NaturalSize {
        match self {
            EmbedHandle::Image(h) => NaturalSize::from_pixels(h.width, h.height),
            EmbedHandle::Page(h) => NaturalSize::from_points(h.media_box[2], h.media_box[3]),
        }
    }
}

struct PageState {
    id: ObjectId,
    media_box: [f64; 4],
    operations: Vec<Operation>,
    xobjects: Vec<(String, ObjectId)>,
    ext_gstates: Vec<(String, ObjectId)>,
}

pub struct OutputDocument {
    doc: Document,
    session: u64,
    pages_id: ObjectId,
    pages: Vec<PageState>,
    next_resource: u32,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    /// Create an empty document with a catalog and an empty page tree
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            doc,
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            pages_id,
            pages: Vec::new(),
            next_resource: 0,
        }
    }

    /// Identifier of this generation session; handles carry it
    pub fn session_id(&self) -> u64 {
        self.session
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Width and height of a page in points
    pub fn page_size(&self, page: usize) -> Result<(f64, f64), EmbedError> {
        let state = self.page(page)?;
        Ok((state.media_box[2], state.media_box[3]))
    }

    pub fn page_height(&self, page: usize) -> Result<f64, EmbedError> {
        Ok(self.page_size(page)?.1)
    }

    /// Append a blank page of the given size in points
    pub fn add_blank_page(&mut self, width: f64, height: f64) -> usize {
        let media_box = [0.0, 0.0, width, height];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => rect_object(&media_box),
            "Resources" => Dictionary::new(),
        });
        self.push_page(page_id, media_box)
    }

    /// Append every page of `source`, remapping its object ids past ours
    pub fn import_pages(&mut self, source: &Document) -> Result<Vec<usize>, EmbedError> {
        let offset = self.doc.max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();

        // Resolve inherited attributes against the source tree before it is
        // detached from its parents.
        let mut inherited = HashMap::new();
        for page_id in &source_pages {
            inherited.insert(*page_id, inherited_attributes(source, *page_id));
        }

        for (old_id, object) in source.objects.iter() {
            let new_id = (old_id.0 + offset, old_id.1);
            self.doc
                .objects
                .insert(new_id, remap_object_refs(object.clone(), offset));
        }
        self.doc.max_id = (source.max_id + offset).max(self.doc.max_id);

        let mut indices = Vec::with_capacity(source_pages.len());
        for old_page_id in source_pages {
            let page_id = (old_page_id.0 + offset, old_page_id.1);
            let attributes = inherited.remove(&old_page_id).unwrap_or_default();

            let page_dict = self
                .doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| EmbedError::ParseError(format!("Invalid page object: {}", e)))?;
            for (key, value) in attributes {
                if !page_dict.has(&key) {
                    page_dict.set(key, remap_object_refs(value, offset));
                }
            }
            page_dict.set("Parent", Object::Reference(self.pages_id));

            let media_box = media_box(&self.doc, page_id)?;
            indices.push(self.push_page(page_id, media_box));
        }

        Ok(indices)
    }

    fn push_page(&mut self, page_id: ObjectId, media_box: [f64; 4]) -> usize {
        self.pages.push(PageState {
            id: page_id,
            media_box,
            operations: Vec::new(),
            xobjects: Vec::new(),
            ext_gstates: Vec::new(),
        });
        self.pages.len() - 1
    }

    fn page(&self, page: usize) -> Result<&PageState, EmbedError> {
        self.pages.get(page).ok_or_else(|| {
            EmbedError::InvalidTemplate(format!(
                "Page {} not found (document has {} pages)",
                page,
                self.pages.len()
            ))
        })
    }

    fn page_mut(&mut self, page: usize) -> Result<&mut PageState, EmbedError> {
        let count = self.pages.len();
        self.pages.get_mut(page).ok_or_else(|| {
            EmbedError::InvalidTemplate(format!(
                "Page {} not found (document has {} pages)",
                page, count
            ))
        })
    }

    fn next_resource_name(&mut self, prefix: &str) -> String {
        self.next_resource += 1;
        format!("{}{}", prefix, self.next_resource)
    }

    /// Embed a PNG as an image XObject, with alpha split into an SMask
    pub fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageHandle, EmbedError> {
        let decoded = decode_png(bytes)?;

        let smask = match &decoded.alpha {
            Some(alpha) => {
                let dict = image_dict(decoded.width, decoded.height, "DeviceGray", "FlateDecode");
                Some(self.doc.add_object(
                    Stream::new(dict, deflate(alpha)?).with_compression(false),
                ))
            }
            None => None,
        };

        let mut dict = image_dict(
            decoded.width,
            decoded.height,
            decoded.color_space,
            "FlateDecode",
        );
        if let Some(smask_id) = smask {
            dict.set("SMask", Object::Reference(smask_id));
        }
        let xobject = self
            .doc
            .add_object(Stream::new(dict, deflate(&decoded.color)?).with_compression(false));

        Ok(ImageHandle {
            session: self.session,
            xobject,
            width: decoded.width,
            height: decoded.height,
        })
    }

    /// Embed a JPEG as-is under DCTDecode
    pub fn embed_jpeg(&mut self, bytes: &[u8]) -> Result<ImageHandle, EmbedError> {
        let header = parse_jpeg_header(bytes)?;
        let color_space = match header.components {
            1 => "DeviceGray",
            3 => "DeviceRGB",
            4 => "DeviceCMYK",
            n => {
                return Err(EmbedError::UnsupportedImage(format!(
                    "JPEG with {} components",
                    n
                )))
            }
        };

        let mut dict = image_dict(header.width, header.height, color_space, "DCTDecode");
        if header.components == 4 {
            // Adobe CMYK JPEGs are stored inverted
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
            );
        }
        let xobject = self
            .doc
            .add_object(Stream::new(dict, bytes.to_vec()).with_compression(false));

        Ok(ImageHandle {
            session: self.session,
            xobject,
            width: header.width,
            height: header.height,
        })
    }

    /// Embed the first page of a PDF as a form XObject
    pub fn embed_pdf_page(&mut self, bytes: &[u8]) -> Result<PageHandle, EmbedError> {
        let source = Document::load_mem(bytes).map_err(|e| EmbedError::ParseError(e.to_string()))?;
        let page_id = source
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or_else(|| EmbedError::ParseError("Embedded PDF has no pages".into()))?;

        let media_box = media_box(&source, page_id)?;
        let page_dict = source
            .get_dictionary(page_id)
            .map_err(|e| EmbedError::ParseError(e.to_string()))?;
        let (content, filter) = page_content(&source, page_dict)?;

        let mut form = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => rect_object(&bbox_corners(&media_box)),
        };
        if let Some((filter, params)) = filter {
            form.set("Filter", filter);
            if let Some(params) = params {
                form.set("DecodeParms", params);
            }
        }

        let mut copied = HashMap::new();
        if let Some((_, resources)) = inherited_attributes(&source, page_id)
            .into_iter()
            .find(|(key, _)| key.as_slice() == b"Resources")
        {
            let resources = copy_object_deep(&mut self.doc, &source, &resources, &mut copied)?;
            form.set("Resources", resources);
        }

        let xobject = self.doc.add_object(Stream::new(form, content));
        Ok(PageHandle {
            session: self.session,
            xobject,
            media_box,
        })
    }

    fn check_session(&self, session: u64) -> Result<(), EmbedError> {
        if session == self.session {
            Ok(())
        } else {
            Err(EmbedError::ForeignHandle {
                handle: session,
                current: self.session,
            })
        }
    }

    /// Draw an embedded image stretched over `geometry`
    pub fn draw_image(
        &mut self,
        page: usize,
        image: &ImageHandle,
        geometry: &OutputBox,
    ) -> Result<(), EmbedError> {
        self.check_session(image.session)?;
        // Image XObjects occupy the unit square
        let placement = placement_operations(geometry, [0.0, 0.0, 1.0, 1.0]);
        self.draw_xobject(page, image.xobject, placement, geometry.opacity)
    }

    /// Draw an embedded PDF page scaled into `geometry`
    pub fn draw_page(
        &mut self,
        page: usize,
        embedded: &PageHandle,
        geometry: &OutputBox,
    ) -> Result<(), EmbedError> {
        self.check_session(embedded.session)?;
        let placement = placement_operations(geometry, embedded.bbox());
        self.draw_xobject(page, embedded.xobject, placement, geometry.opacity)
    }

    fn draw_xobject(
        &mut self,
        page: usize,
        xobject: ObjectId,
        placement: Vec<Operation>,
        opacity: f64,
    ) -> Result<(), EmbedError> {
        self.page(page)?;
        let xobject_name = self.next_resource_name("EmbX");
        let gstate = if opacity < 1.0 {
            let name = self.next_resource_name("EmbGS");
            let id = self.doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(opacity as f32),
                "CA" => Object::Real(opacity as f32),
            });
            Some((name, id))
        } else {
            None
        };

        let state = self.page_mut(page)?;
        state.operations.push(Operation::new("q", vec![]));
        if let Some((name, id)) = gstate {
            state
                .operations
                .push(Operation::new("gs", vec![Object::Name(name.clone().into_bytes())]));
            state.ext_gstates.push((name, id));
        }
        state.operations.extend(placement);
        state.operations.push(Operation::new(
            "Do",
            vec![Object::Name(xobject_name.clone().into_bytes())],
        ));
        state.operations.push(Operation::new("Q", vec![]));
        state.xobjects.push((xobject_name, xobject));
        Ok(())
    }

    /// Write buffered drawing into the page tree and serialise
    pub fn save(mut self) -> Result<Vec<u8>, EmbedError> {
        let pages = std::mem::take(&mut self.pages);
        let kids: Vec<Object> = pages.iter().map(|p| Object::Reference(p.id)).collect();
        let count = kids.len() as i64;

        for state in pages {
            self.flush_page(state)?;
        }

        let pages_dict = self
            .doc
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| EmbedError::OperationError(e.to_string()))?;
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count));

        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| EmbedError::OperationError(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    fn flush_page(&mut self, state: PageState) -> Result<(), EmbedError> {
        if state.operations.is_empty() {
            return Ok(());
        }

        let mut resources = resolve_dict(&self.doc, state.id, b"Resources")?;
        let mut xobjects = resolve_entry(&self.doc, &resources, b"XObject");
        for (name, id) in state.xobjects {
            xobjects.set(name, Object::Reference(id));
        }
        resources.set("XObject", Object::Dictionary(xobjects));
        if !state.ext_gstates.is_empty() {
            let mut gstates = resolve_entry(&self.doc, &resources, b"ExtGState");
            for (name, id) in state.ext_gstates {
                gstates.set(name, Object::Reference(id));
            }
            resources.set("ExtGState", Object::Dictionary(gstates));
        }

        let mut operations = vec![Operation::new("Q", vec![])];
        operations.extend(state.operations);
        // Readers may join content streams without a separator
        let mut encoded = b"\n".to_vec();
        encoded.extend(
            Content { operations }
                .encode()
                .map_err(|e| EmbedError::OperationError(e.to_string()))?,
        );
        let open_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let drawing_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let existing = {
            let page_dict = self
                .doc
                .get_dictionary(state.id)
                .map_err(|e| EmbedError::OperationError(e.to_string()))?;
            match page_dict.get(b"Contents") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(other) => vec![other.clone()],
                Err(_) => Vec::new(),
            }
        };
        let mut contents = vec![Object::Reference(open_id)];
        contents.extend(existing);
        contents.push(Object::Reference(drawing_id));

        let page_dict = self
            .doc
            .get_object_mut(state.id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| EmbedError::OperationError(e.to_string()))?;
        page_dict.set("Contents", Object::Array(contents));
        page_dict.set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}

/// `[x, y, width, height]` to `[x0, y0, x1, y1]`
fn bbox_corners(rect: &[f64; 4]) -> [f64; 4] {
    [rect[0], rect[1], rect[0] + rect[2], rect[1] + rect[3]]
}

/// `cm` operations that map `bbox` ([x0, y0, x1, y1]) onto the output box,
/// rotated clockwise about its origin
fn placement_operations(geometry: &OutputBox, bbox: [f64; 4]) -> Vec<Operation> {
    let bbox_width = bbox[2] - bbox[0];
    let bbox_height = bbox[3] - bbox[1];
    let (sin, cos) = (-geometry.rotate).to_radians().sin_cos();

    let mut operations = vec![cm([1.0, 0.0, 0.0, 1.0, geometry.x, geometry.y])];
    if geometry.rotate != 0.0 {
        operations.push(cm([cos, sin, -sin, cos, 0.0, 0.0]));
    }
    operations.push(cm([
        geometry.width / bbox_width,
        0.0,
        0.0,
        geometry.height / bbox_height,
        0.0,
        0.0,
    ]));
    if bbox[0] != 0.0 || bbox[1] != 0.0 {
        operations.push(cm([1.0, 0.0, 0.0, 1.0, -bbox[0], -bbox[1]]));
    }
    operations
}

fn cm(matrix: [f64; 6]) -> Operation {
    Operation::new(
        "cm",
        matrix.iter().map(|v| Object::Real(*v as f32)).collect(),
    )
}

fn rect_object(rect: &[f64; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v as f32)).collect())
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => Object::Name(color_space.as_bytes().to_vec()),
        "BitsPerComponent" => 8,
        "Filter" => Object::Name(filter.as_bytes().to_vec()),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, EmbedError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| EmbedError::OperationError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| EmbedError::OperationError(e.to_string()))
}

struct DecodedPng {
    width: u32,
    height: u32,
    color_space: &'static str,
    color: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

fn decode_png(bytes: &[u8]) -> Result<DecodedPng, EmbedError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| EmbedError::DecodeError(format!("Invalid PNG: {}", e)))?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buffer)
        .map_err(|e| EmbedError::DecodeError(format!("Invalid PNG: {}", e)))?;
    buffer.truncate(info.buffer_size());

    let (color_type, _) = reader.output_color_type();
    let (color_space, channels, has_alpha) = match color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1, false),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 1, true),
        png::ColorType::Rgb => ("DeviceRGB", 3, false),
        png::ColorType::Rgba => ("DeviceRGB", 3, true),
        png::ColorType::Indexed => {
            return Err(EmbedError::UnsupportedImage(
                "Indexed PNG was not expanded".into(),
            ))
        }
    };

    let (color, alpha) = if has_alpha {
        let stride = channels + 1;
        let pixels = buffer.len() / stride;
        let mut color = Vec::with_capacity(pixels * channels);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in buffer.chunks_exact(stride) {
            color.extend_from_slice(&pixel[..channels]);
            alpha.push(pixel[channels]);
        }
        (color, Some(alpha))
    } else {
        (buffer, None)
    };

    Ok(DecodedPng {
        width: info.width,
        height: info.height,
        color_space,
        color,
        alpha,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
}

/// Walk JPEG markers up to the first start-of-frame segment
fn parse_jpeg_header(data: &[u8]) -> Result<JpegHeader, EmbedError> {
    let invalid = |msg: &str| EmbedError::DecodeError(format!("Invalid JPEG: {}", msg));

    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(invalid("missing SOI marker"));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err(invalid("expected marker"));
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            0xFF => pos -= 1, // fill byte
            0xD8 | 0xD0..=0xD7 | 0x01 => {}
            0xD9 | 0xDA => break,
            0xC0..=0xCF if marker != 0xC4 && marker != 0xC8 && marker != 0xCC => {
                if pos + 8 > data.len() {
                    return Err(invalid("truncated frame header"));
                }
                let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
                let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
                let components = data[pos + 7];
                if width == 0 || height == 0 {
                    return Err(invalid("zero image dimension"));
                }
                return Ok(JpegHeader {
                    width,
                    height,
                    components,
                });
            }
            _ => {
                if pos + 2 > data.len() {
                    return Err(invalid("truncated segment"));
                }
                let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
                pos += length;
            }
        }
    }

    Err(invalid("no frame header"))
}

/// [x, y, width, height] of a page's MediaBox, following the page tree
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4], EmbedError> {
    let attributes = inherited_attributes(doc, page_id);
    let Some((_, media_box)) = attributes
        .into_iter()
        .find(|(key, _)| key.as_slice() == b"MediaBox")
    else {
        return Ok(DEFAULT_MEDIA_BOX);
    };

    let resolved = resolve(doc, &media_box);
    let items = resolved
        .as_array()
        .map_err(|_| EmbedError::ParseError("MediaBox is not an array".into()))?;
    if items.len() != 4 {
        return Err(EmbedError::ParseError(format!(
            "MediaBox has {} elements, expected 4",
            items.len()
        )));
    }

    let mut values = [0.0f64; 4];
    for (i, item) in items.iter().enumerate() {
        values[i] = extract_number(resolve(doc, item))
            .ok_or_else(|| EmbedError::ParseError("Expected number in MediaBox".into()))?;
    }
    Ok([
        values[0],
        values[1],
        values[2] - values[0],
        values[3] - values[1],
    ])
}

fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Inheritable attributes of a page, nearest definition first
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if found.iter().all(|(k, _)| k.as_slice() != key) {
                if let Ok(value) = dict.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 64 {
            break;
        }
    }
    found
}

/// Clone a dictionary entry of an object, resolving one level of reference
fn resolve_dict(doc: &Document, id: ObjectId, key: &[u8]) -> Result<Dictionary, EmbedError> {
    let dict = doc
        .get_dictionary(id)
        .map_err(|e| EmbedError::OperationError(e.to_string()))?;
    Ok(resolve_entry(doc, dict, key))
}

fn resolve_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Dictionary {
    dict.get(key)
        .map(|obj| resolve(doc, obj))
        .and_then(Object::as_dict)
        .cloned()
        .unwrap_or_default()
}

type StreamFilter = (Object, Option<Object>);

/// Concatenated content of a page. A lone stream that cannot be decoded is
/// passed through with its filter; in a `Contents` array every entry must
/// be a decodable stream.
fn page_content(
    doc: &Document,
    page_dict: &Dictionary,
) -> Result<(Vec<u8>, Option<StreamFilter>), EmbedError> {
    let refs: Vec<&Object> = match page_dict.get(b"Contents") {
        Ok(Object::Array(items)) => items.iter().collect(),
        Ok(other) => vec![other],
        Err(_) => return Ok((Vec::new(), None)),
    };

    if let [single] = refs.as_slice() {
        if let Ok(stream) = resolve(doc, single).as_stream() {
            if stream.decompressed_content().is_err() {
                if let Ok(filter) = stream.dict.get(b"Filter") {
                    let params = stream.dict.get(b"DecodeParms").ok().cloned();
                    return Ok((stream.content.clone(), Some((filter.clone(), params))));
                }
            }
        }
    }

    let mut content = Vec::new();
    for item in refs {
        let stream = resolve(doc, item)
            .as_stream()
            .map_err(|e| EmbedError::DecodeError(format!("Page content: {}", e)))?;
        let data = if stream.dict.get(b"Filter").is_ok() {
            stream
                .decompressed_content()
                .map_err(|e| EmbedError::DecodeError(format!("Page content: {}", e)))?
        } else {
            stream.content.clone()
        };
        content.extend_from_slice(&data);
        content.push(b'\n');
    }
    Ok((content, None))
}

/// Recursively remap object references by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Deep copy an object from `source` into `output`, following references.
/// Ids are reserved before recursing so reference cycles terminate.
fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    copied: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object, EmbedError> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = copied.get(id) {
                return Ok(Object::Reference(new_id));
            }
            let new_id = output.new_object_id();
            copied.insert(*id, new_id);

            let referenced = source
                .get_object(*id)
                .map_err(|e| EmbedError::ParseError(e.to_string()))?;
            let copy = copy_object_deep(output, source, referenced, copied)?;
            output.objects.insert(new_id, copy);
            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            Ok(Object::Dictionary(copy_dict(output, source, dict, copied)?))
        }
        Object::Array(items) => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                new_items.push(copy_object_deep(output, source, item, copied)?);
            }
            Ok(Object::Array(new_items))
        }
        Object::Stream(stream) => {
            let dict = copy_dict(output, source, &stream.dict, copied)?;
            Ok(Object::Stream(
                Stream::new(dict, stream.content.clone())
                    .with_compression(stream.allows_compression),
            ))
        }
        other => Ok(other.clone()),
    }
}

fn copy_dict(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    copied: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary, EmbedError> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        // Resources never need a way back up the page tree
        if key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, copied)?);
    }
    Ok(new_dict)
}
