//! Certificate PDF rendering.
//!
//! A record with a stored `pdf_url` is served by redirect. Otherwise the text
//! fields are drawn onto the first page of a fixed template. Positions and
//! sizes are fixed; long names are not wrapped.

use certdesk_common::{CertdeskError, CertificateRecord, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::path::PathBuf;
use tracing::debug;

const REGULAR_FONT: &str = "CdHelv";
const BOLD_FONT: &str = "CdHelvB";
/// Guards the `Parent` walk against cyclic page trees.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// One text overlay on the template page, in PDF points from the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    x: f32,
    y: f32,
    size: f32,
    bold: bool,
}

const FULL_NAME: Placement = Placement { x: 200.0, y: 380.0, size: 18.0, bold: true };
const COURSE: Placement = Placement { x: 150.0, y: 300.0, size: 14.0, bold: false };
const ISSUED: Placement = Placement { x: 200.0, y: 250.0, size: 12.0, bold: false };
const HOURS: Placement = Placement { x: 300.0, y: 250.0, size: 12.0, bold: false };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Redirect(String),
    Pdf(Vec<u8>),
}

/// Text drawn onto the template for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayText {
    pub full_name: String,
    pub course: String,
    pub issued: String,
    pub hours: String,
}

impl OverlayText {
    pub fn for_record(record: &CertificateRecord) -> Self {
        Self {
            full_name: record.full_name(),
            course: record.certificate.clone(),
            // es-ES, two-digit day and month
            issued: record.issued_at().format("%d/%m/%Y").to_string(),
            hours: record.hours_quantity.to_string(),
        }
    }

    fn placements(&self) -> [(&str, Placement); 4] {
        [
            (self.full_name.as_str(), FULL_NAME),
            (self.course.as_str(), COURSE),
            (self.issued.as_str(), ISSUED),
            (self.hours.as_str(), HOURS),
        ]
    }
}

pub struct CertificateRenderer {
    template_path: PathBuf,
}

impl CertificateRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    pub async fn render(&self, record: &CertificateRecord) -> Result<Rendered> {
        if let Some(url) = record.pdf_url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(Rendered::Redirect(url.to_string()));
        }

        let template = tokio::fs::read(&self.template_path).await.map_err(|err| {
            CertdeskError::render(format!(
                "failed to read template {}: {}",
                self.template_path.display(),
                err
            ))
        })?;
        let overlay = OverlayText::for_record(record);
        let bytes = tokio::task::spawn_blocking(move || synthesize(&template, &overlay))
            .await
            .map_err(|err| CertdeskError::render(format!("render task failed: {}", err)))??;

        debug!(certificate_id = %record.id, bytes = bytes.len(), "certificate synthesized");
        Ok(Rendered::Pdf(bytes))
    }
}

/// Draws `overlay` onto the first page of `template` and returns the new document.
pub fn synthesize(template: &[u8], overlay: &OverlayText) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(template)
        .map_err(|err| CertdeskError::render(format!("invalid template: {}", err)))?;
    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| CertdeskError::render("template has no pages"))?;

    if let Some(resources) = inherited_resources(&doc, page_id) {
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| CertdeskError::render(format!("template page: {}", err)))?
            .set("Resources", resources);
    }

    let regular = doc.add_object(font_dictionary("Helvetica"));
    let bold = doc.add_object(font_dictionary("Helvetica-Bold"));
    register_fonts(&mut doc, page_id, &[(REGULAR_FONT, regular), (BOLD_FONT, bold)])?;

    // Leading newline keeps a template stream ending in `ET` from fusing with `Q`.
    let mut content = b"\n".to_vec();
    content.extend(
        overlay_content(overlay)
            .encode()
            .map_err(|err| CertdeskError::render(format!("failed to encode overlay: {}", err)))?,
    );
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));
    wrap_page_content(&mut doc, page_id, save_id, overlay_id)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|err| CertdeskError::render(format!("failed to serialize pdf: {}", err)))?;
    Ok(out)
}

fn font_dictionary(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Restores the state saved before the template content, then draws in a fresh one.
fn overlay_content(overlay: &OverlayText) -> Content {
    let mut operations = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];
    for (text, placement) in overlay.placements() {
        let font = if placement.bold { BOLD_FONT } else { REGULAR_FONT };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("Tf", vec![font.into(), placement.size.into()]),
            Operation::new("Td", vec![placement.x.into(), placement.y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    operations.push(Operation::new("Q", vec![]));
    Content { operations }
}

/// Helvetica with WinAnsiEncoding covers Latin-1; anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Resources the page inherits from its `Pages` ancestors, if it has none of its own.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let page = doc.get_dictionary(page_id).ok()?;
    if page.has(b"Resources") {
        return None;
    }
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        match node.get(b"Resources") {
            Ok(Object::Reference(id)) => return doc.get_dictionary(*id).ok().cloned(),
            Ok(Object::Dictionary(resources)) => return Some(resources.clone()),
            _ => parent = node.get(b"Parent").and_then(Object::as_reference).ok(),
        }
    }
    None
}

fn register_fonts(doc: &mut Document, page_id: ObjectId, fonts: &[(&str, ObjectId)]) -> Result<()> {
    let pdf_err = |err: lopdf::Error| CertdeskError::render(format!("template resources: {}", err));

    let existing = {
        let resources = doc
            .get_or_create_resources(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_err)?;
        let existing = resources.get(b"Font").ok().cloned();
        if !matches!(existing, Some(Object::Reference(_)) | Some(Object::Dictionary(_))) {
            resources.set("Font", Dictionary::new());
        }
        existing
    };

    let font_dict = match existing {
        Some(Object::Reference(font_dict_id)) => doc
            .get_object_mut(font_dict_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_err)?,
        _ => doc
            .get_or_create_resources(page_id)
            .and_then(Object::as_dict_mut)
            .and_then(|resources| resources.get_mut(b"Font"))
            .and_then(Object::as_dict_mut)
            .map_err(pdf_err)?,
    };
    for (name, font_id) in fonts {
        font_dict.set(*name, Object::Reference(*font_id));
    }
    Ok(())
}

/// Sets `Contents` to `[save, template..., overlay]`.
fn wrap_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    save_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| CertdeskError::render(format!("template page: {}", err)))?;

    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents").ok().cloned() {
        Some(Object::Array(items)) => contents.extend(items),
        Some(existing @ Object::Reference(_)) => contents.push(existing),
        _ => {}
    }
    contents.push(Object::Reference(overlay_id));
    page.set("Contents", Object::Array(contents));
    Ok(())
}
