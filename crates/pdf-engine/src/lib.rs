//! PDF side of the overlay editor
//!
//! Opens source documents with `lopdf`, turns annotation entries into drawing
//! primitives and bakes them into a new PDF.

mod canvas;
pub mod compositor;
pub mod export;
pub mod images;

use lopdf::{Document, Object, ObjectId};
use std::fs;
use std::path::{Path, PathBuf};

pub use compositor::{compose, Composition, DrawOp, FontFace, Rgb};
pub use export::{edited_file_name, edited_path, ExportError, Exporter};
pub use images::ImageEmbedError;

/// Page size used when a page has no usable MediaBox
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
}

/// Source PDF bytes plus the page geometry the compositor needs
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

impl SourceDocument {
    pub fn open(source: impl Into<OpenSource>) -> Result<Self, SourceError> {
        let bytes = match source.into() {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let doc = load_document(&bytes)?;
        let page_sizes: Vec<PageSize> =
            doc.get_pages().into_values().map(|id| read_page_size(&doc, id)).collect();
        if page_sizes.is_empty() {
            return Err(SourceError::NoPages);
        }

        Ok(Self { bytes, page_sizes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.page_sizes
    }

    /// Size of a 1-based page
    pub fn page_size(&self, page_num: u32) -> Option<PageSize> {
        let index = page_num.checked_sub(1)?;
        self.page_sizes.get(index as usize).copied()
    }
}

pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, SourceError> {
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(SourceError::EncryptedUnsupported);
    }
    Ok(Document::load_mem(bytes)?)
}

/// MediaBox of a page, inherited from its ancestors when absent
pub(crate) fn read_page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else { break };
        if let Some(size) = dict.get(b"MediaBox").ok().and_then(|obj| media_box(doc, obj)) {
            return size;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    DEFAULT_PAGE_SIZE
}

fn media_box(doc: &Document, obj: &Object) -> Option<PageSize> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = obj.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{dictionary, Document, Object, Stream};

    /// Minimal document with `pages` pages of 612 x 800 points
    pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = format!("BT /F1 12 Tf 72 700 Td (Page {n}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 800.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::sample_pdf;
    use super::*;

    #[test]
    fn opens_pdf_and_reads_inherited_media_box() {
        let doc = SourceDocument::open(sample_pdf(2)).expect("open should succeed");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_size(1), Some(PageSize { width_pt: 612.0, height_pt: 800.0 }));
        assert_eq!(doc.page_size(0), None);
        assert_eq!(doc.page_size(3), None);
    }

    #[test]
    fn opens_from_path() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("sample.pdf");
        fs::write(&path, sample_pdf(1)).expect("fixture should be written");
        let doc = SourceDocument::open(path.as_path()).expect("open should succeed");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn encrypted_documents_are_rejected() {
        let err = SourceDocument::open(b"%PDF-1.7\n/Encrypt 5 0 R".to_vec())
            .expect_err("encrypted input should fail");
        assert!(matches!(err, SourceError::EncryptedUnsupported));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = SourceDocument::open(b"not a pdf".to_vec()).expect_err("should fail");
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
