//! Baking entries into a new PDF byte stream

use crate::canvas::PageCanvas;
use crate::compositor::{compose, DrawOp};
use crate::images::{embed_image, ImageEmbedError};
use crate::{load_document, read_page_size, PageSize, SourceDocument, SourceError};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use overlay_core::entry::Entry;
use overlay_core::{GestureError, HistoryStore, InteractionSession, VisualLayer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

const EDITED_SUFFIX: &str = "_edited";
const DEFAULT_FILE_NAME: &str = "document";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No changes to save")]
    NothingToExport,
    #[error("an export is already in progress")]
    Busy,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to embed image on page {page}: {source}")]
    Image {
        page: usize,
        #[source]
        source: ImageEmbedError,
    },
    #[error("failed to write page content: {0}")]
    Content(#[from] std::fmt::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to settle pending gesture: {0}")]
    Gesture(#[from] GestureError),
}

/// Serializes exports; a second call while one is running is rejected
#[derive(Debug, Default)]
pub struct Exporter {
    busy: AtomicBool,
}

struct ExportGuard<'a>(&'a AtomicBool);

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Result<ExportGuard<'_>, ExportError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::Busy)?;
        Ok(ExportGuard(&self.busy))
    }

    /// Export an already opened document
    pub fn export_document(
        &self,
        source: &SourceDocument,
        entries: &[Entry],
    ) -> Result<Vec<u8>, ExportError> {
        self.export(source.bytes(), entries)
    }

    /// Export the live entries of an editing session
    ///
    /// Records are first brought in line with what `layer` shows on screen,
    /// so entries displaced by the view are written where the user sees them.
    pub fn export_store(
        &self,
        source: &[u8],
        session: &mut InteractionSession,
        store: &mut HistoryStore,
        layer: &impl VisualLayer,
    ) -> Result<Vec<u8>, ExportError> {
        if self.is_busy() {
            return Err(ExportError::Busy);
        }
        session.prepare_export(store, layer)?;
        self.export(source, store.entries())
    }

    /// Draw every entry onto a copy of `source` and serialize the result
    ///
    /// Any image that fails to embed aborts the whole export.
    pub fn export(&self, source: &[u8], entries: &[Entry]) -> Result<Vec<u8>, ExportError> {
        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let _guard = self.try_begin()?;

        let mut doc = load_document(source)?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let sizes: Vec<PageSize> = page_ids.iter().map(|id| read_page_size(&doc, *id)).collect();
        let composition = compose(entries, &sizes);

        let mut touched = 0;
        for (index, page_id) in page_ids.iter().copied().enumerate() {
            let ops = composition.page(index);
            if ops.is_empty() {
                continue;
            }

            let mut resources = page_resources(&doc, page_id);
            let mut canvas = PageCanvas::new(&mut resources);
            for op in ops {
                let image = match op {
                    DrawOp::Image { image, .. } => Some(
                        embed_image(&mut doc, image)
                            .map_err(|source| ExportError::Image { page: index + 1, source })?,
                    ),
                    _ => None,
                };
                canvas.draw(op, image)?;
            }
            if canvas.is_empty() {
                continue;
            }
            let overlay = canvas.finish();
            debug!(
                page = index + 1,
                ops = ops.len(),
                bytes = overlay.len(),
                "page overlay written"
            );
            wrap_page(&mut doc, page_id, resources, overlay)?;
            touched += 1;
        }

        doc.compress();
        let mut out = Vec::new();
        doc.save_to(&mut out)?;

        info!(
            entries = entries.len(),
            pages = touched,
            skipped = composition.skipped(),
            bytes = out.len(),
            "export finished"
        );
        Ok(out)
    }
}

/// The page's effective resources as a direct dictionary
///
/// Inherited and indirect dictionaries are copied so the overlay can extend
/// them without touching objects shared with other pages.
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    let mut resources = None;
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else { break };
        if let Ok(value) = dict.get(b"Resources") {
            resources = resolve_dict(doc, value);
            break;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    let mut resources = resources.unwrap_or_else(Dictionary::new);
    for category in ["Font", "XObject", "ExtGState"] {
        if let Ok(Object::Reference(id)) = resources.get(category.as_bytes()) {
            let resolved = doc.get_dictionary(*id).ok().cloned().unwrap_or_else(Dictionary::new);
            resources.set(category, Object::Dictionary(resolved));
        }
    }
    resources
}

fn resolve_dict(doc: &Document, value: &Object) -> Option<Dictionary> {
    match value {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Isolate the original content in `q … Q` and append the overlay after it
fn wrap_page(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
    overlay: Vec<u8>,
) -> Result<(), ExportError> {
    let existing = doc.get_page_contents(page_id);
    let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut body = b"\nQ\n".to_vec();
    body.extend(overlay);
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Download name for an edited copy: `<stem>_edited<.ext>`
pub fn edited_file_name(original: &str) -> String {
    let name = Path::new(original.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.is_empty() {
        return format!("{DEFAULT_FILE_NAME}{EDITED_SUFFIX}.pdf");
    }
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{EDITED_SUFFIX}.{ext}"),
        None => format!("{stem}{EDITED_SUFFIX}.pdf"),
    }
}

/// Sibling path for the edited copy of `input`
pub fn edited_path(input: &Path) -> PathBuf {
    let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    input.with_file_name(edited_file_name(name))
}
