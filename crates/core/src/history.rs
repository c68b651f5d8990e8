//! Append-only annotation history with multi-level undo/redo
//!
//! The store owns the live entries in insertion order plus a redo buffer of
//! entries removed by [`HistoryStore::undo`]. Only creation is recorded:
//! moves, resizes and content edits mutate records in place and are not
//! undoable.

use crate::content::{extract_text, ContentNode};
use crate::coords::{ScreenPoint, Zoom};
use crate::entry::{Entry, EntryError, EntryId};
use tracing::debug;

/// Read-only view of where entries are currently drawn on screen
///
/// The view layer may have moved an entry's visual element without writing
/// the move back (e.g. a drag in flight). [`HistoryStore::renormalize`]
/// uses this to pull positions back into normalized units before export.
pub trait VisualLayer {
    /// Top-left of the entry's visual element in page-layer pixels
    fn visual_origin(&self, id: EntryId) -> Option<ScreenPoint>;
}

impl<F> VisualLayer for F
where
    F: Fn(EntryId) -> Option<ScreenPoint>,
{
    fn visual_origin(&self, id: EntryId) -> Option<ScreenPoint> {
        self(id)
    }
}

/// Live annotation entries plus the redo buffer
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<Entry>,
    redo: Vec<Entry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry; any pending redo is dropped
    pub fn add(&mut self, entry: Entry) -> EntryId {
        let id = entry.id();
        debug!(%id, kind = entry.type_name(), page = entry.page_num(), "entry added");
        self.entries.push(entry);
        self.redo.clear();
        id
    }

    /// Remove an entry by identity; the redo buffer is left alone
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(index))
    }

    /// Move the most recent entry into the redo buffer
    pub fn undo(&mut self) -> Option<EntryId> {
        let entry = self.entries.pop()?;
        let id = entry.id();
        self.redo.push(entry);
        Some(id)
    }

    /// Re-append the most recently undone entry
    pub fn redo(&mut self) -> Option<EntryId> {
        let entry = self.redo.pop()?;
        let id = entry.id();
        self.entries.push(entry);
        Some(id)
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.redo.clear();
    }

    /// Swap in a loaded session
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        self.redo.clear();
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries drawn on `page_num`, including every-page entries
    pub fn page_entries(&self, page_num: u32) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |e| e.applies_to_all_pages() || e.page_num() == page_num)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Write the edited surface content through to the record
    ///
    /// Returns `Ok(false)` when no live entry has this id.
    pub fn commit_text(&mut self, id: EntryId, nodes: &[ContentNode]) -> Result<bool, EntryError> {
        match self.get_mut(id) {
            Some(entry) => entry.set_text(extract_text(nodes)).map(|()| true),
            None => Ok(false),
        }
    }

    /// Write one table cell through to the record
    pub fn set_cell(
        &mut self,
        id: EntryId,
        row: usize,
        col: usize,
        text: impl Into<String>,
    ) -> Result<bool, EntryError> {
        match self.get_mut(id) {
            Some(entry) => entry.set_cell(row, col, text).map(|()| true),
            None => Ok(false),
        }
    }

    /// Re-derive anchors from where the view layer currently draws entries
    ///
    /// Watermarks and freehand strokes are skipped. Returns how many entries
    /// were updated.
    pub fn renormalize(&mut self, layer: &impl VisualLayer, zoom: Zoom) -> usize {
        let mut updated = 0;
        for entry in self.entries.iter_mut().filter(|e| e.needs_renormalize()) {
            let Some(origin) = layer.visual_origin(entry.id()) else {
                continue;
            };
            let (norm_x, norm_y) = origin.to_norm(zoom);
            if entry.move_to(norm_x, norm_y).is_ok() {
                updated += 1;
            }
        }
        updated
    }
}
