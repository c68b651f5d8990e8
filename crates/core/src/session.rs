//! Pointer-driven interaction state machine
//!
//! [`InteractionSession`] turns clicks and drags on the page layer into
//! entries in a [`HistoryStore`]. Exactly one [`InteractionMode`] is active at
//! a time; the renderer reads it through [`InteractionSession::mode`] to draw
//! drafts and in-flight moves.

use crate::coords::{chevron, ScreenPoint, Zoom};
use crate::entry::{
    CircleData, Entry, EntryError, EntryId, EntryKind, ImageData, ImageKind, RectSize,
    SegmentData, StickyData, StrokeData, TableData, TextData, TextboxData,
};
use crate::history::{HistoryStore, VisualLayer};
use crate::path::VectorPath;
use crate::settings::{Settings, TableConfig, ToolStyle};
use chrono::{Local, NaiveDate};
use std::io::Cursor;
use tracing::{debug, warn};

/// Circle radius in normalized units
pub const CIRCLE_RADIUS: f32 = 25.0;
/// Symbols are anchored this many pixels above the click
pub const SYMBOL_RAISE_PX: f32 = 8.0;
pub const SIGNATURE_SIZE: RectSize = RectSize { norm_width: 160.0, norm_height: 80.0 };
pub const INITIALS_SIZE: RectSize = RectSize { norm_width: 80.0, norm_height: 40.0 };
pub const IMAGE_WIDTH: f32 = 150.0;
pub const STICKY_SIZE: RectSize = RectSize { norm_width: 150.0, norm_height: 100.0 };
/// Table cell size in pixels at the current zoom
pub const TABLE_CELL_PX: (f32, f32) = (80.0, 30.0);
/// Drag-drawn rectangles smaller than this (either side, pixels) are dropped
pub const MIN_DRAW_PX: f32 = 5.0;
/// Resize floor in pixels
pub const MIN_RESIZE_PX: (f32, f32) = (40.0, 30.0);
/// Arrow preview head length in pixels at zoom 1
pub const PREVIEW_HEAD_PX: f32 = 14.0;

pub const CHECK_MARK: &str = "\u{2713}";
pub const CROSS_MARK: &str = "\u{2717}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Select,
    Text,
    Check,
    Cross,
    Date,
    Circle,
    Blackout,
    Highlight,
    Erase,
    Textbox,
    Line,
    Arrow,
    Draw,
    Signature,
    Initials,
    Image,
    Sticky,
    Table,
}

impl Tool {
    /// Tools that create an entry from a press-drag-release
    pub fn is_drag_draw(self) -> bool {
        matches!(self, Tool::Blackout | Tool::Highlight | Tool::Erase | Tool::Textbox | Tool::Draw)
    }

    pub fn is_two_click(self) -> bool {
        matches!(self, Tool::Line | Tool::Arrow)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GestureError {
    #[error("Draw a signature first")]
    MissingSignature,
    #[error("Select an image first")]
    MissingImage,
    #[error("Start and end must be on same page")]
    CrossPageLine,
    #[error("no entry with id {0}")]
    UnknownEntry(EntryId),
    #[error("{0} entries cannot be resized")]
    NotResizable(&'static str),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscardReason {
    /// Drag-drawn rectangle below the minimum size, in pixels
    TooSmall { width: f32, height: f32 },
    /// Freehand stroke with fewer than two points
    TooFewPoints(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Created(EntryId),
    Updated(EntryId),
    /// Gesture started or continued; nothing committed yet
    Pending,
    Discarded(DiscardReason),
    Ignored,
}

/// Entry being dragged; the store is only written on release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveState {
    pub id: EntryId,
    /// Current visual top-left in pixels
    pub origin: ScreenPoint,
    grab: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeState {
    pub id: EntryId,
    start_pointer: ScreenPoint,
    start_size: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectDraft {
    pub tool: Tool,
    pub page_num: u32,
    pub start: ScreenPoint,
    pub current: ScreenPoint,
}

impl RectDraft {
    /// Top-left corner, width and height, all in pixels
    pub fn bounds(&self) -> (ScreenPoint, f32, f32) {
        let left = self.start.x.min(self.current.x);
        let top = self.start.y.min(self.current.y);
        let width = (self.current.x - self.start.x).abs();
        let height = (self.current.y - self.start.y).abs();
        (ScreenPoint::new(left, top), width, height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreehandDraft {
    pub page_num: u32,
    pub points: Vec<ScreenPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStart {
    pub tool: Tool,
    pub page_num: u32,
    pub point: ScreenPoint,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Moving(MoveState),
    Resizing(ResizeState),
    DrawingRect(RectDraft),
    DrawingFreehand(FreehandDraft),
    AwaitingLineEnd(LineStart),
}

/// Raster source waiting to be placed by the next click
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    bytes: Vec<u8>,
    kind: ImageKind,
    dimensions: Option<(u32, u32)>,
}

impl PreparedImage {
    /// Wrap raw bytes, probing pixel dimensions when the header is readable
    pub fn new(bytes: Vec<u8>, mime: &str) -> Self {
        let kind = ImageKind::from_mime(mime);
        let dimensions = probe_dimensions(&bytes);
        if dimensions.is_none() {
            debug!(mime, len = bytes.len(), "could not probe image dimensions");
        }
        Self { bytes, kind, dimensions }
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    fn into_data(self, size: RectSize) -> ImageData {
        ImageData::new(self.bytes, self.kind, size)
    }
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format().ok()?;
    reader.into_dimensions().ok().filter(|(w, h)| *w > 0 && *h > 0)
}

/// Date text placed by the date tool
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

#[derive(Debug, Clone, Default)]
pub struct InteractionSession {
    mode: InteractionMode,
    zoom: Zoom,
    style: ToolStyle,
    default_table: TableConfig,
    pending_image: Option<PreparedImage>,
    pending_signature: Option<PreparedImage>,
    pending_table: Option<TableConfig>,
}

impl InteractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &Settings) -> Self {
        Self { style: settings.tool, default_table: settings.table, ..Self::default() }
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// True while a drag gesture owns the pointer
    pub fn is_active(&self) -> bool {
        matches!(
            self.mode,
            InteractionMode::Moving(_)
                | InteractionMode::Resizing(_)
                | InteractionMode::DrawingRect(_)
                | InteractionMode::DrawingFreehand(_)
        )
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
    }

    pub fn style(&self) -> &ToolStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut ToolStyle {
        &mut self.style
    }

    pub fn prepare_image(&mut self, bytes: Vec<u8>, mime: &str) {
        self.pending_image = Some(PreparedImage::new(bytes, mime));
    }

    pub fn prepare_signature(&mut self, bytes: Vec<u8>, mime: &str) {
        self.pending_signature = Some(PreparedImage::new(bytes, mime));
    }

    pub fn prepare_table(&mut self, config: TableConfig) {
        self.pending_table = Some(config);
    }

    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }

    pub fn has_pending_signature(&self) -> bool {
        self.pending_signature.is_some()
    }

    /// Single click on a page with a placement or two-click tool
    pub fn click(
        &mut self,
        store: &mut HistoryStore,
        tool: Tool,
        page_num: u32,
        point: ScreenPoint,
    ) -> Result<GestureOutcome, GestureError> {
        if self.is_active() {
            return Ok(GestureOutcome::Ignored);
        }
        if tool.is_two_click() {
            return self.line_click(store, tool, page_num, point);
        }
        if let InteractionMode::AwaitingLineEnd(_) = self.mode {
            debug!(?tool, "pending line start dropped");
            self.mode = InteractionMode::Idle;
        }

        let zoom = self.zoom;
        let style = self.style;
        let (nx, ny) = point.to_norm(zoom);
        let kind = match tool {
            Tool::Text => EntryKind::Text(TextData::new(style.font_size, style.color, "")),
            Tool::Date => {
                let today = date_stamp(Local::now().date_naive());
                EntryKind::Date(TextData::new(style.font_size, style.color, today))
            }
            Tool::Check | Tool::Cross => {
                let mark = if tool == Tool::Check { CHECK_MARK } else { CROSS_MARK };
                let (sx, sy) = point.offset(0.0, -SYMBOL_RAISE_PX).to_norm(zoom);
                let kind = EntryKind::Symbol(TextData::new(style.font_size, style.color, mark));
                return place(store, page_num, sx, sy, kind);
            }
            Tool::Circle => {
                let kind = EntryKind::Circle(CircleData {
                    radius: CIRCLE_RADIUS,
                    color: style.color,
                    border_color: style.color,
                    stroke_width: style.stroke_width,
                });
                return place(store, page_num, nx - CIRCLE_RADIUS, ny - CIRCLE_RADIUS, kind);
            }
            Tool::Signature | Tool::Initials => {
                let Some(source) = self.pending_signature.take() else {
                    warn!(?tool, "placement without a prepared signature");
                    return Err(GestureError::MissingSignature);
                };
                let size = if tool == Tool::Signature { SIGNATURE_SIZE } else { INITIALS_SIZE };
                let data = source.into_data(size);
                if tool == Tool::Signature {
                    EntryKind::Signature(data)
                } else {
                    EntryKind::Initials(data)
                }
            }
            Tool::Image => {
                let Some(source) = self.pending_image.take() else {
                    warn!("placement without a prepared image");
                    return Err(GestureError::MissingImage);
                };
                let height = source
                    .dimensions()
                    .map(|(w, h)| IMAGE_WIDTH * h as f32 / w as f32)
                    .unwrap_or(IMAGE_WIDTH);
                EntryKind::Image(source.into_data(RectSize::new(IMAGE_WIDTH, height)))
            }
            Tool::Sticky => {
                EntryKind::Sticky(StickyData { size: STICKY_SIZE, text: String::new() })
            }
            Tool::Table => {
                let config = self.pending_table.take().unwrap_or(self.default_table);
                let (cell_w, cell_h) = TABLE_CELL_PX;
                let size = RectSize::new(
                    zoom.to_norm(cell_w * zoom.factor() * config.cols as f32),
                    zoom.to_norm(cell_h * zoom.factor() * config.rows as f32),
                );
                EntryKind::Table(TableData::new(config.rows, config.cols, size))
            }
            Tool::Select
            | Tool::Blackout
            | Tool::Highlight
            | Tool::Erase
            | Tool::Textbox
            | Tool::Draw
            | Tool::Line
            | Tool::Arrow => return Ok(GestureOutcome::Ignored),
        };
        place(store, page_num, nx, ny, kind)
    }

    fn line_click(
        &mut self,
        store: &mut HistoryStore,
        tool: Tool,
        page_num: u32,
        point: ScreenPoint,
    ) -> Result<GestureOutcome, GestureError> {
        let start = match std::mem::take(&mut self.mode) {
            InteractionMode::AwaitingLineEnd(start) if start.tool == tool => start,
            _ => {
                self.mode = InteractionMode::AwaitingLineEnd(LineStart { tool, page_num, point });
                return Ok(GestureOutcome::Pending);
            }
        };
        if start.page_num != page_num {
            warn!(start = start.page_num, end = page_num, "line endpoints on different pages");
            return Err(GestureError::CrossPageLine);
        }

        let (x1, y1) = start.point.to_norm(self.zoom);
        let (x2, y2) = point.to_norm(self.zoom);
        let segment = SegmentData {
            norm_x2: x2,
            norm_y2: y2,
            stroke_color: self.style.color,
            stroke_width: self.style.stroke_width,
        };
        let kind = if tool == Tool::Arrow {
            EntryKind::Arrow(segment)
        } else {
            EntryKind::Line(segment)
        };
        place(store, page_num, x1, y1, kind)
    }

    /// Press on a page; starts drag-draw gestures
    pub fn pointer_down(
        &mut self,
        tool: Tool,
        page_num: u32,
        point: ScreenPoint,
    ) -> GestureOutcome {
        if self.is_active() || !tool.is_drag_draw() {
            return GestureOutcome::Ignored;
        }
        self.mode = if tool == Tool::Draw {
            InteractionMode::DrawingFreehand(FreehandDraft { page_num, points: vec![point] })
        } else {
            InteractionMode::DrawingRect(RectDraft { tool, page_num, start: point, current: point })
        };
        GestureOutcome::Pending
    }

    /// Start dragging an existing entry
    pub fn begin_move(
        &mut self,
        store: &HistoryStore,
        id: EntryId,
        pointer: ScreenPoint,
    ) -> Result<GestureOutcome, GestureError> {
        let entry = store.get(id).ok_or(GestureError::UnknownEntry(id))?;
        if !entry.is_movable() {
            return Err(EntryError::NotMovable(entry.type_name()).into());
        }
        let origin = entry.screen_origin(self.zoom);
        let grab = (pointer.x - origin.x, pointer.y - origin.y);
        self.mode = InteractionMode::Moving(MoveState { id, origin, grab });
        Ok(GestureOutcome::Pending)
    }

    /// Start resizing an existing entry from its bottom-right handle
    pub fn begin_resize(
        &mut self,
        store: &HistoryStore,
        id: EntryId,
        pointer: ScreenPoint,
    ) -> Result<GestureOutcome, GestureError> {
        let entry = store.get(id).ok_or(GestureError::UnknownEntry(id))?;
        let size = entry.size().ok_or(GestureError::NotResizable(entry.type_name()))?;
        let start_size =
            (self.zoom.from_norm(size.norm_width), self.zoom.from_norm(size.norm_height));
        self.mode =
            InteractionMode::Resizing(ResizeState { id, start_pointer: pointer, start_size });
        Ok(GestureOutcome::Pending)
    }

    pub fn pointer_move(&mut self, store: &mut HistoryStore, point: ScreenPoint) -> GestureOutcome {
        let zoom = self.zoom;
        match &mut self.mode {
            InteractionMode::Moving(state) => {
                state.origin = ScreenPoint::new(point.x - state.grab.0, point.y - state.grab.1);
                GestureOutcome::Updated(state.id)
            }
            InteractionMode::Resizing(state) => {
                let width =
                    (state.start_size.0 + point.x - state.start_pointer.x).max(MIN_RESIZE_PX.0);
                let height =
                    (state.start_size.1 + point.y - state.start_pointer.y).max(MIN_RESIZE_PX.1);
                match store.get_mut(state.id).and_then(Entry::size_mut) {
                    Some(size) => {
                        size.norm_width = zoom.to_norm(width);
                        size.norm_height = zoom.to_norm(height);
                        GestureOutcome::Updated(state.id)
                    }
                    None => GestureOutcome::Ignored,
                }
            }
            InteractionMode::DrawingRect(draft) => {
                draft.current = point;
                GestureOutcome::Pending
            }
            InteractionMode::DrawingFreehand(draft) => {
                draft.points.push(point);
                GestureOutcome::Pending
            }
            InteractionMode::Idle | InteractionMode::AwaitingLineEnd(_) => GestureOutcome::Ignored,
        }
    }

    /// Release; ends whatever drag gesture is active
    pub fn pointer_up(&mut self, store: &mut HistoryStore) -> Result<GestureOutcome, GestureError> {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Idle => Ok(GestureOutcome::Ignored),
            pending @ InteractionMode::AwaitingLineEnd(_) => {
                self.mode = pending;
                Ok(GestureOutcome::Ignored)
            }
            InteractionMode::Moving(state) => self.commit_move(store, state),
            InteractionMode::Resizing(state) => Ok(GestureOutcome::Updated(state.id)),
            InteractionMode::DrawingRect(draft) => self.finish_rect(store, draft),
            InteractionMode::DrawingFreehand(draft) => self.finish_freehand(store, draft),
        }
    }

    /// Abandon the current gesture and any pending line start
    pub fn cancel(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    /// Commit an in-flight move so the store matches what is on screen
    pub fn settle(&mut self, store: &mut HistoryStore) -> Result<GestureOutcome, GestureError> {
        match self.mode {
            InteractionMode::Moving(state) => {
                self.mode = InteractionMode::Idle;
                self.commit_move(store, state)
            }
            _ => Ok(GestureOutcome::Ignored),
        }
    }

    /// Bring every record in line with the view before compositing
    ///
    /// Commits an in-flight move, then re-derives anchors from `layer`.
    /// Returns how many entries the layer repositioned.
    pub fn prepare_export(
        &mut self,
        store: &mut HistoryStore,
        layer: &impl VisualLayer,
    ) -> Result<usize, GestureError> {
        self.settle(store)?;
        let updated = store.renormalize(layer, self.zoom);
        debug!(updated, entries = store.len(), "entries renormalized for export");
        Ok(updated)
    }

    /// Arrow head arms for the two-click preview, in pixels
    pub fn arrow_preview(
        &self,
        start: ScreenPoint,
        end: ScreenPoint,
    ) -> (ScreenPoint, ScreenPoint) {
        let head = PREVIEW_HEAD_PX * self.zoom.factor();
        let (a, b) = chevron((start.x, start.y), (end.x, end.y), head);
        (ScreenPoint::new(a.0, a.1), ScreenPoint::new(b.0, b.1))
    }

    fn commit_move(
        &mut self,
        store: &mut HistoryStore,
        state: MoveState,
    ) -> Result<GestureOutcome, GestureError> {
        let entry = store.get_mut(state.id).ok_or(GestureError::UnknownEntry(state.id))?;
        let (norm_x, norm_y) = state.origin.to_norm(self.zoom);
        entry.move_to(norm_x, norm_y)?;
        Ok(GestureOutcome::Updated(state.id))
    }

    fn finish_rect(
        &mut self,
        store: &mut HistoryStore,
        draft: RectDraft,
    ) -> Result<GestureOutcome, GestureError> {
        let (corner, width, height) = draft.bounds();
        if width < MIN_DRAW_PX || height < MIN_DRAW_PX {
            debug!(width, height, "drag-drawn rectangle too small");
            return Ok(GestureOutcome::Discarded(DiscardReason::TooSmall { width, height }));
        }

        let (nx, ny) = corner.to_norm(self.zoom);
        let size = RectSize::new(self.zoom.to_norm(width), self.zoom.to_norm(height));
        let kind = match draft.tool {
            Tool::Highlight => EntryKind::Highlight(size),
            Tool::Erase => EntryKind::Erase(size),
            Tool::Textbox => EntryKind::Textbox(TextboxData {
                size,
                text: TextData::new(self.style.font_size, self.style.color, ""),
                border_color: self.style.color,
            }),
            _ => EntryKind::Blackout(size),
        };
        place(store, draft.page_num, nx, ny, kind)
    }

    fn finish_freehand(
        &mut self,
        store: &mut HistoryStore,
        draft: FreehandDraft,
    ) -> Result<GestureOutcome, GestureError> {
        let Some(path) = VectorPath::from_screen_points(&draft.points, self.zoom) else {
            return Ok(GestureOutcome::Discarded(DiscardReason::TooFewPoints(draft.points.len())));
        };
        let kind = EntryKind::Draw(StrokeData {
            path_d: path.to_string(),
            stroke_color: self.style.color,
            stroke_width: self.style.stroke_width,
        });
        place(store, draft.page_num, 0.0, 0.0, kind)
    }
}

impl VisualLayer for InteractionSession {
    /// Only an in-flight move displaces an entry from its stored anchor
    fn visual_origin(&self, id: EntryId) -> Option<ScreenPoint> {
        match &self.mode {
            InteractionMode::Moving(state) if state.id == id => Some(state.origin),
            _ => None,
        }
    }
}

fn place(
    store: &mut HistoryStore,
    page_num: u32,
    norm_x: f32,
    norm_y: f32,
    kind: EntryKind,
) -> Result<GestureOutcome, GestureError> {
    let entry = Entry::new(page_num, norm_x, norm_y, kind)?;
    Ok(GestureOutcome::Created(store.add(entry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(zoom: f32) -> InteractionSession {
        let mut session = InteractionSession::new();
        session.set_zoom(Zoom::new(zoom));
        session
    }

    fn created(outcome: Result<GestureOutcome, GestureError>) -> EntryId {
        match outcome {
            Ok(GestureOutcome::Created(id)) => id,
            other => panic!("expected a created entry, got {other:?}"),
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_drag_draw_rectangle() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.pointer_down(Tool::Blackout, 1, ScreenPoint::new(90.0, 75.0));
        assert!(session.is_active());
        session.pointer_move(&mut store, ScreenPoint::new(15.0, 30.0));
        let id = created(session.pointer_up(&mut store));
        assert!(!session.is_active());

        let entry = store.get(id).unwrap();
        assert!(approx(entry.norm_x, 10.0) && approx(entry.norm_y, 20.0));
        let size = entry.size().unwrap();
        assert!(approx(size.norm_width, 50.0) && approx(size.norm_height, 30.0));
    }

    #[test]
    fn test_small_rectangle_is_discarded() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.pointer_down(Tool::Highlight, 1, ScreenPoint::new(10.0, 10.0));
        session.pointer_move(&mut store, ScreenPoint::new(14.0, 60.0));
        let outcome = session.pointer_up(&mut store).unwrap();
        assert!(matches!(outcome, GestureOutcome::Discarded(DiscardReason::TooSmall { .. })));
        assert!(store.is_empty());
        assert_eq!(session.mode(), &InteractionMode::Idle);
    }

    #[test]
    fn test_degenerate_freehand_is_discarded() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.pointer_down(Tool::Draw, 1, ScreenPoint::new(10.0, 10.0));
        let outcome = session.pointer_up(&mut store).unwrap();
        assert_eq!(outcome, GestureOutcome::Discarded(DiscardReason::TooFewPoints(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_freehand_path_is_normalized() {
        let mut store = HistoryStore::new();
        let mut session = session_at(2.0);
        session.pointer_down(Tool::Draw, 2, ScreenPoint::new(30.0, 30.0));
        session.pointer_move(&mut store, ScreenPoint::new(60.0, 90.0));
        let id = created(session.pointer_up(&mut store));
        let EntryKind::Draw(stroke) = store.get(id).unwrap().kind() else {
            panic!("expected a draw entry");
        };
        assert_eq!(stroke.path_d, "M 10 10 L 20 30");
    }

    #[test]
    fn test_pointer_move_without_gesture_is_ignored() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        let outcome = session.pointer_move(&mut store, ScreenPoint::new(1.0, 1.0));
        assert_eq!(outcome, GestureOutcome::Ignored);
    }

    #[test]
    fn test_line_needs_same_page() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        let first = session.click(&mut store, Tool::Line, 1, ScreenPoint::new(0.0, 0.0));
        assert_eq!(first, Ok(GestureOutcome::Pending));
        let second = session.click(&mut store, Tool::Line, 2, ScreenPoint::new(30.0, 30.0));
        assert_eq!(second, Err(GestureError::CrossPageLine));
        assert_eq!(session.mode(), &InteractionMode::Idle);
        assert!(store.is_empty());
    }

    #[test]
    fn test_arrow_two_clicks() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.click(&mut store, Tool::Arrow, 1, ScreenPoint::new(15.0, 15.0)).unwrap();
        session.pointer_up(&mut store).unwrap();
        let id = created(session.click(&mut store, Tool::Arrow, 1, ScreenPoint::new(150.0, 75.0)));
        let entry = store.get(id).unwrap();
        let EntryKind::Arrow(segment) = entry.kind() else { panic!("expected an arrow") };
        assert!(approx(entry.norm_x, 10.0));
        assert!(approx(segment.norm_x2, 100.0) && approx(segment.norm_y2, 50.0));
    }

    #[test]
    fn test_signature_requires_source_and_is_consumed() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        let point = ScreenPoint::new(0.0, 0.0);
        assert_eq!(
            session.click(&mut store, Tool::Signature, 1, point),
            Err(GestureError::MissingSignature)
        );

        session.prepare_signature(vec![0x89, b'P', b'N', b'G'], "image/png");
        let id = created(session.click(&mut store, Tool::Initials, 1, point));
        assert_eq!(store.get(id).unwrap().size(), Some(INITIALS_SIZE));
        assert!(!session.has_pending_signature());
        assert_eq!(
            session.click(&mut store, Tool::Initials, 1, point),
            Err(GestureError::MissingSignature)
        );
    }

    #[test]
    fn test_image_height_follows_aspect_ratio() {
        let mut png = Vec::new();
        image::RgbImage::new(30, 15)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.prepare_image(png, "image/png");
        let id = created(session.click(&mut store, Tool::Image, 1, ScreenPoint::new(0.0, 0.0)));
        assert_eq!(store.get(id).unwrap().size(), Some(RectSize::new(150.0, 75.0)));
        assert_eq!(
            session.click(&mut store, Tool::Image, 1, ScreenPoint::new(0.0, 0.0)),
            Err(GestureError::MissingImage)
        );
    }

    #[test]
    fn test_symbols_and_circle_anchors() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        let check =
            created(session.click(&mut store, Tool::Check, 1, ScreenPoint::new(30.0, 30.0)));
        let entry = store.get(check).unwrap();
        assert_eq!(entry.text(), Some(CHECK_MARK));
        assert!(approx(entry.norm_y, 22.0 / 1.5));

        let circle =
            created(session.click(&mut store, Tool::Circle, 1, ScreenPoint::new(150.0, 150.0)));
        let entry = store.get(circle).unwrap();
        assert!(approx(entry.norm_x, 75.0) && approx(entry.norm_y, 75.0));
    }

    #[test]
    fn test_table_uses_pending_config_once() {
        let mut store = HistoryStore::new();
        let mut session = session_at(2.0);
        session.prepare_table(TableConfig::new(2, 4));
        let id = created(session.click(&mut store, Tool::Table, 1, ScreenPoint::new(0.0, 0.0)));
        let table = store.get(id).unwrap().table().unwrap().clone();
        assert_eq!((table.rows(), table.cols()), (2, 4));
        assert!(approx(table.size.norm_width, 320.0 / 1.5));

        let id = created(session.click(&mut store, Tool::Table, 1, ScreenPoint::new(0.0, 0.0)));
        assert_eq!(store.get(id).unwrap().table().unwrap().rows(), 3);
    }

    #[test]
    fn test_date_stamp_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_stamp(date), "03/07/2024");
    }

    #[test]
    fn test_move_commits_on_release_only() {
        let mut store = HistoryStore::new();
        let entry = Entry::new(1, 10.0, 10.0, EntryKind::Erase(RectSize::new(20.0, 20.0))).unwrap();
        let id = store.add(entry);
        let mut session = session_at(1.0);

        session.begin_move(&store, id, ScreenPoint::new(20.0, 20.0)).unwrap();
        session.pointer_move(&mut store, ScreenPoint::new(50.0, 35.0));
        assert_eq!(store.get(id).unwrap().norm_x, 10.0);
        assert_eq!(session.visual_origin(id), Some(ScreenPoint::new(45.0, 30.0)));

        assert_eq!(session.settle(&mut store), Ok(GestureOutcome::Updated(id)));
        let entry = store.get(id).unwrap();
        assert!(approx(entry.norm_x, 30.0) && approx(entry.norm_y, 20.0));
        assert!(!store.can_redo());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prepare_export_settles_then_follows_view() {
        let mut store = HistoryStore::new();
        let dragged = store
            .add(Entry::new(1, 10.0, 10.0, EntryKind::Erase(RectSize::new(20.0, 20.0))).unwrap());
        let shifted = store
            .add(Entry::new(1, 0.0, 0.0, EntryKind::Blackout(RectSize::new(5.0, 5.0))).unwrap());
        let mut session = session_at(2.0);

        session.begin_move(&store, dragged, ScreenPoint::new(30.0, 30.0)).unwrap();
        session.pointer_move(&mut store, ScreenPoint::new(60.0, 30.0));
        let view = move |id: EntryId| (id == shifted).then(|| ScreenPoint::new(30.0, 60.0));

        assert_eq!(session.prepare_export(&mut store, &view), Ok(1));
        assert_eq!(session.mode(), &InteractionMode::Idle);
        let moved = store.get(dragged).unwrap();
        assert!(approx(moved.norm_x, 20.0) && approx(moved.norm_y, 10.0));
        let followed = store.get(shifted).unwrap();
        assert!(approx(followed.norm_x, 10.0) && approx(followed.norm_y, 20.0));
    }

    #[test]
    fn test_resize_has_floor() {
        let mut store = HistoryStore::new();
        let entry = Entry::new(1, 0.0, 0.0, EntryKind::Sticky(StickyData {
            size: STICKY_SIZE,
            text: String::new(),
        }))
        .unwrap();
        let id = store.add(entry);
        let mut session = session_at(1.0);
        session.begin_resize(&store, id, ScreenPoint::new(225.0, 150.0)).unwrap();
        session.pointer_move(&mut store, ScreenPoint::new(0.0, 0.0));
        session.pointer_up(&mut store).unwrap();
        let size = store.get(id).unwrap().size().unwrap();
        assert!(approx(size.norm_width, 40.0 / 1.5));
        assert!(approx(size.norm_height, 20.0));
    }

    #[test]
    fn test_draw_entries_cannot_move() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        session.pointer_down(Tool::Draw, 1, ScreenPoint::new(0.0, 0.0));
        session.pointer_move(&mut store, ScreenPoint::new(9.0, 9.0));
        let id = created(session.pointer_up(&mut store));
        let err = session.begin_move(&store, id, ScreenPoint::new(0.0, 0.0)).unwrap_err();
        assert_eq!(err, GestureError::Entry(EntryError::NotMovable("draw")));
    }

    #[test]
    fn test_arrow_preview_scales_with_zoom() {
        let session = session_at(2.0);
        let (a, _) =
            session.arrow_preview(ScreenPoint::new(0.0, 0.0), ScreenPoint::new(100.0, 0.0));
        let len = ((100.0 - a.x).powi(2) + a.y.powi(2)).sqrt();
        assert!(approx(len, 28.0));
    }

    #[test]
    fn test_select_click_is_ignored() {
        let mut store = HistoryStore::new();
        let mut session = session_at(1.0);
        let outcome = session.click(&mut store, Tool::Select, 1, ScreenPoint::new(0.0, 0.0));
        assert_eq!(outcome, Ok(GestureOutcome::Ignored));
    }
}
