//! Annotation entry data model
//!
//! An [`Entry`] is the persisted record for one placed object. Geometry is
//! stored in normalized document-space units (see [`crate::coords`]) with the
//! anchor at the top-left and y growing downward from the top of the page.
//!
//! The serialized shape is the exchange schema: `type`, `pageNum`, `normX`,
//! `normY` plus the per-type fields, all in camelCase.

use crate::color::Color;
use crate::coords::{ScreenPoint, Zoom};
use serde::{Deserialize, Serialize};

/// Unique identifier for an entry
///
/// Identity is by id, never by field values: two entries with identical
/// geometry stay distinguishable for removal.
pub type EntryId = uuid::Uuid;

/// Page sentinel meaning "every page"; only watermarks use it
pub const ALL_PAGES: u32 = 0;

/// Largest row or column count a table may have
pub const MAX_TABLE_DIM: u32 = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("page numbers are 1-based; page {0} is reserved for watermarks")]
    InvalidPage(u32),
    #[error("watermarks must be created with Entry::watermark")]
    WatermarkPage,
    #[error("watermarks apply to every page; found page {0}")]
    PagedWatermark(u32),
    #[error("a {rows}x{cols} table exceeds the {max}x{max} limit", max = MAX_TABLE_DIM)]
    TableTooLarge { rows: u32, cols: u32 },
    #[error("{0} entries carry no editable text")]
    NotTextBearing(&'static str),
    #[error("{0} entries cannot be moved")]
    NotMovable(&'static str),
    #[error("{0} entries are not a table")]
    NotATable(&'static str),
    #[error("cell ({row}, {col}) is outside a {rows}x{cols} table")]
    CellOutOfRange { row: usize, col: usize, rows: u32, cols: u32 },
}

/// Width and height in normalized units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectSize {
    #[serde(default)]
    pub norm_width: f32,
    #[serde(default)]
    pub norm_height: f32,
}

impl RectSize {
    pub fn new(norm_width: f32, norm_height: f32) -> Self {
        Self { norm_width, norm_height }
    }

    /// Use `fallback` for any dimension that is zero or not finite
    pub fn or(self, fallback: RectSize) -> RectSize {
        let pick = |v: f32, d: f32| if v.is_finite() && v > 0.0 { v } else { d };
        RectSize {
            norm_width: pick(self.norm_width, fallback.norm_width),
            norm_height: pick(self.norm_height, fallback.norm_height),
        }
    }
}

/// Point-anchored text (text, symbol, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub font_size: f32,
    pub color: Color,
    #[serde(default)]
    pub text: String,
}

impl TextData {
    pub fn new(font_size: f32, color: Color, text: impl Into<String>) -> Self {
        Self { font_size, color, text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleData {
    pub radius: f32,
    pub color: Color,
    pub border_color: Color,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextboxData {
    #[serde(flatten)]
    pub size: RectSize,
    #[serde(flatten)]
    pub text: TextData,
    pub border_color: Color,
}

/// Second anchor and stroke of a line or arrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentData {
    pub norm_x2: f32,
    pub norm_y2: f32,
    pub stroke_color: Color,
    pub stroke_width: f32,
}

/// Supported raster kinds for embedded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Map a MIME type; anything that is not JPEG is treated as PNG
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => ImageKind::Jpeg,
            _ => ImageKind::Png,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

impl From<String> for ImageKind {
    fn from(value: String) -> Self {
        Self::from_mime(&value)
    }
}

impl From<ImageKind> for String {
    fn from(kind: ImageKind) -> Self {
        kind.mime().to_owned()
    }
}

/// Raster payload for signatures, initials and images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    #[serde(flatten)]
    pub size: RectSize,
    #[serde(with = "base64_bytes")]
    pub image_bytes: Vec<u8>,
    pub image_type: ImageKind,
}

impl ImageData {
    pub fn new(image_bytes: Vec<u8>, image_type: ImageKind, size: RectSize) -> Self {
        Self { size, image_bytes, image_type }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyData {
    #[serde(flatten)]
    pub size: RectSize,
    #[serde(default)]
    pub text: String,
}

/// Fixed-shape grid of cell text
///
/// `rows` and `cols` are fixed at creation; only cell text mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord", into = "TableRecord")]
pub struct TableData {
    rows: u32,
    cols: u32,
    pub size: RectSize,
    cells: Vec<Vec<String>>,
}

impl TableData {
    /// Create an empty table; both dimensions are clamped to `1..=MAX_TABLE_DIM`
    pub fn new(rows: u32, cols: u32, size: RectSize) -> Self {
        let rows = rows.clamp(1, MAX_TABLE_DIM);
        let cols = cols.clamp(1, MAX_TABLE_DIM);
        let cells = vec![vec![String::new(); cols as usize]; rows as usize];
        Self { rows, cols, size, cells }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    /// Row-major cell text
    pub fn cells(&self) -> &[Vec<String>] {
        &self.cells
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        text: impl Into<String>,
    ) -> Result<(), EntryError> {
        let (rows, cols) = (self.rows, self.cols);
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(EntryError::CellOutOfRange { row, col, rows, cols })?;
        *cell = text.into();
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRecord {
    rows: u32,
    cols: u32,
    #[serde(flatten)]
    size: RectSize,
    #[serde(default)]
    cell_data: Vec<Vec<String>>,
}

impl TryFrom<TableRecord> for TableData {
    type Error = EntryError;

    fn try_from(record: TableRecord) -> Result<Self, Self::Error> {
        if record.rows > MAX_TABLE_DIM || record.cols > MAX_TABLE_DIM {
            return Err(EntryError::TableTooLarge { rows: record.rows, cols: record.cols });
        }
        let mut table = TableData::new(record.rows, record.cols, record.size);
        for (r, row) in record.cell_data.into_iter().enumerate().take(table.rows as usize) {
            for (c, text) in row.into_iter().enumerate().take(table.cols as usize) {
                table.cells[r][c] = text;
            }
        }
        Ok(table)
    }
}

impl From<TableData> for TableRecord {
    fn from(table: TableData) -> Self {
        Self { rows: table.rows, cols: table.cols, size: table.size, cell_data: table.cells }
    }
}

/// Freehand ink stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeData {
    /// Normalized path data, see [`crate::path::VectorPath`]
    pub path_d: String,
    pub stroke_color: Color,
    pub stroke_width: f32,
}

/// Watermark stamped on every page at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkData {
    pub text: String,
    pub wm_size: f32,
    pub opacity: f32,
    /// Degrees, counter-clockwise
    pub rotation: f32,
    pub color: Color,
}

impl Default for WatermarkData {
    fn default() -> Self {
        Self {
            text: "DRAFT".to_owned(),
            wm_size: 60.0,
            opacity: 0.2,
            rotation: -45.0,
            color: Color::LIGHT_GRAY,
        }
    }
}

/// Type-specific payload, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    Text(TextData),
    Symbol(TextData),
    Date(TextData),
    Circle(CircleData),
    Blackout(RectSize),
    Highlight(RectSize),
    Erase(RectSize),
    Textbox(TextboxData),
    Line(SegmentData),
    Arrow(SegmentData),
    Signature(ImageData),
    Initials(ImageData),
    Image(ImageData),
    Sticky(StickyData),
    Table(TableData),
    Draw(StrokeData),
    Watermark(WatermarkData),
}

impl EntryKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            EntryKind::Text(_) => "text",
            EntryKind::Symbol(_) => "symbol",
            EntryKind::Date(_) => "date",
            EntryKind::Circle(_) => "circle",
            EntryKind::Blackout(_) => "blackout",
            EntryKind::Highlight(_) => "highlight",
            EntryKind::Erase(_) => "erase",
            EntryKind::Textbox(_) => "textbox",
            EntryKind::Line(_) => "line",
            EntryKind::Arrow(_) => "arrow",
            EntryKind::Signature(_) => "signature",
            EntryKind::Initials(_) => "initials",
            EntryKind::Image(_) => "image",
            EntryKind::Sticky(_) => "sticky",
            EntryKind::Table(_) => "table",
            EntryKind::Draw(_) => "draw",
            EntryKind::Watermark(_) => "watermark",
        }
    }
}

/// Persisted record for one placed annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    id: EntryId,
    page_num: u32,
    pub norm_x: f32,
    pub norm_y: f32,
    kind: EntryKind,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    #[serde(default = "EntryId::new_v4")]
    id: EntryId,
    page_num: u32,
    norm_x: f32,
    norm_y: f32,
    #[serde(flatten)]
    kind: EntryKind,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = EntryError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        let EntryRecord { id, page_num, norm_x, norm_y, kind } = record;
        match (&kind, page_num) {
            (EntryKind::Watermark(_), ALL_PAGES) => {}
            (EntryKind::Watermark(_), page) => return Err(EntryError::PagedWatermark(page)),
            (_, ALL_PAGES) => return Err(EntryError::InvalidPage(page_num)),
            _ => {}
        }
        Ok(Self { id, page_num, norm_x, norm_y, kind })
    }
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        let Entry { id, page_num, norm_x, norm_y, kind } = entry;
        Self { id, page_num, norm_x, norm_y, kind }
    }
}

impl Entry {
    /// Create a page-anchored entry with a fresh id
    pub fn new(
        page_num: u32,
        norm_x: f32,
        norm_y: f32,
        kind: EntryKind,
    ) -> Result<Self, EntryError> {
        if matches!(kind, EntryKind::Watermark(_)) {
            return Err(EntryError::WatermarkPage);
        }
        if page_num == ALL_PAGES {
            return Err(EntryError::InvalidPage(page_num));
        }
        Ok(Self { id: EntryId::new_v4(), page_num, norm_x, norm_y, kind })
    }

    /// Create a watermark entry, which applies to every page
    pub fn watermark(data: WatermarkData) -> Self {
        Self {
            id: EntryId::new_v4(),
            page_num: ALL_PAGES,
            norm_x: 0.0,
            norm_y: 0.0,
            kind: EntryKind::Watermark(data),
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// 1-based page number, or [`ALL_PAGES`]
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn applies_to_all_pages(&self) -> bool {
        self.page_num == ALL_PAGES
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Stored text for text-bearing kinds
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Text(data) | EntryKind::Symbol(data) | EntryKind::Date(data) => {
                Some(&data.text)
            }
            EntryKind::Textbox(data) => Some(&data.text.text),
            EntryKind::Sticky(data) => Some(&data.text),
            EntryKind::Watermark(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Write edited surface text through to the record
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), EntryError> {
        let slot = match &mut self.kind {
            EntryKind::Text(data) | EntryKind::Symbol(data) | EntryKind::Date(data) => {
                &mut data.text
            }
            EntryKind::Textbox(data) => &mut data.text.text,
            EntryKind::Sticky(data) => &mut data.text,
            other => return Err(EntryError::NotTextBearing(other.type_name())),
        };
        *slot = text.into();
        Ok(())
    }

    pub fn size(&self) -> Option<RectSize> {
        match &self.kind {
            EntryKind::Blackout(size) | EntryKind::Highlight(size) | EntryKind::Erase(size) => {
                Some(*size)
            }
            EntryKind::Textbox(data) => Some(data.size),
            EntryKind::Signature(data) | EntryKind::Initials(data) | EntryKind::Image(data) => {
                Some(data.size)
            }
            EntryKind::Sticky(data) => Some(data.size),
            EntryKind::Table(data) => Some(data.size),
            _ => None,
        }
    }

    pub fn size_mut(&mut self) -> Option<&mut RectSize> {
        match &mut self.kind {
            EntryKind::Blackout(size) | EntryKind::Highlight(size) | EntryKind::Erase(size) => {
                Some(size)
            }
            EntryKind::Textbox(data) => Some(&mut data.size),
            EntryKind::Signature(data) | EntryKind::Initials(data) | EntryKind::Image(data) => {
                Some(&mut data.size)
            }
            EntryKind::Sticky(data) => Some(&mut data.size),
            EntryKind::Table(data) => Some(&mut data.size),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableData> {
        match &self.kind {
            EntryKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        text: impl Into<String>,
    ) -> Result<(), EntryError> {
        match &mut self.kind {
            EntryKind::Table(table) => table.set_cell(row, col, text),
            other => Err(EntryError::NotATable(other.type_name())),
        }
    }

    /// Whether drag gestures and export-time re-normalization apply
    ///
    /// Watermarks have no per-page geometry and freehand paths carry their
    /// own absolute coordinates.
    pub fn is_movable(&self) -> bool {
        !matches!(self.kind, EntryKind::Watermark(_) | EntryKind::Draw(_))
    }

    /// Whether the anchor should be re-derived from the view before export
    pub fn needs_renormalize(&self) -> bool {
        self.is_movable()
    }

    /// Move the top-left anchor; lines and arrows carry their end anchor along
    pub fn move_to(&mut self, norm_x: f32, norm_y: f32) -> Result<(), EntryError> {
        if !self.is_movable() {
            return Err(EntryError::NotMovable(self.type_name()));
        }
        let (dx, dy) = (norm_x - self.norm_x, norm_y - self.norm_y);
        if let EntryKind::Line(segment) | EntryKind::Arrow(segment) = &mut self.kind {
            segment.norm_x2 += dx;
            segment.norm_y2 += dy;
        }
        self.norm_x = norm_x;
        self.norm_y = norm_y;
        Ok(())
    }

    /// Top-left anchor on screen at the given zoom
    pub fn screen_origin(&self, zoom: Zoom) -> ScreenPoint {
        ScreenPoint::from_norm(self.norm_x, self.norm_y, zoom)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
