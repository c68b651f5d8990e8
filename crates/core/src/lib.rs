//! PDF overlay core
//!
//! Annotation model, coordinates and interaction state for placing overlay
//! objects on rendered PDF pages. Nothing here touches PDF bytes; see the
//! `overlay-engine` crate for baking entries into a document.

pub mod color;
pub mod content;
pub mod coords;
pub mod entry;
pub mod history;
pub mod path;
pub mod session;
pub mod settings;

pub use color::{Color, ColorParseError};
pub use content::{extract_text, ContentNode, ControlKind};
pub use coords::{chevron, from_norm, to_norm, ScreenPoint, Zoom, BASE_SCALE, MAX_ZOOM, MIN_ZOOM};
pub use entry::{
    CircleData, Entry, EntryError, EntryId, EntryKind, ImageData, ImageKind, RectSize,
    SegmentData, StickyData, StrokeData, TableData, TextData, TextboxData, WatermarkData,
    ALL_PAGES, MAX_TABLE_DIM,
};
pub use history::{HistoryStore, VisualLayer};
pub use path::{PathCommand, PathError, VectorPath};
pub use session::{
    DiscardReason, GestureError, GestureOutcome, InteractionMode, InteractionSession, Tool,
};
pub use settings::{Settings, TableConfig, ToolStyle};
