//! Entry records to page drawing primitives
//!
//! [`compose`] is a pure pass over the entry list: it never touches PDF
//! objects. Output coordinates are PDF user space (origin bottom-left, y up),
//! derived from the normalized top-left anchors as
//! `out_y = page_height - norm_y - height`.

use crate::PageSize;
use overlay_core::coords::chevron;
use overlay_core::entry::{Entry, EntryKind, ImageData, RectSize, TextData};
use overlay_core::path::VectorPath;
use overlay_core::session::{CHECK_MARK, CROSS_MARK};
use overlay_core::Color;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Line pitch as a multiple of the font size
pub const LINE_PITCH: f32 = 1.3;
pub const ARROW_HEAD_LEN: f32 = 12.0;
pub const TEXTBOX_INSET: f32 = 4.0;
pub const DEFAULT_RECT: RectSize = RectSize { norm_width: 100.0, norm_height: 40.0 };
pub const DEFAULT_IMAGE: RectSize = RectSize { norm_width: 100.0, norm_height: 100.0 };
pub const DEFAULT_STICKY: RectSize = RectSize { norm_width: 150.0, norm_height: 100.0 };
pub const DEFAULT_TABLE: RectSize = RectSize { norm_width: 200.0, norm_height: 100.0 };
pub const HIGHLIGHT_OPACITY: f32 = 0.3;
const NOTE_FONT_SIZE: f32 = 10.0;
const NOTE_PITCH: f32 = 14.0;
const DEFAULT_STROKE: f32 = 2.0;
const WATERMARK_FALLBACK: &str = "WATERMARK";
/// Average Helvetica glyph width as a fraction of the font size
const WATERMARK_GLYPH_WIDTH: f32 = 0.3;

/// Non-premultiplied RGB in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const YELLOW: Rgb = Rgb::new(1.0, 1.0, 0.0);
    pub const NOTE_FILL: Rgb = Rgb::new(1.0, 0.98, 0.77);
    pub const NOTE_BORDER: Rgb = Rgb::new(0.94, 0.9, 0.55);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for Rgb {
    fn from(color: Color) -> Self {
        let (r, g, b, _) = color.to_normalized();
        Self { r, g, b }
    }
}

/// Standard 14 fonts used for overlay text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFace {
    Helvetica,
    ZapfDingbats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp<'a> {
    /// Single line of text; `(x, y)` is the baseline origin
    Text {
        text: Cow<'a, str>,
        x: f32,
        y: f32,
        size: f32,
        font: FontFace,
        color: Rgb,
        /// Degrees, counter-clockwise
        rotation: f32,
        opacity: f32,
    },
    /// Axis-aligned rectangle; `(x, y)` is the lower-left corner
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
        opacity: f32,
    },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32, color: Rgb, width: f32 },
    Line { from: (f32, f32), to: (f32, f32), color: Rgb, width: f32 },
    /// Stroked polylines, already flipped into PDF space
    Path { subpaths: Vec<Vec<(f32, f32)>>, color: Rgb, width: f32 },
    Image { image: &'a ImageData, x: f32, y: f32, width: f32, height: f32 },
}

/// Per-page primitive lists in entry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition<'a> {
    pages: Vec<Vec<DrawOp<'a>>>,
    skipped: usize,
}

impl<'a> Composition<'a> {
    /// Primitives for a 0-based page index
    pub fn page(&self, index: usize) -> &[DrawOp<'a>] {
        self.pages.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn op_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Entries dropped with a warning (missing page, malformed path)
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Translate entries into drawing primitives for each page
pub fn compose<'a>(entries: &'a [Entry], pages: &[PageSize]) -> Composition<'a> {
    let mut composition =
        Composition { pages: vec![Vec::new(); pages.len()], skipped: 0 };

    for entry in entries {
        if let EntryKind::Watermark(data) = entry.kind() {
            for (ops, size) in composition.pages.iter_mut().zip(pages) {
                let text =
                    if data.text.is_empty() { WATERMARK_FALLBACK } else { data.text.as_str() };
                let advance = text.chars().count() as f32 * data.wm_size * WATERMARK_GLYPH_WIDTH;
                ops.push(DrawOp::Text {
                    text: Cow::Borrowed(text),
                    x: size.width_pt / 2.0 - advance,
                    y: size.height_pt / 2.0,
                    size: data.wm_size,
                    font: FontFace::Helvetica,
                    color: data.color.into(),
                    rotation: data.rotation,
                    opacity: data.opacity.clamp(0.0, 1.0),
                });
            }
            continue;
        }

        let index = entry.page_num() as usize;
        let Some(size) = index.checked_sub(1).and_then(|i| pages.get(i)) else {
            warn!(
                id = %entry.id(),
                page = entry.page_num(),
                page_count = pages.len(),
                "entry targets a page that does not exist; skipped"
            );
            composition.skipped += 1;
            continue;
        };

        let ops = &mut composition.pages[index - 1];
        let before = ops.len();
        if !draw_entry(entry, size.height_pt, ops) {
            composition.skipped += 1;
        }
        debug!(id = %entry.id(), kind = entry.type_name(), ops = ops.len() - before, "composed");
    }

    composition
}

/// Returns false when the entry had to be skipped
fn draw_entry<'a>(entry: &'a Entry, page_height: f32, ops: &mut Vec<DrawOp<'a>>) -> bool {
    let x = entry.norm_x;
    let top = page_height - entry.norm_y;

    match entry.kind() {
        EntryKind::Text(data) | EntryKind::Date(data) => {
            push_lines(ops, data, FontFace::Helvetica, x, top - data.font_size);
        }
        EntryKind::Symbol(data) => {
            push_lines(ops, data, symbol_font(&data.text), x, top - data.font_size);
        }
        EntryKind::Circle(data) => ops.push(DrawOp::Ellipse {
            cx: x + data.radius,
            cy: top - data.radius,
            rx: data.radius,
            ry: data.radius,
            color: data.border_color.into(),
            width: stroke_or_default(data.stroke_width),
        }),
        EntryKind::Blackout(size) => push_fill(ops, x, top, size.or(DEFAULT_RECT), Rgb::BLACK, 1.0),
        EntryKind::Highlight(size) => {
            push_fill(ops, x, top, size.or(DEFAULT_RECT), Rgb::YELLOW, HIGHLIGHT_OPACITY)
        }
        EntryKind::Erase(size) => push_fill(ops, x, top, size.or(DEFAULT_RECT), Rgb::WHITE, 1.0),
        EntryKind::Textbox(data) => {
            let size = data.size.or(DEFAULT_RECT);
            ops.push(DrawOp::Rect {
                x,
                y: top - size.norm_height,
                width: size.norm_width,
                height: size.norm_height,
                fill: None,
                stroke: Some((data.border_color.into(), 1.0)),
                opacity: 1.0,
            });
            let baseline = top - data.text.font_size - TEXTBOX_INSET;
            push_lines(ops, &data.text, FontFace::Helvetica, x + TEXTBOX_INSET, baseline);
        }
        EntryKind::Line(segment) | EntryKind::Arrow(segment) => {
            let from = (x, top);
            let to = (segment.norm_x2, page_height - segment.norm_y2);
            let color = segment.stroke_color.into();
            let width = stroke_or_default(segment.stroke_width);
            ops.push(DrawOp::Line { from, to, color, width });
            if matches!(entry.kind(), EntryKind::Arrow(_)) {
                let (left, right) = chevron(from, to, ARROW_HEAD_LEN);
                ops.push(DrawOp::Line { from: to, to: left, color, width });
                ops.push(DrawOp::Line { from: to, to: right, color, width });
            }
        }
        EntryKind::Signature(image) | EntryKind::Initials(image) | EntryKind::Image(image) => {
            let size = image.size.or(DEFAULT_IMAGE);
            ops.push(DrawOp::Image {
                image,
                x,
                y: top - size.norm_height,
                width: size.norm_width,
                height: size.norm_height,
            });
        }
        EntryKind::Draw(stroke) => {
            let path = match VectorPath::parse(&stroke.path_d) {
                Ok(path) => path,
                Err(err) => {
                    warn!(id = %entry.id(), error = %err, "malformed freehand path; skipped");
                    return false;
                }
            };
            let subpaths = path
                .subpaths()
                .into_iter()
                .map(|points| points.into_iter().map(|(px, py)| (px, page_height - py)).collect())
                .collect();
            ops.push(DrawOp::Path {
                subpaths,
                color: stroke.stroke_color.into(),
                width: stroke_or_default(stroke.stroke_width),
            });
        }
        EntryKind::Sticky(note) => {
            let size = note.size.or(DEFAULT_STICKY);
            ops.push(DrawOp::Rect {
                x,
                y: top - size.norm_height,
                width: size.norm_width,
                height: size.norm_height,
                fill: Some(Rgb::NOTE_FILL),
                stroke: Some((Rgb::NOTE_BORDER, 1.0)),
                opacity: 1.0,
            });
            for (i, line) in note.text.trim().split('\n').enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                ops.push(plain_text(line, x + 6.0, top - 14.0 - i as f32 * NOTE_PITCH));
            }
        }
        EntryKind::Table(table) => {
            let size = table.size.or(DEFAULT_TABLE);
            let (rows, cols) = (table.rows() as usize, table.cols() as usize);
            let cell_w = size.norm_width / cols as f32;
            let cell_h = size.norm_height / rows as f32;
            let grid = |from, to| DrawOp::Line { from, to, color: Rgb::BLACK, width: 1.0 };

            for r in 0..=rows {
                let y = top - r as f32 * cell_h;
                ops.push(grid((x, y), (x + size.norm_width, y)));
            }
            for c in 0..=cols {
                let cx = x + c as f32 * cell_w;
                ops.push(grid((cx, top), (cx, top - size.norm_height)));
            }
            for (r, row) in table.cells().iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let text = cell.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let tx = x + c as f32 * cell_w + 4.0;
                    let ty = top - r as f32 * cell_h - 14.0;
                    ops.push(plain_text(text, tx, ty));
                }
            }
        }
        EntryKind::Watermark(_) => {}
    }
    true
}

fn push_lines<'a>(
    ops: &mut Vec<DrawOp<'a>>,
    data: &'a TextData,
    font: FontFace,
    x: f32,
    baseline: f32,
) {
    let text = data.text.trim();
    if text.is_empty() {
        return;
    }
    let pitch = data.font_size * LINE_PITCH;
    for (i, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        ops.push(DrawOp::Text {
            text: Cow::Borrowed(line),
            x,
            y: baseline - i as f32 * pitch,
            size: data.font_size,
            font,
            color: data.color.into(),
            rotation: 0.0,
            opacity: 1.0,
        });
    }
}

fn push_fill(ops: &mut Vec<DrawOp<'_>>, x: f32, top: f32, size: RectSize, fill: Rgb, opacity: f32) {
    ops.push(DrawOp::Rect {
        x,
        y: top - size.norm_height,
        width: size.norm_width,
        height: size.norm_height,
        fill: Some(fill),
        stroke: None,
        opacity,
    });
}

fn plain_text(text: &str, x: f32, y: f32) -> DrawOp<'_> {
    DrawOp::Text {
        text: Cow::Borrowed(text),
        x,
        y,
        size: NOTE_FONT_SIZE,
        font: FontFace::Helvetica,
        color: Rgb::BLACK,
        rotation: 0.0,
        opacity: 1.0,
    }
}

fn symbol_font(text: &str) -> FontFace {
    if text.contains(CHECK_MARK) || text.contains(CROSS_MARK) {
        FontFace::ZapfDingbats
    } else {
        FontFace::Helvetica
    }
}

fn stroke_or_default(width: f32) -> f32 {
    if width.is_finite() && width > 0.0 {
        width
    } else {
        DEFAULT_STROKE
    }
}
