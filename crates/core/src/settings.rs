//! User-adjustable defaults for new annotations

use crate::color::Color;
use crate::entry::{WatermarkData, MAX_TABLE_DIM};
use serde::{Deserialize, Serialize};

/// Style applied to newly placed text, shapes and strokes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStyle {
    pub font_size: f32,
    pub color: Color,
    pub stroke_width: f32,
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self { font_size: 11.0, color: Color::BLACK, stroke_width: 2.0 }
    }
}

/// Grid shape for the next table placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub rows: u32,
    pub cols: u32,
}

impl TableConfig {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows: rows.clamp(1, MAX_TABLE_DIM), cols: cols.clamp(1, MAX_TABLE_DIM) }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tool: ToolStyle,
    pub watermark: WatermarkData,
    pub table: TableConfig,
}
