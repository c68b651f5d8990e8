//! Content-stream writer for overlay primitives
//!
//! Every primitive is wrapped in its own `q … Q` pair so graphics state never
//! leaks between entries. Fonts, opacity states and image XObjects are
//! registered in the page's resource dictionary under names that do not
//! collide with what the page already uses.

use crate::compositor::{DrawOp, FontFace, Rgb};
use lopdf::{dictionary, Dictionary, Object, ObjectId};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Bezier control-point factor for quarter-circle arcs
const KAPPA: f32 = 0.552_284_8;

/// Accumulates overlay operators for one page
pub(crate) struct PageCanvas<'r> {
    resources: &'r mut Dictionary,
    content: String,
    fonts: BTreeMap<FontFace, String>,
    states: BTreeMap<u32, String>,
}

impl<'r> PageCanvas<'r> {
    /// `resources` must be a direct dictionary owned by the page
    pub(crate) fn new(resources: &'r mut Dictionary) -> Self {
        Self {
            resources,
            content: String::new(),
            fonts: BTreeMap::new(),
            states: BTreeMap::new(),
        }
    }

    /// Write one primitive; image ops need the XObject id from the caller
    pub(crate) fn draw(&mut self, op: &DrawOp<'_>, image: Option<ObjectId>) -> fmt::Result {
        writeln!(self.content, "q")?;
        match op {
            DrawOp::Text { text, x, y, size, font, color, rotation, opacity } => {
                self.set_opacity(*opacity)?;
                let font_name = self.font(*font);
                let encoded = encode_text(text, *font);
                let (sin, cos) = rotation.to_radians().sin_cos();
                writeln!(self.content, "BT")?;
                writeln!(self.content, "/{font_name} {} Tf", num(*size))?;
                fill_color(&mut self.content, *color)?;
                writeln!(
                    self.content,
                    "{} {} {} {} {} {} Tm",
                    num(cos),
                    num(sin),
                    num(-sin),
                    num(cos),
                    num(*x),
                    num(*y)
                )?;
                writeln!(self.content, "<{}> Tj", hex(&encoded))?;
                writeln!(self.content, "ET")?;
            }
            DrawOp::Rect { x, y, width, height, fill, stroke, opacity } => {
                self.set_opacity(*opacity)?;
                if let Some(color) = fill {
                    fill_color(&mut self.content, *color)?;
                }
                if let Some((color, line_width)) = stroke {
                    stroke_style(&mut self.content, *color, *line_width)?;
                }
                writeln!(
                    self.content,
                    "{} {} {} {} re",
                    num(*x),
                    num(*y),
                    num(*width),
                    num(*height)
                )?;
                let paint = match (fill.is_some(), stroke.is_some()) {
                    (true, true) => "B",
                    (true, false) => "f",
                    (false, true) => "S",
                    (false, false) => "n",
                };
                writeln!(self.content, "{paint}")?;
            }
            DrawOp::Ellipse { cx, cy, rx, ry, color, width } => {
                stroke_style(&mut self.content, *color, *width)?;
                ellipse(&mut self.content, *cx, *cy, *rx, *ry)?;
                writeln!(self.content, "s")?;
            }
            DrawOp::Line { from, to, color, width } => {
                stroke_style(&mut self.content, *color, *width)?;
                writeln!(self.content, "{} {} m", num(from.0), num(from.1))?;
                writeln!(self.content, "{} {} l", num(to.0), num(to.1))?;
                writeln!(self.content, "S")?;
            }
            DrawOp::Path { subpaths, color, width } => {
                stroke_style(&mut self.content, *color, *width)?;
                writeln!(self.content, "1 J 1 j")?;
                for points in subpaths {
                    for (i, (px, py)) in points.iter().enumerate() {
                        let op = if i == 0 { "m" } else { "l" };
                        writeln!(self.content, "{} {} {op}", num(*px), num(*py))?;
                    }
                }
                writeln!(self.content, "S")?;
            }
            DrawOp::Image { x, y, width, height, .. } => {
                if let Some(id) = image {
                    let name = self.image(id);
                    writeln!(
                        self.content,
                        "{} 0 0 {} {} {} cm",
                        num(*width),
                        num(*height),
                        num(*x),
                        num(*y)
                    )?;
                    writeln!(self.content, "/{name} Do")?;
                }
            }
        }
        writeln!(self.content, "Q")
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.content.into_bytes()
    }

    fn set_opacity(&mut self, opacity: f32) -> fmt::Result {
        if opacity >= 1.0 {
            return Ok(());
        }
        let key = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32;
        let name = match self.states.get(&key) {
            Some(name) => name.clone(),
            None => {
                let alpha = key as f32 / 1000.0;
                let state = dictionary! {
                    "Type" => "ExtGState",
                    "ca" => alpha,
                    "CA" => alpha,
                };
                let name = register(self.resources, "ExtGState", "OvGs", state.into());
                self.states.insert(key, name.clone());
                name
            }
        };
        writeln!(self.content, "/{name} gs")
    }

    fn font(&mut self, face: FontFace) -> String {
        if let Some(name) = self.fonts.get(&face) {
            return name.clone();
        }
        let font = match face {
            FontFace::Helvetica => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
            FontFace::ZapfDingbats => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "ZapfDingbats",
            },
        };
        let name = register(self.resources, "Font", "OvF", font.into());
        self.fonts.insert(face, name.clone());
        name
    }

    fn image(&mut self, id: ObjectId) -> String {
        register(self.resources, "XObject", "OvIm", Object::Reference(id))
    }
}

/// Insert `value` into the `category` sub-dictionary under a fresh name
fn register(resources: &mut Dictionary, category: &str, prefix: &str, value: Object) -> String {
    let category_key = category.as_bytes();
    let mut sub = match resources.get(category_key) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let name = (0..)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !sub.has(candidate.as_bytes()))
        .unwrap_or_else(|| prefix.to_owned());
    sub.set(name.clone(), value);
    resources.set(category, Object::Dictionary(sub));
    name
}

fn fill_color(out: &mut String, color: Rgb) -> fmt::Result {
    writeln!(out, "{} {} {} rg", num(color.r), num(color.g), num(color.b))
}

fn stroke_style(out: &mut String, color: Rgb, width: f32) -> fmt::Result {
    writeln!(out, "{} {} {} RG", num(color.r), num(color.g), num(color.b))?;
    writeln!(out, "{} w", num(width))
}

fn ellipse(out: &mut String, cx: f32, cy: f32, rx: f32, ry: f32) -> fmt::Result {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    writeln!(out, "{} {} m", num(cx + rx), num(cy))?;
    let arcs = [
        (cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry),
        (cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy),
        (cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry),
        (cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy),
    ];
    for (x1, y1, x2, y2, x3, y3) in arcs {
        writeln!(
            out,
            "{} {} {} {} {} {} c",
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            num(x3),
            num(y3)
        )?;
    }
    Ok(())
}

/// Format a coordinate with at most three decimals
fn num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_owned();
    }
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-0" => "0".to_owned(),
        other => other.to_owned(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Encode text for a simple font
///
/// Helvetica uses WinAnsiEncoding; characters outside it become `?`.
/// ZapfDingbats maps the check and cross marks to their glyph codes.
pub(crate) fn encode_text(text: &str, font: FontFace) -> Vec<u8> {
    text.chars()
        .map(|ch| match font {
            FontFace::ZapfDingbats => match ch {
                '\u{2713}' | '\u{2714}' => b'4',
                '\u{2717}' | '\u{2718}' => b'8',
                c if c.is_ascii() => c as u8,
                _ => b'?',
            },
            FontFace::Helvetica => win_ansi(ch).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => Some(match ch {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            _ => return None,
        }),
    }
}
