//! Normalized freehand vector paths
//!
//! Freehand strokes are persisted as SVG-style path data restricted to absolute
//! `M` (move-to) and `L` (line-to) commands, already divided by the screen
//! scale that was active when the stroke was drawn.

use crate::coords::{ScreenPoint, Zoom};
use std::fmt;

/// A single path command in normalized units (y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
}

impl PathCommand {
    pub fn point(&self) -> (f32, f32) {
        match *self {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => (x, y),
        }
    }
}

/// Errors raised when path data cannot be used for drawing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("path data is empty")]
    Empty,
    #[error("path must start with a move-to command")]
    MissingMoveTo,
    #[error("unsupported path command {0:?}")]
    UnknownCommand(String),
    #[error("command {0} is missing an operand")]
    MissingOperand(char),
    #[error("invalid number {0:?} in path data")]
    InvalidNumber(String),
    #[error("path coordinates must be finite")]
    NonFinite,
    #[error("path needs at least two points, found {0}")]
    TooFewPoints(usize),
}

/// Normalized polyline path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorPath {
    commands: Vec<PathCommand>,
}

impl VectorPath {
    /// Build a path from a screen-space polyline recorded at `zoom`
    ///
    /// Returns `None` when fewer than two points were recorded.
    pub fn from_screen_points(points: &[ScreenPoint], zoom: Zoom) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let scale = zoom.scale();
        let commands = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (x, y) = (p.x / scale, p.y / scale);
                if i == 0 {
                    PathCommand::MoveTo { x, y }
                } else {
                    PathCommand::LineTo { x, y }
                }
            })
            .collect();
        Some(Self { commands })
    }

    /// Parse persisted path data
    pub fn parse(data: &str) -> Result<Self, PathError> {
        let tokens = tokenize(data);
        if tokens.is_empty() {
            return Err(PathError::Empty);
        }

        let mut commands = Vec::new();
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            let letter = match token.as_str() {
                "M" => 'M',
                "L" => 'L',
                other if other.parse::<f32>().is_ok() && commands.is_empty() => {
                    return Err(PathError::MissingMoveTo)
                }
                other => return Err(PathError::UnknownCommand(other.to_owned())),
            };
            if commands.is_empty() && letter != 'M' {
                return Err(PathError::MissingMoveTo);
            }

            let x = parse_operand(iter.next(), letter)?;
            let y = parse_operand(iter.next(), letter)?;
            commands.push(match letter {
                'M' => PathCommand::MoveTo { x, y },
                _ => PathCommand::LineTo { x, y },
            });
        }

        if commands.len() < 2 {
            return Err(PathError::TooFewPoints(commands.len()));
        }
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Split into polylines, one per move-to
    pub fn subpaths(&self) -> Vec<Vec<(f32, f32)>> {
        let mut out: Vec<Vec<(f32, f32)>> = Vec::new();
        for command in &self.commands {
            match command {
                PathCommand::MoveTo { .. } => out.push(vec![command.point()]),
                PathCommand::LineTo { .. } => match out.last_mut() {
                    Some(current) => current.push(command.point()),
                    None => out.push(vec![command.point()]),
                },
            }
        }
        out
    }
}

impl fmt::Display for VectorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match command {
                PathCommand::MoveTo { x, y } => write!(f, "M {x} {y}")?,
                PathCommand::LineTo { x, y } => write!(f, "L {x} {y}")?,
            }
        }
        Ok(())
    }
}

fn parse_operand(token: Option<String>, command: char) -> Result<f32, PathError> {
    let token = token.ok_or(PathError::MissingOperand(command))?;
    let value: f32 = token.parse().map_err(|_| PathError::InvalidNumber(token.clone()))?;
    if !value.is_finite() {
        return Err(PathError::NonFinite);
    }
    Ok(value)
}

/// Split on whitespace and commas, detaching a leading command letter (`M10`)
fn tokenize(data: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for piece in data.split(|c: char| c.is_whitespace() || c == ',') {
        if piece.is_empty() {
            continue;
        }
        let mut chars = piece.chars();
        let first = chars.next();
        let rest = chars.as_str();
        let numeric_rest =
            rest.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
        match first {
            Some(letter) if letter.is_ascii_alphabetic() && numeric_rest => {
                tokens.push(letter.to_string());
                tokens.push(rest.to_owned());
            }
            _ => tokens.push(piece.to_owned()),
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_points_are_normalized() {
        let points = [ScreenPoint::new(30.0, 60.0), ScreenPoint::new(90.0, 120.0)];
        let path = VectorPath::from_screen_points(&points, Zoom::new(2.0)).unwrap();
        assert_eq!(
            path.commands(),
            &[PathCommand::MoveTo { x: 10.0, y: 20.0 }, PathCommand::LineTo { x: 30.0, y: 40.0 }]
        );
        assert_eq!(path.to_string(), "M 10 20 L 30 40");
    }

    #[test]
    fn test_single_point_is_rejected() {
        let points = [ScreenPoint::new(1.0, 1.0)];
        assert!(VectorPath::from_screen_points(&points, Zoom::FIT).is_none());
    }

    #[test]
    fn test_parse_display_output() {
        let path = VectorPath::parse("M 1.5 2 L 3 4.25 L 5,6").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(VectorPath::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn test_parse_attached_command_letters() {
        let path = VectorPath::parse("M0 0 L10 10").unwrap();
        assert_eq!(path.commands()[1], PathCommand::LineTo { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_parse_rejects_malformed_data() {
        assert_eq!(VectorPath::parse("   "), Err(PathError::Empty));
        assert_eq!(VectorPath::parse("L 1 2 L 3 4"), Err(PathError::MissingMoveTo));
        assert_eq!(VectorPath::parse("M 1 2 C 3 4"), Err(PathError::UnknownCommand("C".into())));
        assert_eq!(VectorPath::parse("M 1 2 L 3"), Err(PathError::MissingOperand('L')));
        assert_eq!(VectorPath::parse("M 1 x L 3 4"), Err(PathError::InvalidNumber("x".into())));
        assert_eq!(VectorPath::parse("M 1 2 L inf 4"), Err(PathError::NonFinite));
        assert_eq!(VectorPath::parse("M 1 2"), Err(PathError::TooFewPoints(1)));
    }

    #[test]
    fn test_subpaths_split_on_move() {
        let path = VectorPath::parse("M 0 0 L 1 1 M 5 5 L 6 6 L 7 7").unwrap();
        let subpaths = path.subpaths();
        assert_eq!(subpaths.len(), 2);
        assert_eq!(subpaths[1].len(), 3);
    }
}
