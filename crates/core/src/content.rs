//! Editable surface content and text extraction
//!
//! Text-bearing annotations are edited through a live surface owned by the
//! view layer. The surface reports its content as a tree of [`ContentNode`]s;
//! [`extract_text`] flattens that tree into the plain string stored on the
//! entry record.

use serde::{Deserialize, Serialize};

/// Auxiliary widgets mounted inside an editable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    DeleteButton,
    DragHandle,
    ResizeHandle,
}

/// One node of an editable surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentNode {
    /// Plain text run
    Text(String),
    /// Explicit line break
    LineBreak,
    /// Nested block-level child
    Block(Vec<ContentNode>),
    /// Control widget, never part of the text
    Control(ControlKind),
}

impl ContentNode {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// Flatten surface content into the exported string
///
/// Blocks start on a fresh line unless the text so far is empty or already
/// ends with a newline. The result is trimmed.
pub fn extract_text(nodes: &[ContentNode]) -> String {
    let mut out = String::new();
    walk(nodes, &mut out);
    out.trim().to_owned()
}

fn walk(nodes: &[ContentNode], out: &mut String) {
    for node in nodes {
        match node {
            ContentNode::Text(run) => out.push_str(run),
            ContentNode::LineBreak => out.push('\n'),
            ContentNode::Block(children) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                walk(children, out);
            }
            ContentNode::Control(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_break_between_runs() {
        let nodes =
            [ContentNode::text("Hello"), ContentNode::LineBreak, ContentNode::text("World")];
        assert_eq!(extract_text(&nodes), "Hello\nWorld");
    }

    #[test]
    fn test_blocks_start_new_lines() {
        let nodes = [
            ContentNode::text("first"),
            ContentNode::Block(vec![ContentNode::text("second")]),
            ContentNode::Block(vec![ContentNode::text("third"), ContentNode::LineBreak]),
            ContentNode::Block(vec![ContentNode::text("fourth")]),
        ];
        assert_eq!(extract_text(&nodes), "first\nsecond\nthird\nfourth");
    }

    #[test]
    fn test_leading_block_adds_no_blank_line() {
        let nodes = [ContentNode::Block(vec![ContentNode::text("only")])];
        assert_eq!(extract_text(&nodes), "only");
    }

    #[test]
    fn test_controls_are_skipped_and_result_trimmed() {
        let nodes = [
            ContentNode::Control(ControlKind::DragHandle),
            ContentNode::text("  note "),
            ContentNode::Control(ControlKind::DeleteButton),
            ContentNode::Control(ControlKind::ResizeHandle),
            ContentNode::LineBreak,
        ];
        assert_eq!(extract_text(&nodes), "note");
    }

    #[test]
    fn test_empty_surface() {
        assert_eq!(extract_text(&[]), "");
        assert_eq!(extract_text(&[ContentNode::text("   "), ContentNode::LineBreak]), "");
    }
}
