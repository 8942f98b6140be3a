//! Flattens a page body into the plain-text event description.

use crate::record::{BlockKind, ContentBlock};

/// Appended when the description had to be cut.
pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Google rejects descriptions much beyond 8k characters.
pub const DEFAULT_MAX_CHARS: usize = 8000;
pub const DEFAULT_MAX_DEPTH: usize = 8;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Blocks nested deeper than this are dropped (top level is depth 0)
    pub max_depth: usize,
    /// Hard cap on the output, in characters, marker included
    pub max_chars: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Render `blocks` as text, one line per block, children indented under
/// their parent.
///
/// Never fails: over-deep blocks are skipped and oversized output is cut.
pub fn flatten(blocks: &[ContentBlock], options: &FlattenOptions) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut rendered_chars = 0;

    // Explicit stack, pushed in reverse so blocks pop in document order.
    let mut stack: Vec<(&ContentBlock, usize)> = blocks.iter().rev().map(|b| (b, 0)).collect();

    while let Some((block, depth)) = stack.pop() {
        if let Some(line) = render_block(block, depth) {
            rendered_chars += line.chars().count() + 1;
            lines.push(line);
        }

        // Enough text to know we will truncate; stop walking.
        if rendered_chars > options.max_chars {
            break;
        }

        if depth + 1 < options.max_depth {
            stack.extend(block.children.iter().rev().map(|c| (c, depth + 1)));
        }
    }

    let text = lines.join("\n");
    truncate(text.trim_matches('\n'), options.max_chars)
}

fn render_block(block: &ContentBlock, depth: usize) -> Option<String> {
    let text = block.text.trim();
    if text.is_empty() {
        return None;
    }

    let indent = INDENT.repeat(depth);
    let line = match block.kind {
        BlockKind::Heading(_) => format!("\n{indent}{}\n", text.to_uppercase()),
        BlockKind::BulletedItem | BlockKind::NumberedItem => format!("{indent}• {text}"),
        BlockKind::ToDo { checked: true } => format!("{indent}✅ {text}"),
        BlockKind::ToDo { checked: false } => format!("{indent}☐ {text}"),
        BlockKind::Quote => format!("{indent}> {text}"),
        BlockKind::Paragraph | BlockKind::Other => format!("{indent}{text}"),
    };

    Some(line)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars < marker_chars {
        return text.chars().take(max_chars).collect();
    }

    let mut cut: String = text.chars().take(max_chars - marker_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> ContentBlock {
        ContentBlock::new(BlockKind::Paragraph, text)
    }

    #[test]
    fn test_flatten_renders_each_block_kind() {
        let blocks = vec![
            ContentBlock::new(BlockKind::Heading(1), "Agenda"),
            para("Talk about the launch"),
            ContentBlock::new(BlockKind::BulletedItem, "slides"),
            ContentBlock::new(BlockKind::NumberedItem, "demo"),
            ContentBlock::new(BlockKind::ToDo { checked: true }, "book room"),
            ContentBlock::new(BlockKind::ToDo { checked: false }, "send invite"),
            ContentBlock::new(BlockKind::Quote, "ship it"),
        ];

        let text = flatten(&blocks, &FlattenOptions::default());

        assert_eq!(
            text,
            "AGENDA\n\nTalk about the launch\n• slides\n• demo\n✅ book room\n☐ send invite\n> ship it"
        );
    }

    #[test]
    fn test_flatten_skips_empty_blocks_but_keeps_their_children() {
        let blocks = vec![para("  ").with_children(vec![para("child")])];
        assert_eq!(flatten(&blocks, &FlattenOptions::default()), "  child");
    }

    #[test]
    fn test_flatten_indents_children_and_caps_depth() {
        let blocks = vec![ContentBlock::new(BlockKind::BulletedItem, "level 0").with_children(vec![
            ContentBlock::new(BlockKind::BulletedItem, "level 1")
                .with_children(vec![ContentBlock::new(BlockKind::BulletedItem, "level 2")]),
        ])];

        let options = FlattenOptions {
            max_depth: 2,
            ..FlattenOptions::default()
        };

        assert_eq!(flatten(&blocks, &options), "• level 0\n  • level 1");
    }

    #[test]
    fn test_flatten_survives_pathologically_deep_trees() {
        let mut block = para("leaf");
        for i in 0..1_000 {
            block = para(&format!("node {i}")).with_children(vec![block]);
        }

        let text = flatten(&[block], &FlattenOptions::default());
        assert_eq!(text.lines().count(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_flatten_truncates_with_marker() {
        let blocks: Vec<_> = (0..100).map(|i| para(&format!("line number {i}"))).collect();
        let options = FlattenOptions {
            max_chars: 50,
            ..FlattenOptions::default()
        };

        let text = flatten(&blocks, &options);

        assert_eq!(text.chars().count(), 50);
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert!(text.starts_with("line number 0\nline number 1"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "✅".repeat(30);
        let cut = truncate(&text, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_flatten_empty_forest() {
        assert_eq!(flatten(&[], &FlattenOptions::default()), "");
    }
}
