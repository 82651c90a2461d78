//! Block Splitter - Template Segmentation
//!
//! A template is a sequence of `[KIND condition?]body[FIN]` blocks.
//! Anything that does not form a complete block is ignored.

use regex::Regex;
use std::sync::LazyLock;

/// Non-greedy per block: the body ends at the nearest `[FIN]`.
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[(SINO PERO|SINO|SI|BASE)([^\[\]]*)\](.*?)\[FIN\]").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Base,
    Si,
    SinoPero,
    Sino,
}

impl BlockKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Base => "BASE",
            BlockKind::Si => "SI",
            BlockKind::SinoPero => "SINO PERO",
            BlockKind::Sino => "SINO",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "BASE" => Some(BlockKind::Base),
            "SI" => Some(BlockKind::Si),
            "SINO PERO" => Some(BlockKind::SinoPero),
            "SINO" => Some(BlockKind::Sino),
            _ => None,
        }
    }
}

/// One tagged segment of a template. Only conditional blocks carry
/// condition text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBlock {
    Base { body: String },
    Si { condition: String, body: String },
    SinoPero { condition: String, body: String },
    Sino { body: String },
}

impl CommandBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            CommandBlock::Base { .. } => BlockKind::Base,
            CommandBlock::Si { .. } => BlockKind::Si,
            CommandBlock::SinoPero { .. } => BlockKind::SinoPero,
            CommandBlock::Sino { .. } => BlockKind::Sino,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            CommandBlock::Base { body }
            | CommandBlock::Si { body, .. }
            | CommandBlock::SinoPero { body, .. }
            | CommandBlock::Sino { body } => body,
        }
    }

    pub fn condition(&self) -> Option<&str> {
        match self {
            CommandBlock::Si { condition, .. } | CommandBlock::SinoPero { condition, .. } => {
                Some(condition)
            }
            CommandBlock::Base { .. } | CommandBlock::Sino { .. } => None,
        }
    }
}

/// Split a template into its command blocks, in source order.
pub fn split_blocks(template: &str) -> Vec<CommandBlock> {
    BLOCK_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let kind = BlockKind::from_keyword(caps.get(1)?.as_str())?;
            let tail = caps.get(2).map_or("", |m| m.as_str());
            let body = caps.get(3).map_or("", |m| m.as_str()).to_string();
            build_block(kind, tail, body)
        })
        .collect()
}

fn build_block(kind: BlockKind, tail: &str, body: String) -> Option<CommandBlock> {
    match kind {
        // Unconditional tags take no trailing text.
        BlockKind::Base | BlockKind::Sino if !tail.trim().is_empty() => None,
        BlockKind::Base => Some(CommandBlock::Base { body }),
        BlockKind::Sino => Some(CommandBlock::Sino { body }),
        // `[SIEMPRE]` is not an SI tag.
        BlockKind::Si | BlockKind::SinoPero
            if !tail.is_empty() && !tail.starts_with(char::is_whitespace) =>
        {
            None
        }
        BlockKind::Si => Some(CommandBlock::Si {
            condition: tail.trim().to_string(),
            body,
        }),
        BlockKind::SinoPero => Some(CommandBlock::SinoPero {
            condition: tail.trim().to_string(),
            body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_preserves_source_order() {
        let blocks = split_blocks(
            "[SI {{ticket.a}} ES IGUAL QUE 1]uno[FIN]\n\
             [SINO PERO {{ticket.a}} ES IGUAL QUE 2]dos[FIN]\n\
             [SINO PERO {{ticket.a}} ES IGUAL QUE 3]tres[FIN]\n\
             [SINO]otro[FIN]",
        );

        let kinds: Vec<_> = blocks.iter().map(|b| b.kind()).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Si, BlockKind::SinoPero, BlockKind::SinoPero, BlockKind::Sino]
        );
        assert_eq!(blocks[0].condition(), Some("{{ticket.a}} ES IGUAL QUE 1"));
        assert_eq!(blocks[2].body(), "tres");
        assert_eq!(blocks[3].condition(), None);
    }

    #[test]
    fn test_body_is_non_greedy_and_multiline() {
        let blocks = split_blocks("[BASE]linea 1\nlinea 2[FIN] resto [FIN]");
        assert_eq!(blocks, vec![CommandBlock::Base { body: "linea 1\nlinea 2".into() }]);
    }

    #[test]
    fn test_nested_opening_tag_is_plain_body_text() {
        let blocks = split_blocks("[SINO]a [BASE]b[FIN]");
        assert_eq!(blocks, vec![CommandBlock::Sino { body: "a [BASE]b".into() }]);
    }

    #[test]
    fn test_malformed_tags_are_invisible() {
        assert!(split_blocks("[BASE]sin cierre").is_empty());
        assert!(split_blocks("[SIEMPRE]x[FIN]").is_empty());
        assert!(split_blocks("[OTRO]x[FIN]").is_empty());

        let blocks = split_blocks("[BASE extra]x[FIN][SINO]y[FIN]");
        assert_eq!(blocks, vec![CommandBlock::Sino { body: "y".into() }]);
    }

    #[test]
    fn test_unterminated_block_does_not_hide_later_blocks() {
        let blocks = split_blocks("[SI {{ticket.a}} ES IGUAL QUE 1 sin cierre [SINO]y[FIN]");
        assert_eq!(blocks, vec![CommandBlock::Sino { body: "y".into() }]);
    }

    #[test]
    fn test_empty_template() {
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("texto libre").is_empty());
    }
}
