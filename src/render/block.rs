//! Block pass: one left-to-right scan over lines. Fenced code is lifted out
//! before any other rule looks at it; paragraphs are whatever remains.

use super::inline::parse_inlines;
use super::tree::{Block, Inline};
use crate::markup::FenceOpen;

/// Quotes nested deeper than this are kept as paragraph text.
pub(crate) const MAX_QUOTE_DEPTH: usize = 32;

pub(crate) fn parse_blocks(text: &str) -> Vec<Block> {
    parse_blocks_at(text, 0)
}

fn parse_blocks_at(text: &str, depth: usize) -> Vec<Block> {
    BlockParser {
        lines: text.lines().collect(),
        pos: 0,
        depth,
    }
    .run()
}

struct BlockParser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    depth: usize,
}

enum ListMarker<'a> {
    Bullet(&'a str),
    Ordered(u64, &'a str),
}

impl<'a> ListMarker<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        for marker in ["- ", "* ", "+ "] {
            if let Some(rest) = trimmed.strip_prefix(marker) {
                return Some(ListMarker::Bullet(rest.trim()));
            }
        }
        let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        if (1..=9).contains(&digits) {
            let rest = &trimmed[digits..];
            if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
                let number = trimmed[..digits].parse().ok()?;
                return Some(ListMarker::Ordered(number, item.trim()));
            }
        }
        None
    }

    fn is_ordered(&self) -> bool {
        matches!(self, ListMarker::Ordered(..))
    }

    fn content(&self) -> &'a str {
        match self {
            ListMarker::Bullet(content) | ListMarker::Ordered(_, content) => content,
        }
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if rest.is_empty() {
        return Some((level as u8, ""));
    }
    rest.strip_prefix([' ', '\t'])
        .map(|content| (level as u8, content.trim()))
}

fn is_rule(line: &str) -> bool {
    let compact: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], b'-' | b'*' | b'_')
        && compact.iter().all(|b| *b == compact[0])
}

fn quote_content(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Split a table row on unescaped pipes outside code spans.
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_code = false;
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                cell.push(c);
            }
            '|' if !in_code => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn is_table_separator(line: &str) -> bool {
    line.contains('|')
        && split_cells(line).iter().all(|cell| {
            let inner = cell.strip_prefix(':').unwrap_or(cell);
            let inner = inner.strip_suffix(':').unwrap_or(inner);
            !inner.is_empty() && inner.bytes().all(|b| b == b'-')
        })
}

fn inline_cells(line: &str, width: usize) -> Vec<Vec<Inline>> {
    let mut cells: Vec<Vec<Inline>> = split_cells(line)
        .iter()
        .map(|cell| parse_inlines(cell))
        .collect();
    cells.resize(width, Vec::new());
    cells
}

impl<'a> BlockParser<'a> {
    fn run(mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(line) = self.peek() {
            if line.trim().is_empty() {
                self.pos += 1;
                continue;
            }
            let block = if let Some(fence) = FenceOpen::parse(line) {
                self.code_block(fence)
            } else if let Some((level, content)) = heading(line) {
                self.pos += 1;
                Block::Heading {
                    level,
                    content: parse_inlines(content),
                }
            } else if is_rule(line) {
                self.pos += 1;
                Block::Rule
            } else if self.opens_quote(line) {
                self.block_quote()
            } else if let Some(marker) = ListMarker::parse(line) {
                self.list(marker.is_ordered())
            } else if self.at_table() {
                self.table()
            } else {
                self.paragraph()
            };
            blocks.push(block);
        }
        blocks
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn at_table(&self) -> bool {
        let Some(line) = self.peek() else {
            return false;
        };
        line.contains('|')
            && self
                .lines
                .get(self.pos + 1)
                .is_some_and(|next| is_table_separator(next))
    }

    fn starts_block(&self, line: &str) -> bool {
        FenceOpen::parse(line).is_some()
            || heading(line).is_some()
            || is_rule(line)
            || self.opens_quote(line)
            || ListMarker::parse(line).is_some()
            || self.at_table()
    }

    fn opens_quote(&self, line: &str) -> bool {
        self.depth < MAX_QUOTE_DEPTH && quote_content(line).is_some()
    }

    fn code_block(&mut self, fence: FenceOpen) -> Block {
        self.pos += 1;
        let mut code = Vec::new();
        while let Some(line) = self.peek() {
            self.pos += 1;
            if fence.closes(line) {
                break;
            }
            code.push(line);
        }
        Block::CodeBlock {
            language: fence.language,
            code: code.join("\n"),
        }
    }

    fn block_quote(&mut self) -> Block {
        let mut inner = Vec::new();
        while let Some(content) = self.peek().and_then(quote_content) {
            inner.push(content);
            self.pos += 1;
        }
        Block::BlockQuote {
            blocks: parse_blocks_at(&inner.join("\n"), self.depth + 1),
        }
    }

    /// Adjacent item lines of the same kind coalesce into one list; indented
    /// lines continue the previous item.
    fn list(&mut self, ordered: bool) -> Block {
        let mut items: Vec<String> = Vec::new();
        let mut start = None;
        while let Some(line) = self.peek() {
            match ListMarker::parse(line) {
                Some(marker) if marker.is_ordered() == ordered => {
                    if let (ListMarker::Ordered(number, _), None) = (&marker, start) {
                        start = Some(*number);
                    }
                    items.push(marker.content().to_string());
                }
                Some(_) => break,
                None if !line.trim().is_empty()
                    && line.starts_with([' ', '\t'])
                    && !items.is_empty() =>
                {
                    if let Some(last) = items.last_mut() {
                        last.push(' ');
                        last.push_str(line.trim());
                    }
                }
                None => break,
            }
            self.pos += 1;
        }
        Block::List {
            ordered,
            start,
            items: items.iter().map(|item| parse_inlines(item)).collect(),
        }
    }

    fn table(&mut self) -> Block {
        let header_line = self.lines[self.pos];
        self.pos += 2;
        let header: Vec<Vec<Inline>> = split_cells(header_line)
            .iter()
            .map(|cell| parse_inlines(cell))
            .collect();
        let width = header.len();

        let mut rows = Vec::new();
        while let Some(line) = self.peek() {
            if line.trim().is_empty() || !line.contains('|') {
                break;
            }
            rows.push(inline_cells(line, width));
            self.pos += 1;
        }
        Block::Table { header, rows }
    }

    fn paragraph(&mut self) -> Block {
        let mut lines = vec![self.lines[self.pos].trim()];
        self.pos += 1;
        while let Some(line) = self.peek() {
            if line.trim().is_empty() || self.starts_block(line) {
                break;
            }
            lines.push(line.trim());
            self.pos += 1;
        }
        Block::Paragraph {
            content: parse_inlines(&lines.join("\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::text(s)
    }

    #[test]
    fn test_heading_levels() {
        let blocks = parse_blocks("# One\n## Two\n### Three\n#### Four");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(blocks[0], Block::Heading { level: 1, .. }));
        assert!(matches!(blocks[2], Block::Heading { level: 3, .. }));
        assert_eq!(
            blocks[3],
            Block::Paragraph {
                content: vec![text("#### Four")]
            }
        );
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let blocks = parse_blocks("line one\nline two\n\nsecond");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph {
                    content: vec![text("line one\nline two")]
                },
                Block::Paragraph {
                    content: vec![text("second")]
                },
            ]
        );
    }

    #[test]
    fn test_adjacent_items_coalesce() {
        let blocks = parse_blocks("- a\n- b\n  continued\n* c\n\n1. x\n2. y");
        assert_eq!(
            blocks,
            vec![
                Block::List {
                    ordered: false,
                    start: None,
                    items: vec![vec![text("a")], vec![text("b continued")], vec![text("c")]],
                },
                Block::List {
                    ordered: true,
                    start: Some(1),
                    items: vec![vec![text("x")], vec![text("y")]],
                },
            ]
        );
    }

    #[test]
    fn test_rule_wins_over_bullet() {
        assert_eq!(parse_blocks("* * *"), vec![Block::Rule]);
        assert_eq!(parse_blocks("---"), vec![Block::Rule]);
    }

    #[test]
    fn test_block_quote_is_recursive() {
        let blocks = parse_blocks("> # Note\n> Be *careful*.");
        assert_eq!(
            blocks,
            vec![Block::BlockQuote {
                blocks: vec![
                    Block::Heading {
                        level: 1,
                        content: vec![text("Note")]
                    },
                    Block::Paragraph {
                        content: vec![
                            text("Be "),
                            Inline::Emphasis {
                                content: vec![text("careful")]
                            },
                            text(".")
                        ]
                    },
                ]
            }]
        );
    }

    #[test]
    fn test_quote_nesting_is_capped() {
        let input = format!("{} deep", ">".repeat(10_000));
        let blocks = parse_blocks(&input);

        let mut depth = 0;
        let mut current = &blocks;
        while let [Block::BlockQuote { blocks }] = current.as_slice() {
            depth += 1;
            current = blocks;
        }
        assert_eq!(depth, MAX_QUOTE_DEPTH);
        let [Block::Paragraph { content }] = current.as_slice() else {
            panic!("Expected innermost paragraph, got {:?}", current);
        };
        let Inline::Text { text } = &content[0] else {
            panic!("Expected text, got {:?}", content);
        };
        assert!(text.starts_with('>'));
        assert!(text.ends_with("deep"));
    }

    #[test]
    fn test_fenced_code_is_protected() {
        let blocks = parse_blocks("```js\n# not a heading\nlet a = *b*;\n```\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::CodeBlock {
                    language: "js".into(),
                    code: "# not a heading\nlet a = *b*;".into()
                },
                Block::Paragraph {
                    content: vec![text("after")]
                },
            ]
        );
    }

    #[test]
    fn test_table() {
        let blocks = parse_blocks("| Tag | Use |\n|-----|:---:|\n| `a` | links |\n| p |");
        let Block::Table { header, rows } = &blocks[0] else {
            panic!("Expected table, got {:?}", blocks);
        };
        assert_eq!(header, &vec![vec![text("Tag")], vec![text("Use")]]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], vec![Inline::Code { code: "a".into() }]);
        assert_eq!(rows[1], vec![vec![text("p")], vec![]]);
    }

    #[test]
    fn test_pipe_without_separator_is_paragraph() {
        let blocks = parse_blocks("a | b\nc");
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                content: vec![text("a | b\nc")]
            }]
        );
    }

    #[test]
    fn test_paragraph_interrupted_by_list() {
        let blocks = parse_blocks("Steps:\n- one");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], Block::List { .. }));
    }
}
