//! Inline Renderer: lesson prose to a [`MarkupTree`].
//!
//! Pure and deterministic. Rule order:
//! 1. fenced code blocks and code spans are protected from every other rule;
//! 2. block rules (headings, rules, quotes, lists, tables) apply per line;
//! 3. inline rules (emphasis, strikethrough, links, images) apply inside blocks;
//! 4. whatever is left is wrapped into paragraphs split on blank lines.

mod block;
mod html;
mod inline;
mod tree;

pub use html::{escape_html, sanitize_url};
pub use tree::{inline_text, Block, Inline, MarkupTree};

/// Render one prose segment.
pub fn render_prose(text: &str) -> MarkupTree {
    MarkupTree::new(block::parse_blocks(text))
}
