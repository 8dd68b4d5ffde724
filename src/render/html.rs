//! HTML serialization of a [`MarkupTree`]. All text is escaped and link targets
//! with script-capable schemes are neutralized.

use std::fmt::Write;

use super::tree::{Block, Inline, MarkupTree};

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `#` for targets whose scheme could run script, the target itself otherwise.
pub fn sanitize_url(url: &str) -> &str {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if UNSAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        "#"
    } else {
        url
    }
}

impl MarkupTree {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            write_block(&mut out, block);
        }
        out
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, content } => {
            let _ = write!(out, "<h{level}>");
            write_inlines(out, content);
            let _ = writeln!(out, "</h{level}>");
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            write_inlines(out, content);
            out.push_str("</p>\n");
        }
        Block::BlockQuote { blocks } => {
            out.push_str("<blockquote>\n");
            for inner in blocks {
                write_block(out, inner);
            }
            out.push_str("</blockquote>\n");
        }
        Block::List {
            ordered,
            start,
            items,
        } => {
            match (ordered, start) {
                (true, Some(n)) if *n != 1 => {
                    let _ = writeln!(out, "<ol start=\"{n}\">");
                }
                (true, _) => out.push_str("<ol>\n"),
                (false, _) => out.push_str("<ul>\n"),
            }
            for item in items {
                out.push_str("<li>");
                write_inlines(out, item);
                out.push_str("</li>\n");
            }
            out.push_str(if *ordered { "</ol>\n" } else { "</ul>\n" });
        }
        Block::Table { header, rows } => {
            out.push_str("<table>\n<thead>\n<tr>");
            for cell in header {
                out.push_str("<th>");
                write_inlines(out, cell);
                out.push_str("</th>");
            }
            out.push_str("</tr>\n</thead>\n<tbody>\n");
            for row in rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str("<td>");
                    write_inlines(out, cell);
                    out.push_str("</td>");
                }
                out.push_str("</tr>\n");
            }
            out.push_str("</tbody>\n</table>\n");
        }
        Block::Rule => out.push_str("<hr>\n"),
        Block::CodeBlock { language, code } => {
            let _ = writeln!(
                out,
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(language),
                escape_html(code)
            );
        }
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text } => out.push_str(&escape_html(text)),
            Inline::Emphasis { content } => wrap(out, "em", content),
            Inline::Strong { content } => wrap(out, "strong", content),
            Inline::Strikethrough { content } => wrap(out, "del", content),
            Inline::Code { code } => {
                let _ = write!(out, "<code>{}</code>", escape_html(code));
            }
            Inline::Link { href, content } => {
                let _ = write!(out, "<a href=\"{}\">", escape_html(sanitize_url(href)));
                write_inlines(out, content);
                out.push_str("</a>");
            }
            Inline::Image { src, alt } => {
                let _ = write!(
                    out,
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(sanitize_url(src)),
                    escape_html(alt)
                );
            }
        }
    }
}

fn wrap(out: &mut String, tag: &str, content: &[Inline]) {
    let _ = write!(out, "<{tag}>");
    write_inlines(out, content);
    let _ = write!(out, "</{tag}>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_prose;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url("https://example.com"), "https://example.com");
        assert_eq!(sanitize_url("/relative"), "/relative");
        assert_eq!(sanitize_url("javascript:alert(1)"), "#");
        assert_eq!(sanitize_url(" JavaScript:alert(1)"), "#");
        assert_eq!(sanitize_url("java\tscript:alert(1)"), "#");
        assert_eq!(sanitize_url("data:text/html,<script>"), "#");
        assert_eq!(sanitize_url("VBScript:msgbox"), "#");
    }

    #[test]
    fn test_render_document() {
        let html = render_prose("# Title\n\nSome *text* and `<b>`.\n\n- [link](javascript:x)\n").to_html();
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>Some <em>text</em> and <code>&lt;b&gt;</code>.</p>\n<ul>\n<li><a href=\"#\">link</a></li>\n</ul>\n"
        );
    }

    #[test]
    fn test_render_ordered_start_and_table() {
        let html = render_prose("3. c\n4. d\n\n| a |\n|---|\n| 1 |").to_html();
        assert!(html.starts_with("<ol start=\"3\">\n<li>c</li>"));
        assert!(html.contains("<thead>\n<tr><th>a</th></tr>"));
        assert!(html.contains("<tr><td>1</td></tr>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_prose("<script>alert(1)</script>").to_html();
        assert_eq!(html, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>\n");
    }
}
