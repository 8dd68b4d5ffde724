//! Single left-to-right scan over lesson lines with explicit state:
//! prose, inside a fence, or inside a directive.
//!
//! `tokenize` is total. Unterminated fences and directives close at end of input,
//! unknown `:::` keywords stay prose, and nesting deeper than one level inside
//! `exercise`/`challenge` is kept as literal body text.

use super::lines::{line_content, DirectiveLine, FenceOpen};
use super::segment::{
    CodeBlockSegment, DirectiveKind, DirectiveSegment, LessonDocument, ProseSegment, Segment,
};

/// Split lesson source into an ordered sequence of segments.
pub fn tokenize(source: &str) -> LessonDocument {
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    Tokenizer { lines, pos: 0 }.run()
}

struct Tokenizer<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn run(mut self) -> LessonDocument {
        let mut segments = Vec::new();
        let mut prose = String::new();

        while self.pos < self.lines.len() {
            let content = line_content(self.lines[self.pos]);

            if let Some(fence) = FenceOpen::parse(content) {
                flush_prose(&mut prose, &mut segments);
                segments.push(Segment::CodeBlock(self.read_fence(&fence)));
                continue;
            }

            if let Some(DirectiveLine::Open { keyword, info }) = DirectiveLine::parse(content) {
                match keyword.parse::<DirectiveKind>() {
                    Ok(kind) => {
                        flush_prose(&mut prose, &mut segments);
                        let info = info.to_string();
                        segments.push(Segment::Directive(self.read_directive(kind, info)));
                        continue;
                    }
                    Err(()) => {
                        tracing::debug!(keyword, "unknown directive keyword kept as prose");
                    }
                }
            }

            prose.push_str(self.lines[self.pos]);
            self.pos += 1;
        }

        flush_prose(&mut prose, &mut segments);
        LessonDocument::new(segments)
    }

    /// Consume a fence starting at the current line. Returns the interior lines and
    /// advances past the closing fence (or to end of input).
    fn consume_fence(&mut self, fence: &FenceOpen) -> String {
        self.pos += 1;
        let mut interior = String::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if fence.closes(line_content(line)) {
                return interior;
            }
            interior.push_str(line);
        }
        interior
    }

    fn read_fence(&mut self, fence: &FenceOpen) -> CodeBlockSegment {
        let start = self.pos;
        let interior = self.consume_fence(fence);
        CodeBlockSegment {
            language: fence.language.clone(),
            code: strip_final_line_break(&interior).to_string(),
            executable: fence.executable,
            raw: self.lines[start..self.pos].concat(),
        }
    }

    fn read_directive(&mut self, kind: DirectiveKind, info: String) -> DirectiveSegment {
        let start = self.pos;
        self.pos += 1;

        let mut body = String::new();
        let mut children = Vec::new();
        // openers kept as literal text, each waiting for its own closer
        let mut literal_depth = 0usize;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            let content = line_content(line);

            if let Some(fence) = FenceOpen::parse(content) {
                let fence_start = self.pos;
                self.consume_fence(&fence);
                body.push_str(&self.lines[fence_start..self.pos].concat());
                continue;
            }

            match DirectiveLine::parse(content) {
                Some(DirectiveLine::Close) if literal_depth == 0 => {
                    self.pos += 1;
                    break;
                }
                Some(DirectiveLine::Close) => {
                    literal_depth -= 1;
                }
                Some(DirectiveLine::Open { keyword, info }) => {
                    let child_kind = keyword
                        .parse::<DirectiveKind>()
                        .ok()
                        .filter(|child| literal_depth == 0 && kind.is_container() && child.is_child());
                    if let Some(child_kind) = child_kind {
                        let info = info.to_string();
                        children.push(self.read_directive(child_kind, info));
                        continue;
                    }
                    tracing::debug!(
                        parent = %kind,
                        keyword,
                        "nested directive flattened into body text"
                    );
                    literal_depth += 1;
                }
                None => {}
            }

            body.push_str(line);
            self.pos += 1;
        }

        DirectiveSegment {
            kind,
            info,
            raw_body: body,
            children,
            raw: self.lines[start..self.pos].concat(),
        }
    }
}

fn flush_prose(prose: &mut String, segments: &mut Vec<Segment>) {
    if !prose.is_empty() {
        segments.push(Segment::Prose(ProseSegment {
            text: std::mem::take(prose),
        }));
    }
}

fn strip_final_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}
