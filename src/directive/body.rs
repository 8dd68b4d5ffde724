//! Splits a directive body into text lines and fenced code.

use crate::markup::{line_content, FenceOpen};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FencedCode {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyPart<'a> {
    Line(&'a str),
    Fence(FencedCode),
}

pub(crate) fn scan_body(body: &str) -> Vec<BodyPart<'_>> {
    let mut parts = Vec::new();
    let mut lines = body.split_inclusive('\n');

    while let Some(line) = lines.next() {
        let content = line_content(line);
        let Some(fence) = FenceOpen::parse(content) else {
            parts.push(BodyPart::Line(content));
            continue;
        };

        let mut code = Vec::new();
        for inner in lines.by_ref() {
            let inner = line_content(inner);
            if fence.closes(inner) {
                break;
            }
            code.push(inner);
        }
        parts.push(BodyPart::Fence(FencedCode {
            language: fence.language,
            code: code.join("\n"),
        }));
    }

    parts
}

pub(crate) fn text_lines<'a>(parts: &'a [BodyPart<'a>]) -> impl Iterator<Item = &'a str> + 'a {
    parts.iter().filter_map(|part| match part {
        BodyPart::Line(line) => Some(*line),
        BodyPart::Fence(_) => None,
    })
}

pub(crate) fn fences<'a>(parts: &'a [BodyPart<'a>]) -> impl Iterator<Item = &'a FencedCode> + 'a {
    parts.iter().filter_map(|part| match part {
        BodyPart::Fence(fence) => Some(fence),
        BodyPart::Line(_) => None,
    })
}

/// `- item`, `* item`, `+ item` or `1. item` → `item`.
pub(crate) fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

/// `# Title` (up to three levels) → `Title`.
pub(crate) fn heading(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if (1..=3).contains(&level) {
        trimmed[level..].strip_prefix(' ').map(str::trim)
    } else {
        None
    }
}
