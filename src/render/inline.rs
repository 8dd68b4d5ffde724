//! Inline pass: code spans first, then escapes, images, links and emphasis.

use super::tree::Inline;

/// Links, images and emphasis nested deeper than this stay literal text.
pub(crate) const MAX_INLINE_DEPTH: usize = 32;

pub(crate) fn parse_inlines(src: &str) -> Vec<Inline> {
    parse_inlines_at(src, 0)
}

fn parse_inlines_at(src: &str, depth: usize) -> Vec<Inline> {
    let nested = depth < MAX_INLINE_DEPTH;
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < src.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => {
                text.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            b'`' => {
                if let Some((code, end)) = code_span(src, i) {
                    flush(&mut out, &mut text);
                    out.push(Inline::Code { code });
                    i = end;
                } else {
                    let run = run_length(bytes, i, b'`');
                    text.push_str(&src[i..i + run]);
                    i += run;
                }
                continue;
            }
            b'!' if nested && bytes.get(i + 1) == Some(&b'[') => {
                if let Some((alt, dest, end)) = link_parts(src, i + 1) {
                    flush(&mut out, &mut text);
                    out.push(Inline::Image {
                        src: dest,
                        alt: super::tree::inline_text(&parse_inlines_at(alt, depth + 1)),
                    });
                    i = end;
                    continue;
                }
            }
            b'[' if nested => {
                if let Some((label, dest, end)) = link_parts(src, i) {
                    flush(&mut out, &mut text);
                    out.push(Inline::Link {
                        href: dest,
                        content: parse_inlines_at(label, depth + 1),
                    });
                    i = end;
                    continue;
                }
            }
            b'~' if nested && bytes.get(i + 1) == Some(&b'~') => {
                if let Some((inner, end)) = delimited(src, i, b'~') {
                    flush(&mut out, &mut text);
                    out.push(Inline::Strikethrough {
                        content: parse_inlines_at(inner, depth + 1),
                    });
                    i = end;
                    continue;
                }
            }
            c @ (b'*' | b'_') if nested => {
                let run = run_length(bytes, i, c);
                if let Some((inner, end)) = delimited(src, i, c) {
                    flush(&mut out, &mut text);
                    let content = parse_inlines_at(inner, depth + 1);
                    out.push(match run {
                        1 => Inline::Emphasis { content },
                        2 => Inline::Strong { content },
                        _ => Inline::Strong {
                            content: vec![Inline::Emphasis { content }],
                        },
                    });
                    i = end;
                } else {
                    text.push_str(&src[i..i + run]);
                    i += run;
                }
                continue;
            }
            _ => {}
        }

        let Some(ch) = src[i..].chars().next() else {
            break;
        };
        text.push(ch);
        i += ch.len_utf8();
    }

    flush(&mut out, &mut text);
    out
}

fn flush(out: &mut Vec<Inline>, text: &mut String) {
    if !text.is_empty() {
        out.push(Inline::text(std::mem::take(text)));
    }
}

fn run_length(bytes: &[u8], at: usize, byte: u8) -> usize {
    bytes[at..].iter().take_while(|b| **b == byte).count()
}

fn char_before(src: &str, at: usize) -> Option<char> {
    src[..at].chars().next_back()
}

fn char_at(src: &str, at: usize) -> Option<char> {
    src.get(at..).and_then(|rest| rest.chars().next())
}

/// `` `code` `` starting at `start`; the closer is a backtick run of the same length.
fn code_span(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let n = run_length(bytes, start, b'`');
    let mut j = start + n;
    while j < bytes.len() {
        if bytes[j] != b'`' {
            j += 1;
            continue;
        }
        let m = run_length(bytes, j, b'`');
        if m == n {
            let inner = &src[start + n..j];
            let inner = match inner.strip_prefix(' ').and_then(|s| s.strip_suffix(' ')) {
                Some(stripped) if !inner.trim().is_empty() => stripped,
                _ => inner,
            };
            return Some((inner.replace('\n', " "), j + m));
        }
        j += m;
    }
    None
}

/// Emphasis or strikethrough run at `start`, closed by a run of the same length.
/// Returns the inner text and the offset after the closer.
fn delimited(src: &str, start: usize, delim: u8) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    let n = run_length(bytes, start, delim);
    let max = if delim == b'~' { 2 } else { 3 };
    if n > max || (delim == b'~' && n != 2) {
        return None;
    }
    let open_end = start + n;
    if char_at(src, open_end).map_or(true, char::is_whitespace) {
        return None;
    }
    if delim == b'_' && char_before(src, start).is_some_and(char::is_alphanumeric) {
        return None;
    }

    let mut j = open_end;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' => match code_span(src, j) {
                Some((_, end)) => j = end,
                None => j += run_length(bytes, j, b'`'),
            },
            b if b == delim => {
                let m = run_length(bytes, j, delim);
                let flanked = char_before(src, j).is_some_and(|c| !c.is_whitespace());
                let intraword =
                    delim == b'_' && char_at(src, j + m).is_some_and(char::is_alphanumeric);
                if m == n && flanked && !intraword && j > open_end {
                    return Some((&src[open_end..j], j + m));
                }
                j += m;
            }
            _ => j += 1,
        }
    }
    None
}

/// `[label](dest)` starting at the `[` at `open`.
fn link_parts(src: &str, open: usize) -> Option<(&str, String, usize)> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut j = open;
    let close = loop {
        match *bytes.get(j)? {
            b'\\' => j += 2,
            b'`' => match code_span(src, j) {
                Some((_, end)) => j = end,
                None => j += run_length(bytes, j, b'`'),
            },
            b'[' => {
                depth += 1;
                j += 1;
            }
            b']' => {
                depth -= 1;
                if depth == 0 {
                    break j;
                }
                j += 1;
            }
            b'\n' if bytes.get(j + 1) == Some(&b'\n') => return None,
            _ => j += 1,
        }
    };

    if bytes.get(close + 1) != Some(&b'(') {
        return None;
    }
    let dest_start = close + 2;
    let mut parens = 1usize;
    let mut k = dest_start;
    let dest_end = loop {
        match *bytes.get(k)? {
            b'(' => parens += 1,
            b')' => {
                parens -= 1;
                if parens == 0 {
                    break k;
                }
            }
            b'\n' => return None,
            _ => {}
        }
        k += 1;
    };

    // `(url "title")`: the title is dropped
    let dest = src[dest_start..dest_end]
        .split_whitespace()
        .next()
        .unwrap_or_default();
    let dest = dest
        .strip_prefix('<')
        .and_then(|d| d.strip_suffix('>'))
        .unwrap_or(dest);

    Some((&src[open + 1..close], dest.to_string(), dest_end + 1))
}
