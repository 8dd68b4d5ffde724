//! Line recognizers shared by the tokenizer, the directive parser and the renderer.

/// Strip the line terminator (`\n` or `\r\n`) from a line produced by `split_inclusive('\n')`.
pub fn line_content(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// An opening code fence: three or more backticks, optionally followed by a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceOpen {
    pub indent: usize,
    pub ticks: usize,
    pub language: String,
    pub executable: bool,
}

impl FenceOpen {
    pub const EXECUTABLE_PREFIX: &'static str = "executable:";
    pub const DEFAULT_LANGUAGE: &'static str = "text";

    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim_start_matches([' ', '\t']);
        let indent = line.len() - rest.len();
        let ticks = rest.bytes().take_while(|b| *b == b'`').count();
        if ticks < 3 {
            return None;
        }
        let tag = rest[ticks..].trim();
        // ```foo``` on one line is inline code, not a fence
        if tag.contains('`') {
            return None;
        }

        let token = tag
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let (executable, language) = match token.strip_prefix(Self::EXECUTABLE_PREFIX) {
            Some(language) => (true, language.to_string()),
            None => (false, token),
        };
        let language = if language.is_empty() {
            Self::DEFAULT_LANGUAGE.to_string()
        } else {
            language
        };

        Some(Self {
            indent,
            ticks,
            language,
            executable,
        })
    }

    /// Whether `line` closes this fence: same indentation, at least as many backticks,
    /// nothing else.
    pub fn closes(&self, line: &str) -> bool {
        let rest = line.trim_start_matches([' ', '\t']);
        if line.len() - rest.len() != self.indent {
            return false;
        }
        let rest = rest.trim_end();
        rest.len() >= self.ticks && rest.bytes().all(|b| b == b'`')
    }
}

/// A line starting with exactly three colons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveLine<'a> {
    Open { keyword: &'a str, info: &'a str },
    Close,
}

impl<'a> DirectiveLine<'a> {
    pub const MARKER: &'static str = ":::";

    pub fn parse(line: &'a str) -> Option<Self> {
        let rest = line.trim().strip_prefix(Self::MARKER)?;
        if rest.starts_with(':') {
            return None;
        }
        let rest = rest.trim();
        if rest.is_empty() {
            return Some(DirectiveLine::Close);
        }
        let (keyword, info) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        Some(DirectiveLine::Open { keyword, info })
    }
}
