use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The directive keywords a lesson may use after `:::`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    Exercise,
    Quiz,
    FillBlank,
    DragDrop,
    Challenge,
    Hint,
    Solution,
    StarterCode,
    Explanation,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 9] = [
        DirectiveKind::Exercise,
        DirectiveKind::Quiz,
        DirectiveKind::FillBlank,
        DirectiveKind::DragDrop,
        DirectiveKind::Challenge,
        DirectiveKind::Hint,
        DirectiveKind::Solution,
        DirectiveKind::StarterCode,
        DirectiveKind::Explanation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Exercise => "exercise",
            DirectiveKind::Quiz => "quiz",
            DirectiveKind::FillBlank => "fill-blank",
            DirectiveKind::DragDrop => "drag-drop",
            DirectiveKind::Challenge => "challenge",
            DirectiveKind::Hint => "hint",
            DirectiveKind::Solution => "solution",
            DirectiveKind::StarterCode => "starter-code",
            DirectiveKind::Explanation => "explanation",
        }
    }

    /// Kinds that may own child directives.
    pub fn is_container(&self) -> bool {
        matches!(self, DirectiveKind::Exercise | DirectiveKind::Challenge)
    }

    /// Kinds that may appear as children of a container.
    pub fn is_child(&self) -> bool {
        matches!(
            self,
            DirectiveKind::StarterCode | DirectiveKind::Hint | DirectiveKind::Solution
        )
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive keyword match.
impl FromStr for DirectiveKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DirectiveKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProseSegment {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlockSegment {
    pub language: String,
    pub code: String,
    pub executable: bool,
    #[serde(skip)]
    pub(crate) raw: String,
}

impl CodeBlockSegment {
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveSegment {
    pub kind: DirectiveKind,
    /// Text after the keyword on the opening line, usually a title.
    pub info: String,
    /// Body lines between the markers, without child directives.
    pub raw_body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DirectiveSegment>,
    #[serde(skip)]
    pub(crate) raw: String,
}

impl DirectiveSegment {
    /// Exact source text, markers and children included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn children_of(&self, kind: DirectiveKind) -> impl Iterator<Item = &DirectiveSegment> {
        self.children.iter().filter(move |child| child.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Segment {
    Prose(ProseSegment),
    CodeBlock(CodeBlockSegment),
    Directive(DirectiveSegment),
}

impl Segment {
    pub fn raw(&self) -> &str {
        match self {
            Segment::Prose(prose) => &prose.text,
            Segment::CodeBlock(code) => code.raw(),
            Segment::Directive(directive) => directive.raw(),
        }
    }

    pub fn is_blank_prose(&self) -> bool {
        matches!(self, Segment::Prose(prose) if prose.text.trim().is_empty())
    }
}

/// A tokenized lesson. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LessonDocument {
    segments: Vec<Segment>,
}

impl LessonDocument {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenated source text of every segment; equals the tokenized input.
    pub fn raw(&self) -> String {
        self.segments.iter().map(Segment::raw).collect()
    }
}

impl<'a> IntoIterator for &'a LessonDocument {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
