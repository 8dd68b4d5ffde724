//! Directive tokenizer: splits lesson source into prose, fenced code and
//! triple-colon directive segments.

pub mod lines;
pub mod segment;
pub mod tokenizer;

pub use lines::{line_content, DirectiveLine, FenceOpen};
pub use segment::{
    CodeBlockSegment, DirectiveKind, DirectiveSegment, LessonDocument, ProseSegment, Segment,
};
pub use tokenizer::tokenize;
