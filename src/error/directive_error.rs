use serde::Serialize;
use thiserror::Error;

use crate::markup::DirectiveKind;

/// What exactly is wrong with a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "fault", content = "detail", rename_all = "snake_case")]
pub enum DirectiveFault {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("no option is marked correct")]
    NoCorrectOption,
    #[error("test cases are not a valid list: {0}")]
    InvalidTestCases(String),
    #[error("drag-and-drop definition is invalid: {0}")]
    InvalidDragDrop(String),
}

/// A structurally incomplete directive. Carries the segment's raw text so the
/// caller can show or log it; never aborts the rest of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("malformed `{kind}` directive: {fault}")]
pub struct MalformedDirectiveError {
    pub kind: DirectiveKind,
    pub fault: DirectiveFault,
    pub raw_text: String,
}

impl MalformedDirectiveError {
    pub fn new(kind: DirectiveKind, fault: DirectiveFault, raw_text: impl Into<String>) -> Self {
        Self {
            kind,
            fault,
            raw_text: raw_text.into(),
        }
    }
}
