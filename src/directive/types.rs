use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::markup::DirectiveKind;
use crate::validator::TestCase;

/// A parsed interactive component; one variant per directive kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InteractiveComponent {
    Exercise(ExerciseComponent),
    Quiz(QuizComponent),
    FillBlank(FillBlankComponent),
    DragDrop(DragDropComponent),
    Challenge(ChallengeComponent),
    Hint(HintComponent),
    Solution(CodeSnippet),
    StarterCode(CodeSnippet),
    Explanation(ExplanationComponent),
}

impl InteractiveComponent {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            InteractiveComponent::Exercise(_) => DirectiveKind::Exercise,
            InteractiveComponent::Quiz(_) => DirectiveKind::Quiz,
            InteractiveComponent::FillBlank(_) => DirectiveKind::FillBlank,
            InteractiveComponent::DragDrop(_) => DirectiveKind::DragDrop,
            InteractiveComponent::Challenge(_) => DirectiveKind::Challenge,
            InteractiveComponent::Hint(_) => DirectiveKind::Hint,
            InteractiveComponent::Solution(_) => DirectiveKind::Solution,
            InteractiveComponent::StarterCode(_) => DirectiveKind::StarterCode,
            InteractiveComponent::Explanation(_) => DirectiveKind::Explanation,
        }
    }
}

// ================================
// Quiz
// ================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizComponent {
    pub question: String,
    pub options: Vec<QuizOption>,
    /// True when more than one option is correct.
    pub multiple_choice: bool,
    /// Shown only after answering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizComponent {
    pub fn correct_ids(&self) -> BTreeSet<&str> {
        self.options
            .iter()
            .filter(|option| option.is_correct)
            .map(|option| option.id.as_str())
            .collect()
    }

    /// An answer is right when the selected ids are exactly the correct ones.
    pub fn grade<S: AsRef<str>>(&self, selected: &[S]) -> bool {
        let selected: BTreeSet<&str> = selected.iter().map(|s| s.as_ref()).collect();
        selected == self.correct_ids()
    }
}

// ================================
// Fill in the blank
// ================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplatePart {
    Text { text: String },
    Blank { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blank {
    pub id: String,
    pub accepted_answers: BTreeSet<String>,
    pub case_sensitive: bool,
}

impl Blank {
    pub fn accepts(&self, answer: &str) -> bool {
        let answer = answer.trim();
        if self.case_sensitive {
            self.accepted_answers.contains(answer)
        } else {
            let answer = answer.to_lowercase();
            self.accepted_answers
                .iter()
                .any(|accepted| accepted.to_lowercase() == answer)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillBlankComponent {
    pub template: Vec<TemplatePart>,
    pub blanks: Vec<Blank>,
}

/// Per-blank outcome of [`FillBlankComponent::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankCheck {
    pub results: BTreeMap<String, bool>,
    pub all_correct: bool,
}

impl FillBlankComponent {
    /// Template with each blank rendered as `{{id}}`.
    pub fn template_text(&self) -> String {
        self.template
            .iter()
            .map(|part| match part {
                TemplatePart::Text { text } => text.clone(),
                TemplatePart::Blank { id } => format!("{{{{{}}}}}", id),
            })
            .collect()
    }

    pub fn blank(&self, id: &str) -> Option<&Blank> {
        self.blanks.iter().find(|blank| blank.id == id)
    }

    /// Missing answers count as wrong.
    pub fn check(&self, answers: &HashMap<String, String>) -> BlankCheck {
        let results: BTreeMap<String, bool> = self
            .blanks
            .iter()
            .map(|blank| {
                let ok = answers
                    .get(&blank.id)
                    .map(|answer| blank.accepts(answer))
                    .unwrap_or(false);
                (blank.id.clone(), ok)
            })
            .collect();
        let all_correct = results.values().all(|ok| *ok);
        BlankCheck {
            results,
            all_correct,
        }
    }
}

// ================================
// Exercise / Challenge
// ================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseComponent {
    pub title: String,
    pub description: String,
    pub starter_code: String,
    pub language: String,
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeComponent {
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    /// Starter code keyed by language.
    pub starter_code: BTreeMap<String, String>,
    pub test_cases: Vec<TestCase>,
    /// Reference solutions keyed by language; empty when none is given.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub solution: BTreeMap<String, String>,
    pub hints: Vec<String>,
}

// ================================
// Drag and drop
// ================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragItem {
    pub id: String,
    #[serde(alias = "label")]
    pub text: String,
    /// Grouping hint for presentation; not enforced here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropZone {
    pub id: String,
    pub label: String,
    #[serde(default, alias = "accepts", alias = "accepted_item_ids")]
    pub accepted_item_ids: Vec<String>,
    #[serde(default, alias = "max_items", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragDropComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub source_items: Vec<DragItem>,
    pub drop_zones: Vec<DropZone>,
}

/// Outcome of [`DragDropComponent::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragDropCheck {
    /// item id -> placed in an accepting zone
    pub items: BTreeMap<String, bool>,
    /// zones holding more items than `maxItems`
    pub over_capacity: Vec<String>,
    pub all_correct: bool,
}

impl DragDropComponent {
    pub fn zone(&self, id: &str) -> Option<&DropZone> {
        self.drop_zones.iter().find(|zone| zone.id == id)
    }

    /// `placements` maps item id to zone id. Items that belong in some zone but are
    /// unplaced count as wrong; items no zone accepts are right when left unplaced.
    pub fn check(&self, placements: &HashMap<String, String>) -> DragDropCheck {
        let items: BTreeMap<String, bool> = self
            .source_items
            .iter()
            .map(|item| {
                let expected_somewhere = self
                    .drop_zones
                    .iter()
                    .any(|zone| zone.accepted_item_ids.contains(&item.id));
                let ok = match placements.get(&item.id).and_then(|zone| self.zone(zone)) {
                    Some(zone) => zone.accepted_item_ids.contains(&item.id),
                    None => !expected_somewhere,
                };
                (item.id.clone(), ok)
            })
            .collect();

        let over_capacity: Vec<String> = self
            .drop_zones
            .iter()
            .filter(|zone| {
                zone.max_items.is_some_and(|max| {
                    placements.values().filter(|placed| **placed == zone.id).count() > max
                })
            })
            .map(|zone| zone.id.clone())
            .collect();

        let all_correct = items.values().all(|ok| *ok) && over_capacity.is_empty();
        DragDropCheck {
            items,
            over_capacity,
            all_correct,
        }
    }
}

// ================================
// Standalone helper directives
// ================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HintComponent {
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplanationComponent {
    pub text: String,
}
