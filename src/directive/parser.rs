//! Per-kind extraction of interactive components from directive segments.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::body::{fences, heading, list_item, scan_body, text_lines, BodyPart, FencedCode};
use super::template::parse_template;
use super::types::*;
use crate::error::{DirectiveFault, DirectiveResult, MalformedDirectiveError};
use crate::markup::{DirectiveKind, DirectiveSegment};
use crate::validator::TestCase;

/// Fence tags that declare a test-case list.
pub const TEST_CASE_TAGS: &[&str] = &["tests", "testcases", "test-cases"];

const DEFAULT_CODE_LANGUAGE: &str = "javascript";

const OPTION_PATTERN: &str = r"^\s*[-*+]\s+\[([ xX])\]\s*(.*)$";

/// `None` only if the pattern fails to compile; quizzes then report missing options.
fn option_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(OPTION_PATTERN) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::error!(error = %e, "invalid quiz option pattern");
            None
        }
    })
    .as_ref()
}

/// Convert one directive segment into its typed component.
///
/// Fails only when structurally required data is absent; the error carries the
/// segment's raw text.
pub fn parse(segment: &DirectiveSegment) -> DirectiveResult<InteractiveComponent> {
    let component = match segment.kind {
        DirectiveKind::Quiz => InteractiveComponent::Quiz(parse_quiz(segment)?),
        DirectiveKind::FillBlank => InteractiveComponent::FillBlank(parse_fill_blank(segment)?),
        DirectiveKind::Exercise => InteractiveComponent::Exercise(parse_exercise(segment)?),
        DirectiveKind::Challenge => InteractiveComponent::Challenge(parse_challenge(segment)?),
        DirectiveKind::DragDrop => InteractiveComponent::DragDrop(parse_drag_drop(segment)?),
        DirectiveKind::Hint => InteractiveComponent::Hint(HintComponent {
            hints: split_hints(&segment.raw_body),
        }),
        DirectiveKind::Solution => InteractiveComponent::Solution(code_snippet(segment)),
        DirectiveKind::StarterCode => InteractiveComponent::StarterCode(code_snippet(segment)),
        DirectiveKind::Explanation => InteractiveComponent::Explanation(ExplanationComponent {
            text: segment.raw_body.trim().to_string(),
        }),
    };
    Ok(component)
}

fn malformed(segment: &DirectiveSegment, fault: DirectiveFault) -> MalformedDirectiveError {
    MalformedDirectiveError::new(segment.kind, fault, segment.raw())
}

// ================================
// Quiz
// ================================

fn option_id(index: usize) -> String {
    if index < 26 {
        ((b'a' + index as u8) as char).to_string()
    } else {
        format!("opt-{}", index + 1)
    }
}

fn parse_quiz(segment: &DirectiveSegment) -> DirectiveResult<QuizComponent> {
    let mut question_lines = Vec::new();
    let mut trailing_lines = Vec::new();
    let mut options = Vec::new();

    for line in segment.raw_body.lines() {
        if let Some(caps) = option_pattern().and_then(|pattern| pattern.captures(line)) {
            options.push(QuizOption {
                id: option_id(options.len()),
                text: caps[2].trim().to_string(),
                is_correct: !caps[1].trim().is_empty(),
            });
        } else if options.is_empty() {
            question_lines.push(line.trim());
        } else {
            trailing_lines.push(line.trim());
        }
    }

    if options.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("options")));
    }
    let correct = options.iter().filter(|option| option.is_correct).count();
    if correct == 0 {
        return Err(malformed(segment, DirectiveFault::NoCorrectOption));
    }

    let question = join_paragraph(&question_lines);
    let question = if question.is_empty() {
        segment.info.clone()
    } else {
        question
    };
    if question.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("question")));
    }

    let explanation = join_paragraph(&trailing_lines);

    Ok(QuizComponent {
        question,
        options,
        multiple_choice: correct > 1,
        explanation: (!explanation.is_empty()).then_some(explanation),
    })
}

fn join_paragraph(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|line| !line.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

// ================================
// Fill in the blank
// ================================

fn parse_fill_blank(segment: &DirectiveSegment) -> DirectiveResult<FillBlankComponent> {
    let (template, blanks) = parse_template(segment.raw_body.trim());
    if blanks.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("blanks")));
    }
    Ok(FillBlankComponent { template, blanks })
}

// ================================
// Exercise / Challenge
// ================================

fn is_test_fence(fence: &FencedCode) -> bool {
    TEST_CASE_TAGS.contains(&fence.language.as_str())
}

/// `- a` / `1. a` lines become items; other non-empty lines are kept as-is.
fn split_hints(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| list_item(line).unwrap_or(line.trim()))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn code_snippet(segment: &DirectiveSegment) -> CodeSnippet {
    let parts = scan_body(&segment.raw_body);
    let first = fences(&parts).next().cloned();
    match first {
        Some(fence) => CodeSnippet {
            language: fence.language,
            code: fence.code,
        },
        None => CodeSnippet {
            language: DEFAULT_CODE_LANGUAGE.to_string(),
            code: segment.raw_body.trim_end().to_string(),
        },
    }
}

fn parse_test_cases(
    segment: &DirectiveSegment,
    parts: &[BodyPart<'_>],
) -> DirectiveResult<Vec<TestCase>> {
    let mut cases = Vec::new();
    for fence in fences(parts).filter(|fence| is_test_fence(fence)) {
        if fence.code.trim().is_empty() {
            continue;
        }
        let parsed: Vec<TestCase> = serde_saphyr::from_str(&fence.code).map_err(|e| {
            malformed(segment, DirectiveFault::InvalidTestCases(e.to_string()))
        })?;
        cases.extend(parsed);
    }
    Ok(cases)
}

/// Title from the info string, else the first heading in the body.
fn title_and_description<'a>(
    segment: &DirectiveSegment,
    lines: impl Iterator<Item = &'a str>,
    default_title: &str,
) -> (String, Vec<&'a str>) {
    let mut title = (!segment.info.is_empty()).then(|| segment.info.clone());
    let mut rest = Vec::new();
    for line in lines {
        if title.is_none() {
            if let Some(text) = heading(line) {
                title = Some(text.to_string());
                continue;
            }
        }
        rest.push(line);
    }
    (title.unwrap_or_else(|| default_title.to_string()), rest)
}

fn join_block(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

fn hints_of(segment: &DirectiveSegment) -> Vec<String> {
    segment
        .children_of(DirectiveKind::Hint)
        .flat_map(|hint| split_hints(&hint.raw_body))
        .collect()
}

fn parse_exercise(segment: &DirectiveSegment) -> DirectiveResult<ExerciseComponent> {
    let parts = scan_body(&segment.raw_body);
    let (title, description) = title_and_description(segment, text_lines(&parts), "Exercise");

    let starter = segment
        .children_of(DirectiveKind::StarterCode)
        .next()
        .map(code_snippet)
        .or_else(|| {
            fences(&parts)
                .find(|fence| !is_test_fence(fence))
                .map(|fence| CodeSnippet {
                    language: fence.language.clone(),
                    code: fence.code.clone(),
                })
        });
    let (starter_code, language) = match starter {
        Some(snippet) => (snippet.code, snippet.language),
        None => (String::new(), DEFAULT_CODE_LANGUAGE.to_string()),
    };

    let solution = segment
        .children_of(DirectiveKind::Solution)
        .next()
        .map(|child| code_snippet(child).code);

    Ok(ExerciseComponent {
        title,
        description: join_block(&description),
        starter_code,
        language,
        hints: hints_of(segment),
        solution,
        test_cases: parse_test_cases(segment, &parts)?,
    })
}

fn code_by_language<'a>(fences: impl Iterator<Item = &'a FencedCode>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for fence in fences.filter(|fence| !is_test_fence(fence)) {
        map.entry(fence.language.clone())
            .or_insert_with(|| fence.code.clone());
    }
    map
}

fn parse_challenge(segment: &DirectiveSegment) -> DirectiveResult<ChallengeComponent> {
    let parts = scan_body(&segment.raw_body);
    let (title, lines) = title_and_description(segment, text_lines(&parts), "Challenge");

    let mut requirements = Vec::new();
    let mut description = Vec::new();
    for line in lines {
        match list_item(line) {
            Some(item) if !item.is_empty() => requirements.push(item.to_string()),
            _ => description.push(line),
        }
    }
    if requirements.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("requirements")));
    }

    let mut starter_code = BTreeMap::new();
    for child in segment.children_of(DirectiveKind::StarterCode) {
        let child_parts = scan_body(&child.raw_body);
        for (language, code) in code_by_language(fences(&child_parts)) {
            starter_code.entry(language).or_insert(code);
        }
    }
    for (language, code) in code_by_language(fences(&parts)) {
        starter_code.entry(language).or_insert(code);
    }

    let mut solution = BTreeMap::new();
    for child in segment.children_of(DirectiveKind::Solution) {
        let child_parts = scan_body(&child.raw_body);
        for (language, code) in code_by_language(fences(&child_parts)) {
            solution.entry(language).or_insert(code);
        }
    }

    Ok(ChallengeComponent {
        title,
        description: join_block(&description),
        requirements,
        starter_code,
        test_cases: parse_test_cases(segment, &parts)?,
        solution,
        hints: hints_of(segment),
    })
}

// ================================
// Drag and drop
// ================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DragDropSpec {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default, alias = "sourceItems", alias = "source_items")]
    items: Vec<DragItem>,
    #[serde(default, alias = "dropZones", alias = "drop_zones")]
    zones: Vec<DropZone>,
}

fn parse_drag_drop(segment: &DirectiveSegment) -> DirectiveResult<DragDropComponent> {
    let parts = scan_body(&segment.raw_body);
    let source = match fences(&parts).find(|fence| matches!(fence.language.as_str(), "yaml" | "yml" | "json")) {
        Some(fence) => fence.code.clone(),
        None => segment.raw_body.clone(),
    };

    let spec: DragDropSpec = serde_saphyr::from_str(&source)
        .map_err(|e| malformed(segment, DirectiveFault::InvalidDragDrop(e.to_string())))?;

    if spec.items.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("items")));
    }
    if spec.zones.is_empty() {
        return Err(malformed(segment, DirectiveFault::MissingField("zones")));
    }
    for zone in &spec.zones {
        if let Some(unknown) = zone
            .accepted_item_ids
            .iter()
            .find(|id| !spec.items.iter().any(|item| &item.id == *id))
        {
            return Err(malformed(
                segment,
                DirectiveFault::InvalidDragDrop(format!(
                    "zone `{}` accepts unknown item `{}`",
                    zone.id, unknown
                )),
            ));
        }
    }

    let prompt = spec.prompt.or_else(|| (!segment.info.is_empty()).then(|| segment.info.clone()));
    Ok(DragDropComponent {
        prompt,
        source_items: spec.items,
        drop_zones: spec.zones,
    })
}
