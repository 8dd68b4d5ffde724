//! Whole-lesson assembly: tokenize once, then parse directives and render prose
//! into one ordered list of blocks.

use std::fmt::Write;

use tracing::warn;

use crate::directive::{self, InteractiveComponent};
use crate::error::MalformedDirectiveError;
use crate::markup::{tokenize, DirectiveKind, LessonDocument, Segment};
use crate::render::{escape_html, render_prose, MarkupTree};

#[derive(Debug, Clone, PartialEq)]
pub enum LessonBlock {
    Prose(MarkupTree),
    Code {
        language: String,
        code: String,
        executable: bool,
    },
    Component(ComponentSlot),
}

/// One directive's place in the lesson. Malformed directives keep their slot so the
/// caller can show a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSlot {
    /// `quiz-1`, `exercise-2`, ...: kind plus 1-based position among components
    pub id: String,
    pub kind: DirectiveKind,
    pub component: Result<InteractiveComponent, MalformedDirectiveError>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedLesson {
    pub blocks: Vec<LessonBlock>,
}

/// Tokenize, parse and render `source`. Never fails.
pub fn render_lesson(source: &str) -> RenderedLesson {
    render_document(&tokenize(source))
}

pub fn render_document(document: &LessonDocument) -> RenderedLesson {
    let mut blocks: Vec<LessonBlock> = Vec::new();
    let mut position = 0;
    // index in `blocks` of the last quiz, while nothing but whitespace follows it
    let mut open_quiz: Option<usize> = None;

    for segment in document {
        match segment {
            Segment::Prose(prose) => {
                if prose.text.trim().is_empty() {
                    continue;
                }
                open_quiz = None;
                blocks.push(LessonBlock::Prose(render_prose(&prose.text)));
            }
            Segment::CodeBlock(code) => {
                open_quiz = None;
                blocks.push(LessonBlock::Code {
                    language: code.language.clone(),
                    code: code.code.clone(),
                    executable: code.executable,
                });
            }
            Segment::Directive(directive) => {
                let parsed = directive::parse(directive);

                if let (Some(index), Ok(InteractiveComponent::Explanation(explanation))) =
                    (open_quiz, &parsed)
                {
                    if attach_explanation(&mut blocks[index], &explanation.text) {
                        open_quiz = None;
                        continue;
                    }
                }

                if let Err(e) = &parsed {
                    warn!(kind = %e.kind, error = %e.fault, "malformed directive");
                }
                position += 1;
                let is_quiz = matches!(parsed, Ok(InteractiveComponent::Quiz(_)));
                blocks.push(LessonBlock::Component(ComponentSlot {
                    id: format!("{}-{}", directive.kind, position),
                    kind: directive.kind,
                    component: parsed,
                }));
                open_quiz = is_quiz.then(|| blocks.len() - 1);
            }
        }
    }

    RenderedLesson { blocks }
}

fn attach_explanation(block: &mut LessonBlock, text: &str) -> bool {
    let LessonBlock::Component(ComponentSlot {
        component: Ok(InteractiveComponent::Quiz(quiz)),
        ..
    }) = block
    else {
        return false;
    };
    quiz.explanation = Some(match quiz.explanation.take() {
        Some(existing) => format!("{existing}\n\n{text}"),
        None => text.to_string(),
    });
    true
}

impl RenderedLesson {
    pub fn components(&self) -> impl Iterator<Item = (&str, &InteractiveComponent)> {
        self.slots().filter_map(|slot| {
            slot.component
                .as_ref()
                .ok()
                .map(|component| (slot.id.as_str(), component))
        })
    }

    /// Every malformed directive, with its slot id.
    pub fn diagnostics(&self) -> Vec<(&str, &MalformedDirectiveError)> {
        self.slots()
            .filter_map(|slot| {
                slot.component
                    .as_ref()
                    .err()
                    .map(|error| (slot.id.as_str(), error))
            })
            .collect()
    }

    pub fn component(&self, id: &str) -> Option<&InteractiveComponent> {
        self.components()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, component)| component)
    }

    fn slots(&self) -> impl Iterator<Item = &ComponentSlot> {
        self.blocks.iter().filter_map(|block| match block {
            LessonBlock::Component(slot) => Some(slot),
            _ => None,
        })
    }

    /// HTML with each component as a JSON data island for the client to mount.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                LessonBlock::Prose(tree) => out.push_str(&tree.to_html()),
                LessonBlock::Code {
                    language,
                    code,
                    executable,
                } => {
                    let _ = writeln!(
                        out,
                        "<pre><code class=\"language-{}\"{}>{}</code></pre>",
                        escape_html(language),
                        if *executable { " data-executable=\"true\"" } else { "" },
                        escape_html(code)
                    );
                }
                LessonBlock::Component(slot) => write_component(&mut out, slot),
            }
        }
        out
    }
}

fn write_component(out: &mut String, slot: &ComponentSlot) {
    let id = escape_html(&slot.id);
    match &slot.component {
        Ok(component) => {
            let json = match serde_json::to_string(component) {
                Ok(json) => json,
                Err(e) => {
                    warn!(id = %slot.id, error = %e, "component serialization failed");
                    "null".to_string()
                }
            };
            let _ = writeln!(
                out,
                "<div class=\"xlesson-component\" id=\"{id}\" data-kind=\"{}\"><script type=\"application/json\">{}</script></div>",
                slot.kind,
                // keeps `</script>` and `<!--` inside strings from ending the island
                json.replace('<', "\\u003c")
            );
        }
        Err(error) => {
            let _ = writeln!(
                out,
                "<div class=\"xlesson-component xlesson-error\" id=\"{id}\" data-kind=\"{}\"><p>{}</p><pre>{}</pre></div>",
                slot.kind,
                escape_html(&error.to_string()),
                escape_html(&error.raw_text)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_and_order() {
        let lesson = render_lesson(
            "# Intro\n\n:::quiz\nQ?\n- [x] yes\n:::\n\n```executable:javascript\nconsole.log(1)\n```\n:::fill-blank\nA {b}.\n:::\n",
        );
        assert_eq!(lesson.blocks.len(), 4);
        assert!(matches!(lesson.blocks[0], LessonBlock::Prose(_)));
        assert!(matches!(
            lesson.blocks[2],
            LessonBlock::Code { executable: true, .. }
        ));
        let ids: Vec<&str> = lesson.components().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["quiz-1", "fill-blank-2"]);
    }

    #[test]
    fn test_explanation_attaches_to_preceding_quiz() {
        let lesson = render_lesson(
            ":::quiz\nQ?\n- [x] yes\n- [ ] no\n:::\n\n:::explanation\nBecause yes.\n:::\n",
        );
        assert_eq!(lesson.blocks.len(), 1);
        let Some(InteractiveComponent::Quiz(quiz)) = lesson.component("quiz-1") else {
            panic!("Expected quiz");
        };
        assert_eq!(quiz.explanation.as_deref(), Some("Because yes."));
    }

    #[test]
    fn test_explanation_after_prose_stands_alone() {
        let lesson = render_lesson(":::quiz\nQ?\n- [x] yes\n:::\nText.\n:::explanation\nWhy.\n:::\n");
        let kinds: Vec<DirectiveKind> = lesson.components().map(|(_, c)| c.kind()).collect();
        assert_eq!(kinds, vec![DirectiveKind::Quiz, DirectiveKind::Explanation]);
    }

    #[test]
    fn test_malformed_directive_does_not_block_rest() {
        let lesson = render_lesson(":::quiz\nNo options\n:::\n\nStill *rendered*.\n");
        let diagnostics = lesson.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].0, "quiz-1");
        assert_eq!(diagnostics[0].1.raw_text, ":::quiz\nNo options\n:::\n");

        let html = lesson.to_html();
        assert!(html.contains("xlesson-error"));
        assert!(html.contains("<p>Still <em>rendered</em>.</p>"));
    }

    #[test]
    fn test_data_island_is_script_safe() {
        let lesson = render_lesson(":::quiz\nWhat ends a script?\n- [x] </script>\n:::\n");
        let html = lesson.to_html();
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("\\u003c/script>"));
        assert!(html.contains("id=\"quiz-1\" data-kind=\"quiz\""));
    }
}
