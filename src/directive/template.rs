//! Fill-in-the-blank placeholder scanning: `{answer}`, `{a|b}`, `{!CaseSensitive}`.

use std::collections::BTreeSet;

use super::types::{Blank, TemplatePart};

pub(crate) fn parse_template(text: &str) -> (Vec<TemplatePart>, Vec<Blank>) {
    let mut parts = Vec::new();
    let mut blanks = Vec::new();
    let mut current = String::new();
    let mut rest = text;

    while let Some(idx) = rest.find(['\\', '{']) {
        current.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(escaped) = tail.strip_prefix('\\') {
            match escaped.chars().next() {
                Some(c @ ('{' | '}')) => {
                    current.push(c);
                    rest = &escaped[1..];
                }
                _ => {
                    current.push('\\');
                    rest = escaped;
                }
            }
            continue;
        }

        // tail starts with '{'
        let placeholder = tail[1..]
            .find(['}', '\n'])
            .filter(|end| tail[1..].as_bytes()[*end] == b'}')
            .and_then(|end| parse_placeholder(&tail[1..1 + end]).map(|blank| (end, blank)));

        match placeholder {
            Some((end, (answers, case_sensitive))) => {
                if !current.is_empty() {
                    parts.push(TemplatePart::Text {
                        text: std::mem::take(&mut current),
                    });
                }
                let id = format!("blank-{}", blanks.len() + 1);
                parts.push(TemplatePart::Blank { id: id.clone() });
                blanks.push(Blank {
                    id,
                    accepted_answers: answers,
                    case_sensitive,
                });
                rest = &tail[end + 2..];
            }
            None => {
                current.push('{');
                rest = &tail[1..];
            }
        }
    }

    current.push_str(rest);
    if !current.is_empty() {
        parts.push(TemplatePart::Text { text: current });
    }
    (parts, blanks)
}

fn parse_placeholder(inner: &str) -> Option<(BTreeSet<String>, bool)> {
    let inner = inner.trim();
    let (inner, case_sensitive) = match inner.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let answers: BTreeSet<String> = inner
        .split('|')
        .map(str::trim)
        .filter(|answer| !answer.is_empty())
        .map(str::to_string)
        .collect();
    if answers.is_empty() {
        None
    } else {
        Some((answers, case_sensitive))
    }
}
