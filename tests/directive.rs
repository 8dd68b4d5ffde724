use std::collections::HashMap;

use serde_json::json;
use xlesson::directive::{parse, InteractiveComponent, QuizComponent};
use xlesson::error::DirectiveFault;
use xlesson::markup::{DirectiveSegment, Segment};
use xlesson::tokenize;

fn directives(source: &str) -> Vec<DirectiveSegment> {
    tokenize(source)
        .iter()
        .filter_map(|segment| match segment {
            Segment::Directive(d) => Some(d.clone()),
            _ => None,
        })
        .collect()
}

fn quiz(source: &str) -> QuizComponent {
    match parse(&directives(source)[0]) {
        Ok(InteractiveComponent::Quiz(quiz)) => quiz,
        other => panic!("Expected quiz, got {:?}", other),
    }
}

#[test]
fn test_multiple_choice_iff_more_than_one_correct() {
    let marks = [
        vec![true],
        vec![true, false],
        vec![false, true, false],
        vec![true, true],
        vec![true, false, true, false],
        vec![true, true, true],
    ];
    for pattern in marks {
        let body: String = pattern
            .iter()
            .enumerate()
            .map(|(i, correct)| format!("- [{}] option {i}\n", if *correct { "x" } else { " " }))
            .collect();
        let quiz = quiz(&format!(":::quiz\nPick.\n{body}:::\n"));
        let correct = pattern.iter().filter(|c| **c).count();
        assert_eq!(quiz.multiple_choice, correct > 1, "pattern {:?}", pattern);
        assert_eq!(quiz.options.len(), pattern.len());
    }
}

#[test]
fn test_quiz_grading() {
    let quiz = quiz(":::quiz\nFalsy?\n- [x] 0\n- [ ] 1\n- [x] ''\n:::\n");
    assert!(quiz.grade(&["a", "c"]));
    assert!(quiz.grade(&["c", "a"]));
    assert!(!quiz.grade(&["a"]));
    assert!(!quiz.grade(&["a", "b", "c"]));
}

#[test]
fn test_fill_blank_grading() {
    let segment = &directives(":::fill-blank\nThe sky is {blue|azure}; use {!const} for constants.\n:::\n")[0];
    let Ok(InteractiveComponent::FillBlank(fill)) = parse(segment) else {
        panic!("Expected fill-blank");
    };
    assert_eq!(fill.blanks.len(), 2);
    assert!(fill.blanks[0].accepts("Azure"));
    assert!(fill.blanks[1].case_sensitive);
    assert!(!fill.blanks[1].accepts("CONST"));

    let answers: HashMap<String, String> = [
        ("blank-1".to_string(), " BLUE ".to_string()),
        ("blank-2".to_string(), "const".to_string()),
    ]
    .into();
    assert!(fill.check(&answers).all_correct);

    let partial: HashMap<String, String> = [("blank-1".to_string(), "green".to_string())].into();
    let check = fill.check(&partial);
    assert!(!check.all_correct);
    assert_eq!(check.results["blank-1"], false);
    assert_eq!(check.results["blank-2"], false);
}

#[test]
fn test_template_ids_match_blanks() {
    let segment = &directives(":::fill-blank\n{a} and {b|c} and {d}\n:::\n")[0];
    let Ok(InteractiveComponent::FillBlank(fill)) = parse(segment) else {
        panic!("Expected fill-blank");
    };
    let text = fill.template_text();
    for blank in &fill.blanks {
        assert_eq!(text.matches(&format!("{{{{{}}}}}", blank.id)).count(), 1);
    }
    assert_eq!(text, "{{blank-1}} and {{blank-2}} and {{blank-3}}");
}

#[test]
fn test_drag_drop_grading() {
    let source = r#":::drag-drop
```yaml
prompt: Sort the tags
items:
  - { id: div, text: "<div>" }
  - { id: span, text: "<span>" }
  - { id: p, text: "<p>" }
zones:
  - { id: block, label: Block, accepts: [div, p], maxItems: 2 }
  - { id: inline, label: Inline, accepts: [span] }
```
:::
"#;
    let Ok(InteractiveComponent::DragDrop(dd)) = parse(&directives(source)[0]) else {
        panic!("Expected drag-drop");
    };
    assert_eq!(dd.prompt.as_deref(), Some("Sort the tags"));

    let right: HashMap<String, String> = [
        ("div".to_string(), "block".to_string()),
        ("p".to_string(), "block".to_string()),
        ("span".to_string(), "inline".to_string()),
    ]
    .into();
    assert!(dd.check(&right).all_correct);

    let wrong: HashMap<String, String> = [
        ("div".to_string(), "inline".to_string()),
        ("span".to_string(), "inline".to_string()),
    ]
    .into();
    let check = dd.check(&wrong);
    assert!(!check.all_correct);
    assert_eq!(check.items["div"], false);
    assert_eq!(check.items["span"], true);
    assert_eq!(check.items["p"], false);
}

#[test]
fn test_malformed_errors_carry_raw_text() {
    let source = ":::fill-blank\nno placeholders\n:::\n\n:::quiz\n- [ ] a\n:::\n";
    let errors: Vec<_> = directives(source)
        .iter()
        .map(|d| parse(d).unwrap_err())
        .collect();
    assert_eq!(errors[0].fault, DirectiveFault::MissingField("blanks"));
    assert_eq!(errors[0].raw_text, ":::fill-blank\nno placeholders\n:::\n");
    assert_eq!(errors[1].fault, DirectiveFault::NoCorrectOption);
    assert_eq!(
        errors[1].to_string(),
        "malformed `quiz` directive: no option is marked correct"
    );
}

#[test]
fn test_exercise_test_cases_attached_verbatim() {
    let source = r#":::exercise Shapes
```tests
- input: { w: 2, h: 3 }
  expectedOutput: { area: 6 }
  description: rectangle
- input: [1, 2]
  expectedOutput: [2, 1]
  description: reversed
```
:::
"#;
    let Ok(InteractiveComponent::Exercise(exercise)) = parse(&directives(source)[0]) else {
        panic!("Expected exercise");
    };
    assert_eq!(exercise.test_cases.len(), 2);
    assert_eq!(exercise.test_cases[0].input, json!({"w": 2, "h": 3}));
    assert_eq!(exercise.test_cases[0].expected_output, json!({"area": 6}));
    assert_eq!(exercise.test_cases[1].expected_output, json!([2, 1]));
    assert_eq!(exercise.starter_code, "");
}

#[test]
fn test_component_serialization() {
    let quiz = parse(&directives(":::quiz\nQ?\n- [x] A\n- [ ] B\n:::\n")[0]).unwrap();
    let json = serde_json::to_value(&quiz).unwrap();
    assert_eq!(json["type"], "quiz");
    assert_eq!(json["multipleChoice"], false);
    assert_eq!(json["options"][0]["isCorrect"], true);
}
