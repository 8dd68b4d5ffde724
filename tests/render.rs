use serde_json::json;
use xlesson::render::{render_prose, Block, Inline};
use xlesson::{tokenize, Segment};

#[test]
fn test_heading_then_paragraph() {
    let tree = render_prose("# Title\n\nSome *text*.");
    assert_eq!(
        tree.blocks(),
        &[
            Block::Heading {
                level: 1,
                content: vec![Inline::text("Title")],
            },
            Block::Paragraph {
                content: vec![
                    Inline::text("Some "),
                    Inline::Emphasis {
                        content: vec![Inline::text("text")],
                    },
                    Inline::text("."),
                ],
            },
        ]
    );
}

#[test]
fn test_rendering_is_deterministic() {
    let source = "## Loops\n\n> **Note:** `for (;;)` runs *forever*.\n\n1. one\n2. two\n";
    assert_eq!(render_prose(source), render_prose(source));
    assert_eq!(render_prose(source).to_html(), render_prose(source).to_html());
}

#[test]
fn test_code_span_is_protected_from_emphasis() {
    let tree = render_prose("Use `a*b*c` here.");
    let Block::Paragraph { content } = &tree.blocks()[0] else {
        panic!("Expected paragraph");
    };
    assert!(content.contains(&Inline::Code {
        code: "a*b*c".to_string()
    }));
    assert!(!content.iter().any(|i| matches!(i, Inline::Emphasis { .. })));
}

#[test]
fn test_prose_segments_render_independently() {
    let doc = tokenize("Intro *one*.\n\n```js\nlet x = 1;\n```\n\n## After\n");
    let trees: Vec<_> = doc
        .iter()
        .filter_map(|segment| match segment {
            Segment::Prose(prose) if !prose.text.trim().is_empty() => Some(render_prose(&prose.text)),
            _ => None,
        })
        .collect();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].plain_text(), "Intro one.");
    assert!(matches!(trees[1].blocks()[0], Block::Heading { level: 2, .. }));
}

#[test]
fn test_tree_serializes_with_type_tags() {
    let tree = render_prose("---\n\n[site](https://example.com)");
    let value = serde_json::to_value(&tree).unwrap();
    assert_eq!(
        value,
        json!({
            "blocks": [
                { "type": "rule" },
                {
                    "type": "paragraph",
                    "content": [{
                        "type": "link",
                        "href": "https://example.com",
                        "content": [{ "type": "text", "text": "site" }]
                    }]
                }
            ]
        })
    );
}

#[test]
fn test_html_output_is_script_safe() {
    let html = render_prose(
        "![x](javascript:alert(1)) <img src=x onerror=alert(1)> [y](data:text/html,hi)",
    )
    .to_html();
    assert!(!html.contains("javascript:"));
    assert!(!html.contains("data:"));
    assert!(!html.contains("<img src=x"));
    assert!(html.contains("<img src=\"#\" alt=\"x\">"));
}

#[test]
fn test_deeply_nested_input_renders() {
    let quotes = format!("{} x", ">".repeat(10_000));
    let lesson = xlesson::render_lesson(&quotes);
    assert!(lesson.to_html().contains("<blockquote>"));

    let emphasis = format!("{}x{}", "*_".repeat(2_000), "_*".repeat(2_000));
    let links = format!("{}x{}", "[".repeat(2_000), "](u)".repeat(2_000));
    for source in [emphasis, links] {
        let tree = render_prose(&source);
        assert!(tree.plain_text().contains('x'));
        assert!(serde_json::to_value(&tree).is_ok());
    }
}
