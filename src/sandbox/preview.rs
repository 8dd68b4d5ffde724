//! Preview documents for markup languages. Nothing here executes anything.

/// HTML is already a document; it passes through unchanged.
pub fn html_preview(html: &str) -> String {
    html.to_string()
}

/// Wrap a stylesheet in a small document with sample elements to style.
pub fn css_preview(css: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>CSS preview</title>
<style>
{css}
</style>
</head>
<body>
<div class="container">
  <h1>Heading 1</h1>
  <h2>Heading 2</h2>
  <p>A paragraph with a <a href="#">link</a>, <strong>strong</strong> and <em>emphasized</em> text.</p>
  <button class="btn">Button</button>
  <ul>
    <li>First item</li>
    <li>Second item</li>
  </ul>
  <div class="box">Box</div>
</div>
</body>
</html>
"##,
        css = neutralize_style_close(css)
    )
}

/// `</style` inside the stylesheet would end the element early.
fn neutralize_style_close(css: &str) -> String {
    let lower = css.to_ascii_lowercase();
    let mut out = String::with_capacity(css.len());
    let mut last = 0;
    for (at, _) in lower.match_indices("</style") {
        out.push_str(&css[last..at]);
        out.push_str("<\\/style");
        last = at + "</style".len();
    }
    out.push_str(&css[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_passes_through() {
        let html = "<h1>Hi</h1><script>1</script>";
        assert_eq!(html_preview(html), html);
    }

    #[test]
    fn test_css_is_wrapped() {
        let doc = css_preview("h1 { color: red; }");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<style>\nh1 { color: red; }\n</style>"));
        assert!(doc.contains("<h1>Heading 1</h1>"));
        assert!(doc.contains(r##"<a href="#">link</a>"##));
        assert!(doc.ends_with("</html>\n"));
    }

    #[test]
    fn test_css_cannot_close_style() {
        let doc = css_preview("p{}</STYLE><script>alert(1)</script>");
        assert!(!doc.contains("</STYLE>"));
        assert_eq!(doc.matches("</style>").count(), 1);
    }
}
