//! Markdown rendering.
//!
//! Raw HTML, including directive comments, passes through verbatim so the
//! later pipeline stages still see one directive per line.
//!
//! Two things happen around the renderer itself:
//!
//! - `{{token}}`s are swapped for plain placeholders first, since link and
//!   image destinations would otherwise come out percent-encoded
//! - HTML elements carrying a `markdown` attribute have their content
//!   rendered as markdown, and lose the attribute

use super::vars::TOKEN;
use pulldown_cmark::{Options, Parser, html};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `<tag ... markdown[=value] ...>content</tag>`; tag names are compared by hand.
static MARKDOWN_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<([a-zA-Z][a-zA-Z0-9]*)(\s[^>]*?)?\smarkdown(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?(\s[^>]*)?>(.*?)</([a-zA-Z][a-zA-Z0-9]*)>"#,
    )
    .unwrap()
});

/// Letters and digits only, so no markdown construct or URL escaping touches it.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sniplicitytoken(\d+)x").unwrap());

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_DEFINITION_LIST
        | Options::ENABLE_SMART_PUNCTUATION
}

/// Render markdown text to HTML.
pub fn render(markdown: &str) -> String {
    let mut tokens = Vec::new();
    let protected = TOKEN.replace_all(markdown, |caps: &Captures<'_>| {
        tokens.push(caps[0].to_owned());
        format!("sniplicitytoken{}x", tokens.len() - 1)
    });

    let html = render_fragment(&render_markdown_elements(&protected));

    PLACEHOLDER
        .replace_all(&html, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| tokens.get(index))
                .map_or_else(|| caps[0].to_owned(), Clone::clone)
        })
        .into_owned()
}

fn render_fragment(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Render the content of elements marked with a `markdown` attribute.
///
/// Elements do not nest: the first closing tag ends the match, and a
/// mismatched closing tag leaves the text alone.
fn render_markdown_elements(text: &str) -> String {
    MARKDOWN_ELEMENT
        .replace_all(text, |caps: &Captures<'_>| {
            let (tag, content, close) = (&caps[1], &caps[4], &caps[5]);
            if tag != close {
                return caps[0].to_owned();
            }

            let attrs = [caps.get(2), caps.get(3)]
                .into_iter()
                .flatten()
                .flat_map(|m| m.as_str().split_whitespace())
                .collect::<Vec<_>>()
                .join(" ");
            let inner = render_fragment(content.trim());
            let inner = inner.trim();

            if attrs.is_empty() {
                format!("<{tag}>{inner}</{tag}>")
            } else {
                format!("<{tag} {attrs}>{inner}</{tag}>")
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading_and_paragraph() {
        assert_eq!(render("# Hi\n\nBye\n"), "<h1>Hi</h1>\n<p>Bye</p>\n");
    }

    #[test]
    fn test_render_preserves_directive_blocks() {
        let html = render("<!-- copy footer -->\nBye\n<!-- end -->\n");
        let lines: Vec<_> = html.lines().collect();
        assert_eq!(lines, ["<!-- copy footer -->", "<p>Bye</p>", "<!-- end -->"]);
    }

    #[test]
    fn test_render_directive_after_paragraph() {
        let html = render("Some text\n<!-- paste nav -->\n");
        assert!(html.lines().any(|line| line == "<!-- paste nav -->"));
    }

    #[test]
    fn test_render_keeps_inline_comments_and_tokens() {
        let html = render("Hello <!-- if name -->{{name}}<!-- endif -->\n");
        assert_eq!(html, "<p>Hello <!-- if name -->{{name}}<!-- endif --></p>\n");
    }

    #[test]
    fn test_render_tokens_in_link_and_image_destinations() {
        let html = render("- [{{title}}]({{filepath}})\n\n![{{alt}}]({{img.src}} \"{{caption}}\")\n");
        assert!(html.contains(r#"<a href="{{filepath}}">{{title}}</a>"#), "{html}");
        assert!(html.contains(r#"src="{{img.src}}""#), "{html}");
        assert!(html.contains(r#"alt="{{alt}}""#), "{html}");
        assert!(html.contains(r#"title="{{caption}}""#), "{html}");
        assert!(!html.contains("%7B"));
    }

    #[test]
    fn test_render_tables() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_render_definition_list_and_smart_punctuation() {
        let html = render("Term\n: Meaning\n\n\"Quoted\" -- dashed\n");
        assert!(html.contains("<dl>"), "{html}");
        assert!(html.contains("<dt>Term</dt>"), "{html}");
        assert!(html.contains("\u{201c}Quoted\u{201d}"), "{html}");
        assert!(html.contains('\u{2013}'), "{html}");
    }

    #[test]
    fn test_render_markdown_attribute_elements() {
        let html = render("<div class=\"note\" markdown=\"1\">\n**bold** and *em*\n</div>\n\nafter\n");
        assert!(
            html.contains("<div class=\"note\"><p><strong>bold</strong> and <em>em</em></p></div>"),
            "{html}"
        );
        assert!(html.contains("<p>after</p>"));
        assert!(!html.contains("markdown"));
    }

    #[test]
    fn test_render_markdown_attribute_bare_and_mismatched() {
        assert_eq!(
            render_markdown_elements("<section markdown>## Hi</section>"),
            "<section><h2>Hi</h2></section>"
        );
        let mismatched = "<div markdown>*x*</span>";
        assert_eq!(render_markdown_elements(mismatched), mismatched);
        assert_eq!(render_markdown_elements("<div>*x*</div>"), "<div>*x*</div>");
        let class_only = r#"<div class="markdown-body">*x*</div>"#;
        assert_eq!(render_markdown_elements(class_only), class_only);
    }
}
