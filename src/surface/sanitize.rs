//! HTML sanitizing for the preview
//!
//! Rendered HTML is not trusted by the surface. Before it is mounted every
//! tag is checked against an element allow-list, attributes are filtered to
//! an attribute allow-list, `script` and `style` elements are removed with
//! their contents and `javascript:` URLs are dropped.

use regex::{Captures, Regex};

/// Turns untrusted HTML into something safe to mount
pub trait Sanitizer: Send {
    fn sanitize(&self, html: &str) -> String;
}

const ALLOWED_ELEMENTS: &[&str] = &[
    "a", "blockquote", "br", "code", "del", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "img", "input", "li", "ol", "p", "pre", "s", "section", "span", "strong", "sub",
    "sup", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

const ALLOWED_ATTRIBUTES: &[&str] = &[
    "align", "alt", "checked", "class", "colspan", "disabled", "href", "id", "rowspan", "src",
    "start", "title", "type",
];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

struct Patterns {
    blocks: Vec<Regex>,
    comment: Regex,
    tag: Regex,
    attribute: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            blocks: vec![
                Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")?,
                Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>")?,
            ],
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            tag: Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>")?,
            attribute: Regex::new(
                r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
            )?,
        })
    }
}

/// Regex-driven allow-list sanitizer
pub struct AllowListSanitizer {
    patterns: Option<Patterns>,
}

impl AllowListSanitizer {
    pub fn new() -> Self {
        let patterns = Patterns::compile()
            .map_err(|e| log::error!("Sanitizer patterns failed to compile: {}", e))
            .ok();
        Self { patterns }
    }

    fn rewrite_tag(patterns: &Patterns, caps: &Captures) -> String {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_ELEMENTS.contains(&name.as_str()) {
            return String::new();
        }
        if closing {
            return format!("</{}>", name);
        }

        let raw_attrs = caps[3].trim_end();
        let self_closing = raw_attrs.ends_with('/');
        let raw_attrs = raw_attrs.trim_end_matches('/');

        let mut out = format!("<{}", name);
        for attr in patterns.attribute.captures_iter(raw_attrs) {
            let attr_name = attr[1].to_ascii_lowercase();
            if !ALLOWED_ATTRIBUTES.contains(&attr_name.as_str()) {
                continue;
            }
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            if URL_ATTRIBUTES.contains(&attr_name.as_str()) && is_script_url(value) {
                continue;
            }
            out.push_str(&format!(" {}=\"{}\"", attr_name, value.replace('"', "&quot;")));
        }
        out.push_str(if self_closing { " />" } else { ">" });
        out
    }
}

impl Default for AllowListSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let Some(patterns) = &self.patterns else {
            return html_escape::encode_text(html).into_owned();
        };

        let mut cleaned = html.to_string();
        for block in &patterns.blocks {
            cleaned = block.replace_all(&cleaned, "").into_owned();
        }
        cleaned = patterns.comment.replace_all(&cleaned, "").into_owned();

        patterns
            .tag
            .replace_all(&cleaned, |caps: &Captures| Self::rewrite_tag(patterns, caps))
            .into_owned()
    }
}

/// `javascript:` and friends, ignoring case, whitespace and control chars
fn is_script_url(value: &str) -> bool {
    let decoded = html_escape::decode_html_entities(value);
    let compact: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        AllowListSanitizer::new().sanitize(html)
    }

    #[test]
    fn test_keeps_rendered_markdown() {
        let html = "<h1>Hi</h1>\n<p>Some <strong>bold</strong> and <code>code</code></p>\n";
        assert_eq!(clean(html), html);
    }

    #[test]
    fn test_strips_script_and_style() {
        let out = clean("<p>a</p><SCRIPT type=\"x\">alert(1)</script><style>p{}</style><p>b</p>");
        assert_eq!(out, "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_filters_attributes() {
        let out = clean("<p onclick=\"evil()\" class=\"note\" style=\"color:red\">x</p>");
        assert_eq!(out, "<p class=\"note\">x</p>");
    }

    #[test]
    fn test_drops_script_urls() {
        let out = clean("<a href=\" JavaScript:alert(1)\" title=\"t\">x</a>");
        assert_eq!(out, "<a title=\"t\">x</a>");
        let out = clean("<img src='java&#x09;script:x' alt=\"pic\">");
        assert_eq!(out, "<img alt=\"pic\">");
        let out = clean("<a href=\"https://example.com\">ok</a>");
        assert_eq!(out, "<a href=\"https://example.com\">ok</a>");
    }

    #[test]
    fn test_unknown_elements_unwrapped() {
        assert_eq!(clean("<iframe src=\"x\"></iframe><p>kept</p>"), "<p>kept</p>");
        assert_eq!(clean("<marquee>text</marquee>"), "text");
    }

    #[test]
    fn test_task_list_checkbox_survives() {
        let out = clean("<li><input disabled=\"\" type=\"checkbox\" checked=\"\"/>\ndone</li>");
        assert_eq!(
            out,
            "<li><input disabled=\"\" type=\"checkbox\" checked=\"\" />\ndone</li>"
        );
    }

    #[test]
    fn test_diagram_container_survives() {
        let html = "<div class=\"mermaid\">A--&gt;B</div>";
        assert_eq!(clean(html), html);
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(clean("<p>a<!-- <script>x</script> --></p>"), "<p>a</p>");
    }
}
