//! Diagram-block promotion
//!
//! Rewrites fenced code blocks tagged with the diagram keyword into plain
//! containers a diagram renderer can find by class. The code text arrives
//! HTML-escaped from the base transform. It is decoded back to the raw
//! diagram source and re-encoded as minimal text content (`&`, `<`, `>`),
//! so the container's text content is exactly the source and survives
//! sanitizing on the surface.

use std::borrow::Cow;

const CODE_CLOSE: &str = "</code></pre>";

/// Finds `<pre><code class="language-KEYWORD">` blocks and promotes them
#[derive(Debug, Clone)]
pub struct DiagramPromoter {
    open_tag: String,
    class_name: String,
}

impl DiagramPromoter {
    pub fn new(keyword: &str, class_name: &str) -> Self {
        Self {
            open_tag: format!("<pre><code class=\"language-{}\">", keyword),
            class_name: class_name.to_string(),
        }
    }

    /// Promote every diagram block in `html`
    ///
    /// Returns the input untouched (borrowed) when there is nothing to do.
    /// An opening tag without a matching close is left as is.
    pub fn promote<'a>(&self, html: &'a str) -> Cow<'a, str> {
        if !html.contains(&self.open_tag) {
            return Cow::Borrowed(html);
        }

        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        while let Some(start) = rest.find(&self.open_tag) {
            let body_start = start + self.open_tag.len();
            let Some(body_len) = rest[body_start..].find(CODE_CLOSE) else {
                break;
            };
            out.push_str(&rest[..start]);

            let escaped = &rest[body_start..body_start + body_len];
            let decoded = html_escape::decode_html_entities(escaped);
            let source = decoded.strip_suffix('\n').unwrap_or(&*decoded);

            out.push_str("<div class=\"");
            out.push_str(&self.class_name);
            out.push_str("\">");
            out.push_str(&html_escape::encode_text(source));
            out.push_str("</div>");

            rest = &rest[body_start + body_len + CODE_CLOSE.len()..];
        }
        out.push_str(rest);
        Cow::Owned(out)
    }

    /// Class name carried by promoted containers
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}
