//! Markdown module for Markdown Bridge
//!
//! Turns the canonical Markdown source into the HTML fragment shown in the
//! preview surface:
//! - Math spans lifted out so the typesetter sees them verbatim
//! - Base transform with pulldown-cmark (tables, task lists, strikethrough, footnotes)
//! - Diagram-block promotion
//!
//! Rendering is pure. The same input always yields the same fragment and
//! malformed markup degrades to literal text rather than failing.

pub mod diagram;
pub mod math;

pub use diagram::DiagramPromoter;
pub use math::MathGuard;

use crate::config::RenderConfig;
use pulldown_cmark::{html, Options, Parser};

/// Markdown -> HTML pipeline
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    options: Options,
    promoter: DiagramPromoter,
}

impl RenderPipeline {
    /// Create a pipeline from render settings
    pub fn new(config: &RenderConfig) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        if config.footnotes {
            options.insert(Options::ENABLE_FOOTNOTES);
        }

        Self {
            options,
            promoter: DiagramPromoter::new(&config.diagram_keyword, &config.diagram_class),
        }
    }

    /// Render Markdown to an HTML fragment
    pub fn render(&self, markup: &str) -> String {
        if markup.is_empty() {
            return String::new();
        }

        let (source, math) = MathGuard::protect(markup);
        let parser = Parser::new_ext(&source, self.options);
        let mut html_content = String::with_capacity(markup.len() * 3 / 2);
        html::push_html(&mut html_content, parser);

        let html_content = math.restore(&html_content);
        self.promoter.promote(&html_content).into_owned()
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

/// Render with default settings
pub fn render(markup: &str) -> String {
    RenderPipeline::default().render(markup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_heading() {
        let html = render("# Hi\n");
        assert!(html.contains("<h1>Hi</h1>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = "# Title\n\nSome *text* with `code`.\n\n```mermaid\nA-->B\n```\n";
        let pipeline = RenderPipeline::default();
        assert_eq!(pipeline.render(doc), pipeline.render(doc));
    }

    #[test]
    fn test_diagram_promotion_end_to_end() {
        let html = render("```mermaid\nA-->B\n```\n");
        assert!(html.contains("<div class=\"mermaid\">A--&gt;B</div>"));
        assert!(!html.contains("<pre>"));
        assert!(!html.contains("language-mermaid"));
    }

    #[test]
    fn test_diagram_with_markup_characters() {
        let html = render("```mermaid\nA[\"<b>x</b> & y\"]-->B\n```\n");
        assert!(html.contains(
            "<div class=\"mermaid\">A[\"&lt;b&gt;x&lt;/b&gt; &amp; y\"]--&gt;B</div>"
        ));
    }

    #[test]
    fn test_other_code_blocks_untouched() {
        let html = render("```rust\nlet a = 1 < 2;\n```\n");
        assert!(html.contains("<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>"));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render(
            "~~gone~~\n\n- [x] done\n- [ ] todo\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n",
        );
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>a</th>"));
        assert!(html.contains("<td>2</td>"));
    }

    #[test]
    fn test_common_blocks() {
        let html = render(
            "> quote\n\n---\n\n1. one\n2. two\n\n[link](https://example.com) ![img](a.png)\n",
        );
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<hr />"));
        assert!(html.contains("<ol>"));
        assert!(html.contains("<a href=\"https://example.com\">link</a>"));
        assert!(html.contains("<img src=\"a.png\" alt=\"img\" />"));
    }

    #[test]
    fn test_math_left_literal() {
        let html = render("Inline $E=mc^2$ and\n\n$$\n\\int_0^1 x dx\n$$\n");
        assert!(html.contains("$E=mc^2$"));
        assert!(html.contains("$$"));
    }

    #[test]
    fn test_math_is_not_emphasis() {
        let html = render("Inline $a*b*c$ and $x_1 + y_1$\n");
        assert_eq!(html, "<p>Inline $a*b*c$ and $x_1 + y_1$</p>\n");

        let html = render("$$\na_*b*_c\n$$\n\n`$a*b*c$`\n");
        assert!(html.contains("$$\na_*b*_c\n$$"));
        assert!(html.contains("<code>$a*b*c$</code>"));
    }

    #[test]
    fn test_malformed_markup_degrades() {
        let html = render("**unclosed [link]( `tick\n\n```\nnever closed");
        assert!(html.contains("unclosed"));
    }
}
