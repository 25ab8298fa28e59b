//! Markdown fragments inserted by toolbar commands
//!
//! Each builder returns either a plain insertion at the caret or a
//! prefix/suffix pair that surrounds the current selection.

use crate::message::Message;

pub const MIN_HEADING_LEVEL: u8 = 1;
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Tables never have fewer rows (header included) or columns than this
pub const MIN_TABLE_DIMENSION: usize = 2;

/// A composed fragment, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snippet {
    Insert(String),
    Wrap { prefix: String, suffix: String },
}

impl Snippet {
    fn wrap(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Snippet::Wrap {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Outbound command for this fragment
    pub fn into_message(self) -> Message {
        match self {
            Snippet::Insert(text) => Message::InsertAtCursor(text),
            Snippet::Wrap { prefix, suffix } => Message::WrapSelection { prefix, suffix },
        }
    }
}

pub fn heading(level: u8) -> Snippet {
    let level = level.clamp(MIN_HEADING_LEVEL, MAX_HEADING_LEVEL) as usize;
    Snippet::wrap(format!("{} ", "#".repeat(level)), "")
}

pub fn bold() -> Snippet {
    Snippet::wrap("**", "**")
}

pub fn italic() -> Snippet {
    Snippet::wrap("*", "*")
}

pub fn strikethrough() -> Snippet {
    Snippet::wrap("~~", "~~")
}

pub fn inline_code() -> Snippet {
    Snippet::wrap("`", "`")
}

pub fn blockquote() -> Snippet {
    Snippet::wrap("> ", "")
}

pub fn horizontal_rule() -> Snippet {
    Snippet::Insert("\n---\n".to_string())
}

pub fn bullet_item() -> Snippet {
    Snippet::Insert("- ".to_string())
}

pub fn numbered_item() -> Snippet {
    Snippet::Insert("1. ".to_string())
}

pub fn checkbox(checked: bool) -> Snippet {
    let marker = if checked { "- [x] " } else { "- [ ] " };
    Snippet::Insert(marker.to_string())
}

/// Table skeleton; `rows` counts the header row
pub fn table(rows: usize, cols: usize) -> Snippet {
    let rows = rows.max(MIN_TABLE_DIMENSION);
    let cols = cols.max(MIN_TABLE_DIMENSION);

    let row = |cells: Vec<String>| format!("| {} |\n", cells.join(" | "));

    let mut out = String::from("\n");
    out.push_str(&row((1..=cols).map(|c| format!("Header {}", c)).collect()));
    out.push_str(&row(vec!["---".to_string(); cols]));
    for _ in 1..rows {
        out.push_str(&row(vec!["   ".to_string(); cols]));
    }
    Snippet::Insert(out)
}

pub fn link(text: &str, url: &str) -> Snippet {
    Snippet::Insert(format!("[{}]({})", text, url))
}

pub fn image(alt: &str, path: &str) -> Snippet {
    Snippet::Insert(format!("![{}]({})", alt, path))
}

/// Fence around the selection
pub fn code_block(language: &str) -> Snippet {
    Snippet::wrap(format!("\n```{}\n", language.trim()), "\n```\n")
}

pub fn diagram_sample(keyword: &str) -> Snippet {
    Snippet::Insert(format!(
        "\n```{}\ngraph TD\n    A[Start] --> B{{Decision}}\n    B -->|Yes| C[Done]\n    B -->|No| A\n```\n",
        keyword
    ))
}

pub fn math_sample() -> Snippet {
    Snippet::Insert("\n$$\nE = mc^2\n$$\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inserted(snippet: Snippet) -> String {
        match snippet {
            Snippet::Insert(text) => text,
            other => panic!("expected insertion, got {:?}", other),
        }
    }

    #[test]
    fn test_heading_clamped() {
        assert_eq!(heading(0), Snippet::wrap("# ", ""));
        assert_eq!(heading(3), Snippet::wrap("### ", ""));
        assert_eq!(heading(42), Snippet::wrap("###### ", ""));
    }

    #[test]
    fn test_table_3x3() {
        let text = inserted(table(3, 3));
        let lines: Vec<&str> = text.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Header 1 | Header 2 | Header 3 |");
        assert_eq!(lines[1], "| --- | --- | --- |");
        for data in &lines[2..] {
            assert_eq!(data.matches('|').count(), 4);
        }
    }

    #[test]
    fn test_table_floors_dimensions() {
        let text = inserted(table(0, 1));
        let lines: Vec<&str> = text.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "| --- | --- |");
    }

    #[test]
    fn test_table_renders_as_table() {
        let html = crate::markdown::render(&inserted(table(3, 3)));
        assert_eq!(html.matches("<th>").count(), 3);
        assert_eq!(html.matches("<tr>").count(), 3);
    }

    #[test]
    fn test_link_and_image() {
        assert_eq!(inserted(link("docs", "https://x.y")), "[docs](https://x.y)");
        assert_eq!(inserted(image("logo", "img/logo.png")), "![logo](img/logo.png)");
    }

    #[test]
    fn test_checkbox_markers() {
        assert_eq!(inserted(checkbox(true)), "- [x] ");
        assert_eq!(inserted(checkbox(false)), "- [ ] ");
    }

    #[test]
    fn test_code_block_wraps() {
        assert_eq!(code_block(" rust "), Snippet::wrap("\n```rust\n", "\n```\n"));
    }

    #[test]
    fn test_samples_render() {
        let html = crate::markdown::render(&inserted(diagram_sample("mermaid")));
        assert!(html.contains("<div class=\"mermaid\">graph TD\n    A[Start] --&gt; B{Decision}"));
        assert!(inserted(math_sample()).contains("$$\nE = mc^2\n$$"));
    }

    #[test]
    fn test_into_message() {
        assert_eq!(bullet_item().into_message(), Message::InsertAtCursor("- ".into()));
        assert_eq!(
            bold().into_message(),
            Message::WrapSelection {
                prefix: "**".into(),
                suffix: "**".into()
            }
        );
    }
}
