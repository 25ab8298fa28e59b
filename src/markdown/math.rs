//! Math span protection
//!
//! pulldown-cmark knows nothing about `$…$` and `$$…$$`, so emphasis and
//! escapes inside them would be rewritten. Spans are swapped for opaque
//! placeholders before the base transform and put back, HTML-escaped,
//! afterwards. Code spans and fenced code blocks are left alone.

use std::borrow::Cow;

const SPAN_OPEN: char = '\u{E000}';
const SPAN_CLOSE: char = '\u{E001}';

/// Math spans lifted out of one document
#[derive(Debug, Default)]
pub struct MathGuard {
    spans: Vec<String>,
}

impl MathGuard {
    /// Replace every math span in `markup` with a placeholder
    pub fn protect(markup: &str) -> (Cow<'_, str>, Self) {
        let mut guard = Self::default();
        if !markup.contains('$') {
            return (Cow::Borrowed(markup), guard);
        }

        let mut out = String::with_capacity(markup.len());
        let mut pending = String::new();
        let mut fence: Option<(char, usize)> = None;

        for line in markup.split_inclusive('\n') {
            match fence {
                Some(open) => {
                    out.push_str(line);
                    if closes_fence(open, line) {
                        fence = None;
                    }
                }
                None => match fence_marker(line) {
                    Some(marker) => {
                        guard.scan(&pending, &mut out);
                        pending.clear();
                        out.push_str(line);
                        fence = Some(marker);
                    }
                    None => pending.push_str(line),
                },
            }
        }
        guard.scan(&pending, &mut out);

        if guard.spans.is_empty() {
            return (Cow::Borrowed(markup), guard);
        }
        (Cow::Owned(out), guard)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Put the spans back into rendered HTML
    pub fn restore<'a>(&self, html: &'a str) -> Cow<'a, str> {
        if self.spans.is_empty() {
            return Cow::Borrowed(html);
        }

        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        while let Some(start) = rest.find(SPAN_OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + SPAN_OPEN.len_utf8()..];
            let span = after.find(SPAN_CLOSE).and_then(|end| {
                let index: usize = after[..end].parse().ok()?;
                Some((self.spans.get(index)?, end))
            });
            match span {
                Some((text, end)) => {
                    out.push_str(&html_escape::encode_double_quoted_attribute(text));
                    rest = &after[end + SPAN_CLOSE.len_utf8()..];
                }
                None => {
                    out.push(SPAN_OPEN);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Cow::Owned(out)
    }

    /// Copy `text` to `out`, lifting math spans outside code spans
    fn scan(&mut self, text: &str, out: &mut String) {
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '\\' => {
                    let end = (pos + 2).min(chars.len());
                    out.extend(&chars[pos..end]);
                    pos = end;
                }
                '`' => {
                    let end = find_code_span_end(&chars, pos);
                    out.extend(&chars[pos..end]);
                    pos = end;
                }
                '$' => match find_math_end(&chars, pos) {
                    Some(end) => {
                        out.push(SPAN_OPEN);
                        out.push_str(&self.spans.len().to_string());
                        out.push(SPAN_CLOSE);
                        self.spans.push(chars[pos..end].iter().collect());
                        pos = end;
                    }
                    None => {
                        out.push('$');
                        pos += 1;
                    }
                },
                c => {
                    out.push(c);
                    pos += 1;
                }
            }
        }
    }
}

/// Opening fence (``` or ~~~) and its length
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let fence_char = trimmed.chars().next()?;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let count = trimmed.chars().take_while(|c| *c == fence_char).count();
    (count >= 3).then_some((fence_char, count))
}

fn closes_fence((fence_char, count): (char, usize), line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= count && trimmed.chars().all(|c| c == fence_char)
}

/// End of the code span opening at `start`, or just past the backtick run
/// when it has no closing run of the same length
fn find_code_span_end(chars: &[char], start: usize) -> usize {
    let run = |from: usize| chars[from..].iter().take_while(|c| **c == '`').count();
    let ticks = run(start);
    let mut pos = start + ticks;

    while pos < chars.len() {
        if chars[pos] == '`' {
            let closing = run(pos);
            if closing == ticks {
                return pos + closing;
            }
            pos += closing;
        } else {
            pos += 1;
        }
    }
    start + ticks
}

/// End (exclusive) of the math span opening at `start`
///
/// Display math may cross lines but not a blank line. Inline math stays on
/// one line, must not start or end on whitespace, and must not be followed
/// by a digit, so prices like `$5 and $10` stay plain text.
fn find_math_end(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start + 1) == Some(&'$') {
        let mut pos = start + 2;
        while pos + 1 < chars.len() {
            match chars[pos] {
                '$' if chars[pos + 1] == '$' => {
                    let body = &chars[start + 2..pos];
                    return (!body.iter().all(|c| c.is_whitespace())).then_some(pos + 2);
                }
                '\n' if starts_blank_line(chars, pos + 1) => return None,
                _ => pos += 1,
            }
        }
        return None;
    }

    let first = *chars.get(start + 1)?;
    if first.is_whitespace() {
        return None;
    }

    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\n' => return None,
            '\\' => pos += 2,
            '$' => {
                let closes = !chars[pos - 1].is_whitespace()
                    && !chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit());
                if closes {
                    return Some(pos + 1);
                }
                return None;
            }
            _ => pos += 1,
        }
    }
    None
}

fn starts_blank_line(chars: &[char], from: usize) -> bool {
    chars[from..]
        .iter()
        .take_while(|c| **c != '\n')
        .all(|c| c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(markup: &str) -> (String, String) {
        let (protected, guard) = MathGuard::protect(markup);
        let restored = guard.restore(&protected).into_owned();
        (protected.into_owned(), restored)
    }

    #[test]
    fn test_no_dollars_is_borrowed() {
        let (protected, guard) = MathGuard::protect("plain *text*");
        assert!(matches!(protected, Cow::Borrowed(_)));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_inline_span_lifted() {
        let (protected, guard) = MathGuard::protect("Inline $a*b*c$ here");
        assert!(!protected.contains('*'));
        assert_eq!(guard.spans, vec!["$a*b*c$".to_string()]);
    }

    #[test]
    fn test_display_span_crosses_lines() {
        let (_, guard) = MathGuard::protect("$$\n\\int_0^1 x_i dx\n$$\n");
        assert_eq!(guard.spans, vec!["$$\n\\int_0^1 x_i dx\n$$".to_string()]);
    }

    #[test]
    fn test_display_span_stops_at_blank_line() {
        let (_, guard) = MathGuard::protect("$$ open\n\nnever closed $$");
        assert!(guard.is_empty());
    }

    #[test]
    fn test_prices_are_not_math() {
        let (protected, guard) = MathGuard::protect("costs $5 and $10 total");
        assert!(guard.is_empty());
        assert_eq!(protected, "costs $5 and $10 total");
    }

    #[test]
    fn test_escaped_dollar_skipped() {
        let (_, guard) = MathGuard::protect("\\$not math$");
        assert!(guard.is_empty());
    }

    #[test]
    fn test_code_is_left_alone() {
        let (_, guard) = MathGuard::protect("`$a*b$` and\n\n```\n$x*y$\n```\n");
        assert!(guard.is_empty());

        let (_, guard) = MathGuard::protect("``a ` $x$`` then $y$");
        assert_eq!(guard.spans, vec!["$y$".to_string()]);
    }

    #[test]
    fn test_restore_escapes_markup() {
        let (_, restored) = round_trip("$a<b \\& c$");
        assert_eq!(restored, "$a&lt;b \\&amp; c$");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let guard = MathGuard {
            spans: vec!["$x$".into()],
        };
        let html = format!("{SPAN_OPEN}7{SPAN_CLOSE} {SPAN_OPEN}0{SPAN_CLOSE}");
        assert_eq!(guard.restore(&html), format!("{SPAN_OPEN}7{SPAN_CLOSE} $x$"));
    }
}
