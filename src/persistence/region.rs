//! Persisted region layout
//!
//! ```xml
//! <markdown xmlns="urn:markdown-bridge:source" version="1" savedAt="...">
//!   <content><![CDATA[...]]></content>
//! </markdown>
//! ```
//!
//! The Markdown is stored as CDATA. `]]>` would end the section early, so it
//! is split across two sections. A carriage return would be folded into a
//! line feed by XML end-of-line handling, so it is written as a character
//! reference between sections instead.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{SecondsFormat, Utc};

/// Root element name
pub const ROOT_ELEMENT: &str = "markdown";

/// Element holding the Markdown text
pub const CONTENT_ELEMENT: &str = "content";

/// Layout version written into the region
pub const REGION_VERSION: &str = "1";

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const CDATA_SPLIT: &str = "]]]]><![CDATA[>";
const CR_BREAK: &str = "]]>&#13;<![CDATA[";

/// Whether XML 1.0 can carry `c` at all
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Wrap `text` in CDATA so it survives the round trip byte for byte
pub fn escape_cdata(text: &str) -> PersistenceResult<String> {
    if let Some(bad) = text.chars().find(|c| !is_xml_char(*c)) {
        return Err(PersistenceError::UnrepresentableChar(bad as u32));
    }

    let body = text.replace(CDATA_CLOSE, CDATA_SPLIT).replace('\r', CR_BREAK);
    let mut out = String::with_capacity(body.len() + CDATA_OPEN.len() + CDATA_CLOSE.len());
    out.push_str(CDATA_OPEN);
    out.push_str(&body);
    out.push_str(CDATA_CLOSE);
    Ok(out)
}

/// Build a complete region for `namespace` holding `text`
pub fn build_region(namespace: &str, text: &str) -> PersistenceResult<String> {
    let content = escape_cdata(text)?;
    let saved_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    Ok(format!(
        "<{root} xmlns=\"{ns}\" version=\"{version}\" savedAt=\"{saved_at}\"><{content_el}>{content}</{content_el}></{root}>",
        root = ROOT_ELEMENT,
        ns = html_escape::encode_double_quoted_attribute(namespace),
        version = REGION_VERSION,
        saved_at = saved_at,
        content_el = CONTENT_ELEMENT,
        content = content,
    ))
}

/// A parsed region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Namespace of the root element, if any
    pub namespace: Option<String>,
    /// Text of the content element, `None` when the element is missing
    pub content: Option<String>,
}

impl Region {
    /// Parse a fragment; `None` when it is not well-formed XML
    pub fn parse(xml: &str) -> Option<Self> {
        let doc = match roxmltree::Document::parse(xml) {
            Ok(doc) => doc,
            Err(e) => {
                log::debug!("Skipping unparsable metadata fragment: {}", e);
                return None;
            }
        };

        let root = doc.root_element();
        let namespace = root.tag_name().namespace().map(str::to_string);
        let content = root
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == CONTENT_ELEMENT)
            .map(|node| {
                node.descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect::<String>()
            });

        Some(Self { namespace, content })
    }

    /// Namespace comparison is ASCII case-insensitive
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace
            .as_deref()
            .is_some_and(|ns| ns.eq_ignore_ascii_case(namespace))
    }
}
