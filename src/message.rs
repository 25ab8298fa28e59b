//! Channel message types
//!
//! Everything crossing the host <-> surface boundary is a single string:
//! the message kind, a one-character delimiter, then the payload encoded as
//! standard base64. Encoding the payload keeps delimiter-looking content and
//! control characters in user text from ever reaching the transport raw.

use crate::error::ProtocolError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates the kind from the payload on the wire
pub const DELIMITER: char = '|';

/// Fixed vocabulary of message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Surface -> host: the editable buffer changed
    TextChanged,
    /// Host -> surface: replace the buffer wholesale
    SetText,
    /// Host -> surface: splice text at the caret
    InsertAtCursor,
    /// Host -> surface: surround the selection
    WrapSelection,
    /// Host -> surface: fresh preview HTML
    RenderedHtmlReady,
    /// Host -> surface: report the buffer back as `textChanged`
    RequestText,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::TextChanged,
        MessageKind::SetText,
        MessageKind::InsertAtCursor,
        MessageKind::WrapSelection,
        MessageKind::RenderedHtmlReady,
        MessageKind::RequestText,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::TextChanged => "textChanged",
            MessageKind::SetText => "setText",
            MessageKind::InsertAtCursor => "insertAtCursor",
            MessageKind::WrapSelection => "wrapSelection",
            MessageKind::RenderedHtmlReady => "renderedHtmlReady",
            MessageKind::RequestText => "requestText",
        }
    }

    /// Look up a kind by its wire name
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw envelope: a kind and opaque payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl ChannelMessage {
    pub fn new(kind: MessageKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Serialize to the single-string wire form
    pub fn encode(&self) -> String {
        let encoded = STANDARD.encode(&self.payload);
        let mut wire = String::with_capacity(self.kind.as_str().len() + 1 + encoded.len());
        wire.push_str(self.kind.as_str());
        wire.push(DELIMITER);
        wire.push_str(&encoded);
        wire
    }

    /// Parse the wire form, splitting at the first delimiter only
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let (kind, payload) = raw
            .split_once(DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter)?;
        let kind = MessageKind::from_wire(kind)
            .ok_or_else(|| ProtocolError::UnknownKind(kind.to_string()))?;
        let payload = STANDARD
            .decode(payload)
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
        Ok(Self { kind, payload })
    }

    /// Payload interpreted as UTF-8 text
    pub fn payload_text(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.payload).map_err(|_| ProtocolError::InvalidText)
    }
}

/// Prefix/suffix pair carried by `wrapSelection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapPayload {
    pub prefix: String,
    pub suffix: String,
}

/// Typed view of a channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    TextChanged(String),
    SetText(String),
    InsertAtCursor(String),
    WrapSelection { prefix: String, suffix: String },
    RenderedHtmlReady(String),
    RequestText,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::TextChanged(_) => MessageKind::TextChanged,
            Message::SetText(_) => MessageKind::SetText,
            Message::InsertAtCursor(_) => MessageKind::InsertAtCursor,
            Message::WrapSelection { .. } => MessageKind::WrapSelection,
            Message::RenderedHtmlReady(_) => MessageKind::RenderedHtmlReady,
            Message::RequestText => MessageKind::RequestText,
        }
    }

    /// Build the raw envelope for this message
    pub fn to_channel(&self) -> ChannelMessage {
        let payload = match self {
            Message::TextChanged(text)
            | Message::SetText(text)
            | Message::InsertAtCursor(text)
            | Message::RenderedHtmlReady(text) => text.as_bytes().to_vec(),
            Message::WrapSelection { prefix, suffix } => {
                let wrap = WrapPayload {
                    prefix: prefix.clone(),
                    suffix: suffix.clone(),
                };
                // Serializing two plain strings cannot fail
                serde_json::to_vec(&wrap).unwrap_or_default()
            }
            Message::RequestText => Vec::new(),
        };
        ChannelMessage::new(self.kind(), payload)
    }

    /// Encode straight to the wire form
    pub fn to_wire(&self) -> String {
        self.to_channel().encode()
    }

    /// Decode straight from the wire form
    pub fn from_wire(raw: &str) -> Result<Self, ProtocolError> {
        Self::try_from(ChannelMessage::decode(raw)?)
    }
}

impl TryFrom<ChannelMessage> for Message {
    type Error = ProtocolError;

    fn try_from(msg: ChannelMessage) -> Result<Self, Self::Error> {
        let message = match msg.kind {
            MessageKind::TextChanged => Message::TextChanged(msg.payload_text()?.to_string()),
            MessageKind::SetText => Message::SetText(msg.payload_text()?.to_string()),
            MessageKind::InsertAtCursor => Message::InsertAtCursor(msg.payload_text()?.to_string()),
            MessageKind::RenderedHtmlReady => {
                Message::RenderedHtmlReady(msg.payload_text()?.to_string())
            }
            MessageKind::WrapSelection => {
                let wrap: WrapPayload = serde_json::from_slice(&msg.payload)
                    .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?;
                Message::WrapSelection {
                    prefix: wrap.prefix,
                    suffix: wrap.suffix,
                }
            }
            MessageKind::RequestText => Message::RequestText,
        };
        Ok(message)
    }
}
