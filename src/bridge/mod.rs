//! Host side of the host <-> surface synchronization
//!
//! [`SyncBridge`] owns the canonical Markdown for one open document. The
//! embedded surface reports edits with `textChanged`; the bridge takes the
//! reported text as authoritative (last write wins, no merging), renders it
//! and sends the HTML back. Toolbar commands go the other way as
//! `insertAtCursor` / `wrapSelection` and come back as ordinary edits.
//!
//! Commands issued before the surface has finished its handshake are
//! dropped. Text set before the handshake is kept and pushed on `on_ready`.

pub mod channel;
pub mod snippets;

pub use channel::Outbound;
pub use snippets::Snippet;

use crate::config::RenderConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::markdown::RenderPipeline;
use crate::message::Message;
use tokio::sync::oneshot;

/// Handshake state of the embedded surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Uninitialized,
    Ready,
    Failed,
}

/// The canonical Markdown and its bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupDocument {
    pub text: String,
    /// Changed since the last successful persist
    pub dirty: bool,
    /// Bumped on every applied write
    pub revision: u64,
}

impl MarkupDocument {
    /// Apply a write; returns whether the text actually changed
    fn apply(&mut self, text: String) -> bool {
        self.revision += 1;
        if self.text == text {
            return false;
        }
        self.text = text;
        self.dirty = true;
        true
    }
}

/// Host-side endpoint of the channel
pub struct SyncBridge<O: Outbound> {
    outbound: O,
    document: MarkupDocument,
    readiness: Readiness,
    pipeline: RenderPipeline,
    diagram_keyword: String,
    last_rendered: String,
    pending_query: Option<oneshot::Sender<String>>,
}

impl<O: Outbound> SyncBridge<O> {
    pub fn new(outbound: O, config: &RenderConfig) -> Self {
        Self {
            outbound,
            document: MarkupDocument::default(),
            readiness: Readiness::Uninitialized,
            pipeline: RenderPipeline::new(config),
            diagram_keyword: config.diagram_keyword.clone(),
            last_rendered: String::new(),
            pending_query: None,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn document(&self) -> &MarkupDocument {
        &self.document
    }

    /// Canonical text, without a round trip to the surface
    pub fn current_text(&self) -> &str {
        &self.document.text
    }

    /// HTML produced by the most recent render
    pub fn last_rendered(&self) -> &str {
        &self.last_rendered
    }

    pub fn mark_persisted(&mut self) {
        self.document.dirty = false;
    }

    /// Handshake completed; push any text set beforehand
    pub fn on_ready(&mut self) -> BridgeResult<()> {
        if self.readiness != Readiness::Uninitialized {
            log::debug!("Ignoring readiness signal in state {:?}", self.readiness);
            return Ok(());
        }
        self.readiness = Readiness::Ready;
        log::info!("Embedded surface ready");

        if !self.document.text.is_empty() {
            let text = self.document.text.clone();
            self.send(Message::SetText(text))?;
        }
        Ok(())
    }

    /// Handshake failed; returns the error to report, once
    pub fn on_init_failed(&mut self, reason: &str) -> Option<BridgeError> {
        if self.readiness != Readiness::Uninitialized {
            return None;
        }
        self.readiness = Readiness::Failed;
        log::error!("Embedded surface failed to initialize: {}", reason);
        Some(BridgeError::InitFailed(reason.to_string()))
    }

    /// Handle one raw inbound message
    ///
    /// Envelopes that do not decode are dropped; only a failure to send the
    /// rendered HTML back is reported.
    pub fn on_inbound_message(&mut self, raw: &str) -> BridgeResult<()> {
        let message = match Message::from_wire(raw) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("Discarding inbound envelope: {}", e);
                return Ok(());
            }
        };

        match message {
            Message::TextChanged(text) => {
                if !self.is_ready() {
                    log::debug!("Ignoring textChanged before handshake");
                    return Ok(());
                }
                self.on_text_changed(text)
            }
            other => {
                log::debug!("Discarding surface-bound {} received from surface", other.kind());
                Ok(())
            }
        }
    }

    fn on_text_changed(&mut self, text: String) -> BridgeResult<()> {
        if let Some(reply) = self.pending_query.take() {
            let _ = reply.send(text.clone());
        }
        self.document.apply(text);
        self.render_current()
    }

    /// Render the canonical text and push it to the preview
    pub fn render_current(&mut self) -> BridgeResult<()> {
        self.last_rendered = self.pipeline.render(&self.document.text);
        if self.is_ready() {
            self.send(Message::RenderedHtmlReady(self.last_rendered.clone()))?;
        }
        Ok(())
    }

    /// Overwrite the canonical text; pushed now if ready, on `on_ready` otherwise
    pub fn set_text(&mut self, text: impl Into<String>) -> BridgeResult<()> {
        let text = text.into();
        self.document.apply(text.clone());
        if self.is_ready() {
            self.send(Message::SetText(text))?;
        }
        Ok(())
    }

    /// Ask the surface for its buffer; resolved by the next `textChanged`
    pub fn request_text(&mut self) -> BridgeResult<oneshot::Receiver<String>> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }
        let (tx, rx) = oneshot::channel();
        self.send(Message::RequestText)?;
        self.pending_query = Some(tx);
        Ok(rx)
    }

    // === Commands ===

    /// Surround the selection with `prefix` and `suffix`
    pub fn insert_around_selection(&mut self, prefix: &str, suffix: &str) -> BridgeResult<()> {
        self.command(Snippet::Wrap {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Insert `text` at the caret
    pub fn insert_snippet(&mut self, text: &str) -> BridgeResult<()> {
        self.command(Snippet::Insert(text.to_string()))
    }

    pub fn insert_heading(&mut self, level: u8) -> BridgeResult<()> {
        self.command(snippets::heading(level))
    }

    pub fn insert_bold(&mut self) -> BridgeResult<()> {
        self.command(snippets::bold())
    }

    pub fn insert_italic(&mut self) -> BridgeResult<()> {
        self.command(snippets::italic())
    }

    pub fn insert_strikethrough(&mut self) -> BridgeResult<()> {
        self.command(snippets::strikethrough())
    }

    pub fn insert_inline_code(&mut self) -> BridgeResult<()> {
        self.command(snippets::inline_code())
    }

    pub fn insert_blockquote(&mut self) -> BridgeResult<()> {
        self.command(snippets::blockquote())
    }

    pub fn insert_horizontal_rule(&mut self) -> BridgeResult<()> {
        self.command(snippets::horizontal_rule())
    }

    pub fn insert_bullet_item(&mut self) -> BridgeResult<()> {
        self.command(snippets::bullet_item())
    }

    pub fn insert_numbered_item(&mut self) -> BridgeResult<()> {
        self.command(snippets::numbered_item())
    }

    pub fn insert_checkbox(&mut self, checked: bool) -> BridgeResult<()> {
        self.command(snippets::checkbox(checked))
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> BridgeResult<()> {
        self.command(snippets::table(rows, cols))
    }

    pub fn insert_link(&mut self, text: &str, url: &str) -> BridgeResult<()> {
        self.command(snippets::link(text, url))
    }

    pub fn insert_image(&mut self, alt: &str, path: &str) -> BridgeResult<()> {
        self.command(snippets::image(alt, path))
    }

    pub fn insert_code_block(&mut self, language: &str) -> BridgeResult<()> {
        self.command(snippets::code_block(language))
    }

    pub fn insert_diagram_sample(&mut self) -> BridgeResult<()> {
        let snippet = snippets::diagram_sample(&self.diagram_keyword);
        self.command(snippet)
    }

    pub fn insert_math_sample(&mut self) -> BridgeResult<()> {
        self.command(snippets::math_sample())
    }

    fn command(&mut self, snippet: Snippet) -> BridgeResult<()> {
        if !self.is_ready() {
            log::debug!("Dropping command before handshake: {:?}", snippet);
            return Ok(());
        }
        self.send(snippet.into_message())
    }

    fn send(&self, message: Message) -> BridgeResult<()> {
        log::trace!("-> {}", message.kind());
        self.outbound.send(message.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    fn bridge() -> (SyncBridge<UnboundedSender<String>>, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (SyncBridge::new(tx, &RenderConfig::default()), rx)
    }

    fn next(rx: &mut UnboundedReceiver<String>) -> Message {
        Message::from_wire(&rx.try_recv().expect("expected an outbound message")).unwrap()
    }

    fn changed(text: &str) -> String {
        Message::TextChanged(text.into()).to_wire()
    }

    #[test]
    fn test_commands_dropped_before_ready() {
        let (mut bridge, mut rx) = bridge();
        assert!(bridge.insert_table(3, 3).is_ok());
        assert!(bridge.insert_bold().is_ok());
        assert!(rx.try_recv().is_err());

        bridge.on_ready().unwrap();
        bridge.insert_bold().unwrap();
        assert_eq!(
            next(&mut rx),
            Message::WrapSelection {
                prefix: "**".into(),
                suffix: "**".into()
            }
        );
    }

    #[test]
    fn test_text_set_before_ready_is_pushed_on_ready() {
        let (mut bridge, mut rx) = bridge();
        bridge.set_text("# Loaded").unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(bridge.current_text(), "# Loaded");

        bridge.on_ready().unwrap();
        assert_eq!(next(&mut rx), Message::SetText("# Loaded".into()));
    }

    #[test]
    fn test_ready_without_text_sends_nothing() {
        let (mut bridge, mut rx) = bridge();
        bridge.on_ready().unwrap();
        bridge.on_ready().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_text_changed_renders() {
        let (mut bridge, mut rx) = bridge();
        bridge.on_ready().unwrap();

        bridge.on_inbound_message(&changed("# Hi\n")).unwrap();
        assert_eq!(bridge.current_text(), "# Hi\n");
        assert!(bridge.document().dirty);
        match next(&mut rx) {
            Message::RenderedHtmlReady(html) => assert!(html.contains("<h1>Hi</h1>")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_text_changed_ignored_before_ready() {
        let (mut bridge, mut rx) = bridge();
        bridge.on_inbound_message(&changed("early")).unwrap();
        assert_eq!(bridge.current_text(), "");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_liberal_receiver() {
        let (mut bridge, mut rx) = bridge();
        bridge.on_ready().unwrap();
        bridge.on_inbound_message(&changed("kept")).unwrap();
        let _ = next(&mut rx);

        for raw in [
            "",
            "garbage",
            "selectAll|aGk=",
            "textChanged|%%%not-base64%%%",
            "textChanged|//4=",
            "wrapSelection|bm90IGpzb24=",
            "renderedHtmlReady|PGgxPg==",
        ] {
            assert!(bridge.on_inbound_message(raw).is_ok());
        }
        assert_eq!(bridge.current_text(), "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_last_write_wins() {
        let (mut bridge, _rx) = bridge();
        bridge.on_ready().unwrap();

        bridge.set_text("from host").unwrap();
        let after_set = bridge.document().revision;
        bridge.on_inbound_message(&changed("from surface")).unwrap();
        assert_eq!(bridge.current_text(), "from surface");
        assert!(bridge.document().revision > after_set);

        bridge.set_text("host again").unwrap();
        assert_eq!(bridge.current_text(), "host again");
    }

    #[test]
    fn test_dirty_tracking() {
        let (mut bridge, _rx) = bridge();
        bridge.on_ready().unwrap();
        bridge.on_inbound_message(&changed("a")).unwrap();
        assert!(bridge.document().dirty);

        bridge.mark_persisted();
        bridge.on_inbound_message(&changed("a")).unwrap();
        assert!(!bridge.document().dirty);

        bridge.on_inbound_message(&changed("ab")).unwrap();
        assert!(bridge.document().dirty);
    }

    #[test]
    fn test_request_text_resolves_on_text_changed() {
        let (mut bridge, mut rx) = bridge();
        assert!(matches!(bridge.request_text(), Err(BridgeError::NotReady)));

        bridge.on_ready().unwrap();
        let mut reply = bridge.request_text().unwrap();
        assert_eq!(next(&mut rx), Message::RequestText);
        assert!(reply.try_recv().is_err());

        bridge.on_inbound_message(&changed("buffer")).unwrap();
        assert_eq!(reply.try_recv().unwrap(), "buffer");
    }

    #[test]
    fn test_init_failure_reported_once() {
        let (mut bridge, mut rx) = bridge();
        assert!(matches!(
            bridge.on_init_failed("no webview"),
            Some(BridgeError::InitFailed(_))
        ));
        assert!(bridge.on_init_failed("again").is_none());
        assert_eq!(bridge.readiness(), Readiness::Failed);

        bridge.on_ready().unwrap();
        bridge.insert_bullet_item().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_convenience_commands() {
        let (mut bridge, mut rx) = bridge();
        bridge.on_ready().unwrap();

        bridge.insert_heading(9).unwrap();
        assert_eq!(
            next(&mut rx),
            Message::WrapSelection {
                prefix: "###### ".into(),
                suffix: String::new()
            }
        );

        bridge.insert_link("site", "https://example.com").unwrap();
        assert_eq!(
            next(&mut rx),
            Message::InsertAtCursor("[site](https://example.com)".into())
        );

        bridge.insert_diagram_sample().unwrap();
        match next(&mut rx) {
            Message::InsertAtCursor(text) => assert!(text.contains("```mermaid\n")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_table_lands_in_surface_buffer() {
        use crate::config::Config;
        use crate::surface::SurfaceClient;

        let (mut bridge, mut rx) = bridge();
        let mut surface = SurfaceClient::new(&Config::default());
        bridge.set_text("Intro").unwrap();
        bridge.on_ready().unwrap();
        bridge.insert_table(3, 3).unwrap();

        while let Ok(raw) = rx.try_recv() {
            if let Some(reply) = surface.handle_message(&raw) {
                bridge.on_inbound_message(&reply).unwrap();
            }
        }

        let text = surface.text();
        let rows: Vec<&str> = text.lines().skip_while(|l| !l.starts_with('|')).collect();
        assert_eq!(
            rows,
            vec![
                "| Header 1 | Header 2 | Header 3 |",
                "| --- | --- | --- |",
                "|     |     |     |",
                "|     |     |     |",
            ]
        );
        assert!(text.starts_with("Intro\n"));
        assert_eq!(bridge.current_text(), text);
    }

    #[test]
    fn test_send_failure_is_reported() {
        let (mut bridge, rx) = bridge();
        bridge.on_ready().unwrap();
        drop(rx);
        assert!(matches!(bridge.insert_bold(), Err(BridgeError::ChannelClosed)));
    }
}
