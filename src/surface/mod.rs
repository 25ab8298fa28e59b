//! The embedded surface: editing buffer plus preview
//!
//! [`SurfaceClient`] is the surface end of the channel. It owns the text the
//! user is typing into and the mounted preview HTML, and shares nothing with
//! the host but wire strings.
//!
//! - Local edits are coalesced and reported with a debounced `textChanged`
//! - Host commands (`setText`, `insertAtCursor`, `wrapSelection`,
//!   `requestText`) are applied and answered with an immediate `textChanged`
//! - `renderedHtmlReady` is sanitized, mounted, re-promoted and handed to
//!   every registered [`PresentationPass`]

pub mod buffer;
pub mod debounce;
pub mod sanitize;

pub use buffer::TextBuffer;
pub use debounce::Debouncer;
pub use sanitize::{AllowListSanitizer, Sanitizer};

use crate::config::Config;
use crate::markdown::DiagramPromoter;
use crate::message::Message;
use std::ops::Range;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Post-mount processing of the preview (highlighting, diagrams, math)
pub trait PresentationPass: Send {
    fn name(&self) -> &str;
    fn apply(&mut self, presentation: &mut String);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceState {
    /// Nothing received or typed yet
    #[default]
    Idle,
    Editing,
}

/// A user action inside the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    Type(String),
    Backspace,
    Select(Range<usize>),
    SetCaret(usize),
}

pub struct SurfaceClient {
    buffer: TextBuffer,
    caret: usize,
    /// Other end of the selection; equal to `caret` when nothing is selected
    anchor: usize,
    presentation: String,
    state: SurfaceState,
    debouncer: Debouncer,
    promoter: DiagramPromoter,
    sanitizer: Box<dyn Sanitizer>,
    passes: Vec<Box<dyn PresentationPass>>,
}

impl SurfaceClient {
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: TextBuffer::new(),
            caret: 0,
            anchor: 0,
            presentation: String::new(),
            state: SurfaceState::Idle,
            debouncer: Debouncer::new(config.bridge.debounce_ms),
            promoter: DiagramPromoter::new(
                &config.render.diagram_keyword,
                &config.render.diagram_class,
            ),
            sanitizer: Box::new(AllowListSanitizer::new()),
            passes: Vec::new(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Box<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn add_pass(&mut self, pass: Box<dyn PresentationPass>) {
        log::debug!("Registered presentation pass '{}'", pass.name());
        self.passes.push(pass);
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Selected char range, ordered
    pub fn selection(&self) -> Range<usize> {
        self.caret.min(self.anchor)..self.caret.max(self.anchor)
    }

    /// Currently mounted preview
    pub fn presentation(&self) -> &str {
        &self.presentation
    }

    /// When the pending notification is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    fn place_caret(&mut self, pos: usize) {
        self.caret = pos.min(self.buffer.len_chars());
        self.anchor = self.caret;
    }

    // === Local edits ===

    pub fn apply_edit(&mut self, edit: LocalEdit, now: Instant) {
        match edit {
            LocalEdit::Type(text) => self.type_text(&text, now),
            LocalEdit::Backspace => self.backspace(now),
            LocalEdit::Select(range) => self.select(range, now),
            LocalEdit::SetCaret(pos) => self.set_caret(pos, now),
        }
    }

    /// Type over the selection
    pub fn type_text(&mut self, text: &str, now: Instant) {
        let selection = self.selection();
        let end = self.buffer.replace(selection, text);
        self.place_caret(end);
        self.touched(now);
    }

    /// Delete the selection, or the char before the caret
    pub fn backspace(&mut self, now: Instant) {
        let selection = self.selection();
        if !selection.is_empty() {
            self.buffer.delete(selection.clone());
            self.place_caret(selection.start);
        } else if self.caret > 0 {
            self.buffer.delete(self.caret - 1..self.caret);
            self.place_caret(self.caret - 1);
        }
        self.touched(now);
    }

    pub fn select(&mut self, range: Range<usize>, now: Instant) {
        let len = self.buffer.len_chars();
        self.anchor = range.start.min(len);
        self.caret = range.end.min(len);
        self.touched(now);
    }

    pub fn set_caret(&mut self, pos: usize, now: Instant) {
        self.place_caret(pos);
        self.touched(now);
    }

    fn touched(&mut self, now: Instant) {
        self.state = SurfaceState::Editing;
        self.debouncer.schedule(now);
    }

    /// Emit the debounced `textChanged` once its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        self.debouncer.fire(now).then(|| self.text_changed())
    }

    /// Emit any pending notification immediately
    pub fn flush(&mut self) -> Option<String> {
        if !self.debouncer.is_pending() {
            return None;
        }
        self.debouncer.cancel();
        Some(self.text_changed())
    }

    fn text_changed(&self) -> String {
        Message::TextChanged(self.buffer.text()).to_wire()
    }

    // === Host messages ===

    /// Apply one raw host message; returns the reply, if any
    pub fn handle_message(&mut self, raw: &str) -> Option<String> {
        let message = match Message::from_wire(raw) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("Surface discarding envelope: {}", e);
                return None;
            }
        };

        match message {
            Message::SetText(text) => {
                self.buffer.set_content(&text);
                self.place_caret(self.buffer.len_chars());
                self.state = SurfaceState::Editing;
                Some(self.reply_now())
            }
            Message::InsertAtCursor(text) => {
                let selection = self.selection();
                let end = self.buffer.replace(selection, &text);
                self.place_caret(end);
                self.state = SurfaceState::Editing;
                Some(self.reply_now())
            }
            Message::WrapSelection { prefix, suffix } => {
                let selection = self.selection();
                let end = self.buffer.wrap(selection, &prefix, &suffix);
                self.place_caret(end);
                self.state = SurfaceState::Editing;
                Some(self.reply_now())
            }
            Message::RequestText => Some(self.reply_now()),
            Message::RenderedHtmlReady(html) => {
                self.mount(&html);
                None
            }
            Message::TextChanged(_) => {
                log::debug!("Surface discarding host-bound textChanged");
                None
            }
        }
    }

    /// Immediate notification supersedes a pending debounced one
    fn reply_now(&mut self) -> String {
        self.debouncer.cancel();
        self.text_changed()
    }

    fn mount(&mut self, html: &str) {
        let sanitized = self.sanitizer.sanitize(html);
        self.presentation = self.promoter.promote(&sanitized).into_owned();
        for pass in &mut self.passes {
            pass.apply(&mut self.presentation);
        }
    }
}

/// Drive a surface client until the host side hangs up
///
/// Host messages arrive on `inbound`, user actions on `edits`; everything
/// the surface says goes out on `outbound`. Returns the client so callers
/// can inspect its final state.
pub async fn run_surface(
    mut client: SurfaceClient,
    mut inbound: UnboundedReceiver<String>,
    mut edits: UnboundedReceiver<LocalEdit>,
    outbound: UnboundedSender<String>,
) -> SurfaceClient {
    let mut edits_open = true;

    loop {
        let deadline = client.next_deadline();
        let sleep_target = tokio::time::Instant::from_std(deadline.unwrap_or_else(Instant::now));

        let reply = tokio::select! {
            raw = inbound.recv() => match raw {
                Some(raw) => client.handle_message(&raw),
                None => break,
            },
            edit = edits.recv(), if edits_open => {
                match edit {
                    Some(edit) => client.apply_edit(edit, Instant::now()),
                    None => edits_open = false,
                }
                None
            }
            _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                client.poll(Instant::now())
            }
        };

        if let Some(wire) = reply {
            if outbound.send(wire).is_err() {
                log::debug!("Host end closed, stopping surface");
                return client;
            }
        }
    }

    if let Some(wire) = client.flush() {
        let _ = outbound.send(wire);
    }
    client
}
