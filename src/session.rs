//! One open document: bridge, persistence and file I/O wired together
//!
//! A `Session` replaces any process-wide state. It owns the host end of the
//! channel, the host document the Markdown is persisted into and the path of
//! the Markdown file on disk, if there is one.

use crate::bridge::SyncBridge;
use crate::config::Config;
use crate::error::{AppResult, BridgeResult};
use crate::file_handler::{read_file, write_file_atomic};
use crate::persistence::{HostDocument, PersistenceStore};
use crate::surface::{run_surface, LocalEdit, SurfaceClient};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The preview could not start; shown once
    InitFailed(String),
    /// The file changed on disk and was reloaded
    ReloadedExternally(PathBuf),
    /// The file changed on disk while there were unsaved edits
    ExternalConflict(PathBuf),
}

/// Host-side handles to a surface running on its own task
pub struct SurfaceHandle {
    pub edits: UnboundedSender<LocalEdit>,
    pub task: JoinHandle<SurfaceClient>,
}

pub struct Session {
    id: SessionId,
    config: Config,
    bridge: SyncBridge<UnboundedSender<String>>,
    inbound: UnboundedReceiver<String>,
    store: PersistenceStore,
    document: Box<dyn HostDocument + Send>,
    path: Option<PathBuf>,
    notices: VecDeque<Notice>,
}

impl Session {
    /// Create a session over an existing pair of channel ends
    pub fn new(
        config: Config,
        document: Box<dyn HostDocument + Send>,
        outbound: UnboundedSender<String>,
        inbound: UnboundedReceiver<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        log::debug!("Created session {}", id);
        Self {
            id,
            bridge: SyncBridge::new(outbound, &config.render),
            inbound,
            store: PersistenceStore::new(&config.persistence),
            document,
            path: None,
            notices: VecDeque::new(),
            config,
        }
    }

    /// Spawn an in-process surface and complete the handshake
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        config: Config,
        document: Box<dyn HostDocument + Send>,
    ) -> BridgeResult<(Self, SurfaceHandle)> {
        let (to_surface, surface_inbound) = unbounded_channel();
        let (surface_outbound, from_surface) = unbounded_channel();
        let (edits, edit_rx) = unbounded_channel();

        let client = SurfaceClient::new(&config);
        let task = tokio::spawn(run_surface(client, surface_inbound, edit_rx, surface_outbound));

        let mut session = Self::new(config, document, to_surface, from_surface);
        session.on_surface_ready()?;
        Ok((session, SurfaceHandle { edits, task }))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bridge(&self) -> &SyncBridge<UnboundedSender<String>> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut SyncBridge<UnboundedSender<String>> {
        &mut self.bridge
    }

    pub fn document(&self) -> &dyn HostDocument {
        self.document.as_ref()
    }

    /// Markdown file backing this session, once opened or saved
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    // === Surface lifecycle ===

    pub fn on_surface_ready(&mut self) -> BridgeResult<()> {
        self.bridge.on_ready()
    }

    pub fn on_surface_failed(&mut self, reason: &str) {
        if let Some(err) = self.bridge.on_init_failed(reason) {
            self.notices.push_back(Notice::InitFailed(err.user_message()));
        }
    }

    /// Handle every inbound message already queued; returns how many
    pub fn pump(&mut self) -> BridgeResult<usize> {
        let mut handled = 0;
        while let Ok(raw) = self.inbound.try_recv() {
            self.bridge.on_inbound_message(&raw)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait for and handle one inbound message; `false` once the surface is gone
    pub async fn next_message(&mut self) -> BridgeResult<bool> {
        match self.inbound.recv().await {
            Some(raw) => {
                self.bridge.on_inbound_message(&raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Best current text
    ///
    /// Uses the cached text when there is any. Otherwise asks the surface
    /// and keeps handling inbound messages until it answers or the query
    /// timeout passes, then falls back to the cache.
    pub async fn fetch_text(&mut self) -> String {
        if !self.bridge.current_text().is_empty() || !self.bridge.is_ready() {
            return self.bridge.current_text().to_string();
        }

        let mut reply = match self.bridge.request_text() {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Text query not sent: {}", e);
                return self.bridge.current_text().to_string();
            }
        };

        let timeout_ms = self.config.bridge.query_timeout_ms;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match tokio::time::timeout_at(deadline, self.inbound.recv()).await {
                Ok(Some(raw)) => {
                    if let Err(e) = self.bridge.on_inbound_message(&raw) {
                        log::warn!("Error while waiting for text: {}", e);
                    }
                    if let Ok(text) = reply.try_recv() {
                        return text;
                    }
                }
                Ok(None) => {
                    log::debug!("Surface closed during text query");
                    break;
                }
                Err(_) => {
                    log::warn!("Surface did not answer within {} ms, using cached text", timeout_ms);
                    break;
                }
            }
        }
        self.bridge.current_text().to_string()
    }

    // === Persistence ===

    /// Pull stored Markdown out of the host document; `false` if there was none
    pub fn load_from_document(&mut self) -> BridgeResult<bool> {
        match self.store.load(self.document.as_ref()) {
            Some(text) => {
                self.bridge.set_text(text)?;
                self.bridge.mark_persisted();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the canonical text into the host document
    pub fn persist(&mut self) -> AppResult<()> {
        self.store
            .save(self.document.as_mut(), self.bridge.current_text())?;
        self.bridge.mark_persisted();
        log::debug!("Session {} persisted", self.id);
        Ok(())
    }

    /// Render the canonical text into the host document's native view
    pub fn refresh_body(&mut self) -> AppResult<()> {
        self.bridge.render_current()?;
        self.document.set_body(self.bridge.last_rendered())?;
        Ok(())
    }

    // === Files ===

    /// Load a Markdown file and persist it into the host document
    pub async fn open_file(&mut self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let result = read_file(path, self.config.files.max_file_size).await?;
        log::info!("Opened {} ({} bytes)", path.display(), result.size_bytes);

        self.bridge.set_text(result.content)?;
        self.persist()?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Write the canonical text to disk and persist it
    pub async fn save_file(&mut self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        write_file_atomic(path, self.bridge.current_text()).await?;
        self.persist()?;
        self.path = Some(path.to_path_buf());
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// React to the backing file changing on disk
    ///
    /// Identical content is ignored. Without unsaved edits the new content
    /// replaces the text; with them a conflict notice is raised and the
    /// text is left alone.
    pub fn on_external_change(&mut self, content: &str) -> AppResult<()> {
        let path = self.path.clone().unwrap_or_default();
        if content == self.bridge.current_text() {
            log::debug!("External change to {} matches current text", path.display());
            return Ok(());
        }

        if self.bridge.document().dirty {
            log::warn!("{} changed on disk while it has unsaved edits", path.display());
            self.notices.push_back(Notice::ExternalConflict(path));
            return Ok(());
        }

        self.bridge.set_text(content)?;
        self.persist()?;
        log::info!("Reloaded {} after external change", path.display());
        self.notices.push_back(Notice::ReloadedExternally(path));
        Ok(())
    }

    /// Re-read the backing file and apply the external-change policy
    pub async fn reload_from_disk(&mut self) -> AppResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let result = read_file(&path, self.config.files.max_file_size).await?;
        self.on_external_change(&result.content)
    }
}
