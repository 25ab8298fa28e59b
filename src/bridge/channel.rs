//! Outbound half of the host -> surface channel

use crate::error::{BridgeError, BridgeResult};
use tokio::sync::mpsc::UnboundedSender;

/// Something that can carry wire strings to the embedded surface
pub trait Outbound {
    fn send(&self, wire: String) -> BridgeResult<()>;
}

impl Outbound for UnboundedSender<String> {
    fn send(&self, wire: String) -> BridgeResult<()> {
        UnboundedSender::send(self, wire).map_err(|_| BridgeError::ChannelClosed)
    }
}
