use async_trait::async_trait;
use voicebox_common::MediaReference;

use crate::requests::Requester;

/// Interactive search result selection, implemented by the chat layer
#[async_trait]
pub trait SelectionPrompt: Send + Sync + 'static {
    /// Show `candidates` to the requester and return the text of their next
    /// message in the requesting channel.
    ///
    /// `None` means no reply can arrive (channel gone). The orchestrator puts
    /// its own timeout around this call.
    async fn choose(&self, requester: &Requester, candidates: &[MediaReference]) -> Option<String>;
}
