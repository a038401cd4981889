use thiserror::Error;
use voicebox_common::MediaReference;

/// Resolver failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing matched the link or query
    #[error("no match")]
    NoMatch,

    /// Extraction failed (network, unsupported site, ...)
    #[error("{0}")]
    Failed(String),
}

/// Turns links and queries into playable media references
///
/// Implementations are expected to block (metadata extraction is slow); the
/// orchestrator always calls them through `tokio::task::spawn_blocking`.
pub trait Resolver: Send + Sync + 'static {
    /// Resolve a direct link. Playlists yield one reference per entry.
    fn resolve_by_url(&self, url: &str) -> Result<Vec<MediaReference>, ResolveError>;

    /// Search for up to `limit` candidates, best first
    fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaReference>, ResolveError>;
}
