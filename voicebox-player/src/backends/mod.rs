//! Collaborator interfaces
//!
//! The orchestrator never searches, downloads or decodes anything itself. These
//! traits are the seams the embedding bot plugs its implementations into:
//! - `resolver.rs`: link and query resolution (blocking, run on the worker pool)
//! - `downloader.rs`: local copies of deferred items (blocking, run on the worker pool)
//! - `audio.rs`: the per-guild voice/audio engine (async)
//! - `selection.rs`: interactive search result selection (async)

mod audio;
mod downloader;
mod resolver;
mod selection;

pub use audio::{AudioEngine, AudioError, PlayerHandle, TrackCompletion, TrackOutcome};
pub use downloader::{DownloadError, Downloader};
pub use resolver::{ResolveError, Resolver};
pub use selection::SelectionPrompt;
