//! Playback engine and download coordination

pub mod download;
pub mod engine;
pub mod state;

pub use download::Admission;
pub use engine::{AdvanceOutcome, PlayOutcome, PlaybackEngine};
pub use state::PlaybackState;
