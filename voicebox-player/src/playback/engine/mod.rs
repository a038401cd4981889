//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: track lifecycle, completion handling, advance and retry
//! - `queue.rs`: skip, clear, shuffle, loop, queue view
//! - `control.rs`: pause, resume, stop, voice-disconnect reset

mod control;
mod core;
mod queue;

pub use self::core::{AdvanceOutcome, PlayOutcome, PlaybackEngine};
