//! Test helper modules for voicebox-player integration tests
//!
//! - `fakes`: in-memory resolver, downloader, audio engine and selection prompt
//! - `harness`: an `Orchestrator` wired to the fakes with fast timings
//! - `log_capture`: tracing capture for asserting on log output

#![allow(dead_code)]

pub mod fakes;
pub mod harness;
pub mod log_capture;

pub use fakes::{
    link, media, FakeAudioEngine, FakeDownloader, FakePrompt, FakeResolver, PromptReply,
};
pub use harness::{
    admin, drain_events, requester, wait_for_event, wait_until, TestContext, GUILD,
};
pub use log_capture::capture_logs;
