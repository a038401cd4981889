//! Download coordinator
//!
//! A streaming link stops working a few hours after it was resolved. Items that
//! would only get their turn after that window are marked as requiring a
//! download and played from local storage instead:
//!
//! - `admit`: length check and deferral marking for a freshly resolved batch
//! - `fetch_first_deferred`: synchronous fetch of the batch's first deferred
//!   item, before playback of the batch starts
//! - `ensure_prefetch`: per-guild periodic task fetching the rest

use chrono::Utc;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use voicebox_common::events::GuildEvent;
use voicebox_common::MediaReference;

use crate::backends::DownloadError;
use crate::playback::PlaybackEngine;
use crate::session::GuildSession;
use crate::state::{GuildEntry, SharedState};

/// How a batch was split on admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Appended to the queue, in order (includes the deferred ones)
    pub accepted: Vec<MediaReference>,
    /// Too long to ever play; never enqueued
    pub rejected: Vec<MediaReference>,
    /// Accepted items that must be downloaded before they play
    pub deferred: Vec<MediaReference>,
}

/// Append `items` to the session queue, applying the lifetime cap
///
/// Items at or over `cap_secs` are rejected outright. The running total starts
/// at the duration already queued; the first item that takes it to `cap_secs`
/// or beyond, and every later item of the batch, is deferred.
pub fn admit(session: &mut GuildSession, items: Vec<MediaReference>, cap_secs: u64) -> Admission {
    let mut admission = Admission::default();
    let mut running_total = session.queued_secs();
    let mut deferring = false;

    for item in items {
        if item.duration_secs >= cap_secs {
            debug!(
                guild_id = %session.guild_id,
                "Rejecting '{}' ({}s)",
                item.title,
                item.duration_secs
            );
            admission.rejected.push(item);
            continue;
        }

        running_total += item.duration_secs;
        if deferring || running_total >= cap_secs {
            deferring = true;
            session.requires_download.insert(item.clone());
            admission.deferred.push(item.clone());
        }

        session.queue.push_back(item.clone());
        admission.accepted.push(item);
    }

    if !admission.deferred.is_empty() {
        info!(
            guild_id = %session.guild_id,
            deferred = admission.deferred.len(),
            "Queue exceeds stream lifetime, deferring items to download"
        );
    }
    admission
}

/// Download the first deferred item of a batch
///
/// Must be called without the session lock held. A failure is logged and left
/// to the prefetch task to retry. If the prefetch task already has the item in
/// hand this returns right away.
pub async fn fetch_first_deferred(
    shared: &Arc<SharedState>,
    entry: &Arc<GuildEntry>,
    deferred: &[MediaReference],
) {
    let Some(first) = deferred.first() else {
        return;
    };
    if !claim_download(entry, first).await {
        debug!(guild_id = %entry.guild_id, "'{}' is already being fetched", first.title);
        return;
    }

    let downloader = Arc::clone(&shared.backends.downloader);
    let items = deferred.to_vec();
    let result = shared.run_blocking(move || downloader.fetch_first(&items)).await;
    release_download(entry, first).await;

    match result {
        Ok(Ok(())) => debug!("Fetched first deferred item '{}'", first.title),
        Ok(Err(DownloadError::NoItems)) => {}
        Ok(Err(e)) => warn!("Failed to fetch '{}': {}", first.title, e),
        Err(e) => warn!("Download worker failed: {}", e),
    }
}

/// Mark `item` as being fetched; false if another worker already is
async fn claim_download(entry: &GuildEntry, item: &MediaReference) -> bool {
    entry
        .session
        .lock()
        .await
        .downloads_in_flight
        .insert(item.id.clone())
}

async fn release_download(entry: &GuildEntry, item: &MediaReference) {
    entry.session.lock().await.downloads_in_flight.remove(&item.id);
}

/// Start the guild's prefetch task unless it is already running or there is
/// nothing to fetch
pub(crate) fn ensure_prefetch(
    shared: &Arc<SharedState>,
    entry: &Arc<GuildEntry>,
    session: &mut GuildSession,
) {
    if let Some(task) = &session.prefetch_task {
        if !task.is_finished() {
            return;
        }
    }
    if session.pending_downloads().is_empty() {
        return;
    }

    debug!(guild_id = %session.guild_id, "Starting prefetch task");
    session.prefetch_task = Some(tokio::spawn(prefetch_loop(
        Arc::clone(shared),
        Arc::clone(entry),
    )));
}

/// Periodically fetch queued deferred items that are not on disk yet
///
/// Exits once nothing deferred is queued and no playback waits on a download.
async fn prefetch_loop(shared: Arc<SharedState>, entry: Arc<GuildEntry>) {
    let guild_id = entry.guild_id;
    let engine = PlaybackEngine::new(Arc::clone(&shared));
    let mut ticker = tokio::time::interval(shared.settings.prefetch_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let pending = {
            let mut session = entry.session.lock().await;
            let pending = session.pending_downloads();
            if pending.is_empty() && !session.awaiting_download {
                // Detach under the lock so ensure_prefetch starts a fresh task
                session.prefetch_task = None;
                debug!(guild_id = %guild_id, "Prefetch task idle, exiting");
                return;
            }
            pending
        };

        for item in pending {
            if !claim_download(&entry, &item).await {
                continue;
            }
            let downloader = Arc::clone(&shared.backends.downloader);
            let media = item.clone();
            let fetched = shared
                .run_blocking(move || {
                    if downloader.exists(&media) {
                        return Ok(false);
                    }
                    downloader.fetch_one(&media).map(|()| true)
                })
                .await;
            release_download(&entry, &item).await;

            match fetched {
                Ok(Ok(true)) => {
                    info!(guild_id = %guild_id, "Downloaded '{}'", item.title);
                    shared.emit(GuildEvent::DownloadCompleted {
                        guild_id,
                        media_id: item.id.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    warn!(guild_id = %guild_id, "Failed to download '{}': {}", item.title, e)
                }
                Err(e) => warn!(guild_id = %guild_id, "Download worker failed: {}", e),
            }
        }

        let mut session = entry.session.lock().await;
        if let Err(e) = engine.resume_after_download(&entry, &mut session).await {
            warn!(guild_id = %guild_id, "Could not resume playback after download: {}", e);
        }
    }
}
