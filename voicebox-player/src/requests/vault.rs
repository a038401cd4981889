//! Vault
//!
//! Single-slot mailbox per guild that carries a resolution from the guild's
//! resolver task to the caller that submitted the job.
//!
//! Write-once-then-cleared: the resolver deposits, the sole waiter takes. Waiters
//! are woken through a `Notify` rather than polling. Deposits are tagged with
//! the job id so a waiter never consumes a result meant for another request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;
use voicebox_common::{GuildId, MediaReference};

use crate::error::ResolutionFailure;

/// Outcome of resolving one job
pub type Resolution = std::result::Result<Vec<MediaReference>, ResolutionFailure>;

#[derive(Debug)]
struct Deposit {
    job_id: Uuid,
    resolution: Resolution,
}

/// Resolver-to-caller handoff, keyed by guild
#[derive(Debug, Default)]
pub struct Vault {
    slots: Mutex<HashMap<GuildId, Deposit>>,
    signals: Mutex<HashMap<GuildId, Arc<Notify>>>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    fn signal(&self, guild_id: GuildId) -> Arc<Notify> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(signals.entry(guild_id).or_default())
    }

    /// Store the resolution of `job_id` and wake the guild's waiter
    pub fn deposit(&self, guild_id: GuildId, job_id: Uuid, resolution: Resolution) {
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(stale) = slots.insert(guild_id, Deposit { job_id, resolution }) {
                warn!(
                    guild_id = %guild_id,
                    "Overwrote unclaimed resolution for job {}",
                    stale.job_id
                );
            }
        }
        self.signal(guild_id).notify_waiters();
    }

    /// Take whatever is in the guild's slot, leaving it empty
    pub fn take(&self, guild_id: GuildId) -> Option<(Uuid, Resolution)> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .remove(&guild_id)
            .map(|deposit| (deposit.job_id, deposit.resolution))
    }

    /// Take the slot only if it holds the resolution of `job_id`
    fn take_for(&self, guild_id: GuildId, job_id: Uuid) -> Option<Resolution> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&guild_id) {
            Some(deposit) if deposit.job_id == job_id => {
                slots.remove(&guild_id).map(|deposit| deposit.resolution)
            }
            _ => None,
        }
    }

    /// Wait until the resolution of `job_id` is deposited, then take it
    pub async fn wait_for(&self, guild_id: GuildId, job_id: Uuid) -> Resolution {
        let signal = self.signal(guild_id);
        loop {
            let notified = signal.notified();
            tokio::pin!(notified);
            // Register before checking so a deposit in between is not missed
            notified.as_mut().enable();

            if let Some(resolution) = self.take_for(guild_id, job_id) {
                return resolution;
            }
            notified.await;
        }
    }

    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        !slots.contains_key(&guild_id)
    }
}
