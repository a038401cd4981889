//! Resolver task
//!
//! One task per guild while that guild has resolution work. It drains the
//! guild's `RequestQueue` one job at a time, runs the blocking resolver on the
//! worker pool and deposits each outcome in the vault. When the queue is
//! drained it clears `processing` and exits; the next submission restarts it.

use std::sync::Arc;
use tracing::{debug, info, warn};
use voicebox_common::{GuildId, MediaReference};

use super::job::{Job, JobKind};
use super::vault::Resolution;
use crate::backends::ResolveError;
use crate::error::ResolutionFailure;
use crate::state::{GuildEntry, SharedState};

/// Queue `job` and make sure the guild's resolver task is running
pub(crate) async fn submit(shared: &Arc<SharedState>, entry: &Arc<GuildEntry>, job: Job) {
    let mut session = entry.session.lock().await;
    let job_id = job.id;
    let scheduled = session.requests.submit(job);
    debug!(guild_id = %entry.guild_id, job_id = %job_id, ?scheduled, "Job submitted");

    if !session.processing {
        session.processing = true;
        tokio::spawn(run_loop(Arc::clone(shared), Arc::clone(entry)));
    }
}

async fn run_loop(shared: Arc<SharedState>, entry: Arc<GuildEntry>) {
    let guild_id = entry.guild_id;
    debug!(guild_id = %guild_id, "Resolver task started");

    loop {
        // Pick the next job and mark the task stopped under the same lock, so a
        // concurrent submit either sees processing=true or restarts the task
        let job = {
            let mut session = entry.session.lock().await;
            match session.requests.next_to_run() {
                Some(job) => job,
                None => {
                    session.processing = false;
                    break;
                }
            }
        };

        let resolution = resolve(&shared, guild_id, &job).await;
        match &resolution {
            Ok(items) => info!(
                guild_id = %guild_id,
                job_id = %job.id,
                "Resolved '{}' to {} item(s)",
                job.payload,
                items.len()
            ),
            Err(failure) => warn!(
                guild_id = %guild_id,
                job_id = %job.id,
                "Resolution of '{}' aborted: {}",
                job.payload,
                failure
            ),
        }

        shared.vault.deposit(guild_id, job.id, resolution);
        let waiting = {
            let mut session = entry.session.lock().await;
            session.requests.complete_in_flight();
            session.requests.backlog_len()
        };
        debug!(guild_id = %guild_id, job_id = %job.id, waiting, "Job done");
    }

    debug!(guild_id = %guild_id, "Resolver task drained");
}

/// Resolve one job; never panics, every failure becomes a `ResolutionFailure`
pub(crate) async fn resolve(shared: &Arc<SharedState>, guild_id: GuildId, job: &Job) -> Resolution {
    match job.kind {
        JobKind::Access => resolve_link(shared, &job.payload).await,
        JobKind::Search => resolve_search(shared, guild_id, job).await,
    }
}

async fn resolve_link(shared: &Arc<SharedState>, url: &str) -> Resolution {
    let resolver = Arc::clone(&shared.backends.resolver);
    let owned = url.to_string();
    let result = shared
        .run_blocking(move || resolver.resolve_by_url(&owned))
        .await
        .map_err(|e| ResolutionFailure::Backend(e.to_string()))?;

    non_empty(result, url)
}

async fn resolve_search(shared: &Arc<SharedState>, guild_id: GuildId, job: &Job) -> Resolution {
    let auto_pick = match shared.backends.settings.auto_pick(guild_id).await {
        Ok(flag) => flag,
        Err(e) => {
            warn!(guild_id = %guild_id, "Failed to read auto-pick setting, asking instead: {}", e);
            false
        }
    };

    let limit = if auto_pick {
        1
    } else {
        shared.settings.search_candidates
    };

    let resolver = Arc::clone(&shared.backends.resolver);
    let query = job.payload.clone();
    let result = shared
        .run_blocking(move || resolver.search(&query, limit))
        .await
        .map_err(|e| ResolutionFailure::Backend(e.to_string()))?;

    let mut candidates = non_empty(result, &job.payload)?;
    candidates.truncate(limit);

    if auto_pick {
        return Ok(candidates);
    }

    select_candidate(shared, job, candidates).await
}

/// Interactive selection: wait for the requester's numeric reply
async fn select_candidate(
    shared: &Arc<SharedState>,
    job: &Job,
    candidates: Vec<MediaReference>,
) -> Resolution {
    let prompt = Arc::clone(&shared.backends.prompt);
    let reply = tokio::time::timeout(
        shared.settings.selection_timeout,
        prompt.choose(&job.requester, &candidates),
    )
    .await;

    let reply = match reply {
        Ok(Some(reply)) => reply,
        Ok(None) | Err(_) => return Err(ResolutionFailure::SelectionTimeout),
    };

    match parse_selection(&reply, candidates.len()) {
        Some(index) => Ok(vec![candidates[index].clone()]),
        None => Err(ResolutionFailure::IllegalSelection {
            input: reply.trim().to_string(),
        }),
    }
}

/// 1-based reply to 0-based index, if in range
fn parse_selection(reply: &str, count: usize) -> Option<usize> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let choice: usize = trimmed.parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}

fn non_empty(
    result: std::result::Result<Vec<MediaReference>, ResolveError>,
    query: &str,
) -> Resolution {
    match result {
        Ok(items) if !items.is_empty() => Ok(items),
        Ok(_) | Err(ResolveError::NoMatch) => Err(ResolutionFailure::NoMatch {
            query: query.to_string(),
        }),
        Err(ResolveError::Failed(msg)) => Err(ResolutionFailure::Backend(msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1", 5), Some(0));
        assert_eq!(parse_selection(" 5 ", 5), Some(4));
        assert_eq!(parse_selection("0", 5), None);
        assert_eq!(parse_selection("6", 5), None);
        assert_eq!(parse_selection("3", 2), None);
        assert_eq!(parse_selection("two", 5), None);
        assert_eq!(parse_selection("-1", 5), None);
        assert_eq!(parse_selection("+1", 5), None);
        assert_eq!(parse_selection("", 5), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(
            non_empty(Ok(vec![]), "q"),
            Err(ResolutionFailure::NoMatch { query: "q".into() })
        );
        assert_eq!(
            non_empty(Err(ResolveError::Failed("boom".into())), "q"),
            Err(ResolutionFailure::Backend("boom".into()))
        );
    }
}
