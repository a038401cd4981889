//! Resolution jobs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voicebox_common::events::JobRef;
use voicebox_common::{ChannelId, UserId};

/// Who asked, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,

    /// Channel the command was typed in (selection replies are read from here)
    pub text_channel: ChannelId,

    /// Voice channel the user sits in, if any
    pub voice_channel: Option<ChannelId>,

    /// Guild administrator (required for settings changes)
    pub is_admin: bool,
}

/// What kind of resolution a job needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Free-text query; resolved through a search
    Search,
    /// Direct link; resolved by metadata extraction
    Access,
}

/// One play request waiting to be resolved
///
/// Immutable once created and consumed exactly once by the guild's resolver
/// task.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub payload: String,
    pub requester: Requester,
}

impl Job {
    pub fn new(kind: JobKind, payload: impl Into<String>, requester: Requester) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload: payload.into(),
            requester,
        }
    }

    /// Links become Access jobs, anything else is searched for
    pub fn classify(text: &str, requester: Requester) -> Self {
        let text = text.trim();
        let kind = if is_link(text) {
            JobKind::Access
        } else {
            JobKind::Search
        };
        Self::new(kind, text, requester)
    }

    pub fn event_ref(&self) -> JobRef {
        JobRef(self.id.to_string())
    }
}

fn is_link(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://"))
        && !text.contains(char::is_whitespace)
}

#[cfg(test)]
pub(crate) fn test_requester() -> Requester {
    Requester {
        user_id: UserId(10),
        text_channel: ChannelId(20),
        voice_channel: Some(ChannelId(30)),
        is_admin: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_links_and_queries() {
        let job = Job::classify("https://www.youtube.com/watch?v=abc", test_requester());
        assert_eq!(job.kind, JobKind::Access);

        let job = Job::classify("  HTTP://example.com/a  ", test_requester());
        assert_eq!(job.kind, JobKind::Access);
        assert_eq!(job.payload, "HTTP://example.com/a");

        let job = Job::classify("never gonna give you up", test_requester());
        assert_eq!(job.kind, JobKind::Search);

        let job = Job::classify("https://x.com is cool", test_requester());
        assert_eq!(job.kind, JobKind::Search);
    }

    #[test]
    fn test_jobs_get_distinct_ids() {
        let a = Job::new(JobKind::Search, "a", test_requester());
        let b = Job::new(JobKind::Search, "a", test_requester());
        assert_ne!(a.id, b.id);
        assert_eq!(a.event_ref().0, a.id.to_string());
    }
}
