//! Request intake: jobs, the single-flight scheduler, the resolver task and
//! the vault that hands results back to the caller.

mod job;
mod queue;
pub(crate) mod resolver_task;
mod vault;

pub use job::{Job, JobKind, Requester};
pub use queue::{RequestQueue, Scheduled};
pub use vault::{Resolution, Vault};

#[cfg(test)]
pub(crate) use job::test_requester;
