//! Request Queue
//!
//! Single-flight scheduler for a guild's resolution jobs.
//!
//! - `priority`: the job selected for resolution (at most one, ever)
//! - `backlog`: FIFO of jobs waiting behind it
//!
//! Fairness trade-off: when the scheduler is idle but the backlog is not empty,
//! a new submission promotes the oldest backlog entry and joins the back of the
//! line itself. The scheduler therefore always has exactly one job to run when
//! work exists, but a brand-new job never jumps ahead of older ones.

use std::collections::VecDeque;

use super::job::Job;

/// Where a submitted job ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Became the in-flight job
    Immediate,
    /// Waiting in the backlog at this 0-based position
    Backlogged { position: usize },
}

/// Per-guild resolution scheduler
#[derive(Debug, Default)]
pub struct RequestQueue {
    priority: Option<Job>,
    backlog: VecDeque<Job>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job
    pub fn submit(&mut self, job: Job) -> Scheduled {
        if self.priority.is_none() {
            if self.backlog.is_empty() {
                self.priority = Some(job);
                return Scheduled::Immediate;
            }
            // Idle with waiting work: rotate rather than letting the new job cut in
            self.priority = self.backlog.pop_front();
        }

        self.backlog.push_back(job);
        Scheduled::Backlogged {
            position: self.backlog.len() - 1,
        }
    }

    /// Promote the oldest backlog entry if nothing is in flight
    ///
    /// Returns true if a job was promoted.
    pub fn promote(&mut self) -> bool {
        if self.priority.is_some() {
            return false;
        }
        match self.backlog.pop_front() {
            Some(job) => {
                self.priority = Some(job);
                true
            }
            None => false,
        }
    }

    /// Job to resolve next, promoting from the backlog when needed
    ///
    /// The job stays in flight until [`complete_in_flight`](Self::complete_in_flight).
    pub fn next_to_run(&mut self) -> Option<Job> {
        self.promote();
        self.priority.clone()
    }

    /// Clear the in-flight slot once its result has been deposited (or it was
    /// aborted)
    pub fn complete_in_flight(&mut self) -> Option<Job> {
        self.priority.take()
    }

    /// Jobs waiting behind the in-flight one
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}
