//! Deferred work with replace-on-reschedule semantics
//!
//! The host owns the clock. It calls [`Scheduler::next_deadline`] to arm a
//! single timer and hands due tasks back to the coordinator when it fires.
//! Scheduling a kind that is already pending replaces the pending task, so
//! a burst of input keeps pushing one debounce deadline forward instead of
//! queueing one sync per keystroke.

use log::debug;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Serialize the rich view into the Source Buffer
    RichViewSync,
    /// Serialize after typing inside a code block
    CodeBlockSync,
    /// End the table write-back guard
    ReleaseTableGuard,
}

/// Identifies one scheduled occurrence of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub kind: TaskKind,
    pub token: TaskToken,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<ScheduledTask>,
    next_token: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to run `delay` after `now`, replacing any pending
    /// task of the same kind.
    pub fn schedule(&mut self, kind: TaskKind, now: Instant, delay: Duration) -> TaskToken {
        if let Some(old) = self.cancel(kind) {
            debug!("Rescheduling {:?} (superseded {:?})", kind, old);
        }
        self.next_token += 1;
        let token = TaskToken(self.next_token);
        self.pending.push(ScheduledTask {
            kind,
            token,
            deadline: now + delay,
        });
        token
    }

    /// Drop the pending task of `kind`, returning its token.
    pub fn cancel(&mut self, kind: TaskKind) -> Option<TaskToken> {
        let index = self.pending.iter().position(|t| t.kind == kind)?;
        Some(self.pending.remove(index).token)
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline among pending tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.deadline).min()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScheduledTask> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.deadline <= now);
        self.pending = pending;
        due.sort_by_key(|t| (t.deadline, t.token));
        due
    }
}
