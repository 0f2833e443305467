use std::time::Duration;

use tracing::debug;

/// Delayed work the tutor asks its driver to run later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Start the next repetition of the current exercise.
    ResumeRepetition,
    /// Load the next exercise of the category.
    LoadExercise { category: String, id: String },
    /// Start the freshly loaded exercise.
    AutoStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    pub ticket: u64,
    pub delay: Duration,
    pub transition: Transition,
}

/// Holds at most one pending transition. Every schedule hands out a new ticket, so a
/// timer carrying an old ticket finds nothing to run.
#[derive(Debug, Default)]
pub struct TransitionSlot {
    next_ticket: u64,
    pending: Option<PendingTransition>,
}

impl TransitionSlot {
    pub fn schedule(&mut self, delay: Duration, transition: Transition) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if let Some(replaced) = self.pending.take() {
            debug!(ticket = replaced.ticket, "replacing pending transition");
        }
        debug!(ticket, ?delay, ?transition, "scheduled transition");
        self.pending = Some(PendingTransition {
            ticket,
            delay,
            transition,
        });
        ticket
    }

    pub fn cancel(&mut self) -> bool {
        let cancelled = self.pending.take();
        if let Some(pending) = &cancelled {
            debug!(ticket = pending.ticket, "cancelled pending transition");
        }
        cancelled.is_some()
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Removes and returns the transition if `ticket` is still the live one.
    pub fn take(&mut self, ticket: u64) -> Option<Transition> {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending.take().map(|pending| pending.transition)
            }
            _ => None,
        }
    }
}
