//! Counts in-flight math resolutions and fires a one-shot idle callback.
//!
//! The counter is reset at the start of every render pass. Each deferred
//! region takes a [`Ticket`] with `begin()` and hands it back with `end()`.
//! Tickets carry the pass generation, so a resolution from a superseded pass
//! that finishes late cannot decrement the current pass.

use std::fmt;

/// Callback run once when the current pass goes idle.
pub type IdleCallback = Box<dyn FnOnce() + Send>;

/// Proof of one `begin()`. Not `Clone`: it can be ended once.
#[derive(Debug)]
#[must_use = "every begun resolution must be ended exactly once"]
pub struct Ticket {
    generation: u64,
}

#[derive(Default)]
pub struct CompletionTracker {
    active: usize,
    generation: u64,
    on_idle: Option<IdleCallback>,
}

impl fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("active", &self.active)
            .field("generation", &self.generation)
            .field("idle_registered", &self.on_idle.is_some())
            .finish()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass: zero the counter and drop any pending idle callback
    /// without running it.
    pub fn reset(&mut self) {
        if self.active > 0 || self.on_idle.is_some() {
            tracing::debug!(
                target: "glimpse::tracker",
                abandoned = self.active,
                "resetting tracker with work outstanding"
            );
        }
        self.active = 0;
        self.generation += 1;
        self.on_idle = None;
    }

    pub fn begin(&mut self) -> Ticket {
        self.active += 1;
        Ticket {
            generation: self.generation,
        }
    }

    /// Hand a ticket back. Returns whether it counted against the current pass.
    pub fn end(&mut self, ticket: Ticket) -> bool {
        if ticket.generation != self.generation {
            tracing::trace!(
                target: "glimpse::tracker",
                ticket_generation = ticket.generation,
                generation = self.generation,
                "ignoring end() from a superseded pass"
            );
            return false;
        }
        if self.active == 0 {
            tracing::warn!(target: "glimpse::tracker", "end() with no active renders");
            return false;
        }
        self.active -= 1;
        if self.active == 0 {
            if let Some(callback) = self.on_idle.take() {
                callback();
            }
        }
        true
    }

    /// End `ticket` when the returned guard drops, whatever happens in between.
    pub fn end_on_drop(&mut self, ticket: Ticket) -> EndGuard<'_> {
        EndGuard {
            tracker: self,
            ticket: Some(ticket),
        }
    }

    /// Run `callback` now if idle, otherwise once the counter next reaches zero.
    ///
    /// Only one callback is held; registering another replaces it and the
    /// earlier one never runs.
    pub fn on_idle(&mut self, callback: IdleCallback) {
        if self.active == 0 {
            callback();
            return;
        }
        if self.on_idle.replace(callback).is_some() {
            tracing::debug!(target: "glimpse::tracker", "replaced pending idle callback");
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_idle(&self) -> bool {
        self.active == 0
    }
}

/// Calls [`CompletionTracker::end`] on drop, including during unwinding.
pub struct EndGuard<'a> {
    tracker: &'a mut CompletionTracker,
    ticket: Option<Ticket>,
}

impl Drop for EndGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.tracker.end(ticket);
        }
    }
}
