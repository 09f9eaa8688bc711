//! Delete-poll-insert replacement of edge sets.
//!
//! Platform deletes are asynchronous: triggering one only schedules it. A
//! replacement therefore deletes the old scope, polls the edge count until
//! the scope reads empty, and only then posts the new edges. Posting before
//! the delete converges would let the delete swallow the new edges.

use crate::error::{GavelError, Result};
use crate::platform::Platform;
use crate::types::{Edge, EdgeFilter};
use crate::wait::Waiter;
use std::time::Duration;
use tracing::{debug, info};

pub struct EdgeSync<'a> {
    platform: &'a dyn Platform,
    waiter: Waiter,
    poll_interval: Duration,
    max_polls: u32,
}

impl<'a> EdgeSync<'a> {
    pub fn new(platform: &'a dyn Platform, waiter: Waiter) -> Self {
        Self {
            platform,
            waiter,
            poll_interval: Duration::from_secs(5),
            max_polls: 60,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// Replace every edge in `scope` with `edges`.
    ///
    /// The delete is skipped entirely when the scope is already empty. The
    /// insert never runs until a count poll reads zero; running out of polls
    /// or being cancelled is a timeout and leaves the scope un-posted.
    pub fn replace(&self, scope: &EdgeFilter, edges: &[Edge]) -> Result<()> {
        let existing = self.platform.count_edges(scope)?;
        if existing > 0 {
            info!(%scope, existing, "deleting edges before replacement");
            self.platform.delete_edges(scope)?;
            self.wait_for_empty(scope)?;
        } else {
            debug!(%scope, "scope already empty, skipping delete");
        }

        if edges.is_empty() {
            debug!(%scope, "nothing to post");
            return Ok(());
        }
        info!(%scope, count = edges.len(), "posting replacement edges");
        self.platform.post_edges(edges)
    }

    fn wait_for_empty(&self, scope: &EdgeFilter) -> Result<()> {
        for poll in 0..self.max_polls {
            let remaining = self.platform.count_edges(scope)?;
            debug!(%scope, remaining, poll, "polling delete convergence");
            if remaining == 0 {
                return Ok(());
            }
            if !self.waiter.wait(self.poll_interval) {
                return Err(GavelError::Timeout {
                    context: format!("cancelled while deleting {scope}"),
                });
            }
        }
        Err(GavelError::Timeout {
            context: format!("deleting {scope}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
