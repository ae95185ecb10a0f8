use std::time::Duration;

use async_trait::async_trait;

use super::message::{Message, Receipt};
use crate::error::Result;

/// Default visibility timeout applied to new messages.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeouts are stored in whole seconds; a partial second rounds up so a
/// non-zero timeout never collapses to zero.
pub fn timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Push/pull/delete contract shared by every backend.
///
/// Delivery is at-least-once: a pulled message that is not deleted before
/// its visibility timeout runs out becomes pullable again.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Appends a visible message, creating the queue on first use.
    async fn push(&self, queue: &str, content: &str) -> Result<()>;

    /// Hands out the oldest visible message and hides it for its timeout.
    ///
    /// An absent, empty or fully in-flight queue yields `Ok(None)`.
    async fn pull(&self, queue: &str) -> Result<Option<Message>>;

    /// Removes the message `receipt` was issued for, if that delivery is
    /// still in flight. Returns whether anything was removed; a stale,
    /// foreign or unknown receipt is declined, not an error.
    async fn delete(&self, queue: &str, receipt: &Receipt) -> Result<bool>;

    /// Number of live messages, visible or in flight.
    async fn size(&self, queue: &str) -> Result<usize>;

    /// Names of the queues that have been pushed to, sorted.
    async fn list_queues(&self) -> Result<Vec<String>>;

    /// Sets the timeout given to messages pushed from now on. Partial
    /// seconds round up.
    fn set_visibility_timeout(&self, timeout: Duration);

    fn visibility_timeout(&self) -> Duration;
}
