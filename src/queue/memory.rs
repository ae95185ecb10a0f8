use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::message::{Message, Receipt};
use super::message_queue::MessageQueue;
use super::service::{timeout_secs, QueueService, DEFAULT_VISIBILITY_TIMEOUT};
use crate::error::{validate_content, validate_queue_name, Result};

/// In-process backend. Messages live only as long as the service.
///
/// The service owns its registry of queues; two services never share
/// state.
pub struct MemoryQueueService {
    queues: DashMap<String, Arc<MessageQueue>>,
    visibility_timeout: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MemoryQueueService {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            queues: DashMap::new(),
            visibility_timeout: AtomicU64::new(timeout_secs(timeout)),
            clock,
        }
    }

    fn get_or_create_queue(&self, name: &str) -> Arc<MessageQueue> {
        if let Some(queue) = self.queues.get(name) {
            return queue.value().clone();
        }
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MessageQueue::new(name.to_string())))
            .value()
            .clone()
    }

    pub fn get_queue(&self, name: &str) -> Option<Arc<MessageQueue>> {
        self.queues.get(name).map(|queue| queue.value().clone())
    }
}

impl Default for MemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for MemoryQueueService {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn push(&self, queue: &str, content: &str) -> Result<()> {
        validate_queue_name(queue)?;
        validate_content(content)?;

        let message = Message::new(content, self.visibility_timeout(), self.clock.now_ms());
        debug!(queue, message_id = %message.id(), "push");
        self.get_or_create_queue(queue).push(message);
        Ok(())
    }

    async fn pull(&self, queue: &str) -> Result<Option<Message>> {
        validate_queue_name(queue)?;

        let Some(message_queue) = self.get_queue(queue) else {
            debug!(queue, "pull from absent queue");
            return Ok(None);
        };
        let message = message_queue.pull(self.clock.now_ms());
        match &message {
            Some(message) => {
                debug!(queue, message_id = %message.id(), visible_at = message.visible_at(), "pull")
            }
            None => debug!(queue, "no visible messages"),
        }
        Ok(message)
    }

    async fn delete(&self, queue: &str, receipt: &Receipt) -> Result<bool> {
        validate_queue_name(queue)?;

        let Some(message_queue) = self.get_queue(queue) else {
            warn!(queue, %receipt, "cannot delete from absent queue");
            return Ok(false);
        };
        let removed = message_queue.delete(receipt, self.clock.now_ms());
        if removed {
            debug!(queue, %receipt, "delete");
        } else {
            warn!(queue, %receipt, "message not in flight in this queue, delete declined");
        }
        Ok(removed)
    }

    async fn size(&self, queue: &str) -> Result<usize> {
        validate_queue_name(queue)?;
        Ok(self.get_queue(queue).map_or(0, |q| q.size()))
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.queues.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn set_visibility_timeout(&self, timeout: Duration) {
        self.visibility_timeout
            .store(timeout_secs(timeout), Ordering::SeqCst);
    }

    fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout.load(Ordering::SeqCst))
    }
}
