use std::collections::VecDeque;

use parking_lot::Mutex;

use super::message::{Message, Receipt};

/// One in-memory queue.
///
/// All access to the message sequence goes through a single mutex, so the
/// scan for a visible message and the hide that follows can never
/// interleave with another pull.
pub struct MessageQueue {
    name: String,
    messages: Mutex<VecDeque<Message>>,
}

impl MessageQueue {
    pub fn new(name: String) -> Self {
        Self {
            name,
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, message: Message) {
        self.messages.lock().push_back(message);
    }

    /// Finds the first visible message, hides it and returns a copy.
    pub fn pull(&self, now_ms: u64) -> Option<Message> {
        let mut messages = self.messages.lock();
        let message = messages.iter_mut().find(|m| m.is_visible(now_ms))?;
        message.hide(now_ms);
        Some(message.clone())
    }

    /// Removes the message `receipt` names if that delivery is still in
    /// flight at `now_ms`.
    pub fn delete(&self, receipt: &Receipt, now_ms: u64) -> bool {
        let mut messages = self.messages.lock();
        let position = messages
            .iter()
            .position(|m| m.matches(receipt) && !m.is_visible(now_ms));
        match position {
            Some(index) => {
                messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn size(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
