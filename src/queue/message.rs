use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::service::timeout_secs;

/// A queued message and its visibility state.
///
/// A message is visible when `visible_at <= now`. Pulling it pushes
/// `visible_at` forward by its visibility timeout; nothing moves it back,
/// the deadline simply passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: Uuid,
    content: String,
    visibility_timeout: u64,
    visible_at: u64,
}

impl Message {
    /// Creates a message that is visible from `now_ms` on. The timeout is
    /// kept in whole seconds, rounding partial seconds up.
    pub fn new(content: impl Into<String>, visibility_timeout: Duration, now_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            visibility_timeout: timeout_secs(visibility_timeout),
            visible_at: now_ms,
        }
    }

    pub(crate) fn from_parts(
        id: Uuid,
        content: String,
        visibility_timeout: u64,
        visible_at: u64,
    ) -> Self {
        Self {
            id,
            content,
            visibility_timeout,
            visible_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Timeout in whole seconds, as stored.
    pub fn visibility_timeout_secs(&self) -> u64 {
        self.visibility_timeout
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout)
    }

    /// Epoch milliseconds before which the message is hidden from pulls.
    pub fn visible_at(&self) -> u64 {
        self.visible_at
    }

    pub fn is_visible(&self, now_ms: u64) -> bool {
        self.visible_at <= now_ms
    }

    /// Marks the message in flight until `now_ms + timeout`.
    pub(crate) fn hide(&mut self, now_ms: u64) {
        self.visible_at = now_ms.saturating_add(self.visibility_timeout.saturating_mul(1000));
    }

    /// Handle for deleting this delivery of the message.
    pub fn receipt(&self) -> Receipt {
        Receipt {
            message_id: self.id,
            visible_at: self.visible_at,
        }
    }

    /// True when `receipt` was issued for the current delivery of this message.
    pub(crate) fn matches(&self, receipt: &Receipt) -> bool {
        self.id == receipt.message_id && self.visible_at == receipt.visible_at
    }
}

/// Receipt handed out by a pull and consumed by delete.
///
/// It names one delivery of one message. Once the message has been
/// redelivered its `visible_at` changes and older receipts stop matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receipt {
    pub message_id: Uuid,
    pub visible_at: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid receipt {0:?}")]
pub struct InvalidReceipt(pub String);

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.message_id, self.visible_at)
    }
}

impl FromStr for Receipt {
    type Err = InvalidReceipt;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidReceipt(s.to_string());
        let (id, visible_at) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            message_id: Uuid::parse_str(id).map_err(|_| invalid())?,
            visible_at: visible_at.parse().map_err(|_| invalid())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_visible_immediately() {
        let msg = Message::new("hello", Duration::from_secs(30), 1_000);

        assert!(msg.is_visible(1_000));
        assert!(msg.is_visible(1_001));
        assert!(!msg.is_visible(999));
    }

    #[test]
    fn hide_pushes_deadline_by_timeout() {
        let mut msg = Message::new("hello", Duration::from_secs(2), 1_000);
        msg.hide(5_000);

        assert_eq!(msg.visible_at(), 7_000);
        assert!(!msg.is_visible(6_999));
        assert!(msg.is_visible(7_000));
    }

    #[test]
    fn partial_second_timeout_rounds_up() {
        let msg = Message::new("hello", Duration::from_millis(500), 0);
        assert_eq!(msg.visibility_timeout_secs(), 1);

        let msg = Message::new("hello", Duration::from_millis(2_001), 0);
        assert_eq!(msg.visibility_timeout_secs(), 3);
    }

    #[test]
    fn receipt_goes_stale_after_redelivery() {
        let mut msg = Message::new("hello", Duration::from_secs(1), 0);
        msg.hide(10);
        let first = msg.receipt();
        assert!(msg.matches(&first));

        msg.hide(2_000);
        assert!(!msg.matches(&first));
        assert!(msg.matches(&msg.receipt()));
    }

    #[test]
    fn receipt_text_form() {
        let msg = Message::new("x", Duration::from_secs(1), 42);
        let receipt = msg.receipt();
        let text = receipt.to_string();

        assert_eq!(text, format!("{}:42", msg.id()));
        assert_eq!(text.parse::<Receipt>(), Ok(receipt));
    }

    #[test]
    fn receipt_rejects_garbage() {
        assert!("".parse::<Receipt>().is_err());
        assert!("not-a-uuid:12".parse::<Receipt>().is_err());
        let id = Uuid::new_v4();
        assert!(format!("{id}").parse::<Receipt>().is_err());
        assert!(format!("{id}:soon").parse::<Receipt>().is_err());
    }
}
