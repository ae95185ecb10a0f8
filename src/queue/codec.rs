//! Line encoding for persisted queues.
//!
//! One message per line, `visibleAt:content:visibilityTimeoutSeconds:id`,
//! each line terminated by `\n`. Content may contain `:` because the
//! numeric fields are taken from both ends of the line. Lines with only the
//! first three fields are accepted and get a fresh id.

use uuid::Uuid;

use super::message::Message;
use crate::error::{QueueError, Result};

const SEPARATOR: char = ':';

pub fn encode_message(message: &Message) -> String {
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        message.visible_at(),
        message.content(),
        message.visibility_timeout_secs(),
        message.id()
    )
}

pub fn encode_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    let mut record = String::new();
    for message in messages {
        record.push_str(&encode_message(message));
        record.push('\n');
    }
    record
}

pub fn decode_message(line: &str) -> Result<Message> {
    let malformed = |reason: &str| QueueError::Decode {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let (visible_at, rest) = line
        .split_once(SEPARATOR)
        .ok_or_else(|| malformed("missing separator"))?;
    let visible_at: u64 = visible_at
        .parse()
        .map_err(|_| malformed("visibleAt is not a number"))?;

    let (head, last) = rest
        .rsplit_once(SEPARATOR)
        .ok_or_else(|| malformed("missing visibility timeout"))?;

    // The last field is the id when it parses as one; otherwise the line is
    // in the three-field form and the last field is the timeout.
    let (content, timeout, id) = match Uuid::parse_str(last) {
        Ok(id) => {
            let (content, timeout) = head
                .rsplit_once(SEPARATOR)
                .ok_or_else(|| malformed("missing visibility timeout"))?;
            (content, timeout, id)
        }
        Err(_) => (head, last, Uuid::new_v4()),
    };
    let timeout: u64 = timeout
        .parse()
        .map_err(|_| malformed("visibility timeout is not a number"))?;

    Ok(Message::from_parts(id, content.to_string(), timeout, visible_at))
}

/// Decodes a whole record. Blank lines are skipped; any malformed line
/// fails the whole decode.
pub fn decode_messages(record: &str) -> Result<Vec<Message>> {
    record
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(decode_message)
        .collect()
}
