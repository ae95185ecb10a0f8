use thiserror::Error;

/// Result type for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors surfaced by the queue backends.
///
/// An empty pull and a declined delete are not errors; they are reported
/// through `Ok(None)` and `Ok(false)` respectively.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Reading or writing a persisted record failed
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record line could not be decoded
    #[error("malformed record line {line:?}: {reason}")]
    Decode { line: String, reason: String },

    /// The queue name cannot be used as a storage key
    #[error("invalid queue name: {0:?}")]
    InvalidQueueName(String),

    /// The message content cannot be stored
    #[error("invalid message content: {0}")]
    InvalidContent(String),

    /// Configuration validation error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Rejects names that would escape the storage root or collide with the
/// record layout. Both backends apply the same rule.
pub fn validate_queue_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(QueueError::InvalidQueueName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_content(content: &str) -> Result<()> {
    if content.contains(['\n', '\r']) {
        return Err(QueueError::InvalidContent(
            "content must not contain line breaks".to_string(),
        ));
    }
    Ok(())
}
