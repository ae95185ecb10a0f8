use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use super::clock::{Clock, SystemClock};
use super::codec::{decode_messages, encode_messages};
use super::lease::{DirLease, Lease};
use super::message::{Message, Receipt};
use super::service::{timeout_secs, QueueService};
use crate::error::{validate_content, validate_queue_name, QueueError, Result};

const MESSAGES_FILE: &str = "messages";
const STAGING_FILE: &str = "messages.tmp";
const LEASE_MARKER: &str = ".lock";

/// File-backed backend, safe to share between processes.
///
/// Layout under the root:
///
/// ```text
/// <root>/<queue>/messages   one encoded message per line
/// <root>/<queue>/.lock      present while an operation holds the queue
/// ```
///
/// Every mutation reads the whole record, changes it in memory and replaces
/// the file, all while holding the queue's lease.
pub struct FileQueueService {
    root: PathBuf,
    visibility_timeout: AtomicU64,
    lease: Arc<dyn Lease>,
    clock: Arc<dyn Clock>,
}

impl FileQueueService {
    /// Opens a service rooted at an existing directory.
    pub fn new(root: impl Into<PathBuf>, visibility_timeout: Duration) -> Result<Self> {
        Self::with_parts(
            root,
            visibility_timeout,
            Arc::new(DirLease::default()),
            Arc::new(SystemClock::new()),
        )
    }

    pub fn with_parts(
        root: impl Into<PathBuf>,
        visibility_timeout: Duration,
        lease: Arc<dyn Lease>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(QueueError::Io(io::Error::new(
                ErrorKind::NotFound,
                format!("{} is not a valid directory", root.display()),
            )));
        }
        Ok(Self {
            root,
            visibility_timeout: AtomicU64::new(timeout_secs(visibility_timeout)),
            lease,
            clock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn queue_dir(&self, queue: &str) -> PathBuf {
        self.root.join(queue)
    }

    /// Runs one read-modify-write cycle on `queue` under its lease.
    ///
    /// `apply` returns its output and whether the record changed; the file
    /// is only rewritten in the latter case.
    async fn modify<T, F>(&self, queue: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Message>, u64) -> (T, bool) + Send,
        T: Send,
    {
        let dir = self.queue_dir(queue);
        let _lease = self.lease.acquire(&dir.join(LEASE_MARKER)).await?;

        let mut messages = read_record(&dir.join(MESSAGES_FILE))
            .await
            .inspect_err(|e| error!(queue, error = %e, "failed to read queue record"))?;
        let (output, changed) = apply(&mut messages, self.clock.now_ms());
        if changed {
            write_record(&dir, &messages)
                .await
                .inspect_err(|e| error!(queue, error = %e, "failed to write queue record"))?;
        }
        Ok(output)
    }
}

async fn queue_exists(dir: &Path) -> Result<bool> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn read_record(path: &Path) -> Result<Vec<Message>> {
    match tokio::fs::read_to_string(path).await {
        Ok(record) => decode_messages(&record),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the record through a staging file so readers see either the
/// old or the new contents, never a partial write.
async fn write_record(dir: &Path, messages: &[Message]) -> Result<()> {
    let staging = dir.join(STAGING_FILE);
    let mut file = tokio::fs::File::create(&staging).await?;
    file.write_all(encode_messages(messages).as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&staging, dir.join(MESSAGES_FILE)).await?;
    Ok(())
}

#[async_trait]
impl QueueService for FileQueueService {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn push(&self, queue: &str, content: &str) -> Result<()> {
        validate_queue_name(queue)?;
        validate_content(content)?;

        tokio::fs::create_dir_all(self.queue_dir(queue)).await?;
        let timeout = self.visibility_timeout();
        let id = self
            .modify(queue, |messages, now| {
                let message = Message::new(content, timeout, now);
                let id = message.id();
                messages.push(message);
                (id, true)
            })
            .await?;
        debug!(queue, message_id = %id, "push");
        Ok(())
    }

    async fn pull(&self, queue: &str) -> Result<Option<Message>> {
        validate_queue_name(queue)?;
        if !queue_exists(&self.queue_dir(queue)).await? {
            debug!(queue, "pull from absent queue");
            return Ok(None);
        }

        let message = self
            .modify(queue, |messages, now| {
                match messages.iter_mut().find(|m| m.is_visible(now)) {
                    Some(message) => {
                        message.hide(now);
                        (Some(message.clone()), true)
                    }
                    None => (None, false),
                }
            })
            .await?;
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
        if !queue_exists(&self.queue_dir(queue)).await? {
            warn!(queue, %receipt, "cannot delete from absent queue");
            return Ok(false);
        }

        let removed = self
            .modify(queue, |messages, now| {
                let position = messages
                    .iter()
                    .position(|m| m.matches(receipt) && !m.is_visible(now));
                match position {
                    Some(index) => {
                        messages.remove(index);
                        (true, true)
                    }
                    None => (false, false),
                }
            })
            .await?;
        if removed {
            debug!(queue, %receipt, "delete");
        } else {
            warn!(queue, %receipt, "message not in flight in this queue, delete declined");
        }
        Ok(removed)
    }

    async fn size(&self, queue: &str) -> Result<usize> {
        validate_queue_name(queue)?;
        let messages = read_record(&self.queue_dir(queue).join(MESSAGES_FILE)).await?;
        Ok(messages.len())
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if validate_queue_name(&name).is_ok() {
                names.push(name);
            }
        }
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
