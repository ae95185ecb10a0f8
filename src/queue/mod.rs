// Queue module exports

pub mod clock;
pub mod codec;
pub mod file;
pub mod lease;
pub mod memory;
pub mod message;
pub mod message_queue;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileQueueService;
pub use lease::{DirLease, Lease, LeaseGuard};
pub use memory::MemoryQueueService;
pub use message::{InvalidReceipt, Message, Receipt};
pub use message_queue::MessageQueue;
pub use service::{QueueService, DEFAULT_VISIBILITY_TIMEOUT};
