// tideq - message queue engine with per-message visibility timeouts
//
// This library provides the queue engine and its two backends.
// Binary entry point is in src/main.rs

pub mod config;
pub mod error;
pub mod queue;
pub mod resp;

pub use config::{Backend, Config};
pub use error::{QueueError, Result};
pub use queue::{
    FileQueueService, MemoryQueueService, Message, MessageQueue, QueueService, Receipt,
};
pub use resp::{RespConfig, RespServer};
