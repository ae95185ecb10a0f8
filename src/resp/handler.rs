use std::sync::Arc;
use std::time::Duration;

use redis_protocol::resp2::types::OwnedFrame as RespFrame;
use tracing::warn;

use crate::queue::{QueueService, Receipt};

use super::utils::{bulk, error, extract_integer, extract_string, extract_utf8};

const COMMANDS: [&str; 8] = [
    "PING",
    "PUSH",
    "PULL",
    "DELETE",
    "SIZE",
    "QUEUES",
    "VISIBILITY",
    "COMMAND",
];

pub async fn handle_command(frame: RespFrame, service: Arc<dyn QueueService>) -> RespFrame {
    let cmd_array = match frame {
        RespFrame::Array(arr) => arr,
        _ => {
            return RespFrame::Error("ERR expected array".into());
        }
    };

    if cmd_array.is_empty() {
        return RespFrame::Error("ERR empty command".to_string());
    }

    let command_name = match &cmd_array[0] {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => {
            String::from_utf8_lossy(data).to_uppercase()
        }
        _ => {
            return RespFrame::Error("ERR invalid command format".to_string());
        }
    };

    match command_name.as_str() {
        "PING" => handle_ping(&cmd_array),
        "PUSH" => handle_push(&cmd_array, service.as_ref()).await,
        "PULL" => handle_pull(&cmd_array, service.as_ref()).await,
        "DELETE" => handle_delete(&cmd_array, service.as_ref()).await,
        "SIZE" => handle_size(&cmd_array, service.as_ref()).await,
        "QUEUES" => handle_queues(&cmd_array, service.as_ref()).await,
        "VISIBILITY" => handle_visibility(&cmd_array, service.as_ref()),
        "COMMAND" => handle_command_docs(),
        _ => RespFrame::Error(format!("ERR unknown command '{}'", command_name)),
    }
}

fn wrong_arity(command: &str) -> RespFrame {
    RespFrame::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        command
    ))
}

/// PING [message] - Test connection
fn handle_ping(cmd: &[RespFrame]) -> RespFrame {
    match cmd.len() {
        1 => RespFrame::SimpleString(b"PONG".to_vec()),
        2 => cmd[1].clone(),
        _ => wrong_arity("ping"),
    }
}

/// PUSH queue content [content ...] - Append messages, returns how many
async fn handle_push(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    if cmd.len() < 3 {
        return wrong_arity("push");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };

    let mut count = 0;
    for frame in &cmd[2..] {
        let content = match extract_utf8(frame) {
            Ok(content) => content,
            Err(e) => return e,
        };
        if let Err(e) = service.push(&queue_name, &content).await {
            return error(e);
        }
        count += 1;
    }

    RespFrame::Integer(count)
}

/// PULL queue - Receive one message as [receipt, content], or null
async fn handle_pull(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    if cmd.len() != 2 {
        return wrong_arity("pull");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };

    match service.pull(&queue_name).await {
        Ok(Some(message)) => RespFrame::Array(vec![
            bulk(message.receipt().to_string()),
            bulk(message.content()),
        ]),
        Ok(None) => RespFrame::Null,
        Err(e) => error(e),
    }
}

/// DELETE queue receipt - Retire a pulled message, returns 1 if removed
async fn handle_delete(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    if cmd.len() != 3 {
        return wrong_arity("delete");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };
    let raw_receipt = match extract_string(&cmd[2]) {
        Ok(raw) => raw,
        Err(e) => return e,
    };

    // A handle we did not issue is declined like a stale one.
    let receipt: Receipt = match raw_receipt.parse() {
        Ok(receipt) => receipt,
        Err(e) => {
            warn!(queue = %queue_name, error = %e, "delete with unusable handle");
            return RespFrame::Integer(0);
        }
    };

    match service.delete(&queue_name, &receipt).await {
        Ok(removed) => RespFrame::Integer(removed as i64),
        Err(e) => error(e),
    }
}

/// SIZE queue - Number of live messages
async fn handle_size(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    if cmd.len() != 2 {
        return wrong_arity("size");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };

    match service.size(&queue_name).await {
        Ok(size) => RespFrame::Integer(size as i64),
        Err(e) => error(e),
    }
}

/// QUEUES - Names of known queues, sorted
async fn handle_queues(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    if cmd.len() != 1 {
        return wrong_arity("queues");
    }

    match service.list_queues().await {
        Ok(names) => RespFrame::Array(names.into_iter().map(bulk).collect()),
        Err(e) => error(e),
    }
}

/// VISIBILITY [seconds] - Read or set the timeout for new messages
fn handle_visibility(cmd: &[RespFrame], service: &dyn QueueService) -> RespFrame {
    match cmd.len() {
        1 => RespFrame::Integer(service.visibility_timeout().as_secs() as i64),
        2 => {
            let seconds = match extract_integer(&cmd[1]) {
                Ok(n) => n,
                Err(e) => return e,
            };
            if seconds < 0 {
                return RespFrame::Error("ERR timeout must be non-negative".to_string());
            }
            service.set_visibility_timeout(Duration::from_secs(seconds as u64));
            RespFrame::SimpleString(b"OK".to_vec())
        }
        _ => wrong_arity("visibility"),
    }
}

/// COMMAND - Return supported commands
fn handle_command_docs() -> RespFrame {
    RespFrame::Array(COMMANDS.iter().map(|name| bulk(*name)).collect())
}
