use redis_protocol::resp2::types::OwnedFrame as RespFrame;

/// Lossy string extraction, for names and keywords.
pub fn extract_string(frame: &RespFrame) -> Result<String, RespFrame> {
    match frame {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => {
            Ok(String::from_utf8_lossy(data).to_string())
        }
        _ => Err(RespFrame::Error("ERR invalid string".to_string())),
    }
}

/// Strict UTF-8 extraction, for message content that must survive
/// storage unchanged.
pub fn extract_utf8(frame: &RespFrame) -> Result<String, RespFrame> {
    match frame {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => String::from_utf8(data.clone())
            .map_err(|_| RespFrame::Error("ERR content must be valid UTF-8".to_string())),
        _ => Err(RespFrame::Error("ERR invalid string".to_string())),
    }
}

pub fn extract_integer(frame: &RespFrame) -> Result<i64, RespFrame> {
    match frame {
        RespFrame::Integer(n) => Ok(*n),
        RespFrame::BulkString(data) => {
            let s = String::from_utf8_lossy(data);
            s.parse::<i64>()
                .map_err(|_| RespFrame::Error("ERR invalid integer".to_string()))
        }
        _ => Err(RespFrame::Error("ERR invalid integer".to_string())),
    }
}

pub fn bulk(data: impl Into<Vec<u8>>) -> RespFrame {
    RespFrame::BulkString(data.into())
}

pub fn error(message: impl std::fmt::Display) -> RespFrame {
    RespFrame::Error(format!("ERR {}", message))
}
