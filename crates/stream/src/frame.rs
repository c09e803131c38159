//! Wire shape of frames written to and read from a streaming pipe.
use serde_json::json;
use serde_json::Value;

/// Numeric `type` tags for the Pipe Message data model (`spec.md` §3).
pub mod frame_type {
    pub const ERROR: i64 = -1;
    pub const DATA: i64 = 0;
    pub const KEEPALIVE: i64 = 1;
}

pub fn data_frame(row: Value) -> Value {
    json!({"type": frame_type::DATA, "data": row})
}

pub fn keepalive_frame() -> Value {
    json!({"type": frame_type::KEEPALIVE})
}

pub fn error_frame(message: &str) -> Value {
    json!({"type": frame_type::ERROR, "error": message})
}

/// A frame's body, decoded for the consumer side.
pub enum ParsedFrame {
    Data(Value),
    Keepalive,
    Error(String),
    /// A `type` this consumer does not recognise; ignored for forward-compatibility.
    Unknown,
}

pub fn parse_frame(msg: &Value) -> ParsedFrame {
    match msg.get("type").and_then(Value::as_i64) {
        Some(frame_type::DATA) => ParsedFrame::Data(msg.get("data").cloned().unwrap_or(Value::Null)),
        Some(frame_type::KEEPALIVE) => ParsedFrame::Keepalive,
        Some(frame_type::ERROR) => {
            let message = msg
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            ParsedFrame::Error(message)
        }
        _ => ParsedFrame::Unknown,
    }
}
