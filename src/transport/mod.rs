//! Transport layer: gateway wire formats (request bodies and reply decoding).

mod batch;
mod gateway;
mod id;

pub use batch::{decode_batch_reply, encode_batch_bulk, encode_batch_single};
pub use gateway::{decode_gateway_bulk_reply, decode_gateway_reply, encode_send, encode_send_bulk};

use serde_json::{Value, json};

/// Parse a reply body, keeping something non-null for the audit trail when it is not JSON.
fn parse_body(status: u16, body: &str) -> Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return json!({ "http_status": status });
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => json!({ "http_status": status }),
        Ok(value) => value,
        Err(_) => json!({ "http_status": status, "body": body }),
    }
}

fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_keeps_json_verbatim() {
        assert_eq!(
            parse_body(200, r#"{"message_id":"m1"}"#),
            json!({"message_id": "m1"})
        );
    }

    #[test]
    fn parse_body_wraps_empty_and_non_json() {
        assert_eq!(parse_body(502, "   "), json!({"http_status": 502}));
        assert_eq!(parse_body(200, "null"), json!({"http_status": 200}));
        assert_eq!(
            parse_body(500, "<html>oops</html>"),
            json!({"http_status": 500, "body": "<html>oops</html>"})
        );
    }
}
