use serde_json::{Value, json};

use super::id::TransportId;
use super::{is_success, parse_body};
use crate::domain::Outcome;

/// Failure text: `error` (stringified when structured), then `message`, then the status.
fn error_text(raw: &Value, status: u16) -> String {
    match (raw.get("error"), raw.get("message")) {
        (Some(Value::String(error)), _) if !error.trim().is_empty() => error.clone(),
        (Some(error), _) if !error.is_null() && !error.is_string() => error.to_string(),
        (_, Some(Value::String(message))) if !message.trim().is_empty() => message.clone(),
        _ => format!("HTTP {status}"),
    }
}

/// Body for `POST {base}/send`.
pub fn encode_send(recipient: &str, message: &str, sender: &str) -> Value {
    json!({
        "recipient": recipient,
        "message": message,
        "sender": sender,
    })
}

/// Body for `POST {base}/send-bulk`.
pub fn encode_send_bulk(recipients: &[String], message: &str, sender: &str) -> Value {
    json!({
        "recipients": recipients,
        "message": message,
        "sender": sender,
    })
}

/// Decode a `/send` reply: any 2xx is a send, `message_id` is the external id.
pub fn decode_gateway_reply(status: u16, body: &str) -> Outcome {
    let raw = parse_body(status, body);
    if is_success(status) {
        let message_id = TransportId::field(&raw, "message_id");
        Outcome::sent(message_id, raw)
    } else {
        Outcome::failed(error_text(&raw, status), raw)
    }
}

/// Decode a `/send-bulk` reply into one outcome shared by the batch; `batch_id` is the
/// external id on success and failure alike.
pub fn decode_gateway_bulk_reply(status: u16, body: &str) -> Outcome {
    let raw = parse_body(status, body);
    let error = error_text(&raw, status);
    let batch_id = TransportId::field(&raw, "batch_id");
    let outcome = if is_success(status) {
        Outcome::sent(None, raw)
    } else {
        Outcome::failed(error, raw)
    };
    match batch_id {
        Some(batch_id) => outcome.with_external_id(batch_id),
        None => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutcomeStatus;

    #[test]
    fn encode_single_and_bulk_bodies() {
        assert_eq!(
            encode_send("+9779801002468", "hello", "Acme"),
            json!({"recipient": "+9779801002468", "message": "hello", "sender": "Acme"})
        );
        let recipients = vec!["+9779801002468".to_owned(), "+9779812345678".to_owned()];
        assert_eq!(
            encode_send_bulk(&recipients, "hello", "Acme"),
            json!({
                "recipients": ["+9779801002468", "+9779812345678"],
                "message": "hello",
                "sender": "Acme"
            })
        );
    }

    #[test]
    fn decode_success_reads_message_id() {
        let outcome = decode_gateway_reply(
            200,
            r#"{"success": true, "message_id": "msg_123456", "status": "sent"}"#,
        );
        assert_eq!(outcome.status, OutcomeStatus::Sent);
        assert_eq!(outcome.external_id.as_deref(), Some("msg_123456"));
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.raw_response["status"], "sent");
    }

    #[test]
    fn decode_success_without_id() {
        let outcome = decode_gateway_reply(202, "");
        assert!(outcome.is_sent());
        assert_eq!(outcome.external_id, None);
        assert_eq!(outcome.raw_response, json!({"http_status": 202}));
    }

    #[test]
    fn decode_failure_prefers_error_field() {
        let outcome = decode_gateway_reply(400, r#"{"success": false, "error": "Invalid recipient"}"#);
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("Invalid recipient"));
        assert_eq!(outcome.raw_response["error"], "Invalid recipient");
    }

    #[test]
    fn decode_failure_falls_back_to_message_then_status() {
        let outcome = decode_gateway_reply(422, r#"{"message": "The message field is required."}"#);
        assert_eq!(
            outcome.error.as_deref(),
            Some("The message field is required.")
        );

        let outcome = decode_gateway_reply(503, "Service Unavailable");
        assert_eq!(outcome.error.as_deref(), Some("HTTP 503"));
        assert_eq!(outcome.raw_response["body"], "Service Unavailable");
    }

    #[test]
    fn one_malformed_field_keeps_the_others() {
        let outcome = decode_gateway_reply(200, r#"{"message_id": "m-1", "batch_id": {"x": 1}}"#);
        assert!(outcome.is_sent());
        assert_eq!(outcome.external_id.as_deref(), Some("m-1"));

        let outcome = decode_gateway_bulk_reply(200, r#"{"batch_id": "b-2", "message_id": [1]}"#);
        assert_eq!(outcome.external_id.as_deref(), Some("b-2"));

        let outcome =
            decode_gateway_reply(400, r#"{"message_id": {"x": 1}, "message": "Invalid sender"}"#);
        assert_eq!(outcome.error.as_deref(), Some("Invalid sender"));
    }

    #[test]
    fn decode_bulk_keeps_batch_id_on_both_paths() {
        let ok = decode_gateway_bulk_reply(200, r#"{"batch_id": "b-77", "accepted": 2}"#);
        assert!(ok.is_sent());
        assert_eq!(ok.external_id.as_deref(), Some("b-77"));

        let failed = decode_gateway_bulk_reply(500, r#"{"batch_id": 77, "error": "queue full"}"#);
        assert!(!failed.is_sent());
        assert_eq!(failed.external_id.as_deref(), Some("77"));
        assert_eq!(failed.error.as_deref(), Some("queue full"));
    }
}
