use serde_json::{Value, json};

use super::id::TransportId;
use super::{is_success, parse_body};
use crate::domain::Outcome;

/// `responseCode` the batch gateway uses for an accepted request.
const ACCEPTED: i64 = 100;

/// `responseCode` as a number or a numeric string.
fn response_code(raw: &Value) -> Option<i64> {
    match raw.get("responseCode")? {
        Value::Number(code) => code.as_i64(),
        Value::String(code) => code.trim().parse().ok(),
        _ => None,
    }
}

/// Body for the single-message endpoint.
pub fn encode_batch_single(recipient: &str, message: &str, date: &str) -> Value {
    json!({
        "Message": message,
        "ReceiverNo": recipient,
        "IsClientLogin": "N",
        "Date": date,
    })
}

/// Body for the bulk endpoint: one `SmsDetails` entry per recipient, in order.
pub fn encode_batch_bulk(recipients: &[String], message: &str, batch_id: &str, date: &str) -> Value {
    let details = recipients
        .iter()
        .map(|recipient| json!({ "Message": message, "ReceiverNo": recipient }))
        .collect::<Vec<_>>();
    json!({
        "SmsDetails": details,
        "BatchId": batch_id,
        "Date": date,
        "IsClientLogin": "N",
    })
}

/// Decode a reply from either endpoint. Only a 2xx with `responseCode == 100` is a send.
///
/// Fields are read independently, so a malformed `messageId` or `responseDescription` never
/// hides the response code.
pub fn decode_batch_reply(status: u16, body: &str) -> Outcome {
    let raw = parse_body(status, body);

    if is_success(status) && response_code(&raw) == Some(ACCEPTED) {
        let message_id = TransportId::field(&raw, "messageId");
        return Outcome::sent(message_id, raw);
    }

    let error = raw
        .get("responseDescription")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map_or_else(|| "Unknown error".to_owned(), str::to_owned);
    Outcome::failed(error, raw)
}
