use serde::Deserialize;
use serde_json::Value;

/// Identifier returned by a gateway as either JSON string or JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(super) enum TransportId {
    String(String),
    Number(serde_json::Number),
}

impl TransportId {
    /// Read `key` from a reply object. Missing keys and values of any other shape yield `None`.
    pub(super) fn field(raw: &Value, key: &str) -> Option<String> {
        raw.get(key)
            .and_then(|value| Self::deserialize(value).ok())
            .and_then(Self::into_string)
    }

    pub(super) fn into_string(self) -> Option<String> {
        let value = match self {
            Self::String(value) => value,
            Self::Number(value) => value.to_string(),
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }
}
