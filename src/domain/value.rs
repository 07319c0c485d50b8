use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Destination address of a message.
///
/// Invariant: non-empty after trimming. The engine treats the value as opaque; use
/// [`RecipientRule`](crate::domain::RecipientRule) at the request boundary to check its format.
pub struct Recipient(String);

impl Recipient {
    /// Field name used in validation errors and gateway payloads.
    pub const FIELD: &'static str = "recipient";

    /// Field name for a recipient collection.
    pub const LIST_FIELD: &'static str = "recipients";

    /// Create a validated (non-empty) recipient.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the trimmed address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS body text.
///
/// Invariant: non-empty after trimming. The original value (including whitespace) is preserved
/// and never truncated.
pub struct MessageText(String);

impl MessageText {
    /// Field name used in validation errors and gateway payloads.
    pub const FIELD: &'static str = "message";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Origin identifier shown to the recipient (`sender`).
///
/// Invariant: non-empty after trimming.
pub struct SenderId(String);

impl SenderId {
    /// Field name used in validation errors and gateway payloads.
    pub const FIELD: &'static str = "sender";

    /// Create a validated [`SenderId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated sender id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
