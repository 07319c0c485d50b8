use crate::dispatch::{DispatchError, DispatchService};
use crate::domain::{MessageText, Recipient, SenderId, SentMessage, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Recipient argument accepted by [`MessageBuilder::to`]: one address or a list.
pub enum Recipients {
    #[default]
    Unset,
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Unset => Vec::new(),
            Self::One(recipient) => vec![recipient],
            Self::Many(recipients) => recipients,
        }
    }
}

impl From<&str> for Recipients {
    fn from(value: &str) -> Self {
        Self::One(value.to_owned())
    }
}

impl From<String> for Recipients {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&String> for Recipients {
    fn from(value: &String) -> Self {
        Self::One(value.clone())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(value: Vec<&str>) -> Self {
        Self::Many(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[String]> for Recipients {
    fn from(value: &[String]) -> Self {
        Self::Many(value.to_vec())
    }
}

impl From<&[&str]> for Recipients {
    fn from(value: &[&str]) -> Self {
        Self::Many(value.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Recipients {
    fn from(value: [&str; N]) -> Self {
        Self::Many(value.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[String; N]> for Recipients {
    fn from(value: [String; N]) -> Self {
        Self::Many(value.into())
    }
}

#[derive(Debug, Clone)]
#[must_use = "a MessageBuilder does nothing until send() or send_bulk() is awaited"]
/// Fluent request for [`DispatchService`].
///
/// ```no_run
/// # async fn demo(service: &smsgate::DispatchService) -> Result<(), smsgate::DispatchError> {
/// let record = service
///     .builder()
///     .to("+9779801002468")
///     .message("Your OTP is 4821")
///     .from("Acme")
///     .send()
///     .await?;
/// # let _ = record;
/// # Ok(())
/// # }
/// ```
pub struct MessageBuilder<'a> {
    service: &'a DispatchService,
    recipients: Recipients,
    message: Option<String>,
    sender: Option<String>,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(service: &'a DispatchService) -> Self {
        Self {
            service,
            recipients: Recipients::Unset,
            message: None,
            sender: None,
        }
    }

    /// Set the recipient or recipients.
    ///
    /// Surrounding whitespace is trimmed from each address before dispatch, so the trimmed form
    /// is what the provider receives and what the record stores. Nothing else is rewritten.
    pub fn to(mut self, recipients: impl Into<Recipients>) -> Self {
        self.recipients = recipients.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Override the service's default sender for this request.
    ///
    /// The sender is stored on the delivery record only. Providers receive just the recipient
    /// and the message, so the HTTP gateway still sends its configured sender and the batch
    /// gateway sends none.
    pub fn from(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Send to exactly one recipient. A one-element list is accepted; more is an error.
    pub async fn send(self) -> Result<SentMessage, DispatchError> {
        let recipient = match self.recipients {
            Recipients::Unset => {
                return Err(ValidationError::Empty {
                    field: Recipient::FIELD,
                }
                .into());
            }
            Recipients::One(recipient) => recipient,
            Recipients::Many(mut recipients) => match recipients.len() {
                0 => {
                    return Err(ValidationError::Empty {
                        field: Recipient::FIELD,
                    }
                    .into());
                }
                1 => recipients.remove(0),
                count => return Err(ValidationError::UseBulkSend { recipients: count }.into()),
            },
        };
        let recipient = Recipient::new(recipient)?;
        let message = MessageText::new(self.message.unwrap_or_default())?;
        let sender = self.sender.map(SenderId::new).transpose()?;

        self.service
            .send(
                recipient.as_str(),
                message.as_str(),
                sender.as_ref().map(SenderId::as_str),
            )
            .await
    }

    /// Send to every recipient in one provider call. A single address is treated as a list of one.
    pub async fn send_bulk(self) -> Result<Vec<SentMessage>, DispatchError> {
        let recipients = self
            .recipients
            .into_vec()
            .into_iter()
            .map(|recipient| Recipient::new(recipient).map(Recipient::into_string))
            .collect::<Result<Vec<_>, _>>()?;
        if recipients.is_empty() {
            return Err(ValidationError::Empty {
                field: Recipient::LIST_FIELD,
            }
            .into());
        }
        let message = MessageText::new(self.message.unwrap_or_default())?;
        let sender = self.sender.map(SenderId::new).transpose()?;

        self.service
            .send_bulk(
                &recipients,
                message.as_str(),
                sender.as_ref().map(SenderId::as_str),
            )
            .await
    }
}
