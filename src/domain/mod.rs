//! Domain layer: strong types, delivery records and recipient rules (no I/O).

mod outcome;
mod record;
mod rule;
mod validation;
mod value;

pub use outcome::{BulkOutcome, DeliveryStatus, ErrorDescriptor, Outcome, OutcomeStatus};
pub use record::{DeliverySummary, MessageQuery, NewSentMessage, SentMessage};
pub use rule::RecipientRule;
pub use validation::ValidationError;
pub use value::{MessageText, Recipient, SenderId};
