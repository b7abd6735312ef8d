//! # Cadence Notify
//!
//! Posts finished runs to webhooks. Two payload shapes are supported: the
//! run record itself for generic receivers, and a one-line text message for
//! Slack-style incoming webhooks.

mod error;
mod notifier;
mod payload;

pub use error::NotifyError;
pub use notifier::{DEFAULT_TIMEOUT, Notifier, WebhookNotifier};
pub use payload::{PayloadKind, SlackPayload, build_payload};
