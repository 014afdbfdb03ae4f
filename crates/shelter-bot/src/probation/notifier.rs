use tracing::info;

use super::domain::ChatId;

/// Outbound messaging seam. Delivery is best effort; callers decide what a failure means.
pub trait Notifier: Send + Sync {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError>;
}

/// Message dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected ({code}): {description}")]
    Rejected { code: i64, description: String },
}

/// Writes notifications to the log instead of delivering them. Used when no bot token is
/// configured and for dry-run sweeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        info!(%chat_id, text, "notification not delivered (log only)");
        Ok(())
    }
}
