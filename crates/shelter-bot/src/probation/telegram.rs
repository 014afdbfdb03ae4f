use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::domain::ChatId;
use super::notifier::{Notifier, NotifyError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

/// Blocking Telegram Bot API client delivering `sendMessage` calls.
///
/// The client must be built and dropped outside an async runtime context; the service
/// keeps it on the dedicated sweep thread.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: send_message_endpoint(api_base, bot_token),
        })
    }
}

fn send_message_endpoint(api_base: &str, bot_token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token)
}

fn interpret_response(body: BotApiResponse) -> Result<(), NotifyError> {
    if body.ok {
        return Ok(());
    }
    Err(NotifyError::Rejected {
        code: body.error_code.unwrap_or_default(),
        description: body
            .description
            .unwrap_or_else(|| "no description".to_string()),
    })
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier").finish_non_exhaustive()
    }
}

impl Notifier for TelegramNotifier {
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessageRequest {
                chat_id: chat_id.0,
                text,
            })
            .send()
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;

        let body: BotApiResponse = response
            .json()
            .map_err(|err| NotifyError::Transport(err.without_url().to_string()))?;
        interpret_response(body)
    }
}
