//! Notification delivery.
//!
//! Reports go out through the Telegram Bot API. Long messages are split on
//! line boundaries; each chunk is retried with linear backoff.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use econ_common::config::{Config, TelegramConfig};
use econ_common::util::{sanitize_for_log, truncate_with_ellipsis};

/// Telegram's per-message limit.
const MAX_MESSAGE_LEN: usize = 4096;

/// A channel that delivers rendered reports.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Deliver a message. Failures are logged and reported as `false`.
    async fn send(&self, text: &str) -> bool;
}

/// `sendMessage` request body
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    retry_count: u32,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// Create a notifier. Missing credentials leave it disabled.
    pub fn new(bot_token: Option<&str>, chat_id: Option<&str>, config: &TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            bot_token: bot_token.unwrap_or_default().trim().to_string(),
            chat_id: chat_id.unwrap_or_default().trim().to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry_count: config.retry_count.max(1),
            client,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.telegram_bot_token(),
            config.telegram_chat_id(),
            &config.telegram,
        )
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Send one chunk, retrying with `500ms * attempt` backoff.
    async fn send_chunk(&self, chunk: &str) -> Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.retry_count {
            match self.try_send(chunk).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.retry_count,
                        error = %e,
                        "Failed to send Telegram message, retrying..."
                    );
                    last_error = Some(e);

                    if attempt < self.retry_count {
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }

    /// Send with HTML parsing, falling back to plain text on markup errors.
    async fn try_send(&self, chunk: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: chunk,
            parse_mode: Some("HTML"),
        };

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(sanitize_for_log(&e.to_string())))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        // Telegram answers "Bad Request: can't parse entities" for broken HTML
        if status == reqwest::StatusCode::BAD_REQUEST && error_text.contains("parse entities") {
            tracing::warn!(
                error = %truncate_with_ellipsis(&error_text, 200),
                "Telegram HTML parsing failed, retrying as plain text"
            );

            let plain = SendMessage {
                chat_id: &self.chat_id,
                text: chunk,
                parse_mode: None,
            };
            let response = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&plain)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!(sanitize_for_log(&e.to_string())))?;

            if response.status().is_success() {
                return Ok(());
            }

            let plain_error = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendMessage failed: {}", sanitize_for_log(&plain_error));
        }

        anyhow::bail!("HTTP {}: {}", status, sanitize_for_log(&error_text))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    async fn send(&self, text: &str) -> bool {
        if !self.is_enabled() {
            tracing::warn!("Telegram credentials missing, message not sent");
            return false;
        }

        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let total = chunks.len();

        for (idx, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.send_chunk(chunk).await {
                tracing::error!(
                    chunk = idx + 1,
                    total,
                    error = %e,
                    "Telegram delivery failed"
                );
                return false;
            }
        }

        tracing::info!(chat_id = %self.chat_id, chunks = total, "Telegram message sent");
        true
    }
}

/// Split a message into chunks of at most `max_len` bytes, preferring
/// paragraph and line breaks.
fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut boundary = max_len;
        while boundary > 0 && !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }
        if boundary == 0 {
            boundary = remaining.chars().next().map_or(1, char::len_utf8);
        }

        let window = &remaining[..boundary];
        let split_pos = window
            .rfind("\n\n")
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(' '))
            .filter(|&pos| pos > 0)
            .unwrap_or(boundary);

        chunks.push(remaining[..split_pos].to_string());
        remaining = remaining[split_pos..].trim_start();
    }

    chunks
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier_for(server: &MockServer, retry_count: u32) -> TelegramNotifier {
        let config = TelegramConfig {
            api_base: server.uri(),
            retry_count,
            timeout_secs: 5,
        };
        TelegramNotifier::new(Some("123:ABC"), Some("42"), &config)
    }

    #[tokio::test]
    async fn test_send_html() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "42",
                "text": "<b>hello</b>",
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(notifier_for(&server, 3).send("<b>hello</b>").await);
    }

    #[tokio::test]
    async fn test_html_error_falls_back_to_plain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"parse_mode": "HTML"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: can't parse entities: unclosed tag"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({"chat_id": "42", "text": "<b>broken"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(notifier_for(&server, 1).send("<b>broken").await);
    }

    #[tokio::test]
    async fn test_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        assert!(!notifier_for(&server, 2).send("report").await);
    }

    #[tokio::test]
    async fn test_long_message_sent_in_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(2)
            .mount(&server)
            .await;

        let line = "• Federal Funds Rate: 5.33% ➡️ 0.0%\n";
        let message = line.repeat(150);
        assert!(message.len() > MAX_MESSAGE_LEN);

        assert!(notifier_for(&server, 1).send(&message).await);
    }

    #[tokio::test]
    async fn test_disabled_without_credentials() {
        let config = TelegramConfig::default();
        let notifier = TelegramNotifier::new(None, Some("42"), &config);
        assert!(!notifier.is_enabled());
        assert!(!notifier.send("hello").await);

        let notifier = TelegramNotifier::new(Some("123:ABC"), Some("  "), &config);
        assert!(!notifier.is_enabled());
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let message = "aaaa\nbbbb\ncccc";
        let chunks = split_message(message, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let message = "📈".repeat(10);
        let chunks = split_message(&message, 6);

        assert!(chunks.iter().all(|c| c.len() <= 6));
        assert_eq!(chunks.concat(), message);
    }

    #[test]
    fn test_send_message_serialization() {
        let body = SendMessage {
            chat_id: "42",
            text: "hi",
            parse_mode: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, json!({"chat_id": "42", "text": "hi"}));
    }
}
