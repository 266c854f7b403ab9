use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

// 入站 webhook 更新（仅保留用到的字段）

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

// 出站消息键盘

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: &str, data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: Some(data.to_string()),
            url: None,
        }
    }

    pub fn link(text: &str, url: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: None,
            url: Some(url.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramService {
    client: Client,
    config: TelegramConfig,
}

impl TelegramService {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn admin_chat_id(&self) -> i64 {
        self.config.admin_chat_id
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> AppResult<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        );

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Telegram API {method} failed: {error_text}"
            )));
        }

        let reply: ApiReply = response.json().await?;
        if !reply.ok {
            return Err(AppError::ExternalApiError(format!(
                "Telegram API {method} rejected: {}",
                reply.description.unwrap_or_default()
            )));
        }

        Ok(())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    pub async fn send_message_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &InlineKeyboardMarkup,
    ) -> AppResult<()> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "reply_markup": keyboard,
            }),
        )
        .await
    }

    /// Stops the client-side loading spinner on a pressed button.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> AppResult<()> {
        self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_query_id }),
        )
        .await
    }

    /// Registers the inbound webhook URL with the Bot API. Called once at startup.
    pub async fn set_webhook(&self, url: &str) -> AppResult<()> {
        let mut payload = json!({ "url": url });
        if let Some(secret) = &self.config.secret_token {
            payload["secret_token"] = json!(secret);
        }
        self.call("setWebhook", payload).await
    }

    /// Notify the admin chat, logging instead of failing: a notification must
    /// never undo or block a committed state transition.
    pub async fn notify_admin(&self, text: &str) {
        if self.config.admin_chat_id == 0 {
            return;
        }
        if let Err(e) = self.send_message(self.config.admin_chat_id, text).await {
            log::warn!("Failed to notify admin chat: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_update() {
        let raw = r#"{
            "update_id": 1001,
            "callback_query": {
                "id": "cbq-1",
                "from": {"id": 42, "username": "buyer", "first_name": "B"},
                "data": "BUY_KEY",
                "message": {"message_id": 7, "chat": {"id": 42}}
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        let cb = update.callback_query.expect("callback_query");
        assert_eq!(cb.from.id, 42);
        assert_eq!(cb.data.as_deref(), Some("BUY_KEY"));
        assert!(update.message.is_none());
    }

    #[test]
    fn test_parse_text_update() {
        let raw = r#"{
            "update_id": 1002,
            "message": {
                "message_id": 8,
                "chat": {"id": 99},
                "from": {"id": 99, "first_name": "A"},
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        let msg = update.message.expect("message");
        assert_eq!(msg.chat.id, 99);
        assert_eq!(msg.text.as_deref(), Some("/start"));
    }

    #[test]
    fn test_keyboard_serialization_skips_empty_fields() {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::callback("Buy", "BUY_KEY")]],
        };
        let json = serde_json::to_value(&keyboard).unwrap();
        let button = &json["inline_keyboard"][0][0];
        assert_eq!(button["callback_data"], "BUY_KEY");
        assert!(button.get("url").is_none());
    }
}
