use crate::error::AppResult;
use crate::external::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, TelegramService, Update,
};
use crate::services::{GiftService, PaymentService};

pub const CALLBACK_BUY_KEY: &str = "BUY_KEY";
pub const CALLBACK_STATS: &str = "STATS";
pub const CALLBACK_CANCEL_PREFIX: &str = "CANCEL:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotAction {
    Buy,
    Stats,
    Cancel(i64),
}

/// Maps raw callback data onto a bot action. Anything unrecognized is
/// dropped by the dispatcher.
pub fn parse_callback(data: &str) -> Option<BotAction> {
    match data {
        CALLBACK_BUY_KEY => Some(BotAction::Buy),
        CALLBACK_STATS => Some(BotAction::Stats),
        _ => {
            let gift_id = data.strip_prefix(CALLBACK_CANCEL_PREFIX)?;
            gift_id.parse().ok().map(BotAction::Cancel)
        }
    }
}

/// Routes inbound bot updates to the reservation and payment flows. The HTTP
/// handler has already acknowledged the provider by the time this runs, so
/// failures here are terminal for the delivery attempt.
#[derive(Clone)]
pub struct BotService {
    gifts: GiftService,
    payments: PaymentService,
    telegram: TelegramService,
    webhook_secret: Option<String>,
}

impl BotService {
    pub fn new(
        gifts: GiftService,
        payments: PaymentService,
        telegram: TelegramService,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            gifts,
            payments,
            telegram,
            webhook_secret,
        }
    }

    /// Expected X-Telegram-Bot-Api-Secret-Token value, when configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref()
    }

    pub async fn handle_update(&self, update: Update) -> AppResult<()> {
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        if let Some(callback) = update.callback_query {
            return self.handle_callback(callback).await;
        }

        log::debug!("Ignoring update {} without message or callback", update.update_id);
        Ok(())
    }

    /// Any text message gets the storefront menu; there is nothing else to
    /// type at this bot.
    async fn handle_message(&self, message: Message) -> AppResult<()> {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::callback("🔑 Buy a key", CALLBACK_BUY_KEY),
                InlineKeyboardButton::callback("📊 Stats", CALLBACK_STATS),
            ]],
        };

        self.telegram
            .send_message_with_keyboard(
                message.chat.id,
                "🎁 Welcome to the gift shop!\nA limited pool of keys is on sale. Pick an action:",
                &keyboard,
            )
            .await
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> AppResult<()> {
        // 先停掉按钮上的加载动画，结果稍后单独发消息
        if let Err(e) = self.telegram.answer_callback_query(&callback.id).await {
            log::warn!("Failed to answer callback query {}: {e}", callback.id);
        }

        let chat_id = callback
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(callback.from.id);
        let tg_user_id = callback.from.id;

        let Some(action) = callback.data.as_deref().and_then(parse_callback) else {
            log::warn!(
                "Unknown callback data {:?} from user {tg_user_id}",
                callback.data
            );
            return Ok(());
        };

        match action {
            BotAction::Buy => self.handle_buy(chat_id, tg_user_id).await,
            BotAction::Stats => self.handle_stats(chat_id).await,
            BotAction::Cancel(gift_id) => self.handle_cancel(chat_id, tg_user_id, gift_id).await,
        }
    }

    async fn handle_buy(&self, chat_id: i64, tg_user_id: i64) -> AppResult<()> {
        let Some(gift) = self.gifts.reserve(tg_user_id).await? else {
            // 无候选是正常结果，不是错误
            return self
                .telegram
                .send_message(chat_id, "😔 Sold out, no keys left.")
                .await;
        };

        log::info!("Gift {} reserved by user {tg_user_id}", gift.id);

        match self.payments.initiate_payment(gift.id, tg_user_id).await {
            Ok(handle) => {
                let keyboard = InlineKeyboardMarkup {
                    inline_keyboard: vec![
                        vec![InlineKeyboardButton::link("💳 Pay", &handle.confirmation_url)],
                        vec![InlineKeyboardButton::callback(
                            "❌ Cancel",
                            &format!("{CALLBACK_CANCEL_PREFIX}{}", gift.id),
                        )],
                    ],
                };
                self.telegram
                    .send_message_with_keyboard(
                        chat_id,
                        "🔑 A key is reserved for you. Complete the payment to receive the code:",
                        &keyboard,
                    )
                    .await
            }
            Err(e) => {
                // 支付创建失败就立即放回池子，不留半占用的礼品
                log::error!("Failed to initiate payment for gift {}: {e}", gift.id);
                if let Err(cancel_err) = self.gifts.cancel(gift.id).await {
                    log::error!(
                        "Failed to release gift {} after payment failure: {cancel_err}",
                        gift.id
                    );
                }
                self.telegram
                    .send_message(chat_id, "⚠️ Payment is unavailable right now, try again later.")
                    .await
            }
        }
    }

    async fn handle_stats(&self, chat_id: i64) -> AppResult<()> {
        let stats = self.gifts.stats().await?;
        let vip_line = if stats.vip_used {
            "the vip gift is gone"
        } else {
            "the vip gift is still in play"
        };

        self.telegram
            .send_message(
                chat_id,
                &format!("📊 {} keys left, {vip_line}.", stats.normal_available),
            )
            .await
    }

    async fn handle_cancel(&self, chat_id: i64, tg_user_id: i64, gift_id: i64) -> AppResult<()> {
        // 回调数据可被伪造，取消前核对持有人
        let owned = self
            .gifts
            .find_by_id(gift_id)
            .await?
            .is_some_and(|g| g.tg_user_id == Some(tg_user_id));

        if !owned {
            log::warn!("User {tg_user_id} tried to cancel gift {gift_id} they do not hold");
            return self
                .telegram
                .send_message(chat_id, "Nothing to cancel.")
                .await;
        }

        let released = self.gifts.cancel(gift_id).await?;
        let text = if released {
            "✅ Reservation cancelled, the key is back on sale."
        } else {
            "Nothing to cancel."
        };

        self.telegram.send_message(chat_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buy_callback() {
        assert_eq!(parse_callback("BUY_KEY"), Some(BotAction::Buy));
    }

    #[test]
    fn test_parse_stats_callback() {
        assert_eq!(parse_callback("STATS"), Some(BotAction::Stats));
    }

    #[test]
    fn test_parse_cancel_callback() {
        assert_eq!(parse_callback("CANCEL:42"), Some(BotAction::Cancel(42)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_callback(""), None);
        assert_eq!(parse_callback("CANCEL:"), None);
        assert_eq!(parse_callback("CANCEL:abc"), None);
        assert_eq!(parse_callback("buy_key"), None);
        assert_eq!(parse_callback("DROP TABLE gifts"), None);
    }
}
