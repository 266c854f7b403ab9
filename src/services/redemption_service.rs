use crate::error::AppResult;
use crate::external::TelegramService;
use crate::models::GiftSummary;
use crate::services::GiftService;

/// Redemption gate for the front-end: read-only code checks and the one-way
/// used transition. The admin chat is told about every hit for audit
/// visibility.
#[derive(Clone)]
pub struct RedemptionService {
    gifts: GiftService,
    telegram: TelegramService,
}

impl RedemptionService {
    pub fn new(gifts: GiftService, telegram: TelegramService) -> Self {
        Self { gifts, telegram }
    }

    /// Case-insensitive lookup of a paid, unused code. Causes no mutation.
    pub async fn check_code(&self, code: &str) -> AppResult<Option<GiftSummary>> {
        let Some(gift) = self.gifts.find_redeemable(code).await? else {
            return Ok(None);
        };

        self.telegram
            .notify_admin(&format!("🔎 Gift code {} checked by the front-end", gift.code))
            .await;

        Ok(Some(GiftSummary::from(gift)))
    }

    /// Burns a code. Concurrent or repeated attempts succeed for exactly one
    /// caller; unknown and already-used codes get the same negative answer.
    pub async fn use_code(&self, code: &str) -> AppResult<bool> {
        let Some(gift) = self.gifts.use_code(code).await? else {
            return Ok(false);
        };

        log::info!("Gift {} redeemed (code {})", gift.id, gift.code);

        self.telegram
            .notify_admin(&format!(
                "🎁 Gift #{} ({}) redeemed by user {}",
                gift.id,
                gift.code,
                gift.tg_user_id.unwrap_or_default()
            ))
            .await;

        Ok(true)
    }
}
