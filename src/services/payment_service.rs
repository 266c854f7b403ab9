use crate::config::ShopConfig;
use crate::error::{AppError, AppResult};
use crate::external::{
    EVENT_PAYMENT_CANCELED, PaymentEvent, PaymentGatewayService, PaymentHandle, TelegramService,
};
use crate::services::GiftService;

/// Payment initiation and webhook reconciliation. Every decision rests on a
/// status-conditioned update in [`GiftService`]; a duplicated or reordered
/// callback finds its precondition gone and becomes a no-op.
#[derive(Clone)]
pub struct PaymentService {
    gifts: GiftService,
    gateway: PaymentGatewayService,
    telegram: TelegramService,
    shop: ShopConfig,
}

impl PaymentService {
    pub fn new(
        gifts: GiftService,
        gateway: PaymentGatewayService,
        telegram: TelegramService,
        shop: ShopConfig,
    ) -> Self {
        Self {
            gifts,
            gateway,
            telegram,
            shop,
        }
    }

    /// Creates a gateway payment for a gift the requester currently holds and
    /// moves it to waiting_payment.
    ///
    /// Calling again while still pre-paid replaces the payment id
    /// (last-write-wins); once the gift is paid or used the call is rejected.
    /// If the gateway fails after the claim, the claim is kept and the caller
    /// decides whether to release it.
    pub async fn initiate_payment(
        &self,
        gift_id: i64,
        tg_user_id: i64,
    ) -> AppResult<PaymentHandle> {
        let gift = self
            .gifts
            .find_by_id(gift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Gift {gift_id} not found")))?;

        if !gift.status.is_pre_paid() {
            return Err(AppError::StateConflict(format!(
                "Gift {gift_id} is {} and cannot start a payment",
                gift.status
            )));
        }
        if gift.tg_user_id != Some(tg_user_id) {
            return Err(AppError::StateConflict(format!(
                "Gift {gift_id} is not held by user {tg_user_id}"
            )));
        }

        let description = format!("Gift code #{gift_id}");
        let handle = self
            .gateway
            .create_payment(gift_id, tg_user_id, &description)
            .await?;

        // 状态在附加支付前可能已被别的事件推进，按零行更新拒绝
        let attached = self.gifts.attach_payment(gift_id, &handle.payment_id).await?;
        if !attached {
            return Err(AppError::StateConflict(format!(
                "Gift {gift_id} left the pre-paid state before the payment could be attached"
            )));
        }

        Ok(handle)
    }

    /// Consumes one inbound gateway callback. At-least-once delivery is
    /// assumed: only the update that actually flips the row triggers the
    /// code message and the admin summary.
    pub async fn handle_event(&self, event: PaymentEvent) -> AppResult<()> {
        let Some((gift_id, tg_user_id)) = event.gift_ref() else {
            // 回调缺少元数据：确认并丢弃，不重试
            log::warn!(
                "Dropping payment event {} without gift metadata (payment {})",
                event.event,
                event.object.id
            );
            return Ok(());
        };

        if !event.is_success() {
            // 失败/取消：保留当前状态，交给后台清理或人工处理
            let outcome = if event.event == EVENT_PAYMENT_CANCELED {
                "canceled"
            } else {
                "not successful"
            };
            log::info!(
                "Payment {} for gift {gift_id} is {outcome}, leaving gift untouched",
                event.object.id
            );
            return Ok(());
        }

        let Some(gift) = self.gifts.mark_paid(gift_id).await? else {
            log::info!(
                "Duplicate or stale success callback for gift {gift_id} (payment {}), no-op",
                event.object.id
            );
            return Ok(());
        };

        log::info!(
            "Gift {gift_id} paid by user {tg_user_id} via payment {}",
            event.object.id
        );

        // 通知尽力而为，绝不回滚已提交的状态
        let recipient = gift.tg_user_id.unwrap_or(tg_user_id);
        let buyer_text = format!(
            "✅ Payment received!\n\nYour gift code: <code>{}</code>\nRedeem it at {}",
            gift.code, self.shop.frontend_url
        );
        if let Err(e) = self.telegram.send_message(recipient, &buyer_text).await {
            log::warn!("Failed to deliver gift code for gift {gift_id}: {e}");
        }

        self.telegram
            .notify_admin(&format!(
                "💰 Gift #{gift_id} ({}) sold to user {recipient}, payment {}",
                gift.code, event.object.id
            ))
            .await;

        Ok(())
    }
}
