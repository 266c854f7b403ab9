use crate::external::PaymentEvent;
use crate::services::PaymentService;
use actix_web::{HttpResponse, Result, web};
use log::{error, info, warn};

/// 支付网关webhook处理器
///
/// 无论内部结果如何都返回200，防止网关重试风暴；幂等性由
/// 状态条件更新保证，而不是由响应码保证。
pub async fn payment_webhook(
    body: web::Bytes,
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse> {
    let event: PaymentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Dropping malformed payment callback: {e}");
            return Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })));
        }
    };

    info!(
        "Received payment event: {} (payment {})",
        event.event, event.object.id
    );

    let service = payment_service.get_ref().clone();
    tokio::spawn(async move {
        let payment_id = event.object.id.clone();
        if let Err(e) = service.handle_event(event).await {
            error!("Failed to process payment event for payment {payment_id}: {e}");
        }
    });

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

/// 配置支付webhook路由
pub fn payment_webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/payment", web::post().to(payment_webhook));
}
