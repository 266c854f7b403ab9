use crate::external::Update;
use crate::services::BotService;
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, warn};

/// Telegram webhook处理器
///
/// 提供方按 at-least-once 投递；必须先确认收到再处理，否则超时会触发重投。
pub async fn telegram_webhook(
    req: HttpRequest,
    body: web::Bytes,
    bot_service: web::Data<BotService>,
) -> Result<HttpResponse> {
    // 配置了 secret token 时校验来源
    if let Some(expected) = bot_service.webhook_secret() {
        let provided = req
            .headers()
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            warn!("Rejected telegram update with missing or wrong secret token");
            return Ok(HttpResponse::Forbidden().json(serde_json::json!({
                "error": "Invalid secret token"
            })));
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            // 格式错误的更新：确认并丢弃
            warn!("Dropping malformed telegram update: {e}");
            return Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })));
        }
    };

    // 先响应再处理；处理失败对该次投递而言是终态
    let bot = bot_service.get_ref().clone();
    tokio::spawn(async move {
        let update_id = update.update_id;
        if let Err(e) = bot.handle_update(update).await {
            error!("Failed to process telegram update {update_id}: {e}");
        }
    });

    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

/// 配置telegram webhook路由
pub fn telegram_webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/telegram", web::post().to(telegram_webhook));
}
