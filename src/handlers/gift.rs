use crate::models::{CheckGiftResponse, UseGiftResponse};
use crate::services::{GiftService, RedemptionService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/check-gift/{code}",
    tag = "gift",
    params(
        ("code" = String, Path, description = "礼品码（大小写不敏感）")
    ),
    responses(
        (status = 200, description = "查询结果", body = CheckGiftResponse),
        (status = 500, description = "存储不可用")
    )
)]
pub async fn check_gift(
    redemption_service: web::Data<RedemptionService>,
    code: web::Path<String>,
) -> Result<HttpResponse> {
    match redemption_service.check_code(&code).await {
        Ok(gift) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CheckGiftResponse {
                found: gift.is_some(),
                gift,
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/use-gift/{code}",
    tag = "gift",
    params(
        ("code" = String, Path, description = "礼品码（大小写不敏感）")
    ),
    responses(
        (status = 200, description = "兑换结果；未知码与已用码返回相同的否定信号", body = UseGiftResponse),
        (status = 500, description = "存储不可用")
    )
)]
pub async fn use_gift(
    redemption_service: web::Data<RedemptionService>,
    code: web::Path<String>,
) -> Result<HttpResponse> {
    match redemption_service.use_code(&code).await {
        Ok(ok) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": UseGiftResponse { ok }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "gift",
    responses(
        (status = 200, description = "剩余礼品统计", body = crate::models::StatsResponse),
        (status = 500, description = "存储不可用")
    )
)]
pub async fn stats(gift_service: web::Data<GiftService>) -> Result<HttpResponse> {
    match gift_service.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn gift_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/check-gift/{code}", web::get().to(check_gift))
        .route("/use-gift/{code}", web::post().to(use_gift))
        .route("/stats", web::get().to(stats));
}
