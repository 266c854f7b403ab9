use crate::error::AppError;
use crate::models::{GiftQuery, SeedGiftsRequest};
use crate::services::GiftService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/gifts",
    tag = "admin",
    request_body = SeedGiftsRequest,
    security(
        ("admin_token" = [])
    ),
    responses(
        (status = 200, description = "入库成功，返回生成的礼品码", body = crate::models::SeedGiftsResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "缺少或错误的管理令牌")
    )
)]
pub async fn seed_gifts(
    gift_service: web::Data<GiftService>,
    request: web::Json<SeedGiftsRequest>,
) -> Result<HttpResponse> {
    if request.count == 0 || request.count > 1000 {
        return Ok(AppError::ValidationError(
            "count must be between 1 and 1000".to_string(),
        )
        .error_response());
    }

    match gift_service
        .seed_gifts(request.count, request.gift_type)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/gifts",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<String>, Query, description = "状态: free/reserved/waiting_payment/paid/used")
    ),
    security(
        ("admin_token" = [])
    ),
    responses(
        (status = 200, description = "礼品列表"),
        (status = 401, description = "缺少或错误的管理令牌")
    )
)]
pub async fn list_gifts(
    gift_service: web::Data<GiftService>,
    query: web::Query<GiftQuery>,
) -> Result<HttpResponse> {
    match gift_service.list_gifts(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/gifts", web::post().to(seed_gifts))
            .route("/gifts", web::get().to(list_gifts)),
    );
}
