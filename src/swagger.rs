use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Admin-Token"))),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::gift::check_gift,
        handlers::gift::use_gift,
        handlers::gift::stats,
        handlers::admin::seed_gifts,
        handlers::admin::list_gifts,
    ),
    components(
        schemas(
            Gift,
            GiftType,
            GiftStatus,
            GiftSummary,
            CheckGiftResponse,
            UseGiftResponse,
            StatsResponse,
            SeedGiftsRequest,
            SeedGiftsResponse,
            GiftQuery,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "gift", description = "Redemption front-end API"),
        (name = "admin", description = "Gift pool administration")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
