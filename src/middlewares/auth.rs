use crate::error::AppError;
use actix_web::http::Method;
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

// 受保护路径配置
struct ProtectedPaths {
    prefix_paths: Vec<&'static str>,
}

impl ProtectedPaths {
    fn new() -> Self {
        Self {
            // 前缀匹配的管理路径，其余全部公开
            prefix_paths: vec!["/api/v1/admin"],
        }
    }

    fn is_protected_path(&self, path: &str) -> bool {
        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

/// Shared-token guard for the admin surface. Everything outside
/// `/api/v1/admin` (webhooks, the redemption API, swagger) stays open.
pub struct AdminAuthMiddleware {
    token: String,
}

impl AdminAuthMiddleware {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddlewareService {
            service,
            token: self.token.clone(),
            protected_paths: ProtectedPaths::new(),
        }))
    }
}

pub struct AdminAuthMiddlewareService<S> {
    service: S,
    token: String,
    protected_paths: ProtectedPaths,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if !self.protected_paths.is_protected_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        // 未配置令牌时关闭整个管理面
        if self.token.is_empty() {
            let error = AppError::AuthError("Admin API is disabled".to_string());
            return Box::pin(async move { Err(error.into()) });
        }

        let provided = req
            .headers()
            .get("X-Admin-Token")
            .and_then(|v| v.to_str().ok());

        if provided == Some(self.token.as_str()) {
            let fut = self.service.call(req);
            Box::pin(fut)
        } else {
            let error = AppError::AuthError("Missing or invalid admin token".to_string());
            Box::pin(async move { Err(error.into()) })
        }
    }
}
