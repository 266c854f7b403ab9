pub mod auth;
pub mod cors;

pub use auth::AdminAuthMiddleware;
pub use cors::create_cors;
