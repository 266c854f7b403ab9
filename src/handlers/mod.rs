pub mod admin;
pub mod gift;
pub mod payment;
pub mod telegram;

pub use admin::admin_config;
pub use gift::gift_config;
pub use payment::payment_webhook_config;
pub use telegram::telegram_webhook_config;
