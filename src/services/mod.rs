pub mod bot_service;
pub mod gift_service;
pub mod payment_service;
pub mod redemption_service;

pub use bot_service::*;
pub use gift_service::*;
pub use payment_service::*;
pub use redemption_service::*;
