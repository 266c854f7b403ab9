pub mod payment_gateway;
pub mod telegram;

pub use payment_gateway::*;
pub use telegram::*;
