pub mod gift;
pub mod pagination;

pub use gift::*;
pub use pagination::*;
