pub mod code_generator;

pub use code_generator::{generate_gift_code, generate_unique_gift_code};
