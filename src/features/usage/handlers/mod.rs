pub mod usage_handler;

pub use usage_handler::*;
