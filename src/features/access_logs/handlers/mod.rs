pub mod access_log_handler;

pub use access_log_handler::*;
