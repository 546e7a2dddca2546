pub mod file_handler;

pub use file_handler::*;
