pub mod diagnostics_handler;

pub use diagnostics_handler::*;
