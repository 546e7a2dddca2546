mod api_key_dto;

pub use api_key_dto::*;
