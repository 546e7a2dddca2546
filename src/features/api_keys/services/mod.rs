mod api_key_service;
mod key_gate;

pub use api_key_service::ApiKeyService;
pub use key_gate::KeyGate;
