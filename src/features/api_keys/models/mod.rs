mod api_key;
mod principal;

pub use api_key::ApiKey;
pub use principal::{ApiPrincipal, KeySource};
