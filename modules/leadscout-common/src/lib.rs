pub mod config;
pub mod error;
pub mod fingerprint;
pub mod phone;
pub mod safety;
pub mod types;

pub use config::Config;
pub use error::LeadScoutError;
pub use fingerprint::{fingerprint, identity_key, normalize_name, normalize_text};
pub use phone::normalize_phone;
pub use safety::{validate_search_input, SearchInput};
pub use types::*;
