pub mod service;
pub mod validation;

pub use service::{Authenticator, DEFAULT_SESSION_TTL_HOURS};
