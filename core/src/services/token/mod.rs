//! Flow token issuance
//!
//! A flow token is a short-lived HS256 JWT handed out after a code validates.
//! It binds the verified target and purpose so the next step of the flow
//! (registration completion, password reset) can trust them without a lookup.

mod config;
mod service;

pub use config::TokenIssuerConfig;
pub use service::{FlowTokenClaims, IssuedToken, TokenIssuer};
