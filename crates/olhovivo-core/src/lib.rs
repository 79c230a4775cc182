//! Olho Vivo Proxy Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout the proxy:
//! - Request-scoped values (token, session cookie, search query)
//! - The `TransitApi` trait describing the two upstream steps
//! - Core error taxonomy and the JSON error body

pub mod error;
pub mod transit;
pub mod types;

pub use error::{Error, Result};
pub use transit::TransitApi;
pub use types::{ApiToken, ErrorResponse, SearchQuery, SessionCookie};
