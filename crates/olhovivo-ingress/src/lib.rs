//! Olho Vivo Proxy Ingress
//!
//! This crate provides the HTTP surface of the proxy:
//! - `GET /api/buscar?termos=...` line search endpoint
//! - Shared middleware (request context, CORS, security headers)

pub mod buscar;
pub mod middleware;
pub mod types;

pub use buscar::{BuscarState, CACHE_CONTROL_VALUE, router};
pub use types::{IngressError, IngressResult, RequestId, RequestMetadata};
