//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 server for the LexCompare engine: job
//! submission, live results, per-row context and admin statistics.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
pub use handler::{DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_RATE};
pub use rate_limiter::RateLimiter;
