//! Thin HTTP consumer of the secret lifecycle: a banner, health, and the
//! debug/admin routes.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::{start_api_server, start_api_server_with_shutdown};
