//! Localhost HTTP bridge that lets a chat bot query live game server state:
//! account links, vote cooldowns and templated values.
//!
//! The gateway owns request admission (per-client rate limiting, bearer
//! auth, method and body checks), input validation and TTL caching. The
//! data itself comes from capability providers bound at construction, see
//! [`providers`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod rate_limit;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod validate;

pub use config::Args;
pub use error::{ApiError, ApiResult};
pub use providers::Providers;
pub use router::build_router;
pub use state::AppState;
