mod health;
mod link;
mod metrics;
mod placeholders;
mod vote;

pub use health::health_handler;
pub use link::resolve_link_handler;
pub use metrics::metrics_handler;
pub use placeholders::eval_placeholders_handler;
pub use vote::vote_next_handler;
