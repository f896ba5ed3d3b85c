use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOKEN: &str = "CHANGE_ME_TO_A_RANDOM_SECRET";

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "bot-bridge")]
#[command(about = "Localhost HTTP bridge exposing game server state to a chat bot")]
pub struct Args {
    // Address to bind; keep it on loopback unless a proxy sits in front
    #[arg(long, env = "BRIDGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "BRIDGE_PORT", default_value_t = 9585)]
    pub port: u16,

    // Shared bearer secret
    #[arg(long, env = "BRIDGE_TOKEN", default_value = DEFAULT_TOKEN, hide_env_values = true)]
    pub token: String,

    // Rate limit max requests per client per second
    #[arg(long, env = "BRIDGE_MAX_PER_SECOND", default_value_t = 10)]
    pub max_per_second: u32,

    // Rate limit max requests per client per minute
    #[arg(long, env = "BRIDGE_MAX_PER_MINUTE", default_value_t = 60)]
    pub max_per_minute: u32,

    // Link cache TTL in seconds
    #[arg(long, env = "BRIDGE_LINK_CACHE_TTL", default_value_t = 60)]
    pub link_cache_ttl: u64,

    // Vote cache TTL in seconds
    #[arg(long, env = "BRIDGE_VOTE_CACHE_TTL", default_value_t = 15)]
    pub vote_cache_ttl: u64,

    // Log one line per authenticated request
    #[arg(long, env = "BRIDGE_LOG_REQUESTS", default_value_t = true, action = ArgAction::Set)]
    pub log_requests: bool,

    // Host version reported by /health
    #[arg(long, env = "BRIDGE_SERVER_VERSION", default_value = "unknown")]
    pub server_version: String,

    // JSON file binding the in-memory providers
    #[arg(long, env = "BRIDGE_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    // Seconds in-flight requests get after a shutdown signal
    #[arg(long, env = "BRIDGE_SHUTDOWN_GRACE", default_value_t = 2)]
    pub shutdown_grace: u64,

    // Janitor interval in seconds
    #[arg(long, env = "BRIDGE_SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn link_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.link_cache_ttl)
    }

    pub fn vote_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.vote_cache_ttl)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn uses_default_token(&self) -> bool {
        self.token == DEFAULT_TOKEN
    }
}
