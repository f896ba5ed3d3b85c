use sha2::{Digest, Sha256};

use crate::cache::TtlCache;
use crate::config::Args;
use crate::models::{LinkResult, VoteSiteStatus};
use crate::providers::Providers;
use crate::rate_limit::RateLimiter;

// app's shared state; the limiter and caches are the only mutable parts

pub struct AppState {
    token_digest: Vec<u8>,
    pub rate_limiter: RateLimiter,
    pub link_cache: TtlCache<String, LinkResult>, // discord id -> link
    pub vote_cache: TtlCache<String, Vec<VoteSiteStatus>>, // player uuid -> sites
    pub providers: Providers,
    pub server_version: String,
    pub log_requests: bool,
}

impl AppState {
    pub fn new(args: &Args, providers: Providers) -> Self {
        Self {
            token_digest: digest(&args.token),
            rate_limiter: RateLimiter::new(args.max_per_second, args.max_per_minute),
            link_cache: TtlCache::new("link", args.link_cache_ttl()),
            vote_cache: TtlCache::new("vote", args.vote_cache_ttl()),
            providers,
            server_version: args.server_version.clone(),
            log_requests: args.log_requests,
        }
    }

    /// Compares digests so the time taken does not depend on how much of
    /// the secret the caller guessed.
    pub fn token_matches(&self, presented: &str) -> bool {
        digest(presented) == self.token_digest
    }

    // Drop idle rate windows and expired cache entries
    pub fn sweep(&self) -> usize {
        self.rate_limiter.sweep()
            + self.link_cache.purge_expired()
            + self.vote_cache.purge_expired()
    }
}

fn digest(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}
