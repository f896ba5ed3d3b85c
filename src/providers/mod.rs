//! Capability interfaces consumed by the gateway.
//!
//! Each capability is bound once at construction, either to a real adapter
//! or to [`Unavailable`]. Handlers probe `is_available` once per request and
//! answer `503` when it is false.

mod memory;

pub use memory::{
    FixtureError, Fixtures, LinkedAccount, MemoryLinks, MemoryPlaceholders, MemoryVotes,
    VoteSiteFixture,
};

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Integrations, LinkResult, VoteSiteStatus};

/// Failure raised inside a provider adapter.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("capability is not available")]
    Unavailable,

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Resolves a Discord account to its linked game account.
pub trait LinkResolver: Send + Sync {
    fn is_available(&self) -> bool;

    fn resolve_link(&self, discord_id: &str) -> Result<LinkResult, ProviderError>;
}

/// Reports per-site vote cooldowns for a player.
pub trait VoteStatusSource: Send + Sync {
    fn is_available(&self) -> bool;

    fn vote_status(&self, uuid: &str) -> Result<Vec<VoteSiteStatus>, ProviderError>;
}

/// Expands `%token%` templates for a player.
///
/// Only tokens that already passed the format check and the denylist are
/// passed in. Tokens missing from the returned map are reported as `ERROR`.
pub trait PlaceholderEvaluator: Send + Sync {
    fn is_available(&self) -> bool;

    fn evaluate(
        &self,
        uuid: &str,
        tokens: &[String],
    ) -> Result<HashMap<String, String>, ProviderError>;
}

// Stub bound to every capability the host does not provide
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl LinkResolver for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn resolve_link(&self, _discord_id: &str) -> Result<LinkResult, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

impl VoteStatusSource for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn vote_status(&self, _uuid: &str) -> Result<Vec<VoteSiteStatus>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

impl PlaceholderEvaluator for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        _uuid: &str,
        _tokens: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

/// The three capabilities handed to the gateway.
#[derive(Clone)]
pub struct Providers {
    pub links: Arc<dyn LinkResolver>,
    pub votes: Arc<dyn VoteStatusSource>,
    pub placeholders: Arc<dyn PlaceholderEvaluator>,
}

impl Providers {
    pub fn unavailable() -> Self {
        Self {
            links: Arc::new(Unavailable),
            votes: Arc::new(Unavailable),
            placeholders: Arc::new(Unavailable),
        }
    }

    pub fn with_links(mut self, links: impl LinkResolver + 'static) -> Self {
        self.links = Arc::new(links);
        self
    }

    pub fn with_votes(mut self, votes: impl VoteStatusSource + 'static) -> Self {
        self.votes = Arc::new(votes);
        self
    }

    pub fn with_placeholders(mut self, placeholders: impl PlaceholderEvaluator + 'static) -> Self {
        self.placeholders = Arc::new(placeholders);
        self
    }

    pub fn integrations(&self) -> Integrations {
        Integrations {
            discordsrv: self.links.is_available(),
            votingplugin: self.votes.is_available(),
            placeholderapi: self.placeholders.is_available(),
        }
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::unavailable()
    }
}
