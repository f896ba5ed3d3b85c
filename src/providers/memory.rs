use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{LinkResolver, PlaceholderEvaluator, ProviderError, Providers, VoteStatusSource};
use crate::models::{LinkResult, VoteSiteStatus};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixtures from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixtures in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid fixtures in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Deserialize, Debug, Clone)]
pub struct LinkedAccount {
    pub uuid: String,
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VoteSiteFixture {
    pub name: String,
    pub url: String,
    pub cooldown_hours: i64,
}

/// Data file for the in-memory adapters.
///
/// A missing section leaves that capability unavailable.
#[derive(Deserialize, Debug, Default)]
pub struct Fixtures {
    // discord id -> account
    pub links: Option<HashMap<String, LinkedAccount>>,
    pub vote_sites: Option<Vec<VoteSiteFixture>>,
    // player uuid -> site name -> last vote
    #[serde(default)]
    pub votes: HashMap<String, HashMap<String, DateTime<Utc>>>,
    // player uuid -> token -> value
    pub placeholders: Option<HashMap<String, HashMap<String, String>>>,
}

impl Fixtures {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fixtures = Self::parse(&raw).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fixtures.check().map_err(|reason| FixtureError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(fixtures)
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Rejects vote sites whose cooldown is negative or too large to add to
    /// a timestamp.
    pub fn check(&self) -> Result<(), String> {
        for site in self.vote_sites.iter().flatten() {
            if site.cooldown_hours < 0 {
                return Err(format!("vote site {} has a negative cooldown", site.name));
            }
            if TimeDelta::try_hours(site.cooldown_hours).is_none() {
                return Err(format!("vote site {} cooldown is out of range", site.name));
            }
        }
        Ok(())
    }

    pub fn into_providers(self) -> Providers {
        let mut providers = Providers::unavailable();

        if let Some(links) = self.links {
            let adapter = MemoryLinks::new();
            for (discord_id, account) in links {
                adapter.link(discord_id, account.uuid, account.name);
            }
            providers = providers.with_links(adapter);
        }

        if let Some(sites) = self.vote_sites {
            let adapter = MemoryVotes::new(sites);
            for (uuid, per_site) in self.votes {
                for (site, at) in per_site {
                    adapter.record_vote(&uuid, site, at);
                }
            }
            providers = providers.with_votes(adapter);
        }

        if let Some(values) = self.placeholders {
            let adapter = MemoryPlaceholders::new();
            for (uuid, tokens) in values {
                for (token, value) in tokens {
                    adapter.set(&uuid, token, value);
                }
            }
            providers = providers.with_placeholders(adapter);
        }

        providers
    }
}

// Player uuids are matched case-insensitively
fn player_key(uuid: &str) -> String {
    uuid.to_ascii_lowercase()
}

#[derive(Default)]
pub struct MemoryLinks {
    accounts: DashMap<String, LinkedAccount>,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(
        &self,
        discord_id: impl Into<String>,
        uuid: impl Into<String>,
        name: impl Into<String>,
    ) {
        self.accounts.insert(
            discord_id.into(),
            LinkedAccount {
                uuid: uuid.into(),
                name: name.into(),
            },
        );
    }
}

impl LinkResolver for MemoryLinks {
    fn is_available(&self) -> bool {
        true
    }

    fn resolve_link(&self, discord_id: &str) -> Result<LinkResult, ProviderError> {
        Ok(match self.accounts.get(discord_id) {
            Some(account) => LinkResult::linked(account.uuid.clone(), account.name.clone()),
            None => LinkResult::unlinked(),
        })
    }
}

pub struct MemoryVotes {
    sites: Vec<VoteSiteFixture>,
    last_votes: DashMap<String, HashMap<String, DateTime<Utc>>>,
}

impl MemoryVotes {
    pub fn new(sites: Vec<VoteSiteFixture>) -> Self {
        Self {
            sites,
            last_votes: DashMap::new(),
        }
    }

    pub fn record_vote(&self, uuid: &str, site: impl Into<String>, at: DateTime<Utc>) {
        self.last_votes
            .entry(player_key(uuid))
            .or_default()
            .insert(site.into(), at);
    }

    pub(crate) fn vote_status_at(
        &self,
        uuid: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<VoteSiteStatus>, ProviderError> {
        let history = self.last_votes.get(&player_key(uuid));

        self.sites
            .iter()
            .map(|site| {
                let cooldown = TimeDelta::try_hours(site.cooldown_hours).ok_or_else(|| {
                    ProviderError::Lookup(format!("cooldown of {} is out of range", site.name))
                })?;
                let last_vote = history
                    .as_ref()
                    .and_then(|votes| votes.get(&site.name).copied());

                VoteSiteStatus::from_cooldown(
                    site.name.clone(),
                    site.url.clone(),
                    last_vote,
                    cooldown,
                    now,
                )
                .ok_or_else(|| {
                    ProviderError::Lookup(format!("next vote on {} is out of range", site.name))
                })
            })
            .collect()
    }
}

impl VoteStatusSource for MemoryVotes {
    fn is_available(&self) -> bool {
        true
    }

    fn vote_status(&self, uuid: &str) -> Result<Vec<VoteSiteStatus>, ProviderError> {
        self.vote_status_at(uuid, Utc::now())
    }
}

#[derive(Default)]
pub struct MemoryPlaceholders {
    values: DashMap<String, HashMap<String, String>>,
}

impl MemoryPlaceholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, uuid: &str, token: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(player_key(uuid))
            .or_default()
            .insert(token.into(), value.into());
    }
}

impl PlaceholderEvaluator for MemoryPlaceholders {
    fn is_available(&self) -> bool {
        true
    }

    // unknown tokens come back verbatim, as a template engine leaves them
    fn evaluate(
        &self,
        uuid: &str,
        tokens: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        let known = self.values.get(&player_key(uuid));

        Ok(tokens
            .iter()
            .map(|token| {
                let value = known
                    .as_ref()
                    .and_then(|values| values.get(token).cloned())
                    .unwrap_or_else(|| token.clone());
                (token.clone(), value)
            })
            .collect())
    }
}
