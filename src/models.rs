use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// Error envelope shared by every failing response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: bool,
    pub status: u16,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: true,
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

// Discord account -> game account link; `linked: false` is a normal answer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkResult {
    pub linked: bool,
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl LinkResult {
    pub fn unlinked() -> Self {
        Self {
            linked: false,
            uuid: None,
            name: None,
        }
    }

    pub fn linked(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            linked: true,
            uuid: Some(uuid.into()),
            name: Some(name.into()),
        }
    }
}

// GET /v1/link/resolve response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkResponse {
    #[serde(flatten)]
    pub result: LinkResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cooldown state of one vote site for one player.
///
/// `ready_now` holds exactly when both `remaining_seconds` and
/// `next_vote_epoch` are zero.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteSiteStatus {
    pub site_name: String,
    pub ready_now: bool,
    pub next_vote_epoch: i64,
    #[serde(rename = "nextVoteISO")]
    pub next_vote_iso: Option<String>,
    pub remaining_seconds: i64,
    pub vote_url: String,
}

impl VoteSiteStatus {
    pub fn ready(site_name: impl Into<String>, vote_url: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            ready_now: true,
            next_vote_epoch: 0,
            next_vote_iso: None,
            remaining_seconds: 0,
            vote_url: vote_url.into(),
        }
    }

    /// Derives the status from the last vote time and the site's cooldown.
    /// A missing or non-positive last vote means the player never voted.
    ///
    /// Returns `None` when the next vote time falls outside the representable
    /// date range.
    pub fn from_cooldown(
        site_name: impl Into<String>,
        vote_url: impl Into<String>,
        last_vote: Option<DateTime<Utc>>,
        cooldown: TimeDelta,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let Some(last) = last_vote.filter(|last| last.timestamp_millis() > 0) else {
            return Some(Self::ready(site_name, vote_url));
        };

        let next = last.checked_add_signed(cooldown)?;
        if now >= next {
            return Some(Self::ready(site_name, vote_url));
        }

        Some(Self {
            site_name: site_name.into(),
            ready_now: false,
            next_vote_epoch: next.timestamp(),
            next_vote_iso: Some(to_iso(next)),
            remaining_seconds: (next - now).num_seconds(),
            vote_url: vote_url.into(),
        })
    }
}

// GET /v1/vote/next response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VoteNextResponse {
    pub uuid: String,
    pub sites: Vec<VoteSiteStatus>,
    #[serde(rename = "queriedAt")]
    pub queried_at: i64,
}

// POST /v1/placeholders/eval response; `values` keeps the request order
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PlaceholderResponse {
    pub uuid: String,
    pub values: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Versions {
    pub bridge: String,
    pub server: String,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Integrations {
    pub discordsrv: bool,
    pub votingplugin: bool,
    pub placeholderapi: bool,
}

// GET /health response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub ok: bool,
    pub timestamp: String,
    pub versions: Versions,
    pub integrations: Integrations,
}

pub fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn never_voted_is_ready() {
        let status = VoteSiteStatus::from_cooldown("TopG", "u", None, TimeDelta::hours(24), now())
            .unwrap();
        assert!(status.ready_now);
        assert_eq!(status.next_vote_epoch, 0);
        assert_eq!(status.remaining_seconds, 0);
        assert_eq!(status.next_vote_iso, None);
    }

    #[test]
    fn elapsed_cooldown_is_ready() {
        let last = now() - TimeDelta::hours(25);
        let status =
            VoteSiteStatus::from_cooldown("TopG", "u", Some(last), TimeDelta::hours(24), now())
                .unwrap();
        assert!(status.ready_now);
        assert_eq!(status.next_vote_epoch, 0);
    }

    #[test]
    fn running_cooldown_reports_next_vote() {
        let last = now() - TimeDelta::hours(23);
        let status =
            VoteSiteStatus::from_cooldown("TopG", "u", Some(last), TimeDelta::hours(24), now())
                .unwrap();
        let next = now() + TimeDelta::hours(1);

        assert!(!status.ready_now);
        assert_eq!(status.remaining_seconds, 3600);
        assert_eq!(status.next_vote_epoch, next.timestamp());
        assert_eq!(status.next_vote_iso.as_deref(), Some("2025-03-01T13:00:00Z"));
    }

    #[test]
    fn next_vote_past_date_range_is_none() {
        let last = now() - TimeDelta::hours(1);
        // a million years, well inside TimeDelta but past the last DateTime
        let cooldown = TimeDelta::try_days(365 * 1_000_000).unwrap();
        let status = VoteSiteStatus::from_cooldown("TopG", "u", Some(last), cooldown, now());
        assert_eq!(status, None);
    }

    #[test]
    fn vote_site_uses_wire_field_names() {
        let json = serde_json::to_value(VoteSiteStatus::ready("A", "B")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "siteName": "A",
                "readyNow": true,
                "nextVoteEpoch": 0,
                "nextVoteISO": null,
                "remainingSeconds": 0,
                "voteUrl": "B"
            })
        );
    }

    #[test]
    fn link_error_field_is_omitted_when_absent() {
        let response = LinkResponse {
            result: LinkResult::unlinked(),
            error: None,
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "linked": false, "uuid": null, "name": null })
        );
    }
}
