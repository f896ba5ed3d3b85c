//! Input checks applied by the capability handlers before any provider call.

pub const MAX_PLACEHOLDERS: usize = 20;

pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
pub const BLOCKED: &str = "BLOCKED";
pub const ERROR: &str = "ERROR";

// Expansions that can run commands, scripts or network probes on the host
const BLOCKED_PREFIXES: [&str; 4] = ["%server_command_", "%javascript_", "%math_", "%pinger_"];

/// Canonical hyphenated 8-4-4-4-12 hex form, either case.
pub fn is_valid_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];

    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Discord snowflake: 17 to 20 decimal digits.
pub fn is_valid_discord_id(value: &str) -> bool {
    (17..=20).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    /// Safe to hand to the evaluator.
    Evaluate,
    /// Not of the form `%word%`.
    InvalidFormat,
    /// Matches the denylist.
    Blocked,
}

impl TokenCheck {
    // Sentinel reported in place of a value, if any
    pub fn sentinel(self) -> Option<&'static str> {
        match self {
            TokenCheck::Evaluate => None,
            TokenCheck::InvalidFormat => Some(INVALID_FORMAT),
            TokenCheck::Blocked => Some(BLOCKED),
        }
    }
}

pub fn check_placeholder(token: &str) -> TokenCheck {
    if !is_placeholder_token(token) {
        return TokenCheck::InvalidFormat;
    }

    let lower = token.to_ascii_lowercase();
    if BLOCKED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return TokenCheck::Blocked;
    }

    TokenCheck::Evaluate
}

// %[A-Za-z0-9_]+%
fn is_placeholder_token(token: &str) -> bool {
    token
        .strip_prefix('%')
        .and_then(|rest| rest.strip_suffix('%'))
        .is_some_and(|inner| {
            !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        })
}
