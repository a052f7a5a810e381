/// Single-use opaque token issuance and validation
///
/// Verification tokens have no expiry and live until consumed; password
/// reset tokens carry an absolute one-hour expiry. Expired tokens are
/// rejected lazily on use, there is no background sweep.
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};

/// Length of issued tokens in characters
pub const TOKEN_LENGTH: usize = 64;

/// Password reset token lifetime in hours
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Token issuer for email verification and password reset links
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Generate an email verification token. Unbounded lifetime, single use.
    pub fn issue_verification(&self) -> String {
        random_token()
    }

    /// Generate a password reset token with its absolute expiry
    pub fn issue_reset(&self, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        (random_token(), now + Duration::hours(RESET_TOKEN_TTL_HOURS))
    }

    /// A stored reset token is valid iff it equals the supplied token and
    /// the expiry has not passed. Callers must not distinguish the two
    /// failure modes when reporting errors.
    pub fn reset_token_matches(
        &self,
        stored: Option<&str>,
        expires: Option<DateTime<Utc>>,
        supplied: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match (stored, expires) {
            (Some(stored), Some(expires)) => stored == supplied && now < expires,
            _ => false,
        }
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_charset() {
        let issuer = TokenIssuer::new();
        let token = issuer.issue_verification();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        use std::collections::HashSet;

        let issuer = TokenIssuer::new();
        let tokens: HashSet<String> = (0..100).map(|_| issuer.issue_verification()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_reset_expiry_is_one_hour() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let (_, expires) = issuer.issue_reset(now);

        assert_eq!(expires - now, Duration::hours(1));
    }

    #[test]
    fn test_reset_token_valid_within_window() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let (token, expires) = issuer.issue_reset(now);

        assert!(issuer.reset_token_matches(
            Some(&token),
            Some(expires),
            &token,
            now + Duration::minutes(59),
        ));
    }

    #[test]
    fn test_reset_token_rejected_after_expiry() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let (token, expires) = issuer.issue_reset(now);

        assert!(!issuer.reset_token_matches(
            Some(&token),
            Some(expires),
            &token,
            now + Duration::hours(1),
        ));
    }

    #[test]
    fn test_reset_token_rejected_on_mismatch_or_missing() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let (token, expires) = issuer.issue_reset(now);

        assert!(!issuer.reset_token_matches(Some(&token), Some(expires), "other", now));
        assert!(!issuer.reset_token_matches(None, None, &token, now));
    }
}
