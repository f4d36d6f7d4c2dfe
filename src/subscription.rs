use thiserror::Error;

/// Input errors for a subscription request, caught before anything is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Feed URL is required")]
    EmptyUrl,

    #[error("Owner id must be a positive integer, got {0:?}")]
    InvalidOwner(String),
}

/// A request to register `feed_url` under Farcaster id `owner_id`.
///
/// Ephemeral: validated, submitted, then dropped. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub owner_id: u64,
    pub feed_url: String,
}

impl SubscriptionRequest {
    /// Build a request from raw form input. Both fields are trimmed.
    ///
    /// The URL itself is not checked here; feed validity is the remote
    /// validator's call.
    pub fn parse(owner_id: &str, feed_url: &str) -> Result<Self, SubscriptionError> {
        let feed_url = feed_url.trim();
        if feed_url.is_empty() {
            return Err(SubscriptionError::EmptyUrl);
        }

        let owner = owner_id.trim();
        let owner_id = match owner.parse::<u64>() {
            Ok(id) if id > 0 => id,
            _ => return Err(SubscriptionError::InvalidOwner(owner.to_string())),
        };

        Ok(Self {
            owner_id,
            feed_url: feed_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_inputs() {
        let request = SubscriptionRequest::parse(" 977233 ", "  https://dev.example.com/rss ").unwrap();
        assert_eq!(request.owner_id, 977233);
        assert_eq!(request.feed_url, "https://dev.example.com/rss");
    }

    #[test]
    fn test_parse_rejects_empty_url() {
        assert_eq!(
            SubscriptionRequest::parse("1", "   "),
            Err(SubscriptionError::EmptyUrl)
        );
    }

    #[test]
    fn test_parse_rejects_bad_owner() {
        for owner in ["", "0", "-4", "abc", "1.5"] {
            assert!(matches!(
                SubscriptionRequest::parse(owner, "https://x.example.com/rss"),
                Err(SubscriptionError::InvalidOwner(_))
            ));
        }
    }

    #[test]
    fn test_parse_leaves_url_checks_to_validator() {
        let request = SubscriptionRequest::parse("7", "not-a-url").unwrap();
        assert_eq!(request.feed_url, "not-a-url");
    }
}
