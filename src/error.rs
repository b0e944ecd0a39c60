//! Error types for gddns.

use thiserror::Error;

/// Result type alias for gddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// Error tokens a dyndns2 endpoint can answer with instead of `good`/`nochg`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResponse {
    #[error("nohost")]
    NoHost,
    #[error("badauth")]
    BadAuth,
    #[error("notfqdn")]
    NotFqdn,
    #[error("badagent")]
    BadAgent,
    #[error("abuse")]
    Abuse,
    #[error("911")]
    ServerSide,
    #[error("conflict A")]
    ConflictA,
    #[error("conflict AAAA")]
    ConflictAaaa,
}

impl ProviderResponse {
    /// Every known error token, longest first where one is a prefix of another.
    pub const ALL: [ProviderResponse; 8] = [
        ProviderResponse::NoHost,
        ProviderResponse::BadAuth,
        ProviderResponse::NotFqdn,
        ProviderResponse::BadAgent,
        ProviderResponse::Abuse,
        ProviderResponse::ServerSide,
        ProviderResponse::ConflictAaaa,
        ProviderResponse::ConflictA,
    ];

    /// The literal token sent by the provider.
    pub fn token(&self) -> &'static str {
        match self {
            ProviderResponse::NoHost => "nohost",
            ProviderResponse::BadAuth => "badauth",
            ProviderResponse::NotFqdn => "notfqdn",
            ProviderResponse::BadAgent => "badagent",
            ProviderResponse::Abuse => "abuse",
            ProviderResponse::ServerSide => "911",
            ProviderResponse::ConflictA => "conflict A",
            ProviderResponse::ConflictAaaa => "conflict AAAA",
        }
    }

    /// Match a response body against the known error tokens.
    ///
    /// A body matches when it is exactly the token or starts with the token
    /// followed by a space.
    pub fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        Self::ALL.into_iter().find(|code| {
            let token = code.token();
            body == token
                || body
                    .strip_prefix(token)
                    .is_some_and(|rest| rest.starts_with(' '))
        })
    }
}

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The update endpoint rejected the request.
    #[error("update failed: {0}")]
    Provider(#[from] ProviderResponse),

    /// The update endpoint answered with a non-2xx status.
    #[error("unexpected HTTP status code {0}, want 2xx")]
    Status(u16),

    /// IP detection error.
    #[error("IP detection failed: {0}")]
    IpDetection(String),

    /// DNS lookup of the existing record failed.
    #[error("DNS lookup failed: {0}")]
    Dns(String),

    /// The whole run exceeded its deadline.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<hickory_resolver::ResolveError> for DdnsError {
    fn from(e: hickory_resolver::ResolveError) -> Self {
        DdnsError::Dns(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_tokens() {
        for code in ProviderResponse::ALL {
            assert_eq!(ProviderResponse::parse(code.token()), Some(code));
        }
    }

    #[test]
    fn test_parse_conflict_variants() {
        assert_eq!(
            ProviderResponse::parse("conflict A"),
            Some(ProviderResponse::ConflictA)
        );
        assert_eq!(
            ProviderResponse::parse("conflict AAAA"),
            Some(ProviderResponse::ConflictAaaa)
        );
        assert_eq!(
            ProviderResponse::parse("conflict A 1.2.3.4\n"),
            Some(ProviderResponse::ConflictA)
        );
    }

    #[test]
    fn test_parse_success_bodies() {
        assert_eq!(ProviderResponse::parse("good 1.2.3.4"), None);
        assert_eq!(ProviderResponse::parse("nochg 1.2.3.4\n"), None);
        assert_eq!(ProviderResponse::parse("nohostname"), None);
    }

    #[test]
    fn test_provider_error_message() {
        let err = DdnsError::from(ProviderResponse::BadAuth);
        assert_eq!(err.to_string(), "update failed: badauth");
        assert_eq!(
            DdnsError::Status(404).to_string(),
            "unexpected HTTP status code 404, want 2xx"
        );
    }
}
