/// Shared error type used across all Switchboard crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("no bot provider available: {0}")]
    ProviderUnavailable(String),

    /// Tenant-scoped code was called outside any [`with_tenant`] scope.
    /// This is a programming error and fails the current unit of work.
    #[error("no tenant in scope")]
    NoTenantInScope,

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error should degrade a routing decision to a human
    /// handoff instead of propagating (provider-side failures do; bugs
    /// like a missing tenant scope do not).
    pub fn degrades_to_human(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Timeout(_)
                | Error::Provider { .. }
                | Error::ProviderUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_degrade_to_human() {
        assert!(Error::Timeout("5s".into()).degrades_to_human());
        assert!(Error::ProviderUnavailable("all unhealthy".into()).degrades_to_human());
        assert!(Error::Provider {
            provider: "dialog-engine".into(),
            message: "HTTP 503".into()
        }
        .degrades_to_human());
    }

    #[test]
    fn programming_errors_do_not_degrade() {
        assert!(!Error::NoTenantInScope.degrades_to_human());
        assert!(!Error::Config("bad".into()).degrades_to_human());
    }
}
