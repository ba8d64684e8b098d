//! Error type shared by the identity builder and the Vault client.

/// Error type for every fallible login step.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// AWS credentials could not be resolved from the default chain.
    #[error("failed to load AWS credentials: {0}")]
    Credentials(String),

    /// The STS endpoint rules rejected the region or produced no endpoint.
    #[error("failed to resolve STS endpoint: {0}")]
    Endpoint(String),

    /// SigV4 signing failed.
    #[error("failed to sign STS request: {0}")]
    Signing(String),

    /// Invalid client configuration (e.g. a malformed Vault address).
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request never produced a response.
    #[error("request to Vault failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Vault answered, but without a client token.
    #[error("no client token in Vault response{}", format_vault_errors(.0))]
    MissingToken(Vec<String>),
}

fn format_vault_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
