use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelClientError {
    #[error("HTTP error from provider '{provider}': {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider '{provider}' returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("failed to parse response from provider '{provider}': {source}\n  body: {body}")]
    Parse {
        provider: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider '{0}' returned an empty response")]
    EmptyResponse(String),

    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
}

impl ModelClientError {
    /// Name of the provider that produced this error, when known.
    pub fn provider(&self) -> Option<&str> {
        match self {
            ModelClientError::Http { provider, .. }
            | ModelClientError::Status { provider, .. }
            | ModelClientError::Parse { provider, .. } => Some(provider),
            ModelClientError::EmptyResponse(provider) => Some(provider),
            ModelClientError::MissingApiKey(_) => None,
        }
    }
}
