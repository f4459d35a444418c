//! Error types for the GitHub API client.

#[derive(Debug, thiserror::Error)]
pub enum GitHubApiError {
    #[error("GitHub API returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}
