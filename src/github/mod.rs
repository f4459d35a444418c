//! GitHub REST API client.
//!
//! Thin wrapper over `reqwest` that knows the four analytics resources, the
//! auth/UA headers GitHub requires, and conditional requests: when a caller
//! supplies a cached ETag it is sent as `If-None-Match`, and a 304 comes back
//! as [`ApiResponse::NotModified`] without a body.

pub mod errors;
pub mod filter;

use crate::github::errors::GitHubApiError;
use crate::github::filter::ActivityFilter;
use crate::utils::fmt_duration;
use anyhow::Context;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// The analytics resources the dashboard asks for. String forms are used in
/// cache keys and route paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Commits,
    Issues,
    Languages,
    Contributors,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commits => "commits",
            Self::Issues => "issues",
            Self::Languages => "languages",
            Self::Contributors => "contributors",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource '{0}', expected one of: commits, issues, languages, contributors")]
pub struct UnknownResource(String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commits" => Ok(Self::Commits),
            "issues" => Ok(Self::Issues),
            "languages" => Ok(Self::Languages),
            "contributors" => Ok(Self::Contributors),
            other => Err(UnknownResource(other.to_owned())),
        }
    }
}

/// Outcome of an upstream fetch.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// A full 2xx response body with its validator.
    Fresh { data: Value, etag: Option<String> },
    /// 304: the caller's cached body is still current.
    NotModified,
}

/// GitHub API client. Construct once and share via `Arc`.
pub struct GitHubApi {
    http: reqwest::Client,
    base_url: Url,
}

impl GitHubApi {
    pub fn new(base_url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GITHUB_TOKEN contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("pulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = Url::parse(base_url).context("invalid GitHub base URL")?;
        Ok(Self { http, base_url })
    }

    /// Fetch one resource for a repository, optionally as a conditional
    /// request. `repo` is the `owner/name` full name.
    pub async fn fetch(
        &self,
        resource: Resource,
        repo: &str,
        filter: Option<&ActivityFilter>,
        etag: Option<&str>,
    ) -> Result<ApiResponse, GitHubApiError> {
        let url = self.resource_url(resource, repo, filter)?;
        let started = Instant::now();

        let mut request = self.http.get(url.clone());
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!(%url, elapsed = fmt_duration(started.elapsed()), "upstream not modified");
            return Ok(ApiResponse::NotModified);
        }
        if !status.is_success() {
            return Err(GitHubApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let response_etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let data: Value = response.json().await.map_err(|e| GitHubApiError::ParseFailed {
            status: status.as_u16(),
            url: url.to_string(),
            source: e.into(),
        })?;

        debug!(
            %url,
            status = status.as_u16(),
            has_etag = response_etag.is_some(),
            elapsed = fmt_duration(started.elapsed()),
            "upstream fetch completed"
        );

        Ok(ApiResponse::Fresh {
            data,
            etag: response_etag,
        })
    }

    /// Build the upstream URL for a resource, applying the filter where the
    /// endpoint supports date windows (commits and issues).
    fn resource_url(
        &self,
        resource: Resource,
        repo: &str,
        filter: Option<&ActivityFilter>,
    ) -> Result<Url, GitHubApiError> {
        let mut url = self
            .base_url
            .join(&format!("repos/{repo}/{}", resource.as_str()))
            .with_context(|| format!("invalid repository name '{repo}'"))?;

        let mut params: Vec<(&str, String)> = Vec::new();
        match resource {
            Resource::Commits => {
                params.push(("per_page", "100".into()));
                if let Some(filter) = filter {
                    let (start, end) = filter.current_range();
                    params.push(("since", day_start_rfc3339(start)));
                    params.push(("until", day_start_rfc3339(end)));
                }
            }
            Resource::Issues => {
                params.push(("state", "all".into()));
                params.push(("per_page", "100".into()));
                if let Some(filter) = filter {
                    let (start, _) = filter.current_range();
                    params.push(("since", day_start_rfc3339(start)));
                }
            }
            // Languages are a whole-repo aggregate; the filter only
            // participates in the cache key.
            Resource::Languages => {}
            Resource::Contributors => {
                params.push(("per_page", "100".into()));
            }
        }
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }
}

/// Midnight UTC for a local calendar date, in the format GitHub expects.
fn day_start_rfc3339(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}
