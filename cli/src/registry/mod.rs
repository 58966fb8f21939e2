//! HTTP client for the release registry (the GitHub REST API).
//!
//! [`RegistryClient`] is built once per run from [`Config`] and passed by
//! reference to each subcommand. It implements the core crate's
//! [`AssetLister`], [`AssetDownloader`] and [`AncestryOracle`] ports, and
//! the CLI's own [`ReleaseApi`].

pub mod models;

use crate::config::Config;
use crate::error::ConfigError;
use log::debug;
use models::{ApiErrorBody, AssetInfo, ComparisonInfo, ReleaseInfo, RepositoryInfo};
use repo_trust::identity::RepositoryIdentity;
use repo_trust::manifest::{AssetDescriptor, AssetDownloader, AssetLister, ReleaseDescriptor};
use repo_trust::retry::RetryPolicy;
use repo_trust::squatting::{AncestryOracle, ComparisonStatus};
use repo_trust::transfer::TransferError;
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

/// Timeout covering a whole request, including large downloads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";
const ERROR_EXCERPT_CHARS: usize = 200;

/// Release operations the subcommands need from the registry.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseApi {
    /// The release tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] if no release has that tag.
    fn release_by_tag(&self, tag: &str) -> Result<ReleaseInfo, TransferError>;

    /// The latest published release.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] if the repository has no releases.
    fn latest_release(&self) -> Result<ReleaseInfo, TransferError>;

    /// The release with numeric id `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the release cannot be fetched.
    fn release(&self, id: u64) -> Result<ReleaseInfo, TransferError>;

    /// Delete asset `asset_id`. An already missing asset counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] for any other failure.
    fn delete_asset(&self, asset_id: u64) -> Result<(), TransferError>;

    /// Upload `bytes` as asset `name` of `release`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the upload is refused or fails.
    fn upload_asset(
        &self,
        release: &ReleaseInfo,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<AssetInfo, TransferError>;

    /// Download a small asset fully into memory.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the download fails.
    fn download_to_vec(&self, asset: &AssetInfo) -> Result<Vec<u8>, TransferError>;
}

/// Client for one repository's releases.
pub struct RegistryClient {
    agent: Agent,
    api_base: Url,
    token: String,
    repository: RepositoryIdentity,
    retry: RetryPolicy,
}

impl RegistryClient {
    /// Create a client for `repository` at `api_base`, authenticating with
    /// `token`.
    #[must_use]
    pub fn new(api_base: &Url, token: &str, repository: RepositoryIdentity) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(config),
            api_base: api_base.clone(),
            token: token.to_owned(),
            repository,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the repository, token or API URL is
    /// missing or invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            &config.api_url()?,
            config.token()?,
            config.repository()?,
        ))
    }

    /// Use `retry` for requests this client retries itself.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The repository this client is scoped to.
    #[must_use]
    pub fn repository(&self) -> &RepositoryIdentity {
        &self.repository
    }

    fn stream_asset(&self, asset_id: u64, sink: &mut dyn Write) -> Result<(), TransferError> {
        let url = repo_url(
            &self.api_base,
            &self.repository,
            &["releases", "assets", &asset_id.to_string()],
        );
        debug!("downloading {url}");
        let response = self
            .authorised(self.agent.get(&url), BINARY_MEDIA_TYPE)
            .call()
            .map_err(|err| map_ureq_error(&url, err))?;
        let mut body = check_status(&url, response)?.into_body();
        io::copy(&mut body.as_reader(), sink)?;
        Ok(())
    }

    fn repository_info(&self, repository: &RepositoryIdentity) -> Result<RepositoryInfo, TransferError> {
        let url = repo_url(&self.api_base, repository, &[]);
        self.retry
            .run("fetch repository", || self.get_json(&url))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransferError> {
        debug!("GET {url}");
        let response = self
            .authorised(self.agent.get(url), JSON_MEDIA_TYPE)
            .call()
            .map_err(|err| map_ureq_error(url, err))?;
        read_json(url, check_status(url, response)?)
    }

    fn authorised<B>(
        &self,
        request: ureq::RequestBuilder<B>,
        accept: &str,
    ) -> ureq::RequestBuilder<B> {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", user_agent())
    }
}

impl ReleaseApi for RegistryClient {
    fn release_by_tag(&self, tag: &str) -> Result<ReleaseInfo, TransferError> {
        let url = repo_url(&self.api_base, &self.repository, &["releases", "tags", tag]);
        self.retry
            .run(&format!("fetch release {tag}"), || self.get_json(&url))
    }

    fn latest_release(&self) -> Result<ReleaseInfo, TransferError> {
        let url = repo_url(&self.api_base, &self.repository, &["releases", "latest"]);
        self.retry
            .run("fetch latest release", || self.get_json(&url))
    }

    fn release(&self, id: u64) -> Result<ReleaseInfo, TransferError> {
        let url = repo_url(&self.api_base, &self.repository, &["releases", &id.to_string()]);
        self.retry
            .run(&format!("fetch release {id}"), || self.get_json(&url))
    }

    fn delete_asset(&self, asset_id: u64) -> Result<(), TransferError> {
        let url = repo_url(
            &self.api_base,
            &self.repository,
            &["releases", "assets", &asset_id.to_string()],
        );
        self.retry.run("delete asset", || {
            let response = self
                .authorised(self.agent.delete(&url), JSON_MEDIA_TYPE)
                .call()
                .map_err(|err| map_ureq_error(&url, err))?;
            match check_status(&url, response) {
                Ok(_) | Err(TransferError::NotFound { .. }) => Ok(()),
                Err(err) => Err(err),
            }
        })
    }

    fn upload_asset(
        &self,
        release: &ReleaseInfo,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<AssetInfo, TransferError> {
        let url = upload_url(&release.upload_url, name)?;
        self.retry.run(&format!("upload {name}"), || {
            let response = self
                .authorised(self.agent.post(&url), JSON_MEDIA_TYPE)
                .header("Content-Type", content_type)
                .send(bytes)
                .map_err(|err| map_ureq_error(&url, err))?;
            read_json(&url, check_status(&url, response)?)
        })
    }

    fn download_to_vec(&self, asset: &AssetInfo) -> Result<Vec<u8>, TransferError> {
        self.retry.run(&format!("download {}", asset.name), || {
            let mut bytes = Vec::new();
            self.stream_asset(asset.id, &mut bytes)?;
            Ok(bytes)
        })
    }
}

impl AssetLister for RegistryClient {
    fn list_assets(&self, release: &ReleaseDescriptor) -> Result<Vec<AssetDescriptor>, TransferError> {
        let url = repo_url(
            &self.api_base,
            &release.repository,
            &["releases", &release.release.release_id.to_string()],
        );
        let info: ReleaseInfo = self.get_json(&url)?;
        Ok(info.assets.into_iter().map(asset_descriptor).collect())
    }
}

impl AssetDownloader for RegistryClient {
    fn download_asset(&self, asset: &AssetDescriptor, sink: &mut dyn Write) -> Result<(), TransferError> {
        self.stream_asset(asset.id, sink)
    }
}

impl AncestryOracle for RegistryClient {
    fn default_branch(&self, repository: &RepositoryIdentity) -> Result<String, TransferError> {
        self.repository_info(repository).map(|info| info.default_branch)
    }

    fn compare(
        &self,
        repository: &RepositoryIdentity,
        base: &str,
        head: &str,
    ) -> Result<ComparisonStatus, TransferError> {
        let url = repo_url(
            &self.api_base,
            repository,
            &["compare", &format!("{base}...{head}")],
        );
        let info: ComparisonInfo = self
            .retry
            .run("compare commits", || self.get_json(&url))?;
        ComparisonStatus::parse(&info.status).ok_or_else(|| TransferError::Decode {
            url,
            reason: format!("unknown comparison status {}", info.status),
        })
    }
}

/// Convert a registry asset into the manifest builder's descriptor.
#[must_use]
pub fn asset_descriptor(asset: AssetInfo) -> AssetDescriptor {
    AssetDescriptor {
        id: asset.id,
        name: asset.name,
        download_url: asset.browser_download_url,
        size: Some(asset.size),
    }
}

fn user_agent() -> String {
    format!("repo-trust/{}", env!("CARGO_PKG_VERSION"))
}

/// Join percent-encoded path segments under `repos/{owner}/{name}`.
fn repo_url(api_base: &Url, repository: &RepositoryIdentity, segments: &[&str]) -> String {
    let mut url = api_base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty()
            .extend(["repos", repository.owner(), repository.name()])
            .extend(segments);
    }
    url.into()
}

/// Expand a templated upload URL for asset `name`.
///
/// # Errors
///
/// Returns [`TransferError::Decode`] if the template is not a URL.
///
/// # Examples
///
/// ```
/// use repo_trust_cli::registry::upload_url;
///
/// let url = upload_url(
///     "https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}",
///     "repo-trust-manifest.json.sig",
/// )
/// .unwrap();
/// assert_eq!(
///     url,
///     "https://uploads.github.com/repos/o/r/releases/1/assets?name=repo-trust-manifest.json.sig"
/// );
/// ```
pub fn upload_url(template: &str, name: &str) -> Result<String, TransferError> {
    let base = template.split('{').next().unwrap_or(template);
    let mut url = Url::parse(base).map_err(|err| TransferError::Decode {
        url: template.to_owned(),
        reason: err.to_string(),
    })?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url.to_string())
}

fn check_status(url: &str, response: Response<Body>) -> Result<Response<Body>, TransferError> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = response.into_body().read_to_string().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.chars().take(ERROR_EXCERPT_CHARS).collect());
    Err(classify_status(url, status, remaining.as_deref(), message))
}

/// Classify a non-success status.
///
/// A 403 is a rate limit only when the remaining-quota header says so.
#[must_use]
pub fn classify_status(
    url: &str,
    status: u16,
    rate_limit_remaining: Option<&str>,
    message: String,
) -> TransferError {
    match status {
        404 => TransferError::NotFound {
            url: url.to_owned(),
        },
        429 => TransferError::RateLimited {
            url: url.to_owned(),
        },
        403 if rate_limit_remaining.is_some_and(|remaining| remaining.trim() == "0") => {
            TransferError::RateLimited {
                url: url.to_owned(),
            }
        }
        _ => TransferError::Http {
            url: url.to_owned(),
            status: Some(status),
            reason: if message.is_empty() {
                format!("HTTP {status}")
            } else {
                message
            },
        },
    }
}

fn read_json<T: DeserializeOwned>(url: &str, response: Response<Body>) -> Result<T, TransferError> {
    let text = response
        .into_body()
        .read_to_string()
        .map_err(|err| map_ureq_error(url, err))?;
    serde_json::from_str(&text).map_err(|err| TransferError::Decode {
        url: url.to_owned(),
        reason: err.to_string(),
    })
}

/// Map a transport failure to a [`TransferError`].
fn map_ureq_error(url: &str, err: ureq::Error) -> TransferError {
    match err {
        ureq::Error::StatusCode(status) => classify_status(url, status, None, String::new()),
        ureq::Error::Io(source) => TransferError::Io(source),
        other => TransferError::Http {
            url: url.to_owned(),
            status: None,
            reason: other.to_string(),
        },
    }
}
