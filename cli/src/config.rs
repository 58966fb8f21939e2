//! Runtime configuration from environment variables.
//!
//! Values are captured once into a [`Config`] and validated when a
//! subcommand asks for them, so `verify` does not demand a signing key and
//! `sign` does not demand a token.

use crate::error::ConfigError;
use camino::Utf8PathBuf;
use log::LevelFilter;
use repo_trust::identity::RepositoryIdentity;
use url::Url;

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default source host base URL.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Default static pages branch.
pub const DEFAULT_PAGES_BRANCH: &str = "gh-pages";

/// Default static pages domain.
pub const DEFAULT_PAGES_DOMAIN: &str = "github.io";

/// Which signing backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerKind {
    /// In-process ed25519 signing.
    #[default]
    Native,
    /// Delegate to `ssh-keygen -Y`.
    SshKeygen,
}

/// Log verbosity requested through `REPO_TRUST_LOG_LEVEL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevelSetting {
    /// The filter to install.
    pub filter: LevelFilter,
    /// The raw value, when it was not recognised.
    pub unrecognised: Option<String>,
}

/// Environment-derived configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    repository: Option<String>,
    token: Option<String>,
    api_url: Option<String>,
    server_url: Option<String>,
    ref_name: Option<String>,
    sha: Option<String>,
    key_path: Option<String>,
    allowed_signers: Option<String>,
    log_level: Option<String>,
    signer: Option<String>,
    pages_branch: Option<String>,
    pages_domain: Option<String>,
    actions: bool,
    output_file: Option<String>,
}

impl Config {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust_cli::config::Config;
    ///
    /// let config = Config::from_lookup(|name| match name {
    ///     "GITHUB_REPOSITORY" => Some("octo/widgets".to_owned()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.repository().unwrap().full_name(), "octo/widgets");
    /// assert!(config.token().is_err());
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            repository: get("GITHUB_REPOSITORY"),
            token: get("GITHUB_TOKEN"),
            api_url: get("GITHUB_API_URL"),
            server_url: get("GITHUB_SERVER_URL"),
            ref_name: get("GITHUB_REF_NAME"),
            sha: get("GITHUB_SHA"),
            key_path: get("REPO_TRUST_KEY_PATH"),
            allowed_signers: get("REPO_TRUST_ALLOWED_SIGNERS"),
            log_level: get("REPO_TRUST_LOG_LEVEL"),
            signer: get("REPO_TRUST_SIGNER"),
            pages_branch: get("REPO_TRUST_PAGES_BRANCH"),
            pages_domain: get("REPO_TRUST_PAGES_DOMAIN"),
            actions: get("GITHUB_ACTIONS").is_some_and(|value| value == "true"),
            output_file: get("GITHUB_OUTPUT"),
        }
    }

    /// The repository the run operates on.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `GITHUB_REPOSITORY` is unset or not
    /// `owner/name`.
    pub fn repository(&self) -> Result<RepositoryIdentity, ConfigError> {
        let value = required(
            self.repository.as_deref(),
            "GITHUB_REPOSITORY",
            "set it to owner/name of the repository",
        )?;
        RepositoryIdentity::parse(value).map_err(|err| ConfigError::Invalid {
            variable: "GITHUB_REPOSITORY",
            reason: err.to_string(),
        })
    }

    /// The registry access token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `GITHUB_TOKEN` is unset.
    pub fn token(&self) -> Result<&str, ConfigError> {
        required(
            self.token.as_deref(),
            "GITHUB_TOKEN",
            "pass secrets.GITHUB_TOKEN or a token with contents access",
        )
    }

    /// Base URL of the registry REST API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `GITHUB_API_URL` is not a URL.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_url(
            self.api_url.as_deref().unwrap_or(DEFAULT_API_URL),
            "GITHUB_API_URL",
        )
    }

    /// Base URL of the source host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `GITHUB_SERVER_URL` is not an
    /// absolute URL with a host.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        parse_url(
            self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL),
            "GITHUB_SERVER_URL",
        )
    }

    /// The release tag being processed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `GITHUB_REF_NAME` is unset.
    pub fn release_tag(&self) -> Result<&str, ConfigError> {
        required(
            self.ref_name.as_deref(),
            "GITHUB_REF_NAME",
            "this should be the release tag",
        )
    }

    /// The release tag, if one was given.
    #[must_use]
    pub fn release_tag_opt(&self) -> Option<&str> {
        self.ref_name.as_deref()
    }

    /// The commit the release was built from, or an empty string.
    #[must_use]
    pub fn commit_sha(&self) -> &str {
        self.sha.as_deref().unwrap_or_default()
    }

    /// Path of the private signing key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `REPO_TRUST_KEY_PATH` is unset.
    pub fn key_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        required(
            self.key_path.as_deref(),
            "REPO_TRUST_KEY_PATH",
            "write the signing key secret to a file and point this variable at it",
        )
        .map(Utf8PathBuf::from)
    }

    /// Path of the trusted signers list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `REPO_TRUST_ALLOWED_SIGNERS` is
    /// unset.
    pub fn allowed_signers_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        required(
            self.allowed_signers.as_deref(),
            "REPO_TRUST_ALLOWED_SIGNERS",
            "point it at an OpenSSH allowed_signers file listing the release key",
        )
        .map(Utf8PathBuf::from)
    }

    /// The requested log level; unknown values fall back to `info`.
    #[must_use]
    pub fn log_level(&self) -> LogLevelSetting {
        let Some(raw) = self.log_level.as_deref() else {
            return LogLevelSetting {
                filter: LevelFilter::Info,
                unrecognised: None,
            };
        };
        let filter = match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LevelFilter::Debug),
            "info" => Some(LevelFilter::Info),
            "warning" | "warn" => Some(LevelFilter::Warn),
            "error" | "fatal" => Some(LevelFilter::Error),
            _ => None,
        };
        LogLevelSetting {
            filter: filter.unwrap_or(LevelFilter::Info),
            unrecognised: filter.is_none().then(|| raw.to_owned()),
        }
    }

    /// The signing backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for values other than `native` and
    /// `ssh-keygen`.
    pub fn signer(&self) -> Result<SignerKind, ConfigError> {
        match self.signer.as_deref().map(str::trim) {
            None | Some("native") => Ok(SignerKind::Native),
            Some("ssh-keygen") => Ok(SignerKind::SshKeygen),
            Some(other) => Err(ConfigError::Invalid {
                variable: "REPO_TRUST_SIGNER",
                reason: format!("expected native or ssh-keygen, got {other}"),
            }),
        }
    }

    /// The static pages branch.
    #[must_use]
    pub fn pages_branch(&self) -> &str {
        self.pages_branch.as_deref().unwrap_or(DEFAULT_PAGES_BRANCH)
    }

    /// The static pages domain.
    #[must_use]
    pub fn pages_domain(&self) -> &str {
        self.pages_domain.as_deref().unwrap_or(DEFAULT_PAGES_DOMAIN)
    }

    /// Whether the run is inside GitHub Actions.
    #[must_use]
    pub fn in_actions(&self) -> bool {
        self.actions
    }

    /// The step output file, when running in Actions.
    #[must_use]
    pub fn output_file(&self) -> Option<Utf8PathBuf> {
        self.output_file.as_deref().map(Utf8PathBuf::from)
    }
}

fn required<'a>(
    value: Option<&'a str>,
    variable: &'static str,
    hint: &'static str,
) -> Result<&'a str, ConfigError> {
    value.ok_or(ConfigError::Missing { variable, hint })
}

fn parse_url(value: &str, variable: &'static str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|err| ConfigError::Invalid {
        variable,
        reason: err.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            variable,
            reason: "expected an absolute URL with a host".to_owned(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(move |name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn reads_the_process_environment() {
        temp_env::with_vars(
            [
                ("GITHUB_REPOSITORY", Some("octo/widgets")),
                ("GITHUB_TOKEN", Some("ghs_secret")),
                ("GITHUB_ACTIONS", Some("true")),
                ("REPO_TRUST_PAGES_BRANCH", None),
            ],
            || {
                let config = Config::from_env();
                assert_eq!(config.repository().expect("repo").owner(), "octo");
                assert_eq!(config.token(), Ok("ghs_secret"));
                assert!(config.in_actions());
                assert_eq!(config.pages_branch(), "gh-pages");
            },
        );
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = config(&[("GITHUB_TOKEN", "  ")]);
        assert!(matches!(
            config.token(),
            Err(ConfigError::Missing { variable: "GITHUB_TOKEN", .. })
        ));
    }

    #[rstest]
    #[case::no_slash("widgets")]
    #[case::two_slashes("octo/widgets/extra")]
    fn rejects_malformed_repositories(#[case] value: &str) {
        let config = config(&[("GITHUB_REPOSITORY", value)]);
        assert!(matches!(
            config.repository(),
            Err(ConfigError::Invalid { variable: "GITHUB_REPOSITORY", .. })
        ));
    }

    #[test]
    fn defaults_urls() {
        let config = config(&[]);
        assert_eq!(config.api_url().expect("api").as_str(), "https://api.github.com/");
        assert_eq!(config.server_url().expect("server").as_str(), "https://github.com/");
        assert_eq!(config.pages_domain(), "github.io");
    }

    #[test]
    fn rejects_relative_urls() {
        let config = config(&[("GITHUB_API_URL", "api.github.com")]);
        assert!(config.api_url().is_err());
    }

    #[rstest]
    #[case::debug("DEBUG", LevelFilter::Debug, false)]
    #[case::warning("warning", LevelFilter::Warn, false)]
    #[case::warn("warn", LevelFilter::Warn, false)]
    #[case::error("error", LevelFilter::Error, false)]
    #[case::unknown("chatty", LevelFilter::Info, true)]
    fn parses_log_levels(
        #[case] raw: &str,
        #[case] filter: LevelFilter,
        #[case] unrecognised: bool,
    ) {
        let setting = config(&[("REPO_TRUST_LOG_LEVEL", raw)]).log_level();
        assert_eq!(setting.filter, filter);
        assert_eq!(setting.unrecognised.is_some(), unrecognised);
    }

    #[rstest]
    #[case::unset(None, Ok(SignerKind::Native))]
    #[case::native(Some("native"), Ok(SignerKind::Native))]
    #[case::tool(Some("ssh-keygen"), Ok(SignerKind::SshKeygen))]
    fn selects_signers(#[case] value: Option<&str>, #[case] expected: Result<SignerKind, ConfigError>) {
        let pairs: Vec<(&str, &str)> = value.map(|v| ("REPO_TRUST_SIGNER", v)).into_iter().collect();
        assert_eq!(config(&pairs).signer(), expected);
    }

    #[test]
    fn rejects_unknown_signers() {
        let err = config(&[("REPO_TRUST_SIGNER", "gpg")]).signer().expect_err("gpg");
        assert!(matches!(err, ConfigError::Invalid { variable: "REPO_TRUST_SIGNER", .. }));
    }

    #[test]
    fn signing_key_is_only_required_on_request() {
        let config = config(&[("GITHUB_REPOSITORY", "octo/widgets")]);
        assert!(config.repository().is_ok());
        let err = config.key_path().expect_err("no key");
        assert!(matches!(err, ConfigError::Missing { variable: "REPO_TRUST_KEY_PATH", .. }));
    }
}
