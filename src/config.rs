use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Client, Error, Result};

/// Connection options for [`Client`].
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use space_client::ConnectionOptions;
/// let client = ConnectionOptions::new("http://localhost:5403", "api-key")
///     .with_timeout(Duration::from_secs(2))
///     .connect()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub(crate) url: String,
    pub(crate) api_key: String,
    pub(crate) timeout: Duration,
    pub(crate) api_prefix: String,
    pub(crate) health_check_timeout: Duration,
    pub(crate) upload_timeout: Duration,
}

impl ConnectionOptions {
    /// Default timeout applied to every request issued through the session.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
    /// Default prefix appended to the url to build the REST base path.
    pub const DEFAULT_API_PREFIX: &'static str = "api/v1";
    /// Default timeout of the health check probe.
    pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default timeout of multipart uploads.
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create connection options for the SPACE instance at `url` using default timeouts.
    ///
    /// ```
    /// # use space_client::ConnectionOptions;
    /// ConnectionOptions::new("https://space.example.com", "api-key");
    /// ```
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> ConnectionOptions {
        ConnectionOptions {
            url: url.into(),
            api_key: api_key.into(),
            timeout: ConnectionOptions::DEFAULT_TIMEOUT,
            api_prefix: ConnectionOptions::DEFAULT_API_PREFIX.to_owned(),
            health_check_timeout: ConnectionOptions::DEFAULT_HEALTH_CHECK_TIMEOUT,
            upload_timeout: ConnectionOptions::DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Override the session-wide request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> ConnectionOptions {
        self.timeout = timeout;
        self
    }

    /// Override the API prefix. Clients should use the default setting in most cases.
    pub fn with_api_prefix(mut self, api_prefix: impl Into<String>) -> ConnectionOptions {
        self.api_prefix = api_prefix.into();
        self
    }

    /// Override the timeout used by [`Client::is_connected_to_space`].
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> ConnectionOptions {
        self.health_check_timeout = timeout;
        self
    }

    /// Override the timeout used for pricing and service uploads.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> ConnectionOptions {
        self.upload_timeout = timeout;
        self
    }

    /// The url of the SPACE instance.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session-wide request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Base url every REST path is appended to, e.g. `http://localhost:5403/api/v1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the url cannot be parsed, does not use the `http`
    /// or `https` scheme, or has no host.
    pub fn http_base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|err| Error::invalid_argument(format!("Invalid 'url': {err}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_argument(
                "Invalid 'url'. It must start with 'http://' or 'https://'.",
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::invalid_argument("Invalid 'url'. It must include a host."));
        }

        url.path_segments_mut()
            .map_err(|()| Error::invalid_argument("Invalid 'url'. It cannot be a base url."))?
            .pop_if_empty()
            .extend(self.api_prefix.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// Check the options before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the url or the API key is empty, a timeout is zero,
    /// or the url is not an absolute `http://` or `https://` url with a host.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() || self.api_key.is_empty() {
            return Err(Error::invalid_argument(
                "Both 'url' and 'apiKey' are required to connect to Space.",
            ));
        }

        if self.timeout.is_zero() {
            return Err(Error::invalid_argument(
                "Invalid 'timeout' value. It must be a positive number.",
            ));
        }

        if self.health_check_timeout.is_zero() || self.upload_timeout.is_zero() {
            return Err(Error::invalid_argument(
                "Invalid call timeout. It must be a positive duration.",
            ));
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::invalid_argument(
                "Invalid 'url'. It must start with 'http://' or 'https://'.",
            ));
        }

        if self.api_key.trim().is_empty() {
            return Err(Error::invalid_argument(
                "Invalid 'apiKey'. It must be a non-empty string.",
            ));
        }

        self.http_base_url()?;

        Ok(())
    }

    /// Validate the options and create a new [`Client`]. No request is sent.
    ///
    /// ```
    /// # use space_client::{Client, ConnectionOptions};
    /// let client: Client = ConnectionOptions::new("http://localhost:5403", "api-key")
    ///     .connect()
    ///     .unwrap();
    /// ```
    pub fn connect(self) -> Result<Client> {
        connect(self)
    }
}

/// Loosely typed connection settings, as found in configuration files or environment.
///
/// Every field is optional. Use [`ConnectionSettings::merge`] to layer explicit values over
/// defaults and convert into [`ConnectionOptions`] with `try_from`, which applies the 5000 ms
/// default timeout and validates the result.
///
/// ```
/// # use space_client::{ConnectionOptions, ConnectionSettings};
/// let settings: ConnectionSettings =
///     serde_json::from_str(r#"{"url": "http://localhost:5403", "apiKey": "key"}"#).unwrap();
/// let options = ConnectionOptions::try_from(settings).unwrap();
/// assert_eq!(options.timeout().as_millis(), 5000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    /// Url of the SPACE instance.
    #[serde(default)]
    pub url: Option<String>,
    /// API key. Accepts both `apiKey` and `api_key`.
    #[serde(default, alias = "api_key")]
    pub api_key: Option<String>,
    /// Timeout in milliseconds. Signed so that negative values can be rejected explicitly.
    #[serde(default)]
    pub timeout: Option<i64>,
    /// REST prefix, `api/v1` when absent.
    #[serde(default, alias = "api_prefix")]
    pub api_prefix: Option<String>,
}

impl ConnectionSettings {
    /// Layer `overrides` on top of `self`. Values present in `overrides` win.
    pub fn merge(self, overrides: ConnectionSettings) -> ConnectionSettings {
        ConnectionSettings {
            url: overrides.url.or(self.url),
            api_key: overrides.api_key.or(self.api_key),
            timeout: overrides.timeout.or(self.timeout),
            api_prefix: overrides.api_prefix.or(self.api_prefix),
        }
    }
}

impl From<ConnectionOptions> for ConnectionSettings {
    fn from(options: ConnectionOptions) -> ConnectionSettings {
        ConnectionSettings {
            url: Some(options.url),
            api_key: Some(options.api_key),
            timeout: i64::try_from(options.timeout.as_millis()).ok(),
            api_prefix: Some(options.api_prefix),
        }
    }
}

impl TryFrom<ConnectionSettings> for ConnectionOptions {
    type Error = Error;

    fn try_from(settings: ConnectionSettings) -> Result<ConnectionOptions> {
        let (Some(url), Some(api_key)) = (settings.url, settings.api_key) else {
            return Err(Error::invalid_argument(
                "Both 'url' and 'apiKey' are required to connect to Space.",
            ));
        };

        let mut options = ConnectionOptions::new(url, api_key);

        if let Some(timeout) = settings.timeout {
            let millis = u64::try_from(timeout)
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| {
                    Error::invalid_argument(
                        "Invalid 'timeout' value. It must be a positive number.",
                    )
                })?;
            options = options.with_timeout(Duration::from_millis(millis));
        }

        if let Some(api_prefix) = settings.api_prefix {
            options = options.with_api_prefix(api_prefix);
        }

        options.validate()?;
        Ok(options)
    }
}

/// Validate `options` and create a [`Client`]. No request is sent.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if validation fails. See
/// [`ConnectionOptions::validate`].
pub fn connect(options: ConnectionOptions) -> Result<Client> {
    options.validate()?;
    log::debug!(target: "space", url = options.url.as_str(); "creating SPACE client");
    Ok(Client::new(options))
}

/// Create a [`Client`] from discrete parameters. A missing `timeout` defaults to 5000 ms.
pub fn connect_with(
    url: impl Into<String>,
    api_key: impl Into<String>,
    timeout: Option<Duration>,
) -> Result<Client> {
    let options = ConnectionOptions::new(url, api_key);
    match timeout {
        Some(timeout) => connect(options.with_timeout(timeout)),
        None => connect(options),
    }
}
