//! Client configuration, resolved once from environment-style variables.
//!
//! | Variable               | Effect                                  |
//! |------------------------|-----------------------------------------|
//! | `OPENLINEAGE_DISABLED` | `true`/`1`/`yes` drops every event      |
//! | `OPENLINEAGE_URL`      | selects the HTTP transport              |
//! | `OPENLINEAGE_ENDPOINT` | path under the URL (`api/v1/lineage`)   |
//! | `OPENLINEAGE_API_KEY`  | sent as a bearer token                  |
//! | `OPENLINEAGE_TIMEOUT`  | request timeout in seconds (`5.0`)      |
//!
//! Without a URL, events are written to the log.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::LineageError;

pub const ENV_DISABLED: &str = "OPENLINEAGE_DISABLED";
pub const ENV_URL: &str = "OPENLINEAGE_URL";
pub const ENV_ENDPOINT: &str = "OPENLINEAGE_ENDPOINT";
pub const ENV_API_KEY: &str = "OPENLINEAGE_API_KEY";
pub const ENV_TIMEOUT: &str = "OPENLINEAGE_TIMEOUT";

pub const DEFAULT_ENDPOINT: &str = "api/v1/lineage";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for [`crate::HttpTransport`].
#[derive(Clone, PartialEq)]
pub struct HttpConfig {
    pub url: Url,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Full URL events are posted to.
    pub fn lineage_url(&self) -> Result<Url, LineageError> {
        let base = self.url.as_str().trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        let joined = if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{endpoint}")
        };
        Url::parse(&joined)
            .map_err(|e| LineageError::Config(format!("invalid lineage URL '{joined}': {e}")))
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("url", &self.url.as_str())
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    Http(HttpConfig),
    Console,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineageConfig {
    pub transport: TransportConfig,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self { transport: TransportConfig::Console }
    }
}

impl LineageConfig {
    pub fn http(config: HttpConfig) -> Self {
        Self { transport: TransportConfig::Http(config) }
    }

    pub fn disabled() -> Self {
        Self { transport: TransportConfig::Noop }
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, LineageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup` (a variable name to value map).
    ///
    /// # Errors
    /// [`LineageError::Config`] for an unparsable URL or timeout.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LineageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if var(ENV_DISABLED).is_some_and(|v| is_truthy(&v)) {
            return Ok(Self::disabled());
        }

        let Some(raw_url) = var(ENV_URL) else {
            return Ok(Self::default());
        };

        let url = Url::parse(&raw_url)
            .map_err(|e| LineageError::Config(format!("{ENV_URL}='{raw_url}' is not a valid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LineageError::Config(format!(
                "{ENV_URL} must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let mut http = HttpConfig::new(url);
        if let Some(endpoint) = var(ENV_ENDPOINT) {
            http.endpoint = endpoint;
        }
        http.api_key = var(ENV_API_KEY);
        if let Some(raw) = var(ENV_TIMEOUT) {
            http.timeout = parse_timeout(&raw)?;
        }

        // Fail here rather than on the first emit.
        http.lineage_url()?;

        Ok(Self::http(http))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_timeout(raw: &str) -> Result<Duration, LineageError> {
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            LineageError::Config(format!("{ENV_TIMEOUT}='{raw}' is not a positive number of seconds"))
        })
}
