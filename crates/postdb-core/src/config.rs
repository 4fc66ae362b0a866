// crates/postdb-core/src/config.rs
use std::time::Duration;

/// Environment variable holding the third-party lookup base URL.
pub const DETAILS_URL_ENV: &str = "POSTDB_DETAILS_URL";

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the third-party postcode detail lookup.
///
/// `base_url` is used verbatim as the prefix of the request URL, so it
/// normally ends with `/` (e.g. `https://lookup.example/postcodes/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl LookupConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read [`DETAILS_URL_ENV`]; `None` when unset or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_value(std::env::var(DETAILS_URL_ENV).ok())
    }

    /// An explicit non-blank `flag` wins; otherwise fall back to [`Self::from_env`].
    pub fn from_flag_or_env(flag: Option<&str>) -> Option<Self> {
        Self::from_value(flag.map(str::to_owned)).or_else(Self::from_env)
    }

    fn from_value(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }
}
