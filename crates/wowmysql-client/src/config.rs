//! Client configuration

use std::time::Duration;

const DEFAULT_BASE_DOMAIN: &str = "wowmysql.com";

fn default_user_agent() -> String {
    format!("wowmysql-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Data API client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Project URL, e.g. `https://myproj.wowmysql.com`
    pub project_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Config {
    /// Create a new config for the given project
    pub fn new(project_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: default_user_agent(),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Storage client configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Project URL
    pub project_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Request timeout, longer than the data API to leave room for uploads
    pub timeout: Duration,
    /// Check the quota before every upload unless overridden per call
    pub auto_check_quota: bool,
    /// User agent string
    pub user_agent: String,
}

impl StorageConfig {
    /// Create a new storage config for the given project
    pub fn new(project_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            auto_check_quota: true,
            user_agent: default_user_agent(),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable the pre-upload quota check
    pub fn with_auto_check_quota(mut self, enabled: bool) -> Self {
        self.auto_check_quota = enabled;
        self
    }
}

/// Auth client configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Project slug (`myproj`), host (`myproj.wowmysql.com`) or full URL
    pub project_url: String,
    /// Domain appended to bare project slugs
    pub base_domain: String,
    /// Use https when building a URL from a slug or host
    pub secure: bool,
    /// Request timeout
    pub timeout: Duration,
    /// Public key sent as `X-Wow-Public-Key`
    pub public_api_key: Option<String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            project_url: String::new(),
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            secure: true,
            timeout: Duration::from_secs(30),
            public_api_key: None,
            user_agent: default_user_agent(),
        }
    }
}

impl AuthConfig {
    /// Create a new auth config for the given project
    pub fn new(project_url: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            ..Default::default()
        }
    }

    /// Set the public API key
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_api_key = Some(key.into());
        self
    }

    /// Set the base domain used for bare slugs
    pub fn with_base_domain(mut self, domain: impl Into<String>) -> Self {
        self.base_domain = domain.into();
        self
    }

    /// Use plain http for slug-derived URLs
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        assert_eq!(Config::new("http://x", "k").timeout, Duration::from_secs(30));
        let storage = StorageConfig::new("http://x", "k");
        assert_eq!(storage.timeout, Duration::from_secs(60));
        assert!(storage.auto_check_quota);
        let auth = AuthConfig::new("myproj");
        assert_eq!(auth.base_domain, "wowmysql.com");
        assert!(auth.secure);
    }
}
