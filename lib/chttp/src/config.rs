//! Client configuration types.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cookie::CookieJar;
use crate::redirect::Policy;

/// Network configuration of a [`Client`](crate::Client).
///
/// Cloning copies the values; a cookie jar is shared between clones.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Upper bound for a whole request, redirects included.
    ///
    /// Combined with the request context: the earlier deadline wins.
    /// `None` leaves the context alone in charge.
    pub timeout: Option<Duration>,
    /// Redirect policy.
    pub redirect: Policy,
    /// Cookie storage; cookies are neither stored nor sent without one.
    pub cookie_jar: Option<Arc<dyn CookieJar>>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("redirect", &self.redirect)
            .field("cookie_jar", &self.cookie_jar.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    redirect: Option<Policy>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("timeout", &self.timeout)
            .field("redirect", &self.redirect)
            .field("cookie_jar", &self.cookie_jar.is_some())
            .finish()
    }
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the redirect policy.
    #[must_use]
    pub fn redirect(mut self, policy: Policy) -> Self {
        self.redirect = Some(policy);
        self
    }

    /// Set the cookie jar.
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            timeout: self.timeout,
            redirect: self.redirect.unwrap_or_default(),
            cookie_jar: self.cookie_jar,
        }
    }
}

impl From<ClientConfig> for ClientConfigBuilder {
    fn from(config: ClientConfig) -> Self {
        Self {
            timeout: config.timeout,
            redirect: Some(config.redirect),
            cookie_jar: config.cookie_jar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::MemoryJar;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, None);
        assert!(config.cookie_jar.is_none());
        assert_eq!(format!("{:?}", config.redirect), "Limited(10)");
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(5))
            .redirect(Policy::none())
            .cookie_jar(Arc::new(MemoryJar::new()))
            .build();

        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.cookie_jar.is_some());
        assert_eq!(format!("{:?}", config.redirect), "None");
    }
}
