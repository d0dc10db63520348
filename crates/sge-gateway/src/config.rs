//! Gateway configuration

use std::time::Duration;

/// Tunables for the decision gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound on one external validator call; a timeout is downgraded
    /// to a report warning, never a failure
    pub analyzer_timeout: Duration,
    /// Timeline page size when the caller passes none
    pub default_page_limit: usize,
    /// Hard cap on requested timeline page sizes
    pub max_page_limit: usize,
}

impl GatewayConfig {
    /// Create the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an analyzer timeout
    #[inline]
    #[must_use]
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }

    /// With a default timeline page size
    #[inline]
    #[must_use]
    pub fn with_default_page_limit(mut self, limit: usize) -> Self {
        self.default_page_limit = limit;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout: Duration::from_secs(5),
            default_page_limit: 50,
            max_page_limit: 200,
        }
    }
}
