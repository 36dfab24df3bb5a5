use crate::source_table::FetchStrategy;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Settings for one [Validator](crate::Validator).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValidatorConfig {
    pub user_agent: String,
    /// Per-request timeout of the HTTP client.
    pub timeout: Duration,
    pub strategy: FetchStrategy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: DEFAULT_TIMEOUT,
            strategy: FetchStrategy::Concurrent {
                limit: DEFAULT_CONCURRENCY,
            },
        }
    }
}

impl ValidatorConfig {
    #[inline(always)]
    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..self
        }
    }

    #[inline(always)]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    #[inline(always)]
    pub fn with_strategy(self, strategy: FetchStrategy) -> Self {
        Self { strategy, ..self }
    }
}

pub fn default_user_agent() -> String {
    format!("smap-validator/{}", env!("CARGO_PKG_VERSION"))
}
