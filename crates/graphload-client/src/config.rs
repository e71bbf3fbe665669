//! Client pool settings

use std::time::Duration;

use graphload_core::{ClientError, Result};
use serde::{Deserialize, Serialize};

use crate::retry::{BackoffStrategy, RetryPolicy};

/// Commands run once on an active session after the pool is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostStart {
    commands: String,
    /// Settle period after the commands, in milliseconds
    #[serde(default)]
    after_period_ms: u64,
}

impl PostStart {
    pub fn new(commands: impl Into<String>) -> Self {
        Self {
            commands: commands.into(),
            after_period_ms: 0,
        }
    }

    pub fn with_after_period_ms(mut self, after_period_ms: u64) -> Self {
        self.after_period_ms = after_period_ms;
        self
    }

    pub fn commands(&self) -> &str {
        &self.commands
    }

    pub fn after_period(&self) -> Duration {
        Duration::from_millis(self.after_period_ms)
    }
}

/// Commands run once on an active session while the pool shuts down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreStop {
    commands: String,
}

impl PreStop {
    pub fn new(commands: impl Into<String>) -> Self {
        Self {
            commands: commands.into(),
        }
    }

    pub fn commands(&self) -> &str {
        &self.commands
    }
}

fn default_user() -> String {
    "root".to_string()
}

fn default_password() -> String {
    "nebula".to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_channel_buffer_size() -> usize {
    128
}

fn default_retry() -> u32 {
    1
}

/// Settings for a [`ClientPool`](crate::ClientPool)
///
/// # Example
///
/// ```
/// use graphload_client::ClientSettings;
///
/// let settings = ClientSettings::from_toml_str(r#"
///     address = "127.0.0.1:9669,127.0.0.2:9669"
///     space = "basketball"
///     concurrency = 4
///
///     [post_start]
///     commands = "CREATE TAG IF NOT EXISTS player(name string);"
///     after_period_ms = 8000
/// "#).unwrap();
///
/// assert_eq!(settings.concurrency(), 4);
/// assert_eq!(settings.retry(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Comma-separated `host:port` list
    address: String,
    #[serde(default = "default_user")]
    user: String,
    #[serde(default = "default_password")]
    password: String,
    /// Graph space every session writes into
    space: String,
    /// Sessions per endpoint
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    /// Capacity of each worker's request queue
    #[serde(default = "default_channel_buffer_size")]
    channel_buffer_size: usize,
    /// Bounded retries per request for transient failures
    #[serde(default = "default_retry")]
    retry: u32,
    #[serde(default)]
    post_start: Option<PostStart>,
    #[serde(default)]
    pre_stop: Option<PreStop>,
    #[serde(default)]
    backoff: BackoffStrategy,
    /// Deadline for each execute call, in milliseconds; unset means no deadline
    #[serde(default)]
    execute_timeout_ms: Option<u64>,
}

impl ClientSettings {
    /// Create settings with defaults for everything but address and space
    pub fn new(address: impl Into<String>, space: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: default_user(),
            password: default_password(),
            space: space.into(),
            concurrency: default_concurrency(),
            channel_buffer_size: default_channel_buffer_size(),
            retry: default_retry(),
            post_start: None,
            pre_stop: None,
            backoff: BackoffStrategy::default(),
            execute_timeout_ms: None,
        }
    }

    /// Parse and validate settings from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: ClientSettings =
            toml::from_str(source).map_err(|e| ClientError::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values the pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(ClientError::Configuration("address must not be empty".into()));
        }
        if self.space.trim().is_empty() {
            return Err(ClientError::Configuration("space must not be empty".into()));
        }
        if self.concurrency == 0 {
            return Err(ClientError::Configuration(
                "concurrency must be greater than 0".into(),
            ));
        }
        if self.channel_buffer_size == 0 {
            return Err(ClientError::Configuration(
                "channel_buffer_size must be greater than 0".into(),
            ));
        }
        self.backoff.validate()
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_post_start(mut self, post_start: PostStart) -> Self {
        self.post_start = Some(post_start);
        self
    }

    pub fn with_pre_stop(mut self, pre_stop: PreStop) -> Self {
        self.pre_stop = Some(pre_stop);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_execute_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.execute_timeout_ms = timeout_ms;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn channel_buffer_size(&self) -> usize {
        self.channel_buffer_size
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn post_start(&self) -> Option<&PostStart> {
        self.post_start.as_ref()
    }

    pub fn pre_stop(&self) -> Option<&PreStop> {
        self.pre_stop.as_ref()
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    pub fn execute_timeout(&self) -> Option<Duration> {
        self.execute_timeout_ms.map(Duration::from_millis)
    }

    /// Retry policy built from `retry` and `backoff`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry, self.backoff.clone())
    }
}
