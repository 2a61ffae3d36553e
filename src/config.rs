/// Which validation the hook performs
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Always passes. The deployment is never gated.
    #[default]
    Noop,
    /// Probes an http health endpoint of the new revision
    Http,
}

impl std::str::FromStr for CheckType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noop" => Ok(Self::Noop),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Invalid {
                key: "checkType",
                value: other.to_owned(),
            }),
        }
    }
}

/// How the callback delay grows while a check stays pending
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Always report `pollIntervalSeconds`
    #[default]
    Fixed,
    /// Double the delay for every pending answer, capped at
    /// `maxCallbackDelaySeconds`
    Exponential,
}

impl std::str::FromStr for Backoff {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(ConfigError::Invalid {
                key: "backoff",
                value: other.to_owned(),
            }),
        }
    }
}

/// Configuration of the hook responder
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Validation to perform
    pub check_type: CheckType,
    /// Time the check may take per invocation before the hook answers
    /// `IN_PROGRESS`
    pub timeout_seconds: u64,
    /// Delay reported while the check is pending
    pub poll_interval_seconds: u64,
    /// Growth of the reported delay
    pub backoff: Backoff,
    /// Upper bound for the reported delay
    pub max_callback_delay_seconds: u64,
    /// Url probed by [`CheckType::Http`]. `{revisionId}` is replaced
    /// with the revision of the event.
    pub health_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_type: CheckType::Noop,
            timeout_seconds: 25,
            poll_interval_seconds: 30,
            backoff: Backoff::Fixed,
            max_callback_delay_seconds: 300,
            health_url: None,
        }
    }
}

/// Invalid hook configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Name of the setting
        key: &'static str,
        /// Value which was given
        value: String,
    },
    /// A value was parsed but is out of range
    #[error("{0}")]
    OutOfRange(&'static str),
    /// The selected check needs a setting which is missing
    #[error("missing {0}")]
    Missing(&'static str),
}

impl Config {
    /// Environment variable names and the setting they map to
    pub const ENV_VARS: [(&'static str, &'static str); 6] = [
        ("HOOK_CHECK_TYPE", "checkType"),
        ("HOOK_TIMEOUT_SECONDS", "timeoutSeconds"),
        ("HOOK_POLL_INTERVAL_SECONDS", "pollIntervalSeconds"),
        ("HOOK_BACKOFF", "backoff"),
        ("HOOK_MAX_CALLBACK_DELAY_SECONDS", "maxCallbackDelaySeconds"),
        ("HOOK_HEALTH_URL", "healthUrl"),
    ];

    /// Reads the configuration from the process environment.
    /// Unset variables keep their default.
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        Self::from_lookup(|name| std::env::var(name).ok())
            .context("Invalid hook configuration in environment")
    }

    /// Reads the configuration through `lookup`, which resolves an
    /// environment variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for (var, key) in Self::ENV_VARS {
            let Some(value) = lookup(var) else {
                continue;
            };
            match key {
                "checkType" => config.check_type = value.parse()?,
                "timeoutSeconds" => config.timeout_seconds = parse_seconds(key, &value)?,
                "pollIntervalSeconds" => config.poll_interval_seconds = parse_seconds(key, &value)?,
                "backoff" => config.backoff = value.parse()?,
                "maxCallbackDelaySeconds" => {
                    config.max_callback_delay_seconds = parse_seconds(key, &value)?;
                }
                _ => config.health_url = Some(value),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the ranges of all values and whether the selected
    /// check has everything it needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::OutOfRange("timeoutSeconds must be at least 1"));
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::OutOfRange(
                "pollIntervalSeconds must be at least 1",
            ));
        }
        if self.max_callback_delay_seconds < self.poll_interval_seconds {
            return Err(ConfigError::OutOfRange(
                "maxCallbackDelaySeconds must not be below pollIntervalSeconds",
            ));
        }
        let has_url = self
            .health_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if self.check_type == CheckType::Http && !has_url {
            return Err(ConfigError::Missing("healthUrl"));
        }
        Ok(())
    }

    /// Per invocation budget of the check
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

fn parse_seconds(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}
