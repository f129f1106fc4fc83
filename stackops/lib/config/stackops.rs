//! Runtime configuration of the stack client.

use std::{env, str::FromStr, time::Duration};

use getset::{CopyGetters, Getters, Setters};
use typed_builder::TypedBuilder;

use crate::{StackopsError, StackopsResult};

use super::{
    API_URL_ENV_VAR, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_OPERATE_TIMEOUT,
    DEFAULT_REFRESH_DELAY, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SETTLE_REFRESH_DELAY,
    MAX_RETRIES_ENV_VAR, OPERATE_TIMEOUT_ENV_VAR, REFRESH_DELAY_ENV_VAR, REQUEST_TIMEOUT_ENV_VAR,
    SETTLE_REFRESH_DELAY_ENV_VAR,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The stackops configuration.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters, CopyGetters, Setters)]
pub struct StackopsConfig {
    /// The base URL of the stack backend.
    #[builder(default = DEFAULT_API_URL.to_string(), setter(into))]
    #[getset(get = "pub with_prefix", set = "pub")]
    api_url: String,

    /// The timeout of a single registry or services request.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    #[getset(get_copy = "pub with_prefix")]
    request_timeout: Duration,

    /// The timeout of an operate request.
    #[builder(default = DEFAULT_OPERATE_TIMEOUT)]
    #[getset(get_copy = "pub with_prefix")]
    operate_timeout: Duration,

    /// How many times idempotent requests are retried on transient failures.
    #[builder(default = DEFAULT_MAX_RETRIES)]
    #[getset(get_copy = "pub with_prefix")]
    max_retries: u32,

    /// The delay before the refresh that follows every mutating operation.
    #[builder(default = DEFAULT_REFRESH_DELAY)]
    #[getset(get_copy = "pub with_prefix")]
    refresh_delay: Duration,

    /// The delay before the extra refresh that follows a successful `up`.
    #[builder(default = DEFAULT_SETTLE_REFRESH_DELAY)]
    #[getset(get_copy = "pub with_prefix")]
    settle_refresh_delay: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StackopsConfig {
    /// Reads the configuration from the environment, using the defaults for unset variables.
    pub fn from_env() -> StackopsResult<Self> {
        Ok(Self {
            api_url: env::var(API_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            request_timeout: env_parse::<u64>(REQUEST_TIMEOUT_ENV_VAR)?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            operate_timeout: env_parse::<u64>(OPERATE_TIMEOUT_ENV_VAR)?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_OPERATE_TIMEOUT),
            max_retries: env_parse::<u32>(MAX_RETRIES_ENV_VAR)?.unwrap_or(DEFAULT_MAX_RETRIES),
            refresh_delay: env_parse::<u64>(REFRESH_DELAY_ENV_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REFRESH_DELAY),
            settle_refresh_delay: env_parse::<u64>(SETTLE_REFRESH_DELAY_ENV_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SETTLE_REFRESH_DELAY),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for StackopsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn env_parse<T: FromStr>(name: &str) -> StackopsResult<Option<T>> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            StackopsError::InvalidConfig(format!("{name} has an invalid value: {value:?}"))
        }),
        Err(_) => Ok(None),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
