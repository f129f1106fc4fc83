use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default base URL of the stack backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

/// The default timeout of a single registry or services request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default timeout of an operate request.
///
/// The backend gives compose commands up to five minutes, so operate requests have to outlive that.
pub const DEFAULT_OPERATE_TIMEOUT: Duration = Duration::from_secs(310);

/// The default number of retries for transient failures of idempotent requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The default delay before the status refresh that follows a mutating operation.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(1000);

/// The default delay before the second refresh that follows a successful `up`.
pub const DEFAULT_SETTLE_REFRESH_DELAY: Duration = Duration::from_millis(5000);

/// The environment variable holding the backend base URL.
pub const API_URL_ENV_VAR: &str = "STACKOPS_API_URL";

/// The environment variable holding the request timeout in seconds.
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "STACKOPS_REQUEST_TIMEOUT_SECS";

/// The environment variable holding the operate request timeout in seconds.
pub const OPERATE_TIMEOUT_ENV_VAR: &str = "STACKOPS_OPERATE_TIMEOUT_SECS";

/// The environment variable holding the number of transient retries.
pub const MAX_RETRIES_ENV_VAR: &str = "STACKOPS_MAX_RETRIES";

/// The environment variable holding the post-operation refresh delay in milliseconds.
pub const REFRESH_DELAY_ENV_VAR: &str = "STACKOPS_REFRESH_DELAY_MS";

/// The environment variable holding the settle refresh delay in milliseconds.
pub const SETTLE_REFRESH_DELAY_ENV_VAR: &str = "STACKOPS_SETTLE_REFRESH_DELAY_MS";
