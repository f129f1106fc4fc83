use std::time::Duration;

use reqwest::{Client, Request, Response, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::StackopsConfig,
    models::{OperationRequest, OperationResult, ServicesResponse, StackConfig, StackId},
    StackopsError, StackopsResult,
};

use super::StackApi;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The route prefix of the compose stack endpoints, relative to the base URL.
const STACKS_ROUTE: &str = "docker-compose/";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A client for the stack backend's HTTP API.
///
/// Reads and deletions go through a client that retries transient failures with exponential
/// backoff. Operations are not idempotent, so they are sent exactly once, with a timeout long
/// enough for the compose command to finish.
#[derive(Debug, Clone)]
pub struct HttpStackApi {
    /// The client used for idempotent requests.
    client: ClientWithMiddleware,

    /// The client used for operate requests.
    operate_client: Client,

    /// The timeout of operate requests, overriding the client's request timeout.
    operate_timeout: Duration,

    /// The base URL every route is resolved against.
    base_url: Url,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl HttpStackApi {
    /// Creates a new client from the configuration.
    pub fn new(config: &StackopsConfig) -> StackopsResult<Self> {
        let base_url = parse_base_url(config.get_api_url())?;
        let inner = Client::builder()
            .timeout(config.get_request_timeout())
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.get_max_retries());
        let client = ClientBuilder::new(inner.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            operate_client: inner,
            operate_timeout: config.get_operate_timeout(),
            base_url,
        })
    }

    /// Returns the base URL the client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn stacks_url(&self) -> StackopsResult<Url> {
        self.join(STACKS_ROUTE)
    }

    fn stack_url(&self, id: StackId, suffix: &str) -> StackopsResult<Url> {
        self.join(&format!("{STACKS_ROUTE}{id}{suffix}"))
    }

    fn operate_request(&self, id: StackId, request: &OperationRequest) -> StackopsResult<Request> {
        let url = self.stack_url(id, "/operate")?;
        Ok(self
            .operate_client
            .post(url)
            .timeout(self.operate_timeout)
            .json(request)
            .build()?)
    }

    fn join(&self, route: &str) -> StackopsResult<Url> {
        self.base_url
            .join(route)
            .map_err(|e| StackopsError::InvalidUrl(format!("{}{route}: {e}", self.base_url)))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl StackApi for HttpStackApi {
    async fn list_stacks(&self) -> StackopsResult<Vec<StackConfig>> {
        let url = self.stacks_url()?;
        tracing::debug!("listing stacks: {url}");

        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn delete_stack(&self, id: StackId) -> StackopsResult<()> {
        let url = self.stack_url(id, "")?;
        tracing::debug!("deleting stack {id}: {url}");

        // The body of a successful deletion carries nothing the client needs
        let response = self.client.delete(url).send().await?;
        check(response).await?;

        Ok(())
    }

    async fn get_services(&self, id: StackId) -> StackopsResult<ServicesResponse> {
        let url = self.stack_url(id, "/services")?;
        tracing::debug!("fetching services of stack {id}: {url}");

        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn operate(
        &self,
        id: StackId,
        request: OperationRequest,
    ) -> StackopsResult<OperationResult> {
        let http_request = self.operate_request(id, &request)?;
        tracing::debug!(
            "running {} on stack {id}: {}",
            request.operation,
            http_request.url()
        );

        let response = self.operate_client.execute(http_request).await?;
        decode(response).await
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Parses the base URL, making sure relative routes resolve underneath its path.
fn parse_base_url(raw: &str) -> StackopsResult<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }

    Url::parse(&raw).map_err(|e| StackopsError::InvalidUrl(format!("{raw}: {e}")))
}

async fn decode<T: DeserializeOwned>(response: Response) -> StackopsResult<T> {
    Ok(check(response).await?.json::<T>().await?)
}

/// Turns a non-success response into a [`StackopsError::Backend`].
async fn check(response: Response) -> StackopsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StackopsError::Backend {
        status: status.as_u16(),
        message: backend_detail(&body),
    })
}

/// Extracts the `detail` the backend attaches to its error responses.
fn backend_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => match object.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(detail) => detail.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
