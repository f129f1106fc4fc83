use crate::{
    models::{OperationRequest, OperationResult, ServicesResponse, StackConfig, StackId},
    StackopsResult,
};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The registry and operations API exposed by the stack backend.
#[async_trait::async_trait]
pub trait StackApi: Send + Sync {
    /// Lists every stack known to the registry.
    async fn list_stacks(&self) -> StackopsResult<Vec<StackConfig>>;

    /// Deletes a stack from the registry.
    async fn delete_stack(&self, id: StackId) -> StackopsResult<()>;

    /// Fetches the live services of a stack.
    ///
    /// A reachable backend that could not inspect the stack answers with `success: false`
    /// rather than an error.
    async fn get_services(&self, id: StackId) -> StackopsResult<ServicesResponse>;

    /// Runs an operation against a stack and returns the backend's verdict.
    async fn operate(&self, id: StackId, request: OperationRequest)
        -> StackopsResult<OperationResult>;
}
