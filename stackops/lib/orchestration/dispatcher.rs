use std::{sync::Arc, time::Duration};

use crate::{
    models::{ContainerErrorMap, Operation, OperationResult, StackConfig, StackId},
    StackopsError, StackopsResult,
};

use super::{extract_container_errors, state::Shared, RefreshScheduler};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Dispatches operations against stacks, at most one at a time per stack.
///
/// Different stacks may have operations in flight concurrently. A second dispatch against a busy
/// stack is rejected with [`StackopsError::OperationInProgress`]; it is never queued.
#[derive(Clone)]
pub struct OperationDispatcher {
    shared: Arc<Shared>,
    scheduler: RefreshScheduler,
    refresh_delay: Duration,
    settle_refresh_delay: Duration,
}

/// The single-flight lock of a stack, released when dropped.
struct OperationGuard {
    shared: Arc<Shared>,
    stack_id: StackId,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OperationDispatcher {
    pub(crate) fn new(
        shared: Arc<Shared>,
        scheduler: RefreshScheduler,
        refresh_delay: Duration,
        settle_refresh_delay: Duration,
    ) -> Self {
        Self {
            shared,
            scheduler,
            refresh_delay,
            settle_refresh_delay,
        }
    }

    /// Runs `operation` against the stack.
    ///
    /// Refusals leave every piece of state untouched:
    /// - [`StackopsError::StackNotFound`] if the stack is not registered,
    /// - [`StackopsError::OperationNotAllowed`] for `restart`/`build` while the stack's latest
    ///   snapshot shows no running container,
    /// - [`StackopsError::OperationInProgress`] if another operation holds the stack's lock.
    ///
    /// Once dispatched, transport failures come back as a failed [`OperationResult`]. A mutating
    /// operation that succeeds clears the stack's container errors; one that fails records the
    /// container errors found in its output. Either way a refresh follows after the refresh
    /// delay, and a successful `up` gets a second one after the settle delay.
    pub async fn dispatch(
        &self,
        stack_id: StackId,
        operation: Operation,
    ) -> StackopsResult<OperationResult> {
        let (stack, guard) = self.acquire(stack_id, operation)?;

        tracing::info!("running {operation} on stack {stack_id} ({})", stack.name);
        let result = match self
            .shared
            .api
            .operate(stack_id, stack.operation_request(operation))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if e.is_transport() {
                    tracing::error!("backend unreachable for {operation} on stack {stack_id}: {e}");
                } else {
                    tracing::error!("backend rejected {operation} on stack {stack_id}: {e}");
                }

                OperationResult {
                    success: false,
                    message: format!("{operation} failed: {e}"),
                    output: String::new(),
                }
            }
        };

        drop(guard);

        if result.success {
            tracing::info!("{operation} on stack {stack_id} succeeded: {}", result.message);
        } else {
            tracing::warn!("{operation} on stack {stack_id} failed: {}", result.message);
        }

        if operation.is_mutating() {
            self.settle(stack_id, operation, &result);
        }

        Ok(result)
    }

    /// Returns the operation currently in flight for the stack.
    pub fn current_operation(&self, stack_id: StackId) -> Option<Operation> {
        self.shared.state().locks.get(&stack_id).copied()
    }

    /// Returns the container errors recorded for the stack.
    pub fn container_errors(&self, stack_id: StackId) -> ContainerErrorMap {
        self.shared
            .state()
            .errors
            .get(&stack_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Checks that the operation may run and takes the stack's lock, in one critical section.
    fn acquire(
        &self,
        stack_id: StackId,
        operation: Operation,
    ) -> StackopsResult<(StackConfig, OperationGuard)> {
        let mut state = self.shared.state();
        let stack = state
            .stack(stack_id)
            .cloned()
            .ok_or(StackopsError::StackNotFound(stack_id))?;

        if operation.requires_running() && !state.is_running(stack_id) {
            tracing::warn!("refusing {operation} on stack {stack_id}: no running containers");
            return Err(StackopsError::OperationNotAllowed {
                stack_id,
                operation,
            });
        }

        if let Some(current) = state.locks.get(&stack_id) {
            tracing::warn!("refusing {operation} on stack {stack_id}: {current} is in flight");
            return Err(StackopsError::OperationInProgress {
                stack_id,
                operation: *current,
            });
        }

        state.locks.insert(stack_id, operation);
        Ok((
            stack,
            OperationGuard {
                shared: self.shared.clone(),
                stack_id,
            },
        ))
    }

    /// Applies the post-operation policy of a mutating operation.
    fn settle(&self, stack_id: StackId, operation: Operation, result: &OperationResult) {
        {
            let mut state = self.shared.state();
            if !state.contains(stack_id) {
                tracing::debug!("stack {stack_id} was removed while {operation} was in flight");
                return;
            }

            if result.success {
                state.errors.remove(&stack_id);
            } else if !result.output.trim().is_empty() {
                let extracted = extract_container_errors(&result.output);
                if extracted.is_empty() {
                    tracing::debug!("no container could be blamed for the {operation} failure");
                } else {
                    state.errors.entry(stack_id).or_default().extend(extracted);
                }
            }
        }

        self.scheduler.schedule(stack_id, self.refresh_delay);
        if result.success && operation == Operation::Up {
            self.scheduler.schedule(stack_id, self.settle_refresh_delay);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.shared.state().locks.remove(&self.stack_id);
    }
}
