use std::{slice, sync::Arc, time::Duration};

use crate::{
    api::{HttpStackApi, StackApi},
    config::StackopsConfig,
    models::{
        ContainerErrorMap, Operation, OperationResult, ServiceStatusSnapshot, StackConfig, StackId,
    },
    presentation::StackView,
    StackopsError, StackopsResult,
};

use super::{state::Shared, OperationDispatcher, RefreshScheduler, StackRegistry, StatusPoller};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Manages the docker compose stacks of a backend.
///
/// The manager ties the registry, the status poller, the operation dispatcher and the refresh
/// scheduler to one shared state. It is cheap to clone and every clone sees the same state.
///
/// ## Example
///
/// ```rust,no_run
/// use stackops::{config::StackopsConfig, models::Operation, orchestration::StackManager};
///
/// # async fn run() -> stackops::StackopsResult<()> {
/// let manager = StackManager::connect(&StackopsConfig::from_env()?)?;
/// manager.load().await?;
/// manager.refresh_all(true).await;
///
/// let result = manager.dispatch(1, Operation::Up).await?;
/// println!("{}", result.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StackManager {
    registry: StackRegistry,
    poller: StatusPoller,
    dispatcher: OperationDispatcher,
    scheduler: RefreshScheduler,
    shared: Arc<Shared>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StackManager {
    /// Creates a manager over the given backend.
    ///
    /// Must be called from within a tokio runtime once operations are dispatched, since the
    /// follow-up refreshes are spawned onto it.
    pub fn new(api: Arc<dyn StackApi>, config: &StackopsConfig) -> Self {
        let shared = Arc::new(Shared::new(api));
        let scheduler = RefreshScheduler::new(shared.clone());

        Self {
            registry: StackRegistry::new(shared.clone()),
            poller: StatusPoller::new(shared.clone()),
            dispatcher: OperationDispatcher::new(
                shared.clone(),
                scheduler.clone(),
                config.get_refresh_delay(),
                config.get_settle_refresh_delay(),
            ),
            scheduler,
            shared,
        }
    }

    /// Creates a manager talking to the HTTP backend the configuration points at.
    pub fn connect(config: &StackopsConfig) -> StackopsResult<Self> {
        let api = HttpStackApi::new(config)?;
        tracing::debug!("using stack backend at {}", api.base_url());
        Ok(Self::new(Arc::new(api), config))
    }

    /// Returns the registry.
    pub fn registry(&self) -> &StackRegistry {
        &self.registry
    }

    /// Returns the status poller.
    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    /// Returns the operation dispatcher.
    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.dispatcher
    }

    /// Returns the refresh scheduler.
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Loads the stacks from the registry. See [`StackRegistry::list`].
    pub async fn load(&self) -> StackopsResult<Vec<StackConfig>> {
        self.registry.list().await
    }

    /// Refreshes every stack of the local view.
    pub async fn refresh_all(&self, mark_refreshing: bool) {
        let stacks = self.registry.stacks();
        self.poller.refresh(&stacks, mark_refreshing).await;
    }

    /// Refreshes one stack and returns its new snapshot.
    pub async fn refresh_stack(
        &self,
        id: StackId,
        mark_refreshing: bool,
    ) -> StackopsResult<ServiceStatusSnapshot> {
        let stack = self
            .registry
            .get(id)
            .ok_or(StackopsError::StackNotFound(id))?;

        self.poller
            .refresh(slice::from_ref(&stack), mark_refreshing)
            .await;

        self.poller
            .snapshot(id)
            .ok_or(StackopsError::StackNotFound(id))
    }

    /// Runs an operation against a stack. See [`OperationDispatcher::dispatch`].
    pub async fn dispatch(
        &self,
        id: StackId,
        operation: Operation,
    ) -> StackopsResult<OperationResult> {
        self.dispatcher.dispatch(id, operation).await
    }

    /// Deletes a stack from the registry. See [`StackRegistry::remove`].
    pub async fn remove(&self, id: StackId) -> StackopsResult<()> {
        self.registry.remove(id).await
    }

    /// Returns the local view of the registry's stacks.
    pub fn stacks(&self) -> Vec<StackConfig> {
        self.registry.stacks()
    }

    /// Returns the latest snapshot of a stack.
    pub fn snapshot(&self, id: StackId) -> Option<ServiceStatusSnapshot> {
        self.poller.snapshot(id)
    }

    /// Returns the container errors recorded for a stack.
    pub fn container_errors(&self, id: StackId) -> ContainerErrorMap {
        self.dispatcher.container_errors(id)
    }

    /// Returns `true` while a marked refresh of the stack is in progress.
    pub fn is_refreshing(&self, id: StackId) -> bool {
        self.poller.is_refreshing(id)
    }

    /// Returns the operation in flight for a stack.
    pub fn current_operation(&self, id: StackId) -> Option<Operation> {
        self.dispatcher.current_operation(id)
    }

    /// Returns the delays of the refreshes scheduled for a stack that have not fired yet.
    pub fn pending_refreshes(&self, id: StackId) -> Vec<Duration> {
        self.scheduler.pending(id)
    }

    /// Returns the view model of a stack.
    pub fn view(&self, id: StackId) -> Option<StackView> {
        let state = self.shared.state();
        let stack = state.stack(id)?.clone();

        Some(StackView::new(
            stack,
            state.snapshots.get(&id).cloned(),
            state.errors.get(&id).cloned().unwrap_or_default(),
            state.is_refreshing(id),
            state.locks.get(&id).copied(),
        ))
    }

    /// Returns the view models of every stack, in registry order.
    pub fn views(&self) -> Vec<StackView> {
        let ids: Vec<StackId> = self.stacks().iter().map(|stack| stack.id).collect();
        ids.into_iter().filter_map(|id| self.view(id)).collect()
    }

    /// Cancels every pending refresh.
    ///
    /// Operations in flight are left to complete, but no refresh is scheduled after this call.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        tracing::debug!("stack manager shut down");
    }
}
