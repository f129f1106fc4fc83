use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::{
    api::StackApi,
    models::{ContainerErrorMap, Operation, ServiceStatusSnapshot, StackConfig, StackId},
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The state shared by the registry, the poller, the dispatcher and the refresh timers.
pub(crate) struct Shared {
    /// The backend every component talks to.
    pub(crate) api: Arc<dyn StackApi>,

    /// Everything the subsystem knows about its stacks.
    state: Mutex<StackState>,
}

/// The mutable state owned by the subsystem.
///
/// The lock is never held across an `.await`.
#[derive(Default)]
pub(crate) struct StackState {
    /// The registry's stacks, in registry order.
    pub(crate) stacks: Vec<StackConfig>,

    /// Whether the registry has been loaded at least once.
    pub(crate) loaded: bool,

    /// The latest snapshot of every polled stack.
    pub(crate) snapshots: HashMap<StackId, ServiceStatusSnapshot>,

    /// The container errors extracted from each stack's latest failing operation.
    pub(crate) errors: HashMap<StackId, ContainerErrorMap>,

    /// How many refreshes currently mark each stack as refreshing.
    pub(crate) refreshing: HashMap<StackId, usize>,

    /// The operation holding each busy stack's lock.
    pub(crate) locks: HashMap<StackId, Operation>,

    /// The refresh timers that have not fired yet.
    pub(crate) timers: HashMap<StackId, Vec<PendingRefresh>>,

    /// The token handed to the next scheduled refresh.
    pub(crate) next_token: u64,

    /// Whether the subsystem was shut down, after which nothing is scheduled anymore.
    pub(crate) closed: bool,
}

/// A scheduled refresh that has not fired yet.
pub(crate) struct PendingRefresh {
    /// Identifies the timer so it can remove itself once it fires.
    pub(crate) token: u64,

    /// The delay the timer was scheduled with.
    pub(crate) delay: Duration,

    /// The task sleeping until the refresh is due.
    pub(crate) handle: JoinHandle<()>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Shared {
    /// Creates the shared state around a backend.
    pub(crate) fn new(api: Arc<dyn StackApi>) -> Self {
        Self {
            api,
            state: Mutex::new(StackState::default()),
        }
    }

    /// Locks the state.
    pub(crate) fn state(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops everything known about a stack and cancels its pending refreshes.
    ///
    /// An operation in flight keeps its lock until it completes.
    pub(crate) fn forget_stack(&self, id: StackId) {
        let timers = self.state().forget(id);
        for timer in timers {
            timer.handle.abort();
        }
    }

    /// Cancels every pending refresh and refuses new ones from then on.
    pub(crate) fn close_refreshes(&self) {
        let timers: Vec<_> = {
            let mut state = self.state();
            state.closed = true;
            state.timers.drain().collect()
        };
        let count = timers.iter().map(|(_, timers)| timers.len()).sum::<usize>();
        for timer in timers.into_iter().flat_map(|(_, timers)| timers) {
            timer.handle.abort();
        }

        if count > 0 {
            tracing::debug!("cancelled {count} pending refreshes");
        }
    }
}

impl StackState {
    /// Returns the registered stack with the given id.
    pub(crate) fn stack(&self, id: StackId) -> Option<&StackConfig> {
        self.stacks.iter().find(|stack| stack.id == id)
    }

    /// Returns `true` if the stack is registered.
    pub(crate) fn contains(&self, id: StackId) -> bool {
        self.stack(id).is_some()
    }

    /// Returns `true` if the latest snapshot of the stack shows a running container.
    pub(crate) fn is_running(&self, id: StackId) -> bool {
        self.snapshots
            .get(&id)
            .map(|snapshot| snapshot.is_running)
            .unwrap_or(false)
    }

    /// Returns `true` if at least one refresh currently marks the stack.
    pub(crate) fn is_refreshing(&self, id: StackId) -> bool {
        self.refreshing.get(&id).is_some_and(|count| *count > 0)
    }

    /// Marks the stacks as refreshing.
    pub(crate) fn mark_refreshing(&mut self, ids: &[StackId]) {
        for id in ids {
            *self.refreshing.entry(*id).or_default() += 1;
        }
    }

    /// Releases the refreshing marks taken by [`StackState::mark_refreshing`].
    pub(crate) fn unmark_refreshing(&mut self, ids: &[StackId]) {
        for id in ids {
            if let Some(count) = self.refreshing.get_mut(id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.refreshing.remove(id);
                }
            }
        }
    }

    /// Replaces the registry's stacks, forgetting the ones that disappeared.
    ///
    /// Returns the timers of the forgotten stacks so the caller can cancel them.
    pub(crate) fn replace_stacks(&mut self, stacks: Vec<StackConfig>) -> Vec<PendingRefresh> {
        let removed: Vec<StackId> = self
            .stacks
            .iter()
            .map(|stack| stack.id)
            .filter(|id| !stacks.iter().any(|stack| stack.id == *id))
            .collect();

        self.stacks = stacks;
        self.loaded = true;

        removed.into_iter().flat_map(|id| self.forget(id)).collect()
    }

    /// Removes a stack and everything derived from it, returning its pending timers.
    pub(crate) fn forget(&mut self, id: StackId) -> Vec<PendingRefresh> {
        self.stacks.retain(|stack| stack.id != id);
        self.snapshots.remove(&id);
        self.errors.remove(&id);
        self.refreshing.remove(&id);
        self.timers.remove(&id).unwrap_or_default()
    }

    /// Removes a timer that has fired.
    pub(crate) fn take_timer(&mut self, id: StackId, token: u64) {
        if let Some(timers) = self.timers.get_mut(&id) {
            timers.retain(|timer| timer.token != token);
            if timers.is_empty() {
                self.timers.remove(&id);
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for timer in state.timers.drain().flat_map(|(_, timers)| timers) {
            timer.handle.abort();
        }
    }
}
