use std::sync::Arc;

use scopeguard::defer;

use crate::models::{ServiceStatusSnapshot, StackConfig, StackId};

use super::{snapshot_from_services, state::Shared};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Polls the backend for the live containers of stacks and keeps one snapshot per stack.
#[derive(Clone)]
pub struct StatusPoller {
    shared: Arc<Shared>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StatusPoller {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Refreshes the snapshots of `stacks`, one stack at a time in the given order.
    ///
    /// A stack whose services cannot be fetched is recorded as not running with no services;
    /// the failure never reaches the caller and never stops the batch. Stacks that are not (or
    /// no longer) registered are skipped.
    ///
    /// With `mark_refreshing`, every stack of the batch is reported as refreshing until the
    /// whole batch has completed.
    pub async fn refresh(&self, stacks: &[StackConfig], mark_refreshing: bool) {
        let ids: Vec<StackId> = stacks.iter().map(|stack| stack.id).collect();
        if mark_refreshing {
            self.shared.state().mark_refreshing(&ids);
        }

        defer! {
            if mark_refreshing {
                self.shared.state().unmark_refreshing(&ids);
            }
        }

        for stack in stacks {
            if !self.shared.state().contains(stack.id) {
                tracing::debug!("skipping refresh of unregistered stack {}", stack.id);
                continue;
            }

            let snapshot = self.fetch(stack).await;

            let mut state = self.shared.state();
            if state.contains(stack.id) {
                state.snapshots.insert(stack.id, snapshot);
            } else {
                tracing::debug!("discarding snapshot of removed stack {}", stack.id);
            }
        }
    }

    /// Returns the latest snapshot of a stack.
    pub fn snapshot(&self, id: StackId) -> Option<ServiceStatusSnapshot> {
        self.shared.state().snapshots.get(&id).cloned()
    }

    /// Returns `true` while a marked refresh of the stack is in progress.
    pub fn is_refreshing(&self, id: StackId) -> bool {
        self.shared.state().is_refreshing(id)
    }

    async fn fetch(&self, stack: &StackConfig) -> ServiceStatusSnapshot {
        match self.shared.api.get_services(stack.id).await {
            Ok(response) if response.success => {
                let snapshot = snapshot_from_services(stack, &response.services);
                tracing::debug!(
                    "stack {} ({}): {} services, running={}",
                    stack.id,
                    stack.name,
                    snapshot.services.len(),
                    snapshot.is_running
                );
                snapshot
            }
            Ok(response) => {
                tracing::warn!(
                    "backend could not read services of stack {} ({}): {}",
                    stack.id,
                    stack.name,
                    response.message.as_deref().unwrap_or("no reason given")
                );
                ServiceStatusSnapshot::unavailable(stack)
            }
            Err(e) => {
                tracing::warn!(
                    "failed to fetch services of stack {} ({}): {e}",
                    stack.id,
                    stack.name
                );
                ServiceStatusSnapshot::unavailable(stack)
            }
        }
    }
}
