use std::{
    slice,
    sync::{Arc, Weak},
    time::Duration,
};

use scopeguard::defer;

use crate::models::StackId;

use super::{
    state::{PendingRefresh, Shared},
    StatusPoller,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Schedules delayed, best-effort status refreshes tied to the lifetime of their stack.
///
/// Every timer is tracked with its stack. Removing the stack cancels the timers that have not
/// fired yet, and a timer that fires for a stack that is gone does nothing.
#[derive(Clone)]
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RefreshScheduler {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Schedules a refresh of the stack after `delay`.
    ///
    /// Returns `false` without scheduling anything if the stack is not registered or the
    /// scheduler was shut down.
    pub fn schedule(&self, stack_id: StackId, delay: Duration) -> bool {
        let mut state = self.shared.state();
        if state.closed {
            tracing::debug!("not scheduling refresh of stack {stack_id} after shutdown");
            return false;
        }

        if !state.contains(stack_id) {
            tracing::debug!("not scheduling refresh of unregistered stack {stack_id}");
            return false;
        }

        let token = state.next_token;
        state.next_token += 1;

        // The timer cannot touch the state before this lock is released, so it is always
        // registered before it can fire.
        let handle = tokio::spawn(fire(Arc::downgrade(&self.shared), stack_id, token, delay));
        state
            .timers
            .entry(stack_id)
            .or_default()
            .push(PendingRefresh {
                token,
                delay,
                handle,
            });

        tracing::debug!("scheduled refresh of stack {stack_id} in {delay:?}");
        true
    }

    /// Returns the delays of the stack's timers that have not fired yet, in scheduling order.
    pub fn pending(&self, stack_id: StackId) -> Vec<Duration> {
        self.shared
            .state()
            .timers
            .get(&stack_id)
            .map(|timers| timers.iter().map(|timer| timer.delay).collect())
            .unwrap_or_default()
    }

    /// Cancels the stack's timers that have not fired yet and returns how many there were.
    pub fn cancel(&self, stack_id: StackId) -> usize {
        let timers = self
            .shared
            .state()
            .timers
            .remove(&stack_id)
            .unwrap_or_default();

        for timer in &timers {
            timer.handle.abort();
        }

        timers.len()
    }

    /// Cancels every timer that has not fired yet and stops accepting new ones.
    pub fn shutdown(&self) {
        self.shared.close_refreshes();
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

async fn fire(shared: Weak<Shared>, stack_id: StackId, token: u64, delay: Duration) {
    tokio::time::sleep(delay).await;

    let Some(shared) = shared.upgrade() else {
        return;
    };

    // The stack is marked before its timer disappears so it never looks idle in between.
    let stack = {
        let mut state = shared.state();
        state.take_timer(stack_id, token);
        let stack = state.stack(stack_id).cloned();
        if stack.is_some() {
            state.mark_refreshing(&[stack_id]);
        }
        stack
    };

    let Some(stack) = stack else {
        tracing::debug!("skipping refresh of removed stack {stack_id}");
        return;
    };

    defer! {
        shared.state().unmark_refreshing(&[stack_id]);
    }

    tracing::debug!("refreshing stack {stack_id} after {delay:?}");
    StatusPoller::new(shared.clone())
        .refresh(slice::from_ref(&stack), false)
        .await;
}
