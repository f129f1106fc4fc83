use std::sync::Arc;

use crate::{
    models::{StackConfig, StackId},
    StackopsError, StackopsResult,
};

use super::state::Shared;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The local view of the stacks defined in the external registry.
#[derive(Clone)]
pub struct StackRegistry {
    shared: Arc<Shared>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StackRegistry {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Loads the stacks from the registry and replaces the local view with them.
    ///
    /// On failure the local view is left as it was and [`StackopsError::RegistryUnavailable`] is
    /// returned; callers must not read that as "there are no stacks". Stacks that disappeared
    /// from the registry are forgotten along with their snapshots, errors and pending refreshes.
    pub async fn list(&self) -> StackopsResult<Vec<StackConfig>> {
        let stacks = match self.shared.api.list_stacks().await {
            Ok(stacks) => stacks,
            Err(e) => {
                tracing::warn!("failed to load stacks: {e}");
                return Err(StackopsError::RegistryUnavailable(e.to_string()));
            }
        };

        let forgotten = self.shared.state().replace_stacks(stacks.clone());
        for timer in forgotten {
            timer.handle.abort();
        }

        tracing::info!("loaded {} stacks", stacks.len());
        Ok(stacks)
    }

    /// Deletes a stack from the registry.
    ///
    /// Must only be called once the user has confirmed the removal. The stack leaves the local
    /// view only after the registry confirmed the deletion; on failure it stays and
    /// [`StackopsError::RemoveFailed`] is returned.
    pub async fn remove(&self, id: StackId) -> StackopsResult<()> {
        let Some(stack) = self.get(id) else {
            return Err(StackopsError::StackNotFound(id));
        };

        if let Err(e) = self.shared.api.delete_stack(id).await {
            tracing::warn!("failed to remove stack {id} ({}): {e}", stack.name);
            return Err(StackopsError::RemoveFailed {
                stack_id: id,
                reason: e.to_string(),
            });
        }

        self.shared.forget_stack(id);
        tracing::info!("removed stack {id} ({})", stack.name);
        Ok(())
    }

    /// Returns the stacks of the local view, in registry order.
    pub fn stacks(&self) -> Vec<StackConfig> {
        self.shared.state().stacks.clone()
    }

    /// Returns the stack with the given id.
    pub fn get(&self, id: StackId) -> Option<StackConfig> {
        self.shared.state().stack(id).cloned()
    }

    /// Returns `true` if the stack is part of the local view.
    pub fn contains(&self, id: StackId) -> bool {
        self.shared.state().contains(id)
    }

    /// Returns `true` once the registry has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.shared.state().loaded
    }
}
