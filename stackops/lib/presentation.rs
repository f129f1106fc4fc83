//! Read-only view models of the stacks, for whatever renders them.

use serde::Serialize;

use crate::{
    models::{ContainerErrorMap, Operation, ServiceStatusSnapshot, StackConfig},
    orchestration::StatusClass,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The badge of a container that the latest failing operation blamed.
pub const ERROR_BADGE: StatusBadge = StatusBadge {
    glyph: "✖",
    label: "error",
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How a status is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StatusBadge {
    /// A single-character symbol.
    pub glyph: &'static str,

    /// A short category name.
    pub label: &'static str,
}

/// One container row of a [`StackView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceView {
    /// The compose service.
    pub service_name: String,

    /// The container.
    pub container_name: String,

    /// The raw state.
    pub status: String,

    /// The classification of the raw state.
    pub class: StatusClass,

    /// The badge to display, [`ERROR_BADGE`] when the container has an error.
    pub badge: StatusBadge,

    /// The error text to show as a tooltip.
    pub error: Option<String>,
}

/// Everything there is to display about a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackView {
    /// The stack's registry entry.
    pub stack: StackConfig,

    /// Whether the stack has been polled yet.
    pub polled: bool,

    /// Whether at least one container is running.
    pub is_running: bool,

    /// Whether the stack targets a single service.
    pub has_specific_service: bool,

    /// The container rows.
    pub services: Vec<ServiceView>,

    /// The errors of the latest failing operation, including ones for containers that are gone.
    pub errors: ContainerErrorMap,

    /// Whether a marked refresh is in progress.
    pub refreshing: bool,

    /// The operation in flight, if any.
    pub operation: Option<Operation>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StatusClass {
    /// Returns the badge the class is displayed with.
    pub fn badge(&self) -> StatusBadge {
        let (glyph, label) = match self {
            StatusClass::Running => ("●", "running"),
            StatusClass::Stopped => ("○", "stopped"),
            StatusClass::Paused => ("◐", "paused"),
            StatusClass::Restarting => ("↻", "restarting"),
            StatusClass::Created => ("◌", "created"),
            StatusClass::Unknown => ("?", "unknown"),
        };

        StatusBadge { glyph, label }
    }
}

impl StackView {
    pub(crate) fn new(
        stack: StackConfig,
        snapshot: Option<ServiceStatusSnapshot>,
        errors: ContainerErrorMap,
        refreshing: bool,
        operation: Option<Operation>,
    ) -> Self {
        let polled = snapshot.is_some();
        let snapshot = snapshot.unwrap_or_else(|| ServiceStatusSnapshot::unavailable(&stack));

        let services = snapshot
            .services
            .into_iter()
            .map(|service| {
                let class = service.class();
                let error = errors.get(&service.container_name).cloned();
                ServiceView {
                    badge: if error.is_some() {
                        ERROR_BADGE
                    } else {
                        class.badge()
                    },
                    service_name: service.service_name,
                    container_name: service.container_name,
                    status: service.status,
                    class,
                    error,
                }
            })
            .collect();

        Self {
            stack,
            polled,
            is_running: snapshot.is_running,
            has_specific_service: snapshot.has_specific_service,
            services,
            errors,
            refreshing,
            operation,
        }
    }

    /// Returns the badge summarizing the whole stack.
    pub fn badge(&self) -> StatusBadge {
        match (self.polled, self.is_running) {
            (false, _) => StatusClass::Unknown.badge(),
            (true, true) => StatusClass::Running.badge(),
            (true, false) => StatusClass::Stopped.badge(),
        }
    }

    /// Returns `true` if no operation is in flight.
    pub fn can_operate(&self) -> bool {
        self.operation.is_none()
    }

    /// Returns `true` if `operation` can be dispatched right now.
    pub fn can_dispatch(&self, operation: Operation) -> bool {
        self.can_operate() && (!operation.requires_running() || self.is_running)
    }

    /// Returns `true` if the restart affordance is enabled.
    pub fn can_restart(&self) -> bool {
        self.can_dispatch(Operation::Restart)
    }

    /// Returns `true` if the build affordance is enabled.
    pub fn can_build(&self) -> bool {
        self.can_dispatch(Operation::Build)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
