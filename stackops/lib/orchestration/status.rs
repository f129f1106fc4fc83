//! Normalization and classification of the container status reported by the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ContainerStatus, RawService, ServiceStatusSnapshot, StackConfig};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The value used for a field none of whose aliases is populated.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// The labels the service name may appear under, in priority order.
pub const SERVICE_NAME_ALIASES: &[&str] = &["service_name", "Service", "Name"];

/// The labels the container name may appear under, in priority order.
pub const CONTAINER_NAME_ALIASES: &[&str] = &["container_name", "Name", "Names"];

/// The labels the container state may appear under, in priority order.
pub const STATUS_ALIASES: &[&str] = &["status", "State", "Status"];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The coarse category a raw container state falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    /// The container is up.
    Running,

    /// The container has exited or was stopped.
    Stopped,

    /// The container is paused.
    Paused,

    /// The container is starting or restarting.
    Restarting,

    /// The container was created but never started.
    Created,

    /// The state could not be recognized.
    Unknown,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RawService {
    /// Returns the first populated string among `aliases`.
    fn first_populated(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| match self.0.get(*alias) {
            Some(Value::String(value)) if !value.trim().is_empty() => Some(value.as_str()),
            _ => None,
        })
    }

    /// Resolves the field aliases into the canonical container status.
    pub fn normalize(&self) -> ContainerStatus {
        let field = |aliases: &[&str]| {
            self.first_populated(aliases)
                .unwrap_or(UNKNOWN_FIELD)
                .to_string()
        };

        ContainerStatus {
            service_name: field(SERVICE_NAME_ALIASES),
            container_name: field(CONTAINER_NAME_ALIASES),
            status: field(STATUS_ALIASES),
        }
    }
}

impl ContainerStatus {
    /// Classifies the container's state.
    pub fn class(&self) -> StatusClass {
        classify(&self.status)
    }
}

impl StatusClass {
    /// Returns the lowercase name of the class.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Running => "running",
            StatusClass::Stopped => "stopped",
            StatusClass::Paused => "paused",
            StatusClass::Restarting => "restarting",
            StatusClass::Created => "created",
            StatusClass::Unknown => "unknown",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Classifies a raw container state.
///
/// Matching is a case-insensitive substring search and the first matching rule wins:
///
/// 1. `running`, `up`, or exactly `started` → [`StatusClass::Running`]
/// 2. `exited`, `stopped`, `down` → [`StatusClass::Stopped`]
/// 3. `paused`, `pause` → [`StatusClass::Paused`]
/// 4. `restarting`, `starting` → [`StatusClass::Restarting`]
/// 5. `created`, `new` → [`StatusClass::Created`]
/// 6. anything else → [`StatusClass::Unknown`]
pub fn classify(state: &str) -> StatusClass {
    let state = state.trim().to_lowercase();
    let has = |needle: &str| state.contains(needle);

    if has("running") || has("up") || state == "started" {
        StatusClass::Running
    } else if has("exited") || has("stopped") || has("down") {
        StatusClass::Stopped
    } else if has("paused") || has("pause") {
        StatusClass::Paused
    } else if has("restarting") || has("starting") {
        StatusClass::Restarting
    } else if has("created") || has("new") {
        StatusClass::Created
    } else {
        StatusClass::Unknown
    }
}

/// Builds a stack's snapshot from the raw services the backend reported.
pub fn snapshot_from_services(stack: &StackConfig, raw: &[RawService]) -> ServiceStatusSnapshot {
    let services: Vec<ContainerStatus> = raw.iter().map(RawService::normalize).collect();
    let is_running = services
        .iter()
        .any(|service| service.class() == StatusClass::Running);

    ServiceStatusSnapshot {
        is_running,
        services,
        has_specific_service: stack.service_name.is_some(),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
