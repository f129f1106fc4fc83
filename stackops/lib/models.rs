//! Data model shared by the stack registry, the status poller and the operation dispatcher.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::StackopsError;

//--------------------------------------------------------------------------------------------------
// Types: Stack
//--------------------------------------------------------------------------------------------------

/// The externally assigned identifier of a stack.
pub type StackId = i64;

/// Per-container error text extracted from operation output, keyed by container name.
pub type ContainerErrorMap = BTreeMap<String, String>;

/// A stack as defined in the external registry.
///
/// The core only reads stacks and references them by id; creating and editing them is the
/// registry's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// The stable identifier assigned by the registry.
    pub id: StackId,

    /// The display name of the stack.
    pub name: String,

    /// The location of the orchestration descriptor.
    pub path: String,

    /// Restricts operations to a single service of the stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// A free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Operation modifiers (`detach`, `build`, `project-name`, ...) exactly as the registry stores
    /// them. A `true` value enables a switch; other values are passed along as the flag's argument.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub flags: Map<String, Value>,

    /// Whether the registry considers the stack active.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

//--------------------------------------------------------------------------------------------------
// Types: Operation
//--------------------------------------------------------------------------------------------------

/// A lifecycle operation that can be dispatched against a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create and start the stack's containers.
    Up,

    /// Stop and remove the stack's containers.
    Down,

    /// Restart the stack's containers.
    Restart,

    /// List the stack's containers.
    Ps,

    /// Fetch the stack's logs.
    Logs,

    /// Build the stack's images.
    Build,

    /// Pull the stack's images.
    Pull,
}

/// The body of an operate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRequest {
    /// The operation to run.
    pub operation: Operation,

    /// The service the operation targets, if restricted to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// The modifier flags to run the operation with.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub flags: Map<String, Value>,
}

/// The outcome of a dispatched operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the backend reported success.
    pub success: bool,

    /// A human readable summary.
    #[serde(default)]
    pub message: String,

    /// The raw output of the operation, possibly empty.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub output: String,
}

//--------------------------------------------------------------------------------------------------
// Types: Services
//--------------------------------------------------------------------------------------------------

/// A service entry exactly as the backend reported it.
///
/// Different backend versions label the same fields differently, so the entry is kept as an
/// untyped object until it is normalized into a [`ContainerStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawService(pub Map<String, Value>);

/// The payload of a services request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesResponse {
    /// Whether the backend could read the stack's services.
    #[serde(default)]
    pub success: bool,

    /// The raw service entries.
    ///
    /// Nested arrays are flattened and entries that are not objects are dropped, since some
    /// compose releases print all containers as a single array.
    #[serde(default, deserialize_with = "deserialize_services")]
    pub services: Vec<RawService>,

    /// The failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The normalized status of one container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// The compose service the container belongs to.
    pub service_name: String,

    /// The container's name.
    pub container_name: String,

    /// The raw state string, e.g. `running` or `Up 3 minutes`.
    pub status: String,
}

/// The most recently polled view of a stack's containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusSnapshot {
    /// Whether at least one container is classified as running.
    pub is_running: bool,

    /// The normalized containers.
    pub services: Vec<ContainerStatus>,

    /// Whether the stack targets a single service.
    pub has_specific_service: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StackConfig {
    /// Returns the request body for running `operation` with this stack's target service and flags.
    pub fn operation_request(&self, operation: Operation) -> OperationRequest {
        OperationRequest {
            operation,
            service_name: self.service_name.clone(),
            flags: self.flags.clone(),
        }
    }

    /// Returns `true` if the flag is set to `true`.
    pub fn is_flag_enabled(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(Value::Bool(true)))
    }

    /// Renders the flags the way the backend passes them to compose.
    ///
    /// Enabled switches become `--name`, disabled ones are left out and any other value becomes
    /// `--name value`.
    pub fn flag_args(&self) -> Vec<String> {
        self.flags
            .iter()
            .filter_map(|(name, value)| match value {
                Value::Bool(_) => self.is_flag_enabled(name).then(|| format!("--{name}")),
                Value::Null => None,
                Value::String(argument) => Some(format!("--{name} {argument}")),
                other => Some(format!("--{name} {other}")),
            })
            .collect()
    }
}

impl Operation {
    /// Every supported operation.
    pub const ALL: [Operation; 7] = [
        Operation::Up,
        Operation::Down,
        Operation::Restart,
        Operation::Ps,
        Operation::Logs,
        Operation::Build,
        Operation::Pull,
    ];

    /// Returns the wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Up => "up",
            Operation::Down => "down",
            Operation::Restart => "restart",
            Operation::Ps => "ps",
            Operation::Logs => "logs",
            Operation::Build => "build",
            Operation::Pull => "pull",
        }
    }

    /// Returns `true` if the operation may change the stack's containers.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Operation::Ps | Operation::Logs)
    }

    /// Returns `true` if the operation only makes sense while the stack has running containers.
    pub fn requires_running(&self) -> bool {
        matches!(self, Operation::Restart | Operation::Build)
    }
}

impl ServiceStatusSnapshot {
    /// The snapshot recorded when a stack's services could not be fetched.
    pub fn unavailable(stack: &StackConfig) -> Self {
        Self {
            is_running: false,
            services: Vec::new(),
            has_specific_service: stack.service_name.is_some(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = StackopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StackopsError::InvalidOperation(s.to_string()))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Serde
//--------------------------------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_services<'de, D>(deserializer: D) -> Result<Vec<RawService>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut services = Vec::with_capacity(raw.len());
    collect_services(raw, &mut services);
    Ok(services)
}

fn collect_services(values: Vec<Value>, services: &mut Vec<RawService>) {
    for value in values {
        match value {
            Value::Object(entry) => services.push(RawService(entry)),
            Value::Array(nested) => collect_services(nested, services),
            other => tracing::debug!("skipping service entry that is not an object: {other}"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
