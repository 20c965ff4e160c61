//! `canopy-types` – shared vocabulary for the canopy behavior-tree engine.
//!
//! Everything in here is plain data: the closed set of execution statuses,
//! node classification, the declarative port/manifest model consumed by tree
//! loaders, and the [`BtError`] taxonomy used across the workspace.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// NodeStatus
// ─────────────────────────────────────────────────────────────────────────────

/// The execution status of a node after (or between) ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    /// Not ticked yet, or reset after completion/halt.
    #[default]
    Idle,
    /// Started but not finished; tick again to resume.
    Running,
    /// Completed successfully during this tick.
    Success,
    /// Completed unsuccessfully during this tick.
    Failure,
    /// Excluded from execution this tick by a precondition.
    Skipped,
}

impl NodeStatus {
    /// `true` for every status except [`Idle`][NodeStatus::Idle] and
    /// [`Skipped`][NodeStatus::Skipped].
    #[inline]
    pub fn is_active(self) -> bool {
        !matches!(self, NodeStatus::Idle | NodeStatus::Skipped)
    }

    /// `true` for [`Success`][NodeStatus::Success] and
    /// [`Failure`][NodeStatus::Failure].
    #[inline]
    pub fn is_completed(self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Failure)
    }

    /// Swap `Success` and `Failure`; every other status passes through.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            NodeStatus::Success => NodeStatus::Failure,
            NodeStatus::Failure => NodeStatus::Success,
            other => other,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeStatus::Idle => "IDLE",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Success => "SUCCESS",
            NodeStatus::Failure => "FAILURE",
            NodeStatus::Skipped => "SKIPPED",
        };
        f.write_str(label)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeKind
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a node, used for introspection and printing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Action,
    Condition,
    Control,
    Decorator,
    Subtree,
    #[default]
    Undefined,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Action => "ACTION",
            NodeKind::Condition => "CONDITION",
            NodeKind::Control => "CONTROL",
            NodeKind::Decorator => "DECORATOR",
            NodeKind::Subtree => "SUBTREE",
            NodeKind::Undefined => "UNDEFINED",
        };
        f.write_str(label)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ports & manifests
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a declared port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
    InOut,
}

impl PortDirection {
    /// `true` when values can be read through a port of this direction.
    pub fn is_readable(self) -> bool {
        matches!(self, PortDirection::Input | PortDirection::InOut)
    }
}

/// Static description of one port declared by a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub direction: PortDirection,
    /// Rust type name of the value carried by the port.
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Value used when the port is declared but not remapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PortInfo {
    /// Create a port carrying values of type `T`.
    pub fn new<T: ?Sized>(direction: PortDirection) -> Self {
        Self {
            direction,
            type_name: std::any::type_name::<T>().to_string(),
            description: String::new(),
            default_value: None,
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a default value, stored in its string form.
    pub fn with_default(mut self, value: impl ToString) -> Self {
        self.default_value = Some(value.to_string());
        self
    }
}

/// Declared ports of a node type, keyed by port name.
pub type PortsList = BTreeMap<String, PortInfo>;

/// Port name → remapped value (a literal or a `{blackboard_key}` pointer).
pub type PortsRemapping = HashMap<String, String>;

/// Free-form attributes that are not ports.
pub type NonPortAttributes = HashMap<String, String>;

/// Declare an input port of type `T`.
pub fn input_port<T: ?Sized>(name: &str, description: &str) -> (String, PortInfo) {
    (
        name.to_string(),
        PortInfo::new::<T>(PortDirection::Input).with_description(description),
    )
}

/// Declare an input port of type `T` with a default value.
pub fn input_port_with_default<T: ?Sized>(
    name: &str,
    default: impl ToString,
    description: &str,
) -> (String, PortInfo) {
    (
        name.to_string(),
        PortInfo::new::<T>(PortDirection::Input)
            .with_description(description)
            .with_default(default),
    )
}

/// Declare an output port of type `T`.
pub fn output_port<T: ?Sized>(name: &str, description: &str) -> (String, PortInfo) {
    (
        name.to_string(),
        PortInfo::new::<T>(PortDirection::Output).with_description(description),
    )
}

/// Declare a port of type `T` that is both read and written.
pub fn bidirectional_port<T: ?Sized>(name: &str, description: &str) -> (String, PortInfo) {
    (
        name.to_string(),
        PortInfo::new::<T>(PortDirection::InOut).with_description(description),
    )
}

/// Declarative description of a registered node type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeManifest {
    pub kind: NodeKind,
    pub registration_id: String,
    #[serde(default)]
    pub ports: PortsList,
    #[serde(default)]
    pub metadata: Vec<(String, String)>,
}

impl TreeNodeManifest {
    pub fn new(kind: NodeKind, registration_id: impl Into<String>) -> Self {
        Self {
            kind,
            registration_id: registration_id.into(),
            ports: PortsList::new(),
            metadata: Vec::new(),
        }
    }

    /// Add declared ports, e.g. from [`input_port`] / [`output_port`].
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = (String, PortInfo)>) -> Self {
        self.ports.extend(ports);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while building or (for configuration mistakes) ticking a tree.
#[derive(Error, Debug)]
pub enum BtError {
    #[error("registration ID '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("registration ID '{0}' is not registered")]
    UnknownRegistration(String),

    #[error("missing required input port [{port}] in {node}")]
    MissingPort { node: String, port: String },

    #[error("invalid value '{value}' for port [{port}] in {node}: {reason}")]
    InvalidPort {
        node: String,
        port: String,
        value: String,
        reason: String,
    },

    #[error("{node} expects {expected} children, found {found}")]
    ChildCount {
        node: String,
        expected: String,
        found: usize,
    },

    #[error("{node}: {threshold_name} threshold {threshold} exceeds child count {children}")]
    ThresholdExceedsChildren {
        node: String,
        threshold_name: &'static str,
        threshold: usize,
        children: usize,
    },

    #[error("{node}: can't find requested child [{requested}]")]
    ChildNotFound { node: String, requested: String },

    #[error("{node}: a child should not return IDLE")]
    IdleChild { node: String },

    #[error("{node}: only a single child can return RUNNING")]
    MultipleRunningChildren { node: String },

    #[error("cannot add a child to {node}: {reason}")]
    CannotAddChild { node: String, reason: String },

    #[error("blackboard entry '{key}' holds {found}, not {expected}")]
    BlackboardType {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("blackboard entry '{0}' not found")]
    MissingEntry(String),

    #[error("output port [{port}] of {node} is not remapped to a blackboard entry")]
    OutputNotRemapped { node: String, port: String },

    #[error("timer thread could not be started: {0}")]
    Timer(#[from] std::io::Error),

    #[error("the tree has no root node")]
    NoRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_completed_predicates() {
        assert!(!NodeStatus::Idle.is_active());
        assert!(!NodeStatus::Skipped.is_active());
        assert!(NodeStatus::Running.is_active());
        assert!(NodeStatus::Success.is_active());
        assert!(NodeStatus::Failure.is_active());

        assert!(NodeStatus::Success.is_completed());
        assert!(NodeStatus::Failure.is_completed());
        assert!(!NodeStatus::Running.is_completed());
        assert!(!NodeStatus::Skipped.is_completed());
        assert!(!NodeStatus::Idle.is_completed());
    }

    #[test]
    fn invert_only_swaps_completed_statuses() {
        assert_eq!(NodeStatus::Success.invert(), NodeStatus::Failure);
        assert_eq!(NodeStatus::Failure.invert(), NodeStatus::Success);
        assert_eq!(NodeStatus::Running.invert(), NodeStatus::Running);
        assert_eq!(NodeStatus::Skipped.invert(), NodeStatus::Skipped);
        assert_eq!(NodeStatus::Idle.invert(), NodeStatus::Idle);
    }

    #[test]
    fn fresh_status_is_idle() {
        assert_eq!(NodeStatus::default(), NodeStatus::Idle);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&NodeStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        assert_eq!(NodeStatus::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn manifest_collects_ports() {
        let manifest = TreeNodeManifest::new(NodeKind::Decorator, "Retry").with_ports([
            input_port::<i32>("num_attempts", "attempts before giving up"),
            output_port::<String>("last_error", ""),
        ]);
        let port = &manifest.ports["num_attempts"];
        assert_eq!(port.direction, PortDirection::Input);
        assert_eq!(port.type_name, "i32");
        assert!(manifest.ports["last_error"].direction == PortDirection::Output);
    }

    #[test]
    fn manifest_json_roundtrip() {
        let manifest = TreeNodeManifest::new(NodeKind::Action, "Sleep")
            .with_ports([input_port_with_default::<u64>("msec", 100, "")]);
        let json = serde_json::to_string(&manifest).unwrap();
        let back: TreeNodeManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
        assert_eq!(back.ports["msec"].default_value.as_deref(), Some("100"));
    }

    #[test]
    fn bt_error_display() {
        let err = BtError::MissingPort {
            node: "Retry".to_string(),
            port: "num_attempts".to_string(),
        };
        assert!(err.to_string().contains("num_attempts"));

        let err = BtError::DuplicateRegistration("Sequence".to_string());
        assert!(err.to_string().contains("already registered"));
    }
}
