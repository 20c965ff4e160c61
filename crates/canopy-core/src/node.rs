//! Node abstraction.
//!
//! Every node in a tree implements [`TreeNode`].  Concrete node types compose
//! a [`NodeBase`] holding the state every node shares:
//!
//! | Field          | Meaning                                                     |
//! |----------------|-------------------------------------------------------------|
//! | `name`         | Instance name (not required to be unique).                  |
//! | `status`       | Status after the last tick, or `Idle` after a reset.       |
//! | `config`       | Blackboard handle, port remappings, manifest, uid.          |
//! | `children`     | Owned children; capacity depends on the node's [`Arity`].  |
//! | `parent_uid`   | UID of the parent, for diagnostics only.                    |
//! | `wake_up`      | Signal shared with the tree driver.                         |
//! | `timers`       | Timer queue shared by the whole tree.                       |
//!
//! Parents never call [`TreeNode::tick`] directly.  They call
//! [`TreeNode::execute_tick`], which restarts a node from `Idle` unless it was
//! left `Running`, and terminate a child early only through
//! [`TreeNode::halt_and_reset`].
//!
//! # Port resolution
//!
//! [`NodeBase::get_input`] looks first at the input remapping table, then at
//! the manifest: a declared readable port yields its default value, or an
//! empty string when it has none.  Undeclared ports resolve to `None`.
//! A value of the form `{key}` is a pointer into the blackboard and is
//! followed by [`NodeBase::get_input_as`] and [`NodeBase::set_output`].

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use canopy_types::{BtError, NodeKind, NodeStatus, NonPortAttributes, PortsRemapping, TreeNodeManifest};
use tracing::{debug, error, warn};

use crate::blackboard::Blackboard;
use crate::timer::TimerQueue;
use crate::wake::WakeUpSignal;

// ─────────────────────────────────────────────────────────────────────────────
// NodeConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Per-instance configuration handed to a node constructor.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub blackboard: Arc<Blackboard>,
    /// Input port name → literal value or `{blackboard_key}`.
    pub input_ports: PortsRemapping,
    /// Output port name → `{blackboard_key}`.
    pub output_ports: PortsRemapping,
    pub other_attributes: NonPortAttributes,
    pub manifest: Option<Arc<TreeNodeManifest>>,
    pub uid: u16,
    /// Slash-separated location of the node in its tree.
    pub path: String,
    /// Panic on status anomalies instead of failing the node.
    pub strict: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(Blackboard::create())
    }
}

impl NodeConfig {
    pub fn new(blackboard: Arc<Blackboard>) -> Self {
        Self {
            blackboard,
            input_ports: PortsRemapping::new(),
            output_ports: PortsRemapping::new(),
            other_attributes: NonPortAttributes::new(),
            manifest: None,
            uid: 0,
            path: String::new(),
            strict: false,
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<String>) -> Self {
        self.input_ports.insert(port.into(), value.into());
        self
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<String>) -> Self {
        self.output_ports.insert(port.into(), value.into());
        self
    }

    pub fn with_manifest(mut self, manifest: Arc<TreeNodeManifest>) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.other_attributes.insert(key.into(), value.into());
        self
    }
}

/// Extract `key` from a `{key}` blackboard pointer.
pub fn blackboard_pointer(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    (!inner.is_empty()).then_some(inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeBase
// ─────────────────────────────────────────────────────────────────────────────

/// How many children a node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Actions and conditions.
    Leaf,
    /// Decorators: exactly one.
    Single,
    /// Control nodes: any number.
    Many,
}

/// State shared by every node type.
pub struct NodeBase {
    name: String,
    status: NodeStatus,
    config: NodeConfig,
    arity: Arity,
    children: Vec<Box<dyn TreeNode>>,
    parent_uid: Option<u16>,
    wake_up: Option<WakeUpSignal>,
    timers: Option<TimerQueue>,
}

impl NodeBase {
    pub fn new(name: impl Into<String>, config: NodeConfig, arity: Arity) -> Self {
        Self {
            name: name.into(),
            status: NodeStatus::Idle,
            config,
            arity,
            children: Vec::new(),
            parent_uid: None,
            wake_up: None,
            timers: None,
        }
    }

    /// Base for an action or condition.
    pub fn leaf(name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(name, config, Arity::Leaf)
    }

    /// Base for a decorator.
    pub fn decorator(name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(name, config, Arity::Single)
    }

    /// Base for a control node.
    pub fn control(name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(name, config, Arity::Many)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut NodeConfig {
        &mut self.config
    }

    pub fn blackboard(&self) -> &Arc<Blackboard> {
        &self.config.blackboard
    }

    pub fn uid(&self) -> u16 {
        self.config.uid
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn parent_uid(&self) -> Option<u16> {
        self.parent_uid
    }

    pub fn set_parent_uid(&mut self, uid: Option<u16>) {
        self.parent_uid = uid;
    }

    pub fn wake_up(&self) -> Option<&WakeUpSignal> {
        self.wake_up.as_ref()
    }

    pub fn set_wake_up(&mut self, signal: WakeUpSignal) {
        self.wake_up = Some(signal);
    }

    /// Timer queue of the tree this node belongs to.
    pub fn timers(&self) -> Option<&TimerQueue> {
        self.timers.as_ref()
    }

    pub fn set_timers(&mut self, timers: TimerQueue) {
        self.timers = Some(timers);
    }

    /// Ask the driver to tick the tree again as soon as possible.
    pub fn emit_wake_up_signal(&self) {
        if let Some(signal) = &self.wake_up {
            signal.emit();
        }
    }

    // ── Children ────────────────────────────────────────────────────────────

    pub fn add_child(&mut self, child: Box<dyn TreeNode>) -> Result<(), BtError> {
        let reason = match self.arity {
            Arity::Leaf => Some("leaf nodes have no children"),
            Arity::Single if !self.children.is_empty() => Some("a decorator takes exactly one child"),
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(BtError::CannotAddChild {
                node: self.name.clone(),
                reason: reason.to_string(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn children(&self) -> &[Box<dyn TreeNode>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Box<dyn TreeNode>] {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child_mut(&mut self, index: usize) -> &mut Box<dyn TreeNode> {
        &mut self.children[index]
    }

    /// The single child of a decorator.  A decorator without a child is a
    /// malformed tree and fails fast.
    pub fn only_child(&mut self) -> &mut Box<dyn TreeNode> {
        if self.children.is_empty() {
            self.config_error(BtError::ChildCount {
                node: self.name.clone(),
                expected: "1".to_string(),
                found: 0,
            });
        }
        &mut self.children[0]
    }

    /// Halt and reset every child.
    pub fn reset_children(&mut self) {
        for child in &mut self.children {
            child.halt_and_reset();
        }
    }

    /// Halt and reset one child.
    pub fn halt_child(&mut self, index: usize) {
        if let Some(child) = self.children.get_mut(index) {
            child.halt_and_reset();
        }
    }

    // ── Ports ───────────────────────────────────────────────────────────────

    /// Resolve the raw string of input port `key`.
    pub fn get_input(&self, key: &str) -> Option<String> {
        if let Some(value) = self.config.input_ports.get(key) {
            return Some(value.clone());
        }
        let port = self.config.manifest.as_ref()?.ports.get(key)?;
        if !port.direction.is_readable() {
            return None;
        }
        Some(port.default_value.clone().unwrap_or_default())
    }

    /// Resolve input port `key` as a `T`, following blackboard pointers.
    ///
    /// A blackboard entry may hold a `T` directly or a `String` that parses
    /// into one.  An unbound port is reported as [`BtError::MissingPort`].
    pub fn get_input_as<T>(&self, key: &str) -> Result<T, BtError>
    where
        T: FromStr + Any + Clone,
        T::Err: fmt::Display,
    {
        let raw = self
            .get_input(key)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| self.missing_port(key))?;

        let Some(entry_key) = blackboard_pointer(&raw) else {
            return self.parse_port(key, &raw);
        };
        let entry = self
            .config
            .blackboard
            .get_entry(entry_key)
            .ok_or_else(|| BtError::MissingEntry(entry_key.to_string()))?;
        if let Some(value) = entry.downcast_ref::<T>() {
            return Ok(value.clone());
        }
        if let Some(text) = entry.downcast_ref::<String>() {
            return self.parse_port(key, text);
        }
        if let Some(text) = entry.downcast_ref::<&'static str>() {
            return self.parse_port(key, text);
        }
        Err(BtError::BlackboardType {
            key: entry_key.to_string(),
            expected: std::any::type_name::<T>(),
            found: entry.type_name().to_string(),
        })
    }

    /// Write `value` to the blackboard entry output port `key` points at.
    ///
    /// The remapping must be `{entry}`, or `=` to use the port name itself.
    pub fn set_output<T: Any + Send + Sync>(&self, key: &str, value: T) -> Result<(), BtError> {
        let raw = self
            .config
            .output_ports
            .get(key)
            .or_else(|| self.config.input_ports.get(key))
            .ok_or_else(|| BtError::OutputNotRemapped {
                node: self.name.clone(),
                port: key.to_string(),
            })?;
        let entry_key = if raw == "=" {
            key
        } else {
            blackboard_pointer(raw).ok_or_else(|| BtError::InvalidPort {
                node: self.name.clone(),
                port: key.to_string(),
                value: raw.clone(),
                reason: "output ports must point to a blackboard entry".to_string(),
            })?
        };
        self.config.blackboard.set(entry_key, value);
        Ok(())
    }

    fn missing_port(&self, key: &str) -> BtError {
        BtError::MissingPort {
            node: self.name.clone(),
            port: key.to_string(),
        }
    }

    fn parse_port<T>(&self, key: &str, text: &str) -> Result<T, BtError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        text.trim().parse::<T>().map_err(|e| BtError::InvalidPort {
            node: self.name.clone(),
            port: key.to_string(),
            value: text.to_string(),
            reason: e.to_string(),
        })
    }

    // ── Failure policy ──────────────────────────────────────────────────────

    /// Abort on a malformed tree.
    pub fn config_error(&self, err: BtError) -> ! {
        error!(node = %self.name, uid = self.config.uid, error = %err, "tree configuration error");
        panic!("{err}");
    }

    /// Handle a child misbehaving at runtime: `Failure`, or a panic in strict
    /// mode.
    pub fn status_anomaly(&self, err: BtError) -> NodeStatus {
        if self.config.strict {
            error!(node = %self.name, uid = self.config.uid, error = %err, "status anomaly in strict mode");
            panic!("{err}");
        }
        warn!(node = %self.name, uid = self.config.uid, error = %err, "status anomaly, failing node");
        NodeStatus::Failure
    }
}

impl fmt::Debug for NodeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBase")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("uid", &self.config.uid)
            .field("children", &self.children.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TreeNode
// ─────────────────────────────────────────────────────────────────────────────

/// The capability set of every node in a tree.
pub trait TreeNode: Send {
    fn base(&self) -> &NodeBase;

    fn base_mut(&mut self) -> &mut NodeBase;

    fn kind(&self) -> NodeKind;

    /// One unit of work.  Called through [`execute_tick`][Self::execute_tick].
    fn tick(&mut self) -> NodeStatus;

    /// Node-specific cleanup: stop timers, halt running children.  Must be
    /// idempotent.
    fn halt(&mut self) {}

    /// `true` for nodes that complete asynchronously and emit a wake-up
    /// signal when they do.
    fn requires_wake_up(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn status(&self) -> NodeStatus {
        self.base().status()
    }

    fn set_status(&mut self, status: NodeStatus) {
        self.base_mut().set_status(status);
    }

    fn uid(&self) -> u16 {
        self.base().uid()
    }

    fn children(&self) -> &[Box<dyn TreeNode>] {
        self.base().children()
    }

    fn children_mut(&mut self) -> &mut [Box<dyn TreeNode>] {
        self.base_mut().children_mut()
    }

    fn add_child(&mut self, child: Box<dyn TreeNode>) -> Result<(), BtError> {
        self.base_mut().add_child(child)
    }

    fn get_input(&self, key: &str) -> Option<String> {
        self.base().get_input(key)
    }

    fn emit_wake_up_signal(&self) {
        self.base().emit_wake_up_signal();
    }

    /// Entry point used by parents: restart from `Idle` unless the node was
    /// left `Running`, tick, and record the result.
    fn execute_tick(&mut self) -> NodeStatus {
        let previous = self.status();
        if previous != NodeStatus::Running {
            self.set_status(NodeStatus::Idle);
        }
        let status = self.tick();
        if status != previous {
            debug!(node = %self.name(), uid = self.uid(), from = %previous, to = %status, "status change");
        }
        self.set_status(status);
        status
    }

    /// Halt, then force `Idle`.
    fn halt_and_reset(&mut self) {
        if self.status() == NodeStatus::Running {
            debug!(node = %self.name(), uid = self.uid(), "halting");
        }
        self.halt();
        self.set_status(NodeStatus::Idle);
    }
}

impl fmt::Debug for dyn TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("status", &self.status())
            .finish()
    }
}
