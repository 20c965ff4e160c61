//! `canopy-core` – the behavior-tree engine.
//!
//! A tree is a hierarchy of [`TreeNode`]s ticked from the root.  Each tick
//! produces a [`NodeStatus`]; control nodes and decorators decide which
//! children to tick and how to combine their results, leaves do the work.
//!
//! # Modules
//!
//! - [`blackboard`] – [`Blackboard`]: thread-safe, scoped key/value store
//!   with per-write sequence ids used for change detection.
//! - [`node`] – [`TreeNode`] and [`NodeBase`]: the node contract, port
//!   resolution and the shared per-node state.
//! - [`controls`] – Sequence, Fallback, reactive and parallel variants,
//!   Switch, IfThenElse, WhileDoElse, ManualSelector.
//! - [`decorators`] – Inverter, Force, Retry/Repeat, Timeout, Delay,
//!   RunOnce, Subtree, KeepRunningUntilFailure, EntryUpdated, ConsumeQueue.
//! - [`actions`] – built-in leaves plus closure-backed and stateful
//!   actions for host code.
//! - [`tree`] – [`BehaviorTree`]: owns the root and is the only tick
//!   entry point.
//! - [`factory`] – [`BehaviorTreeFactory`]: registry of node types by id,
//!   used by tree loaders.
//! - [`timer`] / [`wake`] – the background timers behind Timeout, Delay and
//!   Sleep, and the signal they use to ask for a re-tick.
//!
//! # Failure policy
//!
//! A malformed tree (missing required port, wrong child count, unknown
//! switch case) panics at the first tick that notices it, after logging the
//! [`BtError`] with `tracing::error!`.  A child misbehaving at runtime (for
//! example returning `Idle`) fails its parent instead, unless strict mode is
//! enabled with [`BehaviorTree::set_strict_mode`].

pub mod actions;
pub mod blackboard;
pub mod controls;
pub mod decorators;
pub mod factory;
pub mod node;
pub mod timer;
pub mod tree;
pub mod wake;

#[cfg(test)]
mod testing;

pub use blackboard::{AnyValue, Blackboard, Entry, SharedQueue, shared_queue};
pub use factory::{BehaviorTreeFactory, NodeBuilder};
pub use node::{Arity, NodeBase, NodeConfig, TreeNode, blackboard_pointer};
pub use tree::BehaviorTree;
pub use wake::WakeUpSignal;

pub use canopy_types::{
    BtError, NodeKind, NodeStatus, PortDirection, PortInfo, PortsList, PortsRemapping,
    TreeNodeManifest, bidirectional_port, input_port, input_port_with_default, output_port,
};
