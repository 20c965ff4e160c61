//! Closure-backed leaves, for hosts that do not need a dedicated node type.

use std::sync::Arc;

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Tick callback of a [`SimpleAction`] or [`SimpleCondition`].
///
/// Receives the node's [`NodeBase`] so it can read ports and the blackboard.
pub type TickFn = Arc<dyn Fn(&mut NodeBase) -> NodeStatus + Send + Sync>;

fn run(base: &mut NodeBase, tick_fn: &TickFn) -> NodeStatus {
    match tick_fn(base) {
        NodeStatus::Idle => {
            let err = BtError::IdleChild {
                node: base.name().to_string(),
            };
            base.status_anomaly(err)
        }
        status => status,
    }
}

/// Action leaf that delegates its tick to a closure.
pub struct SimpleAction {
    base: NodeBase,
    tick_fn: TickFn,
}

impl SimpleAction {
    pub fn new(
        name: impl Into<String>,
        config: NodeConfig,
        tick_fn: impl Fn(&mut NodeBase) -> NodeStatus + Send + Sync + 'static,
    ) -> Self {
        Self::from_shared(name, config, Arc::new(tick_fn))
    }

    pub fn from_shared(name: impl Into<String>, config: NodeConfig, tick_fn: TickFn) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            tick_fn,
        }
    }
}

impl TreeNode for SimpleAction {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn tick(&mut self) -> NodeStatus {
        run(&mut self.base, &self.tick_fn)
    }
}

/// Condition leaf that delegates its tick to a closure.
///
/// Conditions should answer `Success` or `Failure` without side effects.
pub struct SimpleCondition {
    base: NodeBase,
    tick_fn: TickFn,
}

impl SimpleCondition {
    pub fn new(
        name: impl Into<String>,
        config: NodeConfig,
        tick_fn: impl Fn(&mut NodeBase) -> NodeStatus + Send + Sync + 'static,
    ) -> Self {
        Self::from_shared(name, config, Arc::new(tick_fn))
    }

    pub fn from_shared(name: impl Into<String>, config: NodeConfig, tick_fn: TickFn) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            tick_fn,
        }
    }
}

impl TreeNode for SimpleCondition {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    fn tick(&mut self) -> NodeStatus {
        run(&mut self.base, &self.tick_fn)
    }
}
