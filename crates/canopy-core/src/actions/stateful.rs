//! Actions that span several ticks.
//!
//! A [`StatefulBehavior`] supplies three callbacks and [`StatefulAction`]
//! decides which one a tick needs:
//!
//! * `on_start` when the node enters from `Idle`,
//! * `on_running` while it is `Running`,
//! * `on_halted` when a parent aborts it mid-run.
//!
//! `on_halted` is never called for a node that is not `Running`, so
//! repeated halts (a parent halting, then resetting all children) clean up
//! exactly once.

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

pub trait StatefulBehavior: Send {
    fn on_start(&mut self, node: &mut NodeBase) -> NodeStatus;

    fn on_running(&mut self, node: &mut NodeBase) -> NodeStatus;

    fn on_halted(&mut self, node: &mut NodeBase);

    /// Whether completion is signalled through the tree's wake-up signal.
    fn requires_wake_up(&self) -> bool {
        false
    }
}

/// Leaf node driving a [`StatefulBehavior`].
pub struct StatefulAction<B> {
    base: NodeBase,
    behavior: B,
}

impl<B: StatefulBehavior> StatefulAction<B> {
    pub fn new(name: impl Into<String>, config: NodeConfig, behavior: B) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            behavior,
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }
}

impl<B: StatefulBehavior> TreeNode for StatefulAction<B> {
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
        let status = if self.base.status() == NodeStatus::Running {
            self.behavior.on_running(&mut self.base)
        } else {
            self.behavior.on_start(&mut self.base)
        };
        if status == NodeStatus::Idle {
            let err = BtError::IdleChild {
                node: self.base.name().to_string(),
            };
            return self.base.status_anomaly(err);
        }
        status
    }

    fn halt(&mut self) {
        if self.base.status() == NodeStatus::Running {
            self.behavior.on_halted(&mut self.base);
        }
    }

    fn requires_wake_up(&self) -> bool {
        self.behavior.requires_wake_up()
    }
}
