use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Leaf that completes immediately with a fixed status.
///
/// Registered as `AlwaysSuccess` and `AlwaysFailure`.
pub struct Always {
    base: NodeBase,
    outcome: NodeStatus,
}

impl Always {
    pub fn success(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            outcome: NodeStatus::Success,
        }
    }

    pub fn failure(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            outcome: NodeStatus::Failure,
        }
    }
}

impl TreeNode for Always {
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
        self.outcome
    }
}
