use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Boundary of an embedded subtree.
///
/// Passes the child's status through unchanged.  Its only job is to mark
/// where a subtree begins, so a loader can give the subtree its own scoped
/// blackboard (see [`Blackboard::scoped`](crate::Blackboard::scoped));
/// the `_autoremap` port records whether that scope auto-remaps keys.
pub struct Subtree {
    base: NodeBase,
}

impl Subtree {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
        }
    }

    /// Value of the `_autoremap` port; `false` when unbound or unparsable.
    pub fn auto_remap(&self) -> bool {
        self.base.get_input_as::<bool>("_autoremap").unwrap_or(false)
    }
}

impl TreeNode for Subtree {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Subtree
    }

    fn tick(&mut self) -> NodeStatus {
        if self.base.status() == NodeStatus::Idle {
            self.base.set_status(NodeStatus::Running);
        }
        let child = self.base.only_child();
        let status = child.execute_tick();
        if status.is_completed() {
            child.halt_and_reset();
        }
        status
    }

    fn halt(&mut self) {
        self.base.reset_children();
    }
}
