use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Replaces a completed child's outcome with a fixed status.
///
/// Registered as `ForceSuccess` and `ForceFailure`.
pub struct Force {
    base: NodeBase,
    outcome: NodeStatus,
}

impl Force {
    pub fn success(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            outcome: NodeStatus::Success,
        }
    }

    pub fn failure(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            outcome: NodeStatus::Failure,
        }
    }
}

impl TreeNode for Force {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn tick(&mut self) -> NodeStatus {
        self.base.set_status(NodeStatus::Running);
        let child = self.base.only_child();
        let status = child.execute_tick();
        if status.is_completed() {
            child.halt_and_reset();
            return self.outcome;
        }
        status
    }

    fn halt(&mut self) {
        self.base.reset_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::attach;
    use NodeStatus::*;

    #[test]
    fn forces_outcome_once_child_completes() {
        let mut force = Force::success("ok", NodeConfig::default());
        let counters = attach(&mut force, &[&[Running, Failure]]);
        assert_eq!(force.execute_tick(), Running);
        assert_eq!(force.execute_tick(), Success);
        assert_eq!(counters[0].halts(), 1);

        let mut force = Force::failure("ko", NodeConfig::default());
        attach(&mut force, &[&[Success]]);
        assert_eq!(force.execute_tick(), Failure);
    }

    #[test]
    fn skipped_child_is_not_forced() {
        let mut force = Force::success("ok", NodeConfig::default());
        attach(&mut force, &[&[Skipped]]);
        assert_eq!(force.execute_tick(), Skipped);
    }
}
