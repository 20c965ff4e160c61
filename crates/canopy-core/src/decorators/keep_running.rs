use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Keeps re-running the child across ticks until it fails.
///
/// Each `Success` restarts the child and reports `Running`; the first
/// `Failure` is returned.
pub struct KeepRunningUntilFailure {
    base: NodeBase,
}

impl KeepRunningUntilFailure {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
        }
    }
}

impl TreeNode for KeepRunningUntilFailure {
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
        match child.execute_tick() {
            NodeStatus::Success => {
                child.halt_and_reset();
                NodeStatus::Running
            }
            NodeStatus::Failure => {
                child.halt_and_reset();
                NodeStatus::Failure
            }
            other => other,
        }
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
    fn runs_until_the_child_fails() {
        let mut keep = KeepRunningUntilFailure::new("keep", NodeConfig::default());
        let counters = attach(&mut keep, &[&[Success, Running, Success, Failure]]);
        assert_eq!(keep.execute_tick(), Running);
        assert_eq!(keep.execute_tick(), Running);
        assert_eq!(keep.execute_tick(), Running);
        assert_eq!(keep.execute_tick(), Failure);
        assert_eq!(counters[0].ticks(), 4);
    }
}
