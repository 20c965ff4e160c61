use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Runs the child to its first completion, then reports `Success` without
/// ticking it again.  Halting the decorator forgets the completion.
pub struct RunOnce {
    base: NodeBase,
    already_run: bool,
}

impl RunOnce {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            already_run: false,
        }
    }

    pub fn already_run(&self) -> bool {
        self.already_run
    }
}

impl TreeNode for RunOnce {
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
        if self.already_run {
            return NodeStatus::Success;
        }
        self.base.set_status(NodeStatus::Running);
        let child = self.base.only_child();
        let status = child.execute_tick();
        if status.is_completed() {
            child.halt_and_reset();
            self.already_run = true;
        }
        status
    }

    fn halt(&mut self) {
        self.already_run = false;
        self.base.reset_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::attach;
    use NodeStatus::*;

    #[test]
    fn child_runs_only_until_first_completion() {
        let mut once = RunOnce::new("once", NodeConfig::default());
        let counters = attach(&mut once, &[&[Running, Failure]]);
        assert_eq!(once.execute_tick(), Running);
        assert_eq!(once.execute_tick(), Failure);
        assert_eq!(once.execute_tick(), Success);
        assert_eq!(once.execute_tick(), Success);
        assert_eq!(counters[0].ticks(), 2);
    }

    #[test]
    fn halt_clears_the_cache() {
        let mut once = RunOnce::new("once", NodeConfig::default());
        let counters = attach(&mut once, &[&[Success]]);
        once.execute_tick();
        assert!(once.already_run());
        once.halt_and_reset();
        assert!(!once.already_run());
        once.execute_tick();
        assert_eq!(counters[0].ticks(), 2);
    }
}
