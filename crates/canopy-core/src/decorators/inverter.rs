use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Swaps `Success` and `Failure`; `Running` and `Skipped` pass through.
pub struct Inverter {
    base: NodeBase,
}

impl Inverter {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
        }
    }
}

impl TreeNode for Inverter {
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
        }
        status.invert()
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

    fn inverted(script: &[NodeStatus]) -> Inverter {
        let mut inv = Inverter::new("not", NodeConfig::default());
        attach(&mut inv, &[script]);
        inv
    }

    #[test]
    fn swaps_completed_statuses() {
        assert_eq!(inverted(&[Success]).execute_tick(), Failure);
        assert_eq!(inverted(&[Failure]).execute_tick(), Success);
    }

    #[test]
    fn running_and_skipped_pass_through() {
        assert_eq!(inverted(&[Running]).execute_tick(), Running);
        assert_eq!(inverted(&[Skipped]).execute_tick(), Skipped);
    }
}
