use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Reactive `while condition { do } else { else }` over two or three
/// children.
///
/// The condition is re-evaluated on every tick.  When its outcome flips
/// while a branch is running, that branch is halted and the other one runs.
/// Without an else branch a failing condition fails the node.
pub struct WhileDoElse {
    base: NodeBase,
}

impl WhileDoElse {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
        }
    }
}

impl TreeNode for WhileDoElse {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Control
    }

    fn tick(&mut self) -> NodeStatus {
        let child_count = self.base.child_count();
        if !(2..=3).contains(&child_count) {
            return self.base.status_anomaly(BtError::ChildCount {
                node: self.base.name().to_string(),
                expected: "2 or 3".to_string(),
                found: child_count,
            });
        }
        self.base.set_status(NodeStatus::Running);

        let (chosen, other) = match self.base.child_mut(0).execute_tick() {
            NodeStatus::Running => return NodeStatus::Running,
            NodeStatus::Success => (1, 2),
            NodeStatus::Failure if child_count == 3 => (2, 1),
            NodeStatus::Failure => {
                self.base.halt_child(1);
                return NodeStatus::Failure;
            }
            NodeStatus::Skipped => {
                self.base.reset_children();
                return NodeStatus::Skipped;
            }
            NodeStatus::Idle => {
                let err = BtError::IdleChild {
                    node: self.base.name().to_string(),
                };
                self.base.reset_children();
                return self.base.status_anomaly(err);
            }
        };

        self.base.halt_child(other);
        let status = self.base.child_mut(chosen).execute_tick();
        if status != NodeStatus::Running {
            self.base.reset_children();
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
    fn reevaluates_condition_each_tick() {
        let mut wde = WhileDoElse::new("wde", NodeConfig::default());
        let counters = attach(&mut wde, &[&[Success], &[Running], &[Success]]);
        assert_eq!(wde.execute_tick(), Running);
        assert_eq!(wde.execute_tick(), Running);
        assert_eq!(counters[0].ticks(), 2);
        assert_eq!(counters[2].ticks(), 0);
    }

    #[test]
    fn flipped_condition_halts_do_branch_and_runs_else() {
        let mut wde = WhileDoElse::new("wde", NodeConfig::default());
        let counters = attach(&mut wde, &[&[Success, Failure], &[Running], &[Success]]);
        assert_eq!(wde.execute_tick(), Running);
        assert_eq!(wde.execute_tick(), Success);
        assert!(counters[1].halts() >= 1);
        assert_eq!(counters[2].ticks(), 1);
    }

    #[test]
    fn failing_condition_without_else_fails() {
        let mut wde = WhileDoElse::new("wde", NodeConfig::default());
        let counters = attach(&mut wde, &[&[Success, Failure], &[Running]]);
        assert_eq!(wde.execute_tick(), Running);
        assert_eq!(wde.execute_tick(), Failure);
        assert_eq!(counters[1].halts(), 1);
    }

    #[test]
    fn wrong_arity_is_a_failure() {
        let mut wde = WhileDoElse::new("wde", NodeConfig::default());
        attach(&mut wde, &[&[Success]]);
        assert_eq!(wde.execute_tick(), Failure);
    }
}
