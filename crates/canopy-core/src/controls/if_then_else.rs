use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

const CONDITION: usize = 0;
const THEN: usize = 1;
const ELSE: usize = 2;

/// `if condition { then } else { else }` over exactly three children.
///
/// The condition is evaluated once; while the chosen branch is `Running`
/// later ticks resume that branch without re-checking the condition.  The
/// branch that was not chosen is halted.
pub struct IfThenElse {
    base: NodeBase,
    /// Branch being executed, if the condition already completed.
    branch: Option<usize>,
}

impl IfThenElse {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            branch: None,
        }
    }
}

impl TreeNode for IfThenElse {
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
        if child_count != 3 {
            return self.base.status_anomaly(BtError::ChildCount {
                node: self.base.name().to_string(),
                expected: "3".to_string(),
                found: child_count,
            });
        }
        self.base.set_status(NodeStatus::Running);

        let branch = match self.branch {
            Some(branch) => branch,
            None => match self.base.child_mut(CONDITION).execute_tick() {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Success => THEN,
                NodeStatus::Failure => ELSE,
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
            },
        };

        let other = if branch == THEN { ELSE } else { THEN };
        self.base.halt_child(other);

        let status = self.base.child_mut(branch).execute_tick();
        if status == NodeStatus::Running {
            self.branch = Some(branch);
        } else {
            self.branch = None;
            self.base.reset_children();
        }
        status
    }

    fn halt(&mut self) {
        self.branch = None;
        self.base.reset_children();
    }
}
