use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Ticks a child chosen from outside the tree.
///
/// Ports:
/// - `SELECTED_CHILD_INDEX`: index of the child to run; unbound or out of
///   range means "no selection".
/// - `REPEAT_LAST_SELECTION`: when `true` and nothing is selected, run the
///   previously executed child again.
///
/// Returns `Running` while waiting for a selection.  A selected child that
/// is `Running` stays selected until it completes.
pub struct ManualSelector {
    base: NodeBase,
    running_child: Option<usize>,
    previously_executed: Option<usize>,
}

impl ManualSelector {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            running_child: None,
            previously_executed: None,
        }
    }

    /// Child index executed most recently to completion.
    pub fn previously_executed(&self) -> Option<usize> {
        self.previously_executed
    }

    fn requested_child(&self) -> Option<usize> {
        let index = self.base.get_input_as::<i64>("SELECTED_CHILD_INDEX").ok()?;
        usize::try_from(index)
            .ok()
            .filter(|&index| index < self.base.child_count())
    }
}

impl TreeNode for ManualSelector {
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
        if self.base.child_count() == 0 {
            return NodeStatus::Success;
        }
        let repeat_last = self
            .base
            .get_input_as::<bool>("REPEAT_LAST_SELECTION")
            .unwrap_or(false);

        let selected = self
            .requested_child()
            .or(self.running_child)
            .or(if repeat_last { self.previously_executed } else { None });
        let Some(selected) = selected else {
            return NodeStatus::Running;
        };

        if let Some(running) = self.running_child
            && running != selected
        {
            self.base.halt_child(running);
        }

        let status = self.base.child_mut(selected).execute_tick();
        if status == NodeStatus::Running {
            self.running_child = Some(selected);
        } else {
            self.running_child = None;
            self.previously_executed = Some(selected);
            self.base.halt_child(selected);
        }
        status
    }

    fn halt(&mut self) {
        self.running_child = None;
        self.base.reset_children();
    }
}
