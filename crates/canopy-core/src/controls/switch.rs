use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Ticks the one child whose name equals the `switch` input.
///
/// The input may point at the blackboard (`{mode}`), so the branch follows
/// the host application's data.  When the selection changes while another
/// child is running, that child is halted first.  A missing `switch` port or
/// a value that names no child is a malformed tree.
pub struct Switch {
    base: NodeBase,
    running_child: Option<usize>,
}

impl Switch {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            running_child: None,
        }
    }

    fn selection(&self) -> usize {
        let value = self
            .base
            .get_input_as::<String>("switch")
            .unwrap_or_else(|err| self.base.config_error(err));
        self.base
            .children()
            .iter()
            .position(|child| child.name() == value)
            .unwrap_or_else(|| {
                self.base.config_error(BtError::ChildNotFound {
                    node: self.base.name().to_string(),
                    requested: value.clone(),
                })
            })
    }
}

impl TreeNode for Switch {
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
        let selected = self.selection();

        if let Some(running) = self.running_child
            && running != selected
        {
            self.base.halt_child(running);
        }

        let status = self.base.child_mut(selected).execute_tick();
        self.running_child = (status == NodeStatus::Running).then_some(selected);
        status
    }

    fn halt(&mut self) {
        self.running_child = None;
        self.base.reset_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::testing::Scripted;
    use std::sync::Arc;
    use NodeStatus::*;

    fn switch_over(bb: &Arc<Blackboard>) -> (Switch, Vec<crate::testing::Counters>) {
        let config = NodeConfig::new(Arc::clone(bb)).with_input("switch", "{mode}");
        let mut switch = Switch::new("switch", config);
        let mut counters = Vec::new();
        for (name, script) in [("patrol", &[Running][..]), ("charge", &[Success][..])] {
            let (child, c) = Scripted::boxed(name, script);
            switch.add_child(child).unwrap();
            counters.push(c);
        }
        (switch, counters)
    }

    #[test]
    fn ticks_only_the_named_child() {
        let bb = Blackboard::create();
        bb.set("mode", "charge".to_string());
        let (mut switch, counters) = switch_over(&bb);
        assert_eq!(switch.execute_tick(), Success);
        assert_eq!(counters[0].ticks(), 0);
        assert_eq!(counters[1].ticks(), 1);
    }

    #[test]
    fn changing_selection_halts_previous_child() {
        let bb = Blackboard::create();
        bb.set("mode", "patrol".to_string());
        let (mut switch, counters) = switch_over(&bb);
        assert_eq!(switch.execute_tick(), Running);

        bb.set("mode", "charge".to_string());
        assert_eq!(switch.execute_tick(), Success);
        assert_eq!(counters[0].halts(), 1);
    }

    #[test]
    #[should_panic(expected = "can't find requested child [dock]")]
    fn unknown_child_fails_fast() {
        let bb = Blackboard::create();
        bb.set("mode", "dock".to_string());
        let (mut switch, _) = switch_over(&bb);
        switch.execute_tick();
    }

    #[test]
    #[should_panic(expected = "missing required input port [switch]")]
    fn missing_switch_port_fails_fast() {
        let mut switch = Switch::new("switch", NodeConfig::default());
        let (child, _) = Scripted::boxed("a", &[Success]);
        switch.add_child(child).unwrap();
        switch.execute_tick();
    }
}
