use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Ticks children in order until one succeeds (a selector).
///
/// Mirror of [`Sequence`](super::Sequence): failures advance the cursor, the
/// first success rewinds it and stops.  The asynchronous variant
/// (`AsyncFallback`) returns `Running` after each failing child that
/// completed within a single tick, emitting a wake-up so the driver comes
/// straight back, instead of trying every alternative in one tick.
pub struct Fallback {
    base: NodeBase,
    current_child: usize,
    skipped_count: usize,
    asynch: bool,
}

impl Fallback {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            current_child: 0,
            skipped_count: 0,
            asynch: false,
        }
    }

    pub fn asynchronous(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            asynch: true,
            ..Self::new(name, config)
        }
    }

    pub fn current_child(&self) -> usize {
        self.current_child
    }

    fn rewind(&mut self) {
        self.base.reset_children();
        self.current_child = 0;
        self.skipped_count = 0;
    }
}

impl TreeNode for Fallback {
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
        if !self.base.status().is_active() {
            self.skipped_count = 0;
        }
        self.base.set_status(NodeStatus::Running);

        while self.current_child < child_count {
            let child = self.base.child_mut(self.current_child);
            let prev_status = child.status();
            match child.execute_tick() {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Success => {
                    self.rewind();
                    return NodeStatus::Success;
                }
                NodeStatus::Failure => {
                    self.current_child += 1;
                    if self.asynch
                        && self.base.wake_up().is_some()
                        && prev_status == NodeStatus::Idle
                        && self.current_child < child_count
                    {
                        self.base.emit_wake_up_signal();
                        return NodeStatus::Running;
                    }
                }
                NodeStatus::Skipped => {
                    self.current_child += 1;
                    self.skipped_count += 1;
                }
                NodeStatus::Idle => {
                    let err = BtError::IdleChild {
                        node: self.base.name().to_string(),
                    };
                    self.rewind();
                    return self.base.status_anomaly(err);
                }
            }
        }

        let all_skipped = child_count > 0 && self.skipped_count == child_count;
        self.rewind();
        if all_skipped {
            NodeStatus::Skipped
        } else {
            NodeStatus::Failure
        }
    }

    fn halt(&mut self) {
        self.current_child = 0;
        self.skipped_count = 0;
        self.base.reset_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::attach;
    use crate::wake::WakeUpSignal;
    use std::time::Duration;
    use NodeStatus::*;

    #[test]
    fn first_success_short_circuits() {
        let mut fb = Fallback::new("fb", NodeConfig::default());
        let counters = attach(&mut fb, &[&[Failure], &[Success], &[Success]]);
        assert_eq!(fb.execute_tick(), Success);
        assert_eq!(counters[2].ticks(), 0);
        assert_eq!(fb.current_child(), 0);
    }

    #[test]
    fn fails_only_when_every_child_fails() {
        let mut fb = Fallback::new("fb", NodeConfig::default());
        let counters = attach(&mut fb, &[&[Failure], &[Failure]]);
        assert_eq!(fb.execute_tick(), Failure);
        assert!(counters.iter().all(|c| c.ticks() == 1));
    }

    #[test]
    fn running_child_keeps_cursor() {
        let mut fb = Fallback::new("fb", NodeConfig::default());
        let counters = attach(&mut fb, &[&[Failure], &[Running, Success]]);
        assert_eq!(fb.execute_tick(), Running);
        assert_eq!(fb.current_child(), 1);
        assert_eq!(fb.execute_tick(), Success);
        assert_eq!(counters[0].ticks(), 1);
    }

    #[test]
    fn all_skipped_children_skip_the_fallback() {
        let mut fb = Fallback::new("fb", NodeConfig::default());
        attach(&mut fb, &[&[Skipped], &[Skipped]]);
        assert_eq!(fb.execute_tick(), Skipped);
    }

    #[test]
    fn async_variant_yields_between_failures() {
        let signal = WakeUpSignal::new();
        let mut fb = Fallback::asynchronous("async", NodeConfig::default());
        fb.base_mut().set_wake_up(signal.clone());
        let counters = attach(&mut fb, &[&[Failure], &[Failure], &[Success]]);

        assert_eq!(fb.execute_tick(), Running);
        assert!(signal.wait_for(Duration::from_millis(1)));
        assert_eq!(counters[1].ticks(), 0);

        assert_eq!(fb.execute_tick(), Running);
        assert_eq!(fb.execute_tick(), Success);
        assert!(counters.iter().all(|c| c.ticks() == 1));
    }

    #[test]
    fn async_variant_without_wake_up_behaves_synchronously() {
        let mut fb = Fallback::asynchronous("async", NodeConfig::default());
        attach(&mut fb, &[&[Failure], &[Success]]);
        assert_eq!(fb.execute_tick(), Success);
    }
}
