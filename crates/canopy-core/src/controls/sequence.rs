use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Ticks children in order; fails on the first failure.
///
/// A `Running` child keeps the cursor, so the next tick resumes at that
/// child without re-ticking the ones that already succeeded.  When every
/// child was skipped the sequence itself reports `Skipped`.
///
/// With memory enabled (`SequenceWithMemory`), halting the sequence keeps
/// the cursor: after an interruption it resumes at the child that was
/// running instead of starting over.  Only a failure rewinds it.
pub struct Sequence {
    base: NodeBase,
    current_child: usize,
    skipped_count: usize,
    with_memory: bool,
}

impl Sequence {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            current_child: 0,
            skipped_count: 0,
            with_memory: false,
        }
    }

    pub fn with_memory(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            with_memory: true,
            ..Self::new(name, config)
        }
    }

    /// Index of the child the next tick starts from.
    pub fn current_child(&self) -> usize {
        self.current_child
    }

    fn rewind(&mut self) {
        self.base.reset_children();
        self.current_child = 0;
        self.skipped_count = 0;
    }
}

impl TreeNode for Sequence {
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
        if self.current_child == 0 {
            self.skipped_count = 0;
        }
        self.base.set_status(NodeStatus::Running);

        while self.current_child < child_count {
            match self.base.child_mut(self.current_child).execute_tick() {
                NodeStatus::Running => return NodeStatus::Running,
                NodeStatus::Failure => {
                    self.rewind();
                    return NodeStatus::Failure;
                }
                NodeStatus::Success => self.current_child += 1,
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
            NodeStatus::Success
        }
    }

    fn halt(&mut self) {
        if !self.with_memory {
            self.current_child = 0;
            self.skipped_count = 0;
        }
        self.base.reset_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::attach;
    use NodeStatus::*;

    #[test]
    fn succeeds_when_every_child_succeeds() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        let counters = attach(&mut seq, &[&[Success], &[Success]]);
        assert_eq!(seq.execute_tick(), Success);
        assert!(counters.iter().all(|c| c.ticks() == 1));
        assert_eq!(seq.current_child(), 0);
    }

    #[test]
    fn running_child_keeps_cursor() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        let counters = attach(
            &mut seq,
            &[&[Success], &[Running, Running, Success], &[Success]],
        );

        assert_eq!(seq.execute_tick(), Running);
        assert_eq!(seq.current_child(), 1);
        assert_eq!(seq.execute_tick(), Running);
        assert_eq!(seq.execute_tick(), Success);

        assert_eq!(counters[0].ticks(), 1);
        assert_eq!(counters[1].ticks(), 3);
        assert_eq!(counters[2].ticks(), 1);
    }

    #[test]
    fn failure_rewinds_and_stops() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        let counters = attach(&mut seq, &[&[Success], &[Failure], &[Success]]);
        assert_eq!(seq.execute_tick(), Failure);
        assert_eq!(seq.current_child(), 0);
        assert_eq!(counters[2].ticks(), 0);

        // Restarts from the first child.
        assert_eq!(seq.execute_tick(), Failure);
        assert_eq!(counters[0].ticks(), 2);
    }

    #[test]
    fn all_skipped_children_skip_the_sequence() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        attach(&mut seq, &[&[Skipped], &[Skipped]]);
        assert_eq!(seq.execute_tick(), Skipped);

        let mut seq = Sequence::new("seq", NodeConfig::default());
        attach(&mut seq, &[&[Skipped], &[Success]]);
        assert_eq!(seq.execute_tick(), Success);
    }

    #[test]
    fn empty_sequence_succeeds() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        assert_eq!(seq.execute_tick(), Success);
    }

    #[test]
    fn idle_child_fails_the_sequence() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        attach(&mut seq, &[&[Idle]]);
        assert_eq!(seq.execute_tick(), Failure);
    }

    #[test]
    fn halt_rewinds_plain_sequence() {
        let mut seq = Sequence::new("seq", NodeConfig::default());
        let counters = attach(&mut seq, &[&[Success], &[Running]]);
        assert_eq!(seq.execute_tick(), Running);
        seq.halt_and_reset();
        assert_eq!(seq.current_child(), 0);
        assert_eq!(counters[1].halts(), 1);

        seq.execute_tick();
        assert_eq!(counters[0].ticks(), 2);
    }

    #[test]
    fn memory_variant_resumes_after_halt() {
        let mut seq = Sequence::with_memory("mem", NodeConfig::default());
        let counters = attach(&mut seq, &[&[Success], &[Running, Success]]);
        assert_eq!(seq.execute_tick(), Running);
        seq.halt_and_reset();
        assert_eq!(seq.current_child(), 1);

        assert_eq!(seq.execute_tick(), Success);
        assert_eq!(counters[0].ticks(), 1);
        assert_eq!(counters[1].ticks(), 2);
    }

    #[test]
    fn memory_variant_rewinds_on_failure() {
        let mut seq = Sequence::with_memory("mem", NodeConfig::default());
        let counters = attach(&mut seq, &[&[Success], &[Running, Failure]]);
        assert_eq!(seq.execute_tick(), Running);
        assert_eq!(seq.execute_tick(), Failure);
        assert_eq!(seq.current_child(), 0);
        seq.execute_tick();
        assert_eq!(counters[0].ticks(), 2);
    }
}
