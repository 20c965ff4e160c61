//! Reactive sequence and fallback.
//!
//! Neither keeps a cursor: every tick starts again at the first child, so
//! earlier conditions are re-evaluated while a later child is running.  At
//! most one child is `Running` at a time; when one reports `Running`, every
//! other child is halted.

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Which child outcome makes a reactive node stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    /// Stop at the first failure.
    Sequence,
    /// Stop at the first success.
    Fallback,
}

impl Flavor {
    /// Outcome when the loop runs off the end without stopping.
    fn exhausted(self) -> NodeStatus {
        match self {
            Flavor::Sequence => NodeStatus::Success,
            Flavor::Fallback => NodeStatus::Failure,
        }
    }
}

struct Reactive {
    base: NodeBase,
    flavor: Flavor,
    running_child: Option<usize>,
}

impl Reactive {
    fn tick(&mut self) -> NodeStatus {
        if self.base.status() == NodeStatus::Idle {
            self.running_child = None;
        }
        self.base.set_status(NodeStatus::Running);

        let child_count = self.base.child_count();
        let mut all_skipped = true;
        for index in 0..child_count {
            let status = self.base.child_mut(index).execute_tick();
            all_skipped &= status == NodeStatus::Skipped;

            match status {
                NodeStatus::Running => {
                    for other in (0..child_count).filter(|&i| i != index) {
                        self.base.halt_child(other);
                    }
                    match self.running_child {
                        Some(previous) if previous != index => {
                            let err = BtError::MultipleRunningChildren {
                                node: self.base.name().to_string(),
                            };
                            self.base.reset_children();
                            self.running_child = None;
                            return self.base.status_anomaly(err);
                        }
                        _ => self.running_child = Some(index),
                    }
                    return NodeStatus::Running;
                }
                NodeStatus::Failure if self.flavor == Flavor::Sequence => {
                    self.base.reset_children();
                    self.running_child = None;
                    return NodeStatus::Failure;
                }
                NodeStatus::Success if self.flavor == Flavor::Fallback => {
                    self.base.reset_children();
                    self.running_child = None;
                    return NodeStatus::Success;
                }
                NodeStatus::Success | NodeStatus::Failure => {}
                NodeStatus::Skipped => self.base.halt_child(index),
                NodeStatus::Idle => {
                    let err = BtError::IdleChild {
                        node: self.base.name().to_string(),
                    };
                    self.base.reset_children();
                    self.running_child = None;
                    return self.base.status_anomaly(err);
                }
            }
        }

        self.base.reset_children();
        self.running_child = None;
        if child_count > 0 && all_skipped {
            NodeStatus::Skipped
        } else {
            self.flavor.exhausted()
        }
    }

    fn halt(&mut self) {
        self.running_child = None;
        self.base.reset_children();
    }
}

/// Re-ticks every child from the first one each tick; fails on the first
/// failure, succeeds when all succeed.
pub struct ReactiveSequence(Reactive);

impl ReactiveSequence {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self(Reactive {
            base: NodeBase::control(name, config),
            flavor: Flavor::Sequence,
            running_child: None,
        })
    }
}

/// Re-ticks every child from the first one each tick; succeeds on the first
/// success, fails when all fail.
pub struct ReactiveFallback(Reactive);

impl ReactiveFallback {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self(Reactive {
            base: NodeBase::control(name, config),
            flavor: Flavor::Fallback,
            running_child: None,
        })
    }
}

impl TreeNode for ReactiveSequence {
    fn base(&self) -> &NodeBase {
        &self.0.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.0.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Control
    }

    fn tick(&mut self) -> NodeStatus {
        self.0.tick()
    }

    fn halt(&mut self) {
        self.0.halt();
    }
}

impl TreeNode for ReactiveFallback {
    fn base(&self) -> &NodeBase {
        &self.0.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.0.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Control
    }

    fn tick(&mut self) -> NodeStatus {
        self.0.tick()
    }

    fn halt(&mut self) {
        self.0.halt();
    }
}
