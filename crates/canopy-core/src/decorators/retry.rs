//! [`Retry`] and [`Repeat`]: re-tick the child in a loop within one tick.
//!
//! `Retry` goes again after each `Failure`, `Repeat` after each `Success`;
//! the opposite outcome stops the loop at once.  The limit comes from a
//! port (`num_attempts` / `num_cycles`) or is fixed at construction; `-1`
//! loops forever.  The child is halted and reset between iterations.
//!
//! A child that completes asynchronously (it asks for wake-ups) would turn
//! the loop into a busy spin, so after such a child completes within a
//! single tick the decorator returns `Running` and emits a wake-up instead
//! of looping.

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

struct Looping {
    base: NodeBase,
    port: &'static str,
    fixed_limit: Option<i32>,
    count: i32,
    /// Outcome that triggers another iteration.
    again_on: NodeStatus,
}

impl Looping {
    fn new(base: NodeBase, port: &'static str, again_on: NodeStatus) -> Self {
        Self {
            base,
            port,
            fixed_limit: None,
            count: 0,
            again_on,
        }
    }

    fn limit(&self) -> i32 {
        match self.fixed_limit {
            Some(limit) => limit,
            None => self
                .base
                .get_input_as::<i32>(self.port)
                .unwrap_or_else(|err| self.base.config_error(err)),
        }
    }

    fn tick(&mut self) -> NodeStatus {
        let limit = self.limit();
        let stop_on = self.again_on.invert();
        self.base.set_status(NodeStatus::Running);

        let mut do_loop = limit < 0 || self.count < limit;
        while do_loop {
            let child = self.base.only_child();
            let prev_status = child.status();
            let status = child.execute_tick();

            if status == self.again_on {
                self.count += 1;
                do_loop = limit < 0 || self.count < limit;
                child.halt_and_reset();
                if child.requires_wake_up() && prev_status == NodeStatus::Idle && do_loop {
                    self.base.emit_wake_up_signal();
                    return NodeStatus::Running;
                }
                continue;
            }
            if status == stop_on {
                self.count = 0;
                child.halt_and_reset();
                return status;
            }
            match status {
                NodeStatus::Skipped => {
                    child.halt_and_reset();
                    return NodeStatus::Skipped;
                }
                NodeStatus::Idle => {
                    let err = BtError::IdleChild {
                        node: self.base.name().to_string(),
                    };
                    return self.base.status_anomaly(err);
                }
                _ => return NodeStatus::Running,
            }
        }

        self.count = 0;
        self.again_on
    }

    fn halt(&mut self) {
        self.count = 0;
        self.base.reset_children();
    }
}

/// Re-ticks a failing child up to `num_attempts` times.
pub struct Retry(Looping);

impl Retry {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self(Looping::new(
            NodeBase::decorator(name, config),
            "num_attempts",
            NodeStatus::Failure,
        ))
    }

    /// A retry whose limit ignores the `num_attempts` port.
    pub fn with_attempts(name: impl Into<String>, config: NodeConfig, attempts: i32) -> Self {
        let mut retry = Self::new(name, config);
        retry.0.fixed_limit = Some(attempts);
        retry
    }

    /// Failed attempts so far in the current run.
    pub fn attempts(&self) -> i32 {
        self.0.count
    }
}

/// Re-ticks a succeeding child up to `num_cycles` times.
pub struct Repeat(Looping);

impl Repeat {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self(Looping::new(
            NodeBase::decorator(name, config),
            "num_cycles",
            NodeStatus::Success,
        ))
    }

    /// A repeat whose limit ignores the `num_cycles` port.
    pub fn with_cycles(name: impl Into<String>, config: NodeConfig, cycles: i32) -> Self {
        let mut repeat = Self::new(name, config);
        repeat.0.fixed_limit = Some(cycles);
        repeat
    }

    /// Completed cycles so far in the current run.
    pub fn cycles(&self) -> i32 {
        self.0.count
    }
}

impl TreeNode for Retry {
    fn base(&self) -> &NodeBase {
        &self.0.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.0.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn tick(&mut self) -> NodeStatus {
        self.0.tick()
    }

    fn halt(&mut self) {
        self.0.halt();
    }
}

impl TreeNode for Repeat {
    fn base(&self) -> &NodeBase {
        &self.0.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.0.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn tick(&mut self) -> NodeStatus {
        self.0.tick()
    }

    fn halt(&mut self) {
        self.0.halt();
    }
}
