//! Threshold-based parallel nodes.
//!
//! Both nodes tick every child that has not completed yet, once per tick,
//! and remember which children already completed so that a result is never
//! counted twice.  Thresholds may be negative, meaning "`n + t + 1`" for `n`
//! children: `-1` is "all of them".

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Read an integer threshold port, falling back to `default` when unbound.
fn threshold_port(base: &NodeBase, key: &str, default: i32) -> i32 {
    match base.get_input(key).filter(|raw| !raw.is_empty()) {
        None => default,
        Some(_) => base
            .get_input_as::<i32>(key)
            .unwrap_or_else(|err| base.config_error(err)),
    }
}

fn resolve_threshold(threshold: i32, children: usize) -> usize {
    if threshold < 0 {
        usize::try_from(children as i64 + i64::from(threshold) + 1).unwrap_or(0)
    } else {
        threshold as usize
    }
}

fn count(completed: &[Option<NodeStatus>], status: NodeStatus) -> usize {
    completed.iter().filter(|s| **s == Some(status)).count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel
// ─────────────────────────────────────────────────────────────────────────────

/// Succeeds once `success_count` children succeeded, fails once
/// `failure_count` children failed.
///
/// Ports: `success_count` (default `-1`), `failure_count` (default `1`).
pub struct Parallel {
    base: NodeBase,
    success_threshold: i32,
    failure_threshold: i32,
    completed: Vec<Option<NodeStatus>>,
}

impl Parallel {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            success_threshold: -1,
            failure_threshold: 1,
            completed: Vec::new(),
        }
    }

    /// Thresholds used when the corresponding ports are not bound.
    pub fn with_thresholds(mut self, success: i32, failure: i32) -> Self {
        self.success_threshold = success;
        self.failure_threshold = failure;
        self
    }

    fn finish(&mut self, status: NodeStatus) -> NodeStatus {
        self.base.reset_children();
        self.completed.clear();
        status
    }

    /// Outcome implied by the children completed so far, if any.
    fn verdict(&self, success_threshold: usize, failure_threshold: usize) -> Option<NodeStatus> {
        let successes = count(&self.completed, NodeStatus::Success);
        let failures = count(&self.completed, NodeStatus::Failure);
        let skipped = count(&self.completed, NodeStatus::Skipped);

        if !self.completed.is_empty() && skipped == self.completed.len() {
            Some(NodeStatus::Skipped)
        } else if successes >= success_threshold {
            Some(NodeStatus::Success)
        } else if failures >= failure_threshold {
            Some(NodeStatus::Failure)
        } else if self.completed.iter().all(Option::is_some) {
            // Everyone finished below the success threshold.
            Some(NodeStatus::Failure)
        } else {
            None
        }
    }
}

impl TreeNode for Parallel {
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
        let success_threshold = resolve_threshold(
            threshold_port(&self.base, "success_count", self.success_threshold),
            child_count,
        );
        let failure_threshold = resolve_threshold(
            threshold_port(&self.base, "failure_count", self.failure_threshold),
            child_count,
        );
        for (threshold_name, threshold) in [
            ("success", success_threshold),
            ("failure", failure_threshold),
        ] {
            if threshold > child_count {
                self.base.config_error(BtError::ThresholdExceedsChildren {
                    node: self.base.name().to_string(),
                    threshold_name,
                    threshold,
                    children: child_count,
                });
            }
        }

        if self.completed.len() != child_count {
            self.completed = vec![None; child_count];
        }
        if let Some(status) = self.verdict(success_threshold, failure_threshold) {
            return self.finish(status);
        }
        self.base.set_status(NodeStatus::Running);

        for index in 0..child_count {
            if self.completed[index].is_some() {
                continue;
            }
            match self.base.child_mut(index).execute_tick() {
                NodeStatus::Running => continue,
                NodeStatus::Idle => {
                    let err = BtError::IdleChild {
                        node: self.base.name().to_string(),
                    };
                    self.finish(NodeStatus::Failure);
                    return self.base.status_anomaly(err);
                }
                done => self.completed[index] = Some(done),
            }
            if let Some(status) = self.verdict(success_threshold, failure_threshold) {
                return self.finish(status);
            }
        }

        NodeStatus::Running
    }

    fn halt(&mut self) {
        self.completed.clear();
        self.base.reset_children();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParallelAll
// ─────────────────────────────────────────────────────────────────────────────

/// Runs every child to completion; succeeds only if all of them succeeded.
///
/// Port: `max_failures` (default `1`), the number of failures that stops the
/// node early with `Failure`.
pub struct ParallelAll {
    base: NodeBase,
    failure_threshold: i32,
    completed: Vec<Option<NodeStatus>>,
}

impl ParallelAll {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::control(name, config),
            failure_threshold: 1,
            completed: Vec::new(),
        }
    }

    pub fn with_max_failures(mut self, max_failures: i32) -> Self {
        self.failure_threshold = max_failures;
        self
    }

    fn finish(&mut self, status: NodeStatus) -> NodeStatus {
        self.base.reset_children();
        self.completed.clear();
        status
    }
}

impl TreeNode for ParallelAll {
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
        let failure_threshold = resolve_threshold(
            threshold_port(&self.base, "max_failures", self.failure_threshold),
            child_count,
        );
        if failure_threshold > child_count {
            self.base.config_error(BtError::ThresholdExceedsChildren {
                node: self.base.name().to_string(),
                threshold_name: "max_failures",
                threshold: failure_threshold,
                children: child_count,
            });
        }

        if self.completed.len() != child_count {
            self.completed = vec![None; child_count];
        }
        self.base.set_status(NodeStatus::Running);

        for index in 0..child_count {
            if self.completed[index].is_some() {
                continue;
            }
            match self.base.child_mut(index).execute_tick() {
                NodeStatus::Running => {}
                NodeStatus::Idle => {
                    let err = BtError::IdleChild {
                        node: self.base.name().to_string(),
                    };
                    self.finish(NodeStatus::Failure);
                    return self.base.status_anomaly(err);
                }
                done => self.completed[index] = Some(done),
            }
        }

        let failures = count(&self.completed, NodeStatus::Failure);
        if failures >= failure_threshold.max(1) {
            return self.finish(NodeStatus::Failure);
        }
        if self.completed.iter().any(Option::is_none) {
            return NodeStatus::Running;
        }

        let skipped = count(&self.completed, NodeStatus::Skipped);
        let status = if skipped == child_count {
            NodeStatus::Skipped
        } else if failures == 0 {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        };
        self.finish(status)
    }

    fn halt(&mut self) {
        self.completed.clear();
        self.base.reset_children();
    }
}
