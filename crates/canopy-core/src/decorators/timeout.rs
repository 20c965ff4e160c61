use std::sync::Arc;
use std::time::Duration;

use canopy_types::{NodeKind, NodeStatus};
use parking_lot::Mutex;

use crate::node::{NodeBase, NodeConfig, TreeNode};
use crate::timer::NodeTimer;

/// State shared between the tick path and the timer callback.
#[derive(Debug, Default)]
struct Deadline {
    /// Bumped on every arm and halt; a callback from an older generation is
    /// stale and does nothing.
    generation: u64,
    armed: bool,
    fired: bool,
}

/// Fails the child if it has not completed within `msec` milliseconds.
///
/// The countdown starts when the decorator leaves `Idle`.  The timer
/// callback only records that the deadline passed and wakes the tree; the
/// child is halted on the next tick, under the same lock the callback takes,
/// so a late timer can never override a child that completed first.
/// `msec = 0` disables the deadline.
pub struct Timeout {
    base: NodeBase,
    fixed_msec: Option<u64>,
    started: bool,
    deadline: Arc<Mutex<Deadline>>,
    timer: NodeTimer,
}

impl Timeout {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            fixed_msec: None,
            started: false,
            deadline: Arc::new(Mutex::new(Deadline::default())),
            timer: NodeTimer::new(),
        }
    }

    /// A timeout whose duration ignores the `msec` port.
    pub fn with_msec(name: impl Into<String>, config: NodeConfig, msec: u64) -> Self {
        Self {
            fixed_msec: Some(msec),
            ..Self::new(name, config)
        }
    }

    fn msec(&self) -> u64 {
        match self.fixed_msec {
            Some(msec) => msec,
            None => self
                .base
                .get_input_as::<u64>("msec")
                .unwrap_or_else(|err| self.base.config_error(err)),
        }
    }

    fn disarm(&mut self) {
        let mut deadline = self.deadline.lock();
        deadline.generation += 1;
        deadline.armed = false;
        deadline.fired = false;
        drop(deadline);
        self.timer.cancel();
        self.started = false;
    }
}

impl TreeNode for Timeout {
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
        if !self.started {
            let msec = self.msec();
            self.started = true;
            self.base.set_status(NodeStatus::Running);

            let generation = {
                let mut deadline = self.deadline.lock();
                deadline.generation += 1;
                deadline.armed = msec > 0;
                deadline.fired = false;
                deadline.generation
            };
            if msec > 0 {
                let shared = Arc::clone(&self.deadline);
                let wake_up = self.base.wake_up().cloned();
                let timers = self.base.timers();
                let scheduled = self.timer.schedule(timers, Duration::from_millis(msec), move || {
                    let mut deadline = shared.lock();
                    if deadline.armed && deadline.generation == generation {
                        deadline.fired = true;
                        drop(deadline);
                        if let Some(signal) = wake_up {
                            signal.emit();
                        }
                    }
                });
                if let Err(err) = scheduled {
                    self.disarm();
                    return self.base.status_anomaly(err);
                }
            }
        }

        let shared = Arc::clone(&self.deadline);
        let mut deadline = shared.lock();
        if deadline.fired {
            deadline.armed = false;
            deadline.fired = false;
            self.started = false;
            tracing::debug!(node = %self.base.name(), "deadline passed, halting child");
            self.base.only_child().halt_and_reset();
            return NodeStatus::Failure;
        }

        let child = self.base.only_child();
        let status = child.execute_tick();
        if status != NodeStatus::Running {
            child.halt_and_reset();
            deadline.armed = false;
            self.started = false;
            self.timer.cancel();
        }
        status
    }

    fn halt(&mut self) {
        self.disarm();
        self.base.reset_children();
    }

    fn requires_wake_up(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::attach;
    use crate::wake::WakeUpSignal;
    use std::thread;
    use NodeStatus::*;

    #[test]
    fn child_completing_in_time_keeps_its_status() {
        let mut timeout = Timeout::with_msec("timeout", NodeConfig::default(), 200);
        attach(&mut timeout, &[&[Running, Failure]]);
        assert_eq!(timeout.execute_tick(), Running);
        assert_eq!(timeout.execute_tick(), Failure);
    }

    #[test]
    fn expired_deadline_halts_child_and_fails() {
        let signal = WakeUpSignal::new();
        let config = NodeConfig::default().with_input("msec", "20");
        let mut timeout = Timeout::new("timeout", config);
        timeout.base_mut().set_wake_up(signal.clone());
        let counters = attach(&mut timeout, &[&[Running]]);

        assert_eq!(timeout.execute_tick(), Running);
        assert!(signal.wait_for(Duration::from_secs(2)));
        assert_eq!(timeout.execute_tick(), Failure);
        assert_eq!(counters[0].halts(), 1);
        assert_eq!(counters[0].ticks(), 1);
    }

    #[test]
    fn halted_timeout_ignores_stale_timer() {
        let mut timeout = Timeout::with_msec("timeout", NodeConfig::default(), 20);
        attach(&mut timeout, &[&[Running]]);
        assert_eq!(timeout.execute_tick(), Running);
        timeout.halt_and_reset();

        thread::sleep(Duration::from_millis(40));
        // A fresh run starts a fresh countdown; the old one must not fail it.
        assert_eq!(timeout.execute_tick(), Running);
    }

    #[test]
    fn zero_msec_disables_the_deadline() {
        let mut timeout = Timeout::with_msec("timeout", NodeConfig::default(), 0);
        attach(&mut timeout, &[&[Running]]);
        assert_eq!(timeout.execute_tick(), Running);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(timeout.execute_tick(), Running);
    }
}
