use std::sync::Arc;
use std::time::Duration;

use canopy_types::{NodeKind, NodeStatus};
use parking_lot::Mutex;

use crate::node::{NodeBase, NodeConfig, TreeNode};
use crate::timer::NodeTimer;

#[derive(Debug, Default)]
struct Countdown {
    generation: u64,
    elapsed: bool,
}

/// Waits `delay_msec` milliseconds before ticking the child.
///
/// Returns `Running` while waiting; once the delay has elapsed the child is
/// ticked on every tick until it completes.
pub struct Delay {
    base: NodeBase,
    fixed_msec: Option<u64>,
    started: bool,
    countdown: Arc<Mutex<Countdown>>,
    timer: NodeTimer,
}

impl Delay {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            fixed_msec: None,
            started: false,
            countdown: Arc::new(Mutex::new(Countdown::default())),
            timer: NodeTimer::new(),
        }
    }

    /// A delay whose duration ignores the `delay_msec` port.
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
                .get_input_as::<u64>("delay_msec")
                .unwrap_or_else(|err| self.base.config_error(err)),
        }
    }

    fn stop(&mut self) {
        let mut countdown = self.countdown.lock();
        countdown.generation += 1;
        countdown.elapsed = false;
        drop(countdown);
        self.timer.cancel();
        self.started = false;
    }
}

impl TreeNode for Delay {
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
                let mut countdown = self.countdown.lock();
                countdown.generation += 1;
                countdown.elapsed = msec == 0;
                countdown.generation
            };
            if msec > 0 {
                let shared = Arc::clone(&self.countdown);
                let wake_up = self.base.wake_up().cloned();
                let timers = self.base.timers();
                let scheduled = self.timer.schedule(timers, Duration::from_millis(msec), move || {
                    let mut countdown = shared.lock();
                    if countdown.generation == generation {
                        countdown.elapsed = true;
                        drop(countdown);
                        if let Some(signal) = wake_up {
                            signal.emit();
                        }
                    }
                });
                if let Err(err) = scheduled {
                    self.stop();
                    return self.base.status_anomaly(err);
                }
            }
        }

        if !self.countdown.lock().elapsed {
            return NodeStatus::Running;
        }

        let child = self.base.only_child();
        let status = child.execute_tick();
        if status != NodeStatus::Running {
            child.halt_and_reset();
            self.stop();
        }
        status
    }

    fn halt(&mut self) {
        self.stop();
        self.base.reset_children();
    }

    fn requires_wake_up(&self) -> bool {
        true
    }
}
