use std::sync::Arc;
use std::time::Duration;

use canopy_types::NodeStatus;
use parking_lot::Mutex;

use crate::actions::stateful::{StatefulAction, StatefulBehavior};
use crate::node::{NodeBase, NodeConfig};
use crate::timer::NodeTimer;

#[derive(Debug, Default)]
struct Nap {
    generation: u64,
    done: bool,
}

/// Returns `Running` for `msec` milliseconds, then `Success`.
///
/// The wait is backed by a timer that wakes the tree when it expires, so a
/// driver blocked on the wake-up signal re-ticks promptly.
pub struct Sleep {
    fixed_msec: Option<u64>,
    nap: Arc<Mutex<Nap>>,
    timer: NodeTimer,
}

impl Sleep {
    pub fn new() -> Self {
        Self {
            fixed_msec: None,
            nap: Arc::new(Mutex::new(Nap::default())),
            timer: NodeTimer::new(),
        }
    }

    pub fn with_msec(msec: u64) -> Self {
        Self {
            fixed_msec: Some(msec),
            ..Self::new()
        }
    }

    /// Wrap into a tree node.
    pub fn node(self, name: impl Into<String>, config: NodeConfig) -> StatefulAction<Self> {
        StatefulAction::new(name, config, self)
    }
}

impl Default for Sleep {
    fn default() -> Self {
        Self::new()
    }
}

impl StatefulBehavior for Sleep {
    fn on_start(&mut self, node: &mut NodeBase) -> NodeStatus {
        let msec = match self.fixed_msec {
            Some(msec) => msec,
            None => node
                .get_input_as::<u64>("msec")
                .unwrap_or_else(|err| node.config_error(err)),
        };
        if msec == 0 {
            return NodeStatus::Success;
        }

        let generation = {
            let mut nap = self.nap.lock();
            nap.generation += 1;
            nap.done = false;
            nap.generation
        };
        let shared = Arc::clone(&self.nap);
        let wake_up = node.wake_up().cloned();
        let timers = node.timers();
        let scheduled = self.timer.schedule(timers, Duration::from_millis(msec), move || {
            let mut nap = shared.lock();
            if nap.generation == generation {
                nap.done = true;
                drop(nap);
                if let Some(signal) = wake_up {
                    signal.emit();
                }
            }
        });
        match scheduled {
            Ok(()) => NodeStatus::Running,
            Err(err) => node.status_anomaly(err),
        }
    }

    fn on_running(&mut self, _node: &mut NodeBase) -> NodeStatus {
        if self.nap.lock().done {
            NodeStatus::Success
        } else {
            NodeStatus::Running
        }
    }

    fn on_halted(&mut self, _node: &mut NodeBase) {
        let mut nap = self.nap.lock();
        nap.generation += 1;
        nap.done = false;
        drop(nap);
        self.timer.cancel();
    }

    fn requires_wake_up(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TreeNode;
    use crate::wake::WakeUpSignal;

    #[test]
    fn sleeps_then_succeeds() {
        let signal = WakeUpSignal::new();
        let config = NodeConfig::default().with_input("msec", "15");
        let mut sleep = Sleep::new().node("nap", config);
        sleep.base_mut().set_wake_up(signal.clone());

        assert_eq!(sleep.execute_tick(), NodeStatus::Running);
        assert!(signal.wait_for(Duration::from_secs(2)));
        assert_eq!(sleep.execute_tick(), NodeStatus::Success);
        assert!(sleep.requires_wake_up());
    }

    #[test]
    fn zero_msec_completes_immediately() {
        let mut sleep = Sleep::with_msec(0).node("nap", NodeConfig::default());
        assert_eq!(sleep.execute_tick(), NodeStatus::Success);
    }

    #[test]
    fn halt_cancels_the_nap() {
        let mut sleep = Sleep::with_msec(10).node("nap", NodeConfig::default());
        assert_eq!(sleep.execute_tick(), NodeStatus::Running);
        sleep.halt_and_reset();
        assert!(!sleep.behavior().timer.is_pending());

        std::thread::sleep(Duration::from_millis(30));
        // A fresh run restarts the nap instead of finishing at once.
        assert_eq!(sleep.execute_tick(), NodeStatus::Running);
    }
}
