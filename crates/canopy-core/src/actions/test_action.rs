use std::sync::Arc;
use std::time::Duration;

use canopy_types::NodeStatus;
use parking_lot::Mutex;

use crate::actions::stateful::{StatefulAction, StatefulBehavior};
use crate::node::{NodeBase, NodeConfig};
use crate::timer::NodeTimer;

/// Callback deciding the final status of a [`TestAction`].
pub type CompleteFn = Arc<dyn Fn() -> NodeStatus + Send + Sync>;

/// Behaviour of a [`TestAction`].
#[derive(Clone)]
pub struct TestActionConfig {
    pub return_status: NodeStatus,
    /// Stay `Running` this long before completing; zero completes on the
    /// first tick.
    pub async_delay: Duration,
    /// Overrides `return_status` when set.
    pub complete_fn: Option<CompleteFn>,
}

impl Default for TestActionConfig {
    fn default() -> Self {
        Self {
            return_status: NodeStatus::Success,
            async_delay: Duration::ZERO,
            complete_fn: None,
        }
    }
}

impl TestActionConfig {
    pub fn returning(status: NodeStatus) -> Self {
        Self {
            return_status: status,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.async_delay = delay;
        self
    }

    pub fn on_complete(mut self, complete: impl Fn() -> NodeStatus + Send + Sync + 'static) -> Self {
        self.complete_fn = Some(Arc::new(complete));
        self
    }
}

#[derive(Debug, Default)]
struct Progress {
    generation: u64,
    completed: bool,
}

/// Configurable action for exercising trees in tests and demos.
pub struct TestAction {
    config: TestActionConfig,
    progress: Arc<Mutex<Progress>>,
    timer: NodeTimer,
}

impl TestAction {
    pub fn new(config: TestActionConfig) -> Self {
        Self {
            config,
            progress: Arc::new(Mutex::new(Progress::default())),
            timer: NodeTimer::new(),
        }
    }

    pub fn node(self, name: impl Into<String>, config: NodeConfig) -> StatefulAction<Self> {
        StatefulAction::new(name, config, self)
    }

    fn completed(&self) -> NodeStatus {
        match &self.config.complete_fn {
            Some(complete) => complete(),
            None => self.config.return_status,
        }
    }
}

impl StatefulBehavior for TestAction {
    fn on_start(&mut self, node: &mut NodeBase) -> NodeStatus {
        if self.config.async_delay.is_zero() {
            return self.completed();
        }

        let generation = {
            let mut progress = self.progress.lock();
            progress.generation += 1;
            progress.completed = false;
            progress.generation
        };
        let shared = Arc::clone(&self.progress);
        let wake_up = node.wake_up().cloned();
        let timers = node.timers();
        let scheduled = self.timer.schedule(timers, self.config.async_delay, move || {
            let mut progress = shared.lock();
            if progress.generation == generation {
                progress.completed = true;
                drop(progress);
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
        if self.progress.lock().completed {
            self.completed()
        } else {
            NodeStatus::Running
        }
    }

    fn on_halted(&mut self, _node: &mut NodeBase) {
        let mut progress = self.progress.lock();
        progress.generation += 1;
        progress.completed = false;
        drop(progress);
        self.timer.cancel();
    }

    fn requires_wake_up(&self) -> bool {
        !self.config.async_delay.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TreeNode;
    use crate::wake::WakeUpSignal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn synchronous_action_returns_configured_status() {
        let mut node = TestAction::new(TestActionConfig::returning(NodeStatus::Failure))
            .node("test", NodeConfig::default());
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
        assert!(!node.requires_wake_up());
    }

    #[test]
    fn asynchronous_action_completes_after_its_delay() {
        let signal = WakeUpSignal::new();
        let config = TestActionConfig::returning(NodeStatus::Success)
            .with_delay(Duration::from_millis(10));
        let mut node = TestAction::new(config).node("test", NodeConfig::default());
        node.base_mut().set_wake_up(signal.clone());

        assert_eq!(node.execute_tick(), NodeStatus::Running);
        assert!(signal.wait_for(Duration::from_secs(2)));
        assert_eq!(node.execute_tick(), NodeStatus::Success);
    }

    #[test]
    fn completion_callback_overrides_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let config = TestActionConfig::returning(NodeStatus::Success).on_complete(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            NodeStatus::Failure
        });
        let mut node = TestAction::new(config).node("test", NodeConfig::default());
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
