//! [`TreeDriver`] – async loop that ticks a [`BehaviorTree`] to completion.
//!
//! Between ticks the driver waits for the tree's wake-up signal, bounded by
//! `tick_interval_ms`, so timer-backed nodes (Timeout, Delay, Sleep) are
//! re-ticked as soon as they are ready instead of on the next poll.  Ticks
//! and waits run on tokio's blocking pool; the tree itself stays
//! synchronous.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use canopy_core::{BehaviorTree, BehaviorTreeFactory, Blackboard, NodeConfig};
//! use canopy_runtime::{EngineConfig, TreeDriver};
//!
//! # async fn demo() -> Result<(), canopy_runtime::DriverError> {
//! let factory = BehaviorTreeFactory::with_builtin_nodes();
//! let blackboard = Blackboard::create();
//! let config = NodeConfig::new(blackboard.clone()).with_input("msec", "100");
//! let root = factory.create_node("Sleep", "nap", config).unwrap();
//! let tree = Arc::new(BehaviorTree::new(root, blackboard));
//!
//! let report = TreeDriver::new(tree, EngineConfig::default()).run().await?;
//! println!("{} after {} ticks", report.status, report.ticks);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use canopy_core::BehaviorTree;
use canopy_types::NodeStatus;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// Errors raised while driving a tree.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A tick panicked (a malformed tree, or an anomaly in strict mode) or
    /// its task was cancelled.
    #[error("tick task failed: {0}")]
    Tick(#[from] tokio::task::JoinError),
}

/// Outcome of [`TreeDriver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveReport {
    /// Status returned by the last tick, `Idle` if none ran.
    pub status: NodeStatus,
    pub ticks: u64,
    /// `true` when a shutdown request halted the tree.
    pub halted: bool,
}

/// Ticks a shared tree until it leaves `Running`.
pub struct TreeDriver {
    tree: Arc<BehaviorTree>,
    config: EngineConfig,
}

impl TreeDriver {
    /// Applies `config.strict_mode` to the tree.
    pub fn new(tree: Arc<BehaviorTree>, config: EngineConfig) -> Self {
        if config.strict_mode {
            tree.set_strict_mode(true);
        }
        Self { tree, config }
    }

    pub fn tree(&self) -> &Arc<BehaviorTree> {
        &self.tree
    }

    /// Drive the tree with no way to stop it early other than `max_ticks`.
    pub async fn run(&self) -> Result<DriveReport, DriverError> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_until(shutdown).await
    }

    /// Drive the tree until it completes, `max_ticks` is reached, or
    /// `shutdown` becomes `true`; in the last case the tree is halted.
    pub async fn run_until(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DriveReport, DriverError> {
        let interval = self.config.tick_interval();
        let mut report = DriveReport {
            status: NodeStatus::Idle,
            ticks: 0,
            halted: false,
        };
        let mut shutdown_open = true;
        info!(max_ticks = ?self.config.max_ticks, interval_ms = self.config.tick_interval_ms, "driving tree");

        loop {
            if *shutdown.borrow() {
                return self.halt(report).await;
            }

            let tree = Arc::clone(&self.tree);
            report.status = tokio::task::spawn_blocking(move || tree.tick()).await?;
            report.ticks += 1;
            debug!(tick = report.ticks, status = %report.status, "tick");

            if report.status != NodeStatus::Running {
                info!(status = %report.status, ticks = report.ticks, "tree completed");
                return Ok(report);
            }
            if self.config.max_ticks.is_some_and(|max| report.ticks >= max) {
                warn!(ticks = report.ticks, "tick limit reached with the tree still running");
                return Ok(report);
            }

            // One waiter per pause; a closed shutdown channel must not start another.
            let signal = self.tree.wake_up().clone();
            let mut wait = tokio::task::spawn_blocking(move || signal.wait_for(interval));
            loop {
                tokio::select! {
                    woke = &mut wait => {
                        if woke? {
                            debug!("woken up by the tree");
                        }
                        break;
                    }
                    changed = shutdown.changed(), if shutdown_open => {
                        // A dropped sender can never request a shutdown.
                        shutdown_open = changed.is_ok();
                        if *shutdown.borrow() {
                            return self.halt(report).await;
                        }
                    }
                }
            }
        }
    }

    async fn halt(&self, mut report: DriveReport) -> Result<DriveReport, DriverError> {
        info!(ticks = report.ticks, "shutdown requested, halting tree");
        let tree = Arc::clone(&self.tree);
        tokio::task::spawn_blocking(move || tree.halt()).await?;
        report.halted = true;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::actions::{SimpleAction, Sleep};
    use canopy_core::{Blackboard, NodeConfig};
    use std::time::{Duration, Instant};

    fn sleeping_tree(msec: u64) -> Arc<BehaviorTree> {
        let blackboard = Blackboard::create();
        let node = Sleep::with_msec(msec).node("nap", NodeConfig::new(Arc::clone(&blackboard)));
        Arc::new(BehaviorTree::new(Box::new(node), blackboard))
    }

    #[tokio::test]
    async fn wake_up_ends_the_wait_early() {
        let config = EngineConfig {
            tick_interval_ms: 5_000,
            ..EngineConfig::default()
        };
        let started = Instant::now();
        let report = TreeDriver::new(sleeping_tree(20), config).run().await.unwrap();
        assert_eq!(report.status, NodeStatus::Success);
        assert_eq!(report.ticks, 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn tick_limit_stops_a_running_tree() {
        let blackboard = Blackboard::create();
        let node = SimpleAction::new("spin", NodeConfig::new(Arc::clone(&blackboard)), |_| {
            NodeStatus::Running
        });
        let tree = Arc::new(BehaviorTree::new(Box::new(node), blackboard));
        let config = EngineConfig {
            tick_interval_ms: 1,
            max_ticks: Some(3),
            ..EngineConfig::default()
        };
        let report = TreeDriver::new(tree, config).run().await.unwrap();
        assert_eq!(report.status, NodeStatus::Running);
        assert_eq!(report.ticks, 3);
        assert!(!report.halted);
    }

    #[tokio::test]
    async fn shutdown_halts_the_tree() {
        let tree = sleeping_tree(10_000);
        let driver = TreeDriver::new(
            Arc::clone(&tree),
            EngineConfig {
                tick_interval_ms: 20,
                ..EngineConfig::default()
            },
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run_until(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        let report = handle.await.unwrap().unwrap();
        assert!(report.halted);
        assert_eq!(tree.root_status(), NodeStatus::Idle);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_keeps_the_pending_wait() {
        let driver = TreeDriver::new(
            sleeping_tree(100),
            EngineConfig {
                tick_interval_ms: 5_000,
                ..EngineConfig::default()
            },
        );
        let (tx, rx) = watch::channel(false);
        let started = Instant::now();
        let handle = tokio::spawn(async move { driver.run_until(rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(tx);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, NodeStatus::Success);
        assert_eq!(report.ticks, 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn strict_mode_panics_surface_as_errors() {
        let blackboard = Blackboard::create();
        let node = SimpleAction::new("broken", NodeConfig::new(Arc::clone(&blackboard)), |_| {
            NodeStatus::Idle
        });
        let tree = Arc::new(BehaviorTree::new(Box::new(node), blackboard));
        let config = EngineConfig {
            strict_mode: true,
            ..EngineConfig::default()
        };
        let result = TreeDriver::new(tree, config).run().await;
        assert!(matches!(result, Err(DriverError::Tick(_))));
    }
}
