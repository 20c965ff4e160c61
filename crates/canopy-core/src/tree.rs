//! [`BehaviorTree`] – owns a root node and its blackboard, and is the only
//! place ticks enter a tree.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use canopy_types::NodeStatus;
use parking_lot::Mutex;
use tracing::{info_span, warn};

use crate::blackboard::Blackboard;
use crate::node::TreeNode;
use crate::timer::TimerQueue;
use crate::wake::WakeUpSignal;

/// A fully assembled tree.
///
/// Ticking takes an internal lock, so a tree may be shared between threads,
/// but ticks never overlap.
pub struct BehaviorTree {
    root: Mutex<Option<Box<dyn TreeNode>>>,
    blackboard: Arc<Blackboard>,
    wake_up: WakeUpSignal,
    timers: TimerQueue,
}

impl BehaviorTree {
    /// Assemble a tree around `root`.
    ///
    /// Walks the nodes in pre-order, assigning UIDs from 1, recording parent
    /// UIDs and paths, and installing the tree's wake-up signal and timer
    /// queue on every node.
    pub fn new(mut root: Box<dyn TreeNode>, blackboard: Arc<Blackboard>) -> Self {
        let wake_up = WakeUpSignal::new();
        let timers = TimerQueue::new();
        let mut next_uid = 1;
        assemble(root.as_mut(), None, "", &wake_up, &timers, &mut next_uid);
        Self {
            root: Mutex::new(Some(root)),
            blackboard,
            wake_up,
            timers,
        }
    }

    /// A tree with no root; every tick fails.
    pub fn empty(blackboard: Arc<Blackboard>) -> Self {
        Self {
            root: Mutex::new(None),
            blackboard,
            wake_up: WakeUpSignal::new(),
            timers: TimerQueue::new(),
        }
    }

    /// Tick the root once.
    pub fn tick(&self) -> NodeStatus {
        let mut root = self.root.lock();
        let Some(root) = root.as_mut() else {
            warn!("tick on a tree without a root");
            return NodeStatus::Failure;
        };
        let span = info_span!("tick", root = %root.name());
        let _entered = span.enter();
        root.execute_tick()
    }

    /// Alias of [`tick`][Self::tick], for symmetry with
    /// [`tick_while_running`][Self::tick_while_running].
    pub fn tick_once(&self) -> NodeStatus {
        self.tick()
    }

    /// Tick until the root leaves `Running`.
    ///
    /// Between ticks, waits up to `max_sleep` for a node to emit the wake-up
    /// signal.
    pub fn tick_while_running(&self, max_sleep: Duration) -> NodeStatus {
        let mut status = self.tick();
        while status == NodeStatus::Running {
            self.wake_up.wait_for(max_sleep);
            status = self.tick();
        }
        status
    }

    /// Halt and reset every running node.
    pub fn halt(&self) {
        if let Some(root) = self.root.lock().as_mut() {
            root.halt_and_reset();
        }
    }

    pub fn blackboard(&self) -> &Arc<Blackboard> {
        &self.blackboard
    }

    /// The timer queue shared by every timer-backed node of the tree.
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Signal emitted by asynchronous nodes when they want a re-tick.
    pub fn wake_up(&self) -> &WakeUpSignal {
        &self.wake_up
    }

    /// Run `f` on the root.  `None` when the tree is empty.
    pub fn with_root<R>(&self, f: impl FnOnce(&dyn TreeNode) -> R) -> Option<R> {
        self.root.lock().as_deref().map(|root| f(root))
    }

    /// Status of the root, `Idle` for an empty tree.
    pub fn root_status(&self) -> NodeStatus {
        self.with_root(|root| root.status()).unwrap_or_default()
    }

    /// Visit every node in pre-order.
    pub fn apply_visitor(&self, mut visitor: impl FnMut(&dyn TreeNode)) {
        if let Some(root) = self.root.lock().as_deref() {
            visit(root, 0, &mut |node, _| visitor(node));
        }
    }

    /// Visit every node in pre-order, mutably.
    pub fn apply_visitor_mut(&self, mut visitor: impl FnMut(&mut dyn TreeNode)) {
        if let Some(root) = self.root.lock().as_deref_mut() {
            visit_mut(root, &mut visitor);
        }
    }

    /// Make every node panic on status anomalies instead of failing.
    pub fn set_strict_mode(&self, strict: bool) {
        self.apply_visitor_mut(|node| node.base_mut().config_mut().strict = strict);
    }

    /// Indented outline of the tree, one node per line.
    pub fn tree_to_string(&self) -> String {
        let mut out = String::from("----------------\n");
        if let Some(root) = self.root.lock().as_deref() {
            visit(root, 0, &mut |node, depth| {
                let _ = writeln!(
                    out,
                    "{:indent$}{} [{}] {}",
                    "",
                    node.name(),
                    node.kind(),
                    node.status(),
                    indent = depth * 3
                );
            });
        }
        out.push_str("----------------\n");
        out
    }

    pub fn print_tree(&self) {
        print!("{}", self.tree_to_string());
    }
}

impl std::fmt::Debug for BehaviorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("root", &self.with_root(|root| root.name().to_string()))
            .field("blackboard", &self.blackboard)
            .finish()
    }
}

fn assemble(
    node: &mut dyn TreeNode,
    parent_uid: Option<u16>,
    parent_path: &str,
    wake_up: &WakeUpSignal,
    timers: &TimerQueue,
    next_uid: &mut u16,
) {
    let uid = *next_uid;
    *next_uid = next_uid.wrapping_add(1);
    let path = format!("{parent_path}/{}", node.name());

    let base = node.base_mut();
    base.config_mut().uid = uid;
    base.config_mut().path = path.clone();
    base.set_parent_uid(parent_uid);
    base.set_wake_up(wake_up.clone());
    base.set_timers(timers.clone());

    for child in node.children_mut() {
        assemble(child.as_mut(), Some(uid), &path, wake_up, timers, next_uid);
    }
}

fn visit(node: &dyn TreeNode, depth: usize, visitor: &mut dyn FnMut(&dyn TreeNode, usize)) {
    visitor(node, depth);
    for child in node.children() {
        visit(child.as_ref(), depth + 1, visitor);
    }
}

fn visit_mut(node: &mut dyn TreeNode, visitor: &mut dyn FnMut(&mut dyn TreeNode)) {
    visitor(node);
    for child in node.children_mut() {
        visit_mut(child.as_mut(), visitor);
    }
}
