//! Scripted leaf used by the unit tests of control and decorator nodes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use canopy_types::{NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Tick and halt counters shared with a [`Scripted`] node after it has been
/// moved into a parent.
#[derive(Clone, Default)]
pub(crate) struct Counters {
    ticks: Arc<AtomicUsize>,
    halts: Arc<AtomicUsize>,
}

impl Counters {
    pub(crate) fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    pub(crate) fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }
}

/// Returns the scripted statuses in order, then repeats the last one.
pub(crate) struct Scripted {
    base: NodeBase,
    script: VecDeque<NodeStatus>,
    last: NodeStatus,
    counters: Counters,
    wakes: bool,
}

impl Scripted {
    pub(crate) fn new(name: &str, script: &[NodeStatus]) -> (Self, Counters) {
        let counters = Counters::default();
        let node = Self {
            base: NodeBase::leaf(name, NodeConfig::default()),
            script: script.iter().copied().collect(),
            last: script.last().copied().unwrap_or(NodeStatus::Success),
            counters: counters.clone(),
            wakes: false,
        };
        (node, counters)
    }

    pub(crate) fn boxed(name: &str, script: &[NodeStatus]) -> (Box<dyn TreeNode>, Counters) {
        let (node, counters) = Self::new(name, script);
        (Box::new(node), counters)
    }

    pub(crate) fn asynchronous(mut self) -> Self {
        self.wakes = true;
        self
    }
}

impl TreeNode for Scripted {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn tick(&mut self) -> NodeStatus {
        self.counters.ticks.fetch_add(1, Ordering::SeqCst);
        self.script.pop_front().unwrap_or(self.last)
    }

    fn halt(&mut self) {
        self.counters.halts.fetch_add(1, Ordering::SeqCst);
    }

    fn requires_wake_up(&self) -> bool {
        self.wakes
    }
}

/// Attach scripted children to `parent`, returning their counters.
pub(crate) fn attach(parent: &mut dyn TreeNode, scripts: &[&[NodeStatus]]) -> Vec<Counters> {
    scripts
        .iter()
        .enumerate()
        .map(|(i, script)| {
            let (child, counters) = Scripted::boxed(&format!("child{i}"), script);
            parent.add_child(child).unwrap();
            counters
        })
        .collect()
}
