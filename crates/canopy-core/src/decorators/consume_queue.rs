use std::any::Any;
use std::marker::PhantomData;

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::blackboard::SharedQueue;
use crate::node::{NodeBase, NodeConfig, TreeNode, blackboard_pointer};

/// Drains the [`SharedQueue<T>`] named by the `queue` port.
///
/// Each item is popped, written to `popped_item`, and the child ticked with
/// it.  A `Running` child suspends the loop until a later tick; a `Failure`
/// stops it.  Returns `Success` once the queue is empty, including when the
/// entry does not exist.
pub struct ConsumeQueue<T> {
    base: NodeBase,
    running_child: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> ConsumeQueue<T> {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            running_child: false,
            _item: PhantomData,
        }
    }
}

/// Look up the queue bound to port `port`.  `Ok(None)` when the entry is
/// absent.
pub(crate) fn bound_queue<T: Any + Send>(
    base: &NodeBase,
    port: &str,
) -> Result<Option<SharedQueue<T>>, BtError> {
    let raw = base
        .get_input(port)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| BtError::MissingPort {
            node: base.name().to_string(),
            port: port.to_string(),
        })?;
    let key = blackboard_pointer(&raw).unwrap_or(raw.trim());
    if !base.blackboard().has_key(key) {
        return Ok(None);
    }
    base.blackboard().try_get::<SharedQueue<T>>(key).map(Some)
}

impl<T: Any + Send + Sync> TreeNode for ConsumeQueue<T> {
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
        if self.running_child {
            let child = self.base.only_child();
            let status = child.execute_tick();
            self.running_child = status == NodeStatus::Running;
            if self.running_child {
                return NodeStatus::Running;
            }
            child.halt_and_reset();
            if status == NodeStatus::Failure {
                return NodeStatus::Failure;
            }
        }

        let queue = match bound_queue::<T>(&self.base, "queue") {
            Ok(Some(queue)) => queue,
            Ok(None) => return NodeStatus::Success,
            Err(err @ BtError::MissingPort { .. }) => self.base.config_error(err),
            Err(err) => return self.base.status_anomaly(err),
        };
        self.base.set_status(NodeStatus::Running);

        loop {
            let Some(item) = queue.lock().pop_front() else {
                break;
            };
            if let Err(err) = self.base.set_output("popped_item", item) {
                self.base.config_error(err);
            }
            let child = self.base.only_child();
            let status = child.execute_tick();
            if status == NodeStatus::Running {
                self.running_child = true;
                return NodeStatus::Running;
            }
            child.halt_and_reset();
            if status == NodeStatus::Failure {
                return NodeStatus::Failure;
            }
        }
        NodeStatus::Success
    }

    fn halt(&mut self) {
        self.running_child = false;
        self.base.reset_children();
    }
}
