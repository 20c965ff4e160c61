//! Leaves that read and write the blackboard directly.

use std::any::Any;
use std::marker::PhantomData;

use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::decorators::{bound_queue, entry_key};
use crate::node::{NodeBase, NodeConfig, TreeNode, blackboard_pointer};

/// Blackboard key named by port `port`: `{key}` or a bare key.
fn key_port(base: &NodeBase, port: &str) -> String {
    let raw = base
        .get_input(port)
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| {
            base.config_error(BtError::MissingPort {
                node: base.name().to_string(),
                port: port.to_string(),
            })
        });
    blackboard_pointer(&raw).unwrap_or(raw.trim()).to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// SetBlackboard / UnsetBlackboard
// ─────────────────────────────────────────────────────────────────────────────

/// Writes `value` into the entry named by `output_key`.
///
/// A `value` of the form `{other}` copies entry `other`, keeping its type;
/// anything else is stored as a `String`.  Fails if the source entry does
/// not exist.
pub struct SetBlackboard {
    base: NodeBase,
}

impl SetBlackboard {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
        }
    }
}

impl TreeNode for SetBlackboard {
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
        let target = key_port(&self.base, "output_key");
        let value = self.base.get_input("value").unwrap_or_else(|| {
            self.base.config_error(BtError::MissingPort {
                node: self.base.name().to_string(),
                port: "value".to_string(),
            })
        });
        let blackboard = self.base.blackboard();

        match blackboard_pointer(&value) {
            Some(source) => match blackboard.get_entry(source) {
                Some(entry) => {
                    blackboard.set_any(&target, entry.value().clone(), entry.type_name());
                }
                None => {
                    tracing::debug!(node = %self.base.name(), %source, "source entry not found");
                    return NodeStatus::Failure;
                }
            },
            None => blackboard.set(&target, value),
        }
        NodeStatus::Success
    }
}

/// Removes the entry named by `key`.  Succeeds whether or not it existed.
pub struct UnsetBlackboard {
    base: NodeBase,
}

impl UnsetBlackboard {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
        }
    }
}

impl TreeNode for UnsetBlackboard {
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
        let key = key_port(&self.base, "key");
        self.base.blackboard().unset(&key);
        NodeStatus::Success
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WasEntryUpdated
// ─────────────────────────────────────────────────────────────────────────────

/// Condition: `Success` if the entry named by `entry` was written since the
/// previous tick of this node, `Failure` otherwise or if it does not exist.
pub struct WasEntryUpdated {
    base: NodeBase,
    last_sequence: u64,
}

impl WasEntryUpdated {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            last_sequence: 0,
        }
    }
}

impl TreeNode for WasEntryUpdated {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    fn tick(&mut self) -> NodeStatus {
        let key = entry_key(&self.base).unwrap_or_else(|err| self.base.config_error(err));
        let Some(entry) = self.base.blackboard().get_entry(&key) else {
            return NodeStatus::Failure;
        };
        let previous = std::mem::replace(&mut self.last_sequence, entry.sequence_id());
        if previous != entry.sequence_id() {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PopFromQueue
// ─────────────────────────────────────────────────────────────────────────────

/// Pops the front of the [`SharedQueue<T>`](crate::SharedQueue) named by
/// `queue` into `popped_item`.  Fails when the queue is empty or missing.
pub struct PopFromQueue<T> {
    base: NodeBase,
    _item: PhantomData<fn() -> T>,
}

impl<T> PopFromQueue<T> {
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            base: NodeBase::leaf(name, config),
            _item: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> TreeNode for PopFromQueue<T> {
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
        let queue = match bound_queue::<T>(&self.base, "queue") {
            Ok(Some(queue)) => queue,
            Ok(None) => return NodeStatus::Failure,
            Err(err @ BtError::MissingPort { .. }) => self.base.config_error(err),
            Err(err) => return self.base.status_anomaly(err),
        };
        let Some(item) = queue.lock().pop_front() else {
            return NodeStatus::Failure;
        };
        match self.base.set_output("popped_item", item) {
            Ok(()) => NodeStatus::Success,
            Err(err) => self.base.config_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::shared_queue;

    #[test]
    fn set_blackboard_stores_literal_as_string() {
        let config = NodeConfig::default()
            .with_input("value", "docked")
            .with_input("output_key", "{state}");
        let blackboard = config.blackboard.clone();
        let mut node = SetBlackboard::new("set", config);
        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert_eq!(blackboard.get::<String>("state").as_deref(), Some("docked"));
    }

    #[test]
    fn set_blackboard_copies_typed_entries() {
        let config = NodeConfig::default()
            .with_input("value", "{battery}")
            .with_input("output_key", "saved");
        let blackboard = config.blackboard.clone();
        blackboard.set("battery", 42_u8);
        let mut node = SetBlackboard::new("set", config);
        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert_eq!(blackboard.get::<u8>("saved"), Some(42));
    }

    #[test]
    fn set_blackboard_fails_on_missing_source() {
        let config = NodeConfig::default()
            .with_input("value", "{nothing}")
            .with_input("output_key", "saved");
        let mut node = SetBlackboard::new("set", config);
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
    }

    #[test]
    fn unset_removes_the_entry() {
        let config = NodeConfig::default().with_input("key", "{goal}");
        let blackboard = config.blackboard.clone();
        blackboard.set("goal", 1_i32);
        let mut node = UnsetBlackboard::new("unset", config);
        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert!(!blackboard.has_key("goal"));
        assert_eq!(node.execute_tick(), NodeStatus::Success);
    }

    #[test]
    fn was_entry_updated_tracks_sequence_ids() {
        let config = NodeConfig::default().with_input("entry", "{pose}");
        let blackboard = config.blackboard.clone();
        let mut node = WasEntryUpdated::new("pose_changed", config);

        assert_eq!(node.execute_tick(), NodeStatus::Failure);
        blackboard.set("pose", (1.0_f64, 2.0_f64));
        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
        blackboard.set("pose", (1.0_f64, 2.0_f64));
        assert_eq!(node.execute_tick(), NodeStatus::Success);
    }

    #[test]
    fn pop_from_queue_until_empty() {
        let config = NodeConfig::default()
            .with_input("queue", "{jobs}")
            .with_output("popped_item", "{job}");
        let blackboard = config.blackboard.clone();
        blackboard.set("jobs", shared_queue([7_u32, 8]));
        let mut node = PopFromQueue::<u32>::new("pop", config);

        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert_eq!(blackboard.get::<u32>("job"), Some(7));
        assert_eq!(node.execute_tick(), NodeStatus::Success);
        assert_eq!(blackboard.get::<u32>("job"), Some(8));
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
    }

    #[test]
    fn pop_from_missing_queue_fails() {
        let config = NodeConfig::default()
            .with_input("queue", "{jobs}")
            .with_output("popped_item", "{job}");
        let mut node = PopFromQueue::<u32>::new("pop", config);
        assert_eq!(node.execute_tick(), NodeStatus::Failure);
    }
}
