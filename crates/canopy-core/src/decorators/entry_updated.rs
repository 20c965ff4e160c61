use canopy_types::{BtError, NodeKind, NodeStatus};

use crate::node::{NodeBase, NodeConfig, TreeNode, blackboard_pointer};

/// Ticks the child only when the blackboard entry named by the `entry` port
/// has been written since the last check.
///
/// When the entry did not change (or does not exist) the decorator returns
/// its `if_not_updated` status without touching the child.  A child left
/// `Running` is resumed on later ticks without re-checking the entry.
///
/// See [`EntryUpdated::skip_unless_updated`] and
/// [`EntryUpdated::wait_value_update`] for the two registered flavours.
pub struct EntryUpdated {
    base: NodeBase,
    if_not_updated: NodeStatus,
    last_sequence: u64,
    still_executing_child: bool,
}

impl EntryUpdated {
    pub fn new(name: impl Into<String>, config: NodeConfig, if_not_updated: NodeStatus) -> Self {
        Self {
            base: NodeBase::decorator(name, config),
            if_not_updated,
            last_sequence: 0,
            still_executing_child: false,
        }
    }

    /// Returns `Skipped` when the entry is unchanged.
    pub fn skip_unless_updated(name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(name, config, NodeStatus::Skipped)
    }

    /// Returns `Running` until the entry changes.
    pub fn wait_value_update(name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(name, config, NodeStatus::Running)
    }

    fn tick_child(&mut self) -> NodeStatus {
        let child = self.base.only_child();
        let status = child.execute_tick();
        self.still_executing_child = status == NodeStatus::Running;
        if status.is_completed() {
            child.halt_and_reset();
        }
        status
    }
}

/// Blackboard key named by an `entry` port: `{key}` or a bare key.
pub(crate) fn entry_key(base: &NodeBase) -> Result<String, BtError> {
    let raw = base
        .get_input("entry")
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| BtError::MissingPort {
            node: base.name().to_string(),
            port: "entry".to_string(),
        })?;
    Ok(blackboard_pointer(&raw).unwrap_or(raw.trim()).to_string())
}

impl TreeNode for EntryUpdated {
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
        if self.still_executing_child {
            return self.tick_child();
        }

        let key = entry_key(&self.base).unwrap_or_else(|err| self.base.config_error(err));
        let updated = match self.base.blackboard().get_entry(&key) {
            Some(entry) => {
                let changed = entry.sequence_id() != self.last_sequence;
                self.last_sequence = entry.sequence_id();
                changed
            }
            None => false,
        };

        if !updated {
            return self.if_not_updated;
        }
        self.tick_child()
    }

    fn halt(&mut self) {
        self.still_executing_child = false;
        self.base.reset_children();
    }
}
