//! [`BehaviorTreeFactory`] – registry of node types by registration id.
//!
//! A tree loader walks its tree description and calls
//! [`create_node`][BehaviorTreeFactory::create_node] for every element; the
//! factory looks up the builder registered under the element's id and hands
//! it a [`NodeConfig`] with the registered manifest injected.
//!
//! The registry is only touched while building trees, never on the tick
//! path.
//!
//! # Example
//!
//! ```rust
//! use canopy_core::{BehaviorTree, BehaviorTreeFactory, Blackboard, NodeConfig, NodeStatus};
//!
//! let factory = BehaviorTreeFactory::with_builtin_nodes();
//! let blackboard = Blackboard::create();
//! let config = || NodeConfig::new(blackboard.clone());
//!
//! let mut root = factory.create_node("Sequence", "root", config()).unwrap();
//! root.add_child(factory.create_node("AlwaysSuccess", "ok", config()).unwrap()).unwrap();
//!
//! let tree = BehaviorTree::new(root, blackboard.clone());
//! assert_eq!(tree.tick(), NodeStatus::Success);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use canopy_types::{
    BtError, NodeKind, NodeStatus, PortInfo, TreeNodeManifest, bidirectional_port, input_port,
    input_port_with_default, output_port,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::actions::{
    Always, PopFromQueue, SetBlackboard, SimpleAction, SimpleCondition, Sleep, TickFn,
    UnsetBlackboard, WasEntryUpdated,
};
use crate::controls::{
    Fallback, IfThenElse, ManualSelector, Parallel, ParallelAll, ReactiveFallback,
    ReactiveSequence, Sequence, Switch, WhileDoElse,
};
use crate::decorators::{
    ConsumeQueue, Delay, EntryUpdated, Force, Inverter, KeepRunningUntilFailure, Repeat, Retry,
    RunOnce, Subtree, Timeout,
};
use crate::node::{NodeBase, NodeConfig, TreeNode};

/// Builds one node instance from its name and configuration.
pub type NodeBuilder = Arc<dyn Fn(&str, NodeConfig) -> Box<dyn TreeNode> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    manifest: Arc<TreeNodeManifest>,
    builder: NodeBuilder,
}

/// Registry mapping registration ids to node builders and manifests.
#[derive(Default)]
pub struct BehaviorTreeFactory {
    registrations: RwLock<HashMap<String, Registration>>,
}

impl BehaviorTreeFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with every built-in node registered.
    pub fn with_builtin_nodes() -> Self {
        let factory = Self::new();
        factory.register_builtin_nodes();
        factory
    }

    /// Register `builder` under `manifest.registration_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BtError::DuplicateRegistration`] if the id is taken.
    pub fn register_builder(
        &self,
        manifest: TreeNodeManifest,
        builder: impl Fn(&str, NodeConfig) -> Box<dyn TreeNode> + Send + Sync + 'static,
    ) -> Result<(), BtError> {
        let mut registrations = self.registrations.write();
        let id = manifest.registration_id.clone();
        if registrations.contains_key(&id) {
            return Err(BtError::DuplicateRegistration(id));
        }
        debug!(id = %id, kind = %manifest.kind, "registered node type");
        registrations.insert(
            id,
            Registration {
                manifest: Arc::new(manifest),
                builder: Arc::new(builder),
            },
        );
        Ok(())
    }

    /// Register a closure-backed action.
    pub fn register_simple_action(
        &self,
        id: &str,
        tick_fn: impl Fn(&mut NodeBase) -> NodeStatus + Send + Sync + 'static,
        ports: impl IntoIterator<Item = (String, PortInfo)>,
    ) -> Result<(), BtError> {
        let tick_fn: TickFn = Arc::new(tick_fn);
        let manifest = TreeNodeManifest::new(NodeKind::Action, id).with_ports(ports);
        self.register_builder(manifest, move |name, config| {
            Box::new(SimpleAction::from_shared(name, config, Arc::clone(&tick_fn)))
        })
    }

    /// Register a closure-backed condition.
    pub fn register_simple_condition(
        &self,
        id: &str,
        tick_fn: impl Fn(&mut NodeBase) -> NodeStatus + Send + Sync + 'static,
        ports: impl IntoIterator<Item = (String, PortInfo)>,
    ) -> Result<(), BtError> {
        let tick_fn: TickFn = Arc::new(tick_fn);
        let manifest = TreeNodeManifest::new(NodeKind::Condition, id).with_ports(ports);
        self.register_builder(manifest, move |name, config| {
            Box::new(SimpleCondition::from_shared(name, config, Arc::clone(&tick_fn)))
        })
    }

    /// Instantiate the node registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BtError::UnknownRegistration`] if nothing is registered
    /// under `id`.
    pub fn create_node(
        &self,
        id: &str,
        name: &str,
        config: NodeConfig,
    ) -> Result<Box<dyn TreeNode>, BtError> {
        let registration = self
            .registrations
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| BtError::UnknownRegistration(id.to_string()))?;
        let config = config.with_manifest(registration.manifest);
        Ok((registration.builder)(name, config))
    }

    /// Remove the registration for `id`.  Returns `true` if it existed.
    pub fn unregister(&self, id: &str) -> bool {
        self.registrations.write().remove(id).is_some()
    }

    /// Remove every registration, built-ins included.
    pub fn clear(&self) {
        self.registrations.write().clear();
    }

    pub fn manifest(&self, id: &str) -> Option<Arc<TreeNodeManifest>> {
        self.registrations
            .read()
            .get(id)
            .map(|registration| Arc::clone(&registration.manifest))
    }

    /// Registered ids, sorted.
    pub fn registered_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registrations.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn builtin(
        &self,
        manifest: TreeNodeManifest,
        builder: impl Fn(&str, NodeConfig) -> Box<dyn TreeNode> + Send + Sync + 'static,
    ) {
        let id = manifest.registration_id.clone();
        if let Err(err) = self.register_builder(manifest, builder) {
            warn!(id = %id, error = %err, "skipping built-in node");
        }
    }

    fn register_builtin_nodes(&self) {
        use NodeKind::{Action, Condition, Control, Decorator};
        let watched_entry = || input_port::<String>("entry", "blackboard entry to watch");

        // Controls
        self.builtin(manifest(Control, "Sequence"), |n, c| Box::new(Sequence::new(n, c)));
        self.builtin(manifest(Control, "SequenceWithMemory"), |n, c| {
            Box::new(Sequence::with_memory(n, c))
        });
        self.builtin(manifest(Control, "Fallback"), |n, c| Box::new(Fallback::new(n, c)));
        self.builtin(manifest(Control, "AsyncFallback"), |n, c| {
            Box::new(Fallback::asynchronous(n, c))
        });
        self.builtin(manifest(Control, "ReactiveSequence"), |n, c| {
            Box::new(ReactiveSequence::new(n, c))
        });
        self.builtin(manifest(Control, "ReactiveFallback"), |n, c| {
            Box::new(ReactiveFallback::new(n, c))
        });
        self.builtin(
            manifest(Control, "Parallel").with_ports([
                input_port_with_default::<i32>(
                    "success_count",
                    -1,
                    "number of children that must succeed; negative counts from the end",
                ),
                input_port_with_default::<i32>(
                    "failure_count",
                    1,
                    "number of children that must fail; negative counts from the end",
                ),
            ]),
            |n, c| Box::new(Parallel::new(n, c)),
        );
        self.builtin(
            manifest(Control, "ParallelAll").with_ports([input_port_with_default::<i32>(
                "max_failures",
                1,
                "failures tolerated before the node fails",
            )]),
            |n, c| Box::new(ParallelAll::new(n, c)),
        );
        self.builtin(
            manifest(Control, "Switch")
                .with_ports([input_port::<String>("switch", "name of the child to run")]),
            |n, c| Box::new(Switch::new(n, c)),
        );
        self.builtin(manifest(Control, "IfThenElse"), |n, c| Box::new(IfThenElse::new(n, c)));
        self.builtin(manifest(Control, "WhileDoElse"), |n, c| {
            Box::new(WhileDoElse::new(n, c))
        });
        self.builtin(
            manifest(Control, "ManualSelector").with_ports([
                input_port::<i64>("SELECTED_CHILD_INDEX", "index of the child to run"),
                input_port_with_default::<bool>(
                    "REPEAT_LAST_SELECTION",
                    false,
                    "run the previously selected child again",
                ),
            ]),
            |n, c| Box::new(ManualSelector::new(n, c)),
        );

        // Decorators
        self.builtin(manifest(Decorator, "Inverter"), |n, c| Box::new(Inverter::new(n, c)));
        self.builtin(manifest(Decorator, "ForceSuccess"), |n, c| {
            Box::new(Force::success(n, c))
        });
        self.builtin(manifest(Decorator, "ForceFailure"), |n, c| {
            Box::new(Force::failure(n, c))
        });
        self.builtin(
            manifest(Decorator, "RetryUntilSuccessful").with_ports([input_port::<i32>(
                "num_attempts",
                "attempts before giving up; -1 retries forever",
            )]),
            |n, c| Box::new(Retry::new(n, c)),
        );
        self.builtin(
            manifest(Decorator, "Repeat").with_ports([input_port::<i32>(
                "num_cycles",
                "successful runs to repeat; -1 repeats forever",
            )]),
            |n, c| Box::new(Repeat::new(n, c)),
        );
        self.builtin(
            manifest(Decorator, "Timeout")
                .with_ports([input_port::<u64>("msec", "deadline in milliseconds")]),
            |n, c| Box::new(Timeout::new(n, c)),
        );
        self.builtin(
            manifest(Decorator, "Delay").with_ports([input_port::<u64>(
                "delay_msec",
                "milliseconds to wait before ticking the child",
            )]),
            |n, c| Box::new(Delay::new(n, c)),
        );
        self.builtin(manifest(Decorator, "RunOnce"), |n, c| Box::new(RunOnce::new(n, c)));
        self.builtin(
            manifest(NodeKind::Subtree, "SubTree").with_ports([input_port_with_default::<bool>(
                "_autoremap",
                false,
                "remap ports with matching names automatically",
            )]),
            |n, c| Box::new(Subtree::new(n, c)),
        );
        self.builtin(manifest(Decorator, "KeepRunningUntilFailure"), |n, c| {
            Box::new(KeepRunningUntilFailure::new(n, c))
        });
        self.builtin(
            manifest(Decorator, "SkipUnlessUpdated").with_ports([watched_entry()]),
            |n, c| Box::new(EntryUpdated::skip_unless_updated(n, c)),
        );
        self.builtin(
            manifest(Decorator, "WaitValueUpdate").with_ports([watched_entry()]),
            |n, c| Box::new(EntryUpdated::wait_value_update(n, c)),
        );
        self.builtin(
            manifest(Decorator, "ConsumeQueue").with_ports([
                input_port::<String>("queue", "blackboard entry holding the queue"),
                output_port::<String>("popped_item", "item popped for the current child run"),
            ]),
            |n, c| Box::new(ConsumeQueue::<String>::new(n, c)),
        );

        // Leaves
        self.builtin(manifest(Action, "AlwaysSuccess"), |n, c| {
            Box::new(Always::success(n, c))
        });
        self.builtin(manifest(Action, "AlwaysFailure"), |n, c| {
            Box::new(Always::failure(n, c))
        });
        self.builtin(
            manifest(Action, "Sleep").with_ports([input_port::<u64>("msec", "sleep duration")]),
            |n, c| Box::new(Sleep::new().node(n, c)),
        );
        self.builtin(
            manifest(Action, "SetBlackboard").with_ports([
                input_port::<String>("value", "literal, or {entry} to copy"),
                bidirectional_port::<String>("output_key", "entry to write"),
            ]),
            |n, c| Box::new(SetBlackboard::new(n, c)),
        );
        self.builtin(
            manifest(Action, "UnsetBlackboard")
                .with_ports([input_port::<String>("key", "entry to remove")]),
            |n, c| Box::new(UnsetBlackboard::new(n, c)),
        );
        self.builtin(
            manifest(Condition, "WasEntryUpdated").with_ports([watched_entry()]),
            |n, c| Box::new(WasEntryUpdated::new(n, c)),
        );
        self.builtin(
            manifest(Action, "PopFromQueue").with_ports([
                bidirectional_port::<String>("queue", "blackboard entry holding the queue"),
                output_port::<String>("popped_item", "the popped item"),
            ]),
            |n, c| Box::new(PopFromQueue::<String>::new(n, c)),
        );
    }
}

impl std::fmt::Debug for BehaviorTreeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTreeFactory")
            .field("registered_nodes", &self.registered_nodes())
            .finish()
    }
}

fn manifest(kind: NodeKind, id: &str) -> TreeNodeManifest {
    TreeNodeManifest::new(kind, id)
}
