//! [`Blackboard`] – shared, hierarchically scoped key/value store.
//!
//! Values are stored type-erased together with their Rust type name and a
//! sequence id.  Every write draws a fresh id from a counter shared by the
//! root blackboard and all of its scopes, so ids for a key strictly increase
//! on each write, even when the value is unchanged, the key was removed and
//! re-created, or a scope shadows an entry it used to read from its parent.  Nodes that
//! want to know "did this change since I last looked" compare ids with `!=`.
//!
//! # Scoping
//!
//! A blackboard may have a parent.  Reads that miss locally fall back to the
//! parent chain.  Writes stay local unless the key is explicitly remapped to
//! a parent key, or auto-remapping is enabled and the parent already holds
//! the key.
//!
//! # Example
//!
//! ```rust
//! use canopy_core::Blackboard;
//!
//! let bb = Blackboard::create();
//! bb.set("battery", 80_u8);
//! let first = bb.get_entry("battery").unwrap().sequence_id();
//!
//! bb.set("battery", 80_u8);
//! assert!(bb.get_entry("battery").unwrap().sequence_id() > first);
//! assert_eq!(bb.get::<u8>("battery"), Some(80));
//! ```

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use canopy_types::BtError;
use parking_lot::{Mutex, RwLock};

/// A type-erased, shareable blackboard value.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Queue stored in a blackboard entry and drained by `PopFromQueue` and
/// `ConsumeQueue`.
pub type SharedQueue<T> = Arc<Mutex<VecDeque<T>>>;

/// Build a [`SharedQueue`] from `items`.
pub fn shared_queue<T>(items: impl IntoIterator<Item = T>) -> SharedQueue<T> {
    Arc::new(Mutex::new(items.into_iter().collect()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of one blackboard entry: value, type tag and sequence id.
#[derive(Clone)]
pub struct Entry {
    value: AnyValue,
    type_name: &'static str,
    sequence_id: u64,
    stamp: Instant,
}

impl Entry {
    pub fn value(&self) -> &AnyValue {
        &self.value
    }

    /// Borrow the value as `T`, if that is what the entry holds.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Id of the write that produced this value.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// When the value was written.
    pub fn stamp(&self) -> Instant {
        self.stamp
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("type_name", &self.type_name)
            .field("sequence_id", &self.sequence_id)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blackboard
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Storage {
    entries: HashMap<String, Entry>,
}

/// Thread-safe key/value store shared by the nodes of a tree.
///
/// Always handled through an [`Arc`]; construct with [`Blackboard::create`],
/// [`Blackboard::with_parent`] or [`Blackboard::scoped`].
pub struct Blackboard {
    storage: RwLock<Storage>,
    /// Last sequence id handed out; shared with every scope of the root.
    sequence: Arc<AtomicU64>,
    parent: Option<Arc<Blackboard>>,
    /// Internal key → parent key.
    remapping: HashMap<String, String>,
    auto_remap: bool,
}

impl Blackboard {
    /// Create a root blackboard.
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            storage: RwLock::new(Storage::default()),
            sequence: Arc::new(AtomicU64::new(0)),
            parent: None,
            remapping: HashMap::new(),
            auto_remap: false,
        })
    }

    /// Create a child blackboard that falls back to `parent` for reads.
    pub fn with_parent(parent: Arc<Blackboard>) -> Arc<Self> {
        Self::scoped(parent, HashMap::new(), false)
    }

    /// Create a child blackboard for a subtree.
    ///
    /// `remapping` maps keys used inside the subtree to keys of `parent`;
    /// reads and writes of a remapped key go straight to the parent.  With
    /// `auto_remap`, writes to a key the parent already holds also go to the
    /// parent.
    pub fn scoped(
        parent: Arc<Blackboard>,
        remapping: HashMap<String, String>,
        auto_remap: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage: RwLock::new(Storage::default()),
            sequence: Arc::clone(&parent.sequence),
            parent: Some(parent),
            remapping,
            auto_remap,
        })
    }

    pub fn parent(&self) -> Option<&Arc<Blackboard>> {
        self.parent.as_ref()
    }

    fn remapped(&self, key: &str) -> Option<(&Arc<Blackboard>, &str)> {
        let parent = self.parent.as_ref()?;
        self.remapping
            .get(key)
            .map(|external| (parent, external.as_str()))
    }

    /// Write `value` under `key`, bumping the entry's sequence id.
    pub fn set<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.set_any(key, Arc::new(value), std::any::type_name::<T>());
    }

    /// Write an already type-erased value.
    pub fn set_any(&self, key: &str, value: AnyValue, type_name: &'static str) {
        if let Some((parent, external)) = self.remapped(key) {
            parent.set_any(external, value, type_name);
            return;
        }
        if self.auto_remap
            && let Some(parent) = &self.parent
            && !self.storage.read().entries.contains_key(key)
            && parent.has_key(key)
        {
            parent.set_any(key, value, type_name);
            return;
        }

        let mut storage = self.storage.write();
        let entry = Entry {
            value,
            type_name,
            sequence_id: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            stamp: Instant::now(),
        };
        storage.entries.insert(key.to_string(), entry);
    }

    /// Snapshot the entry for `key`, searching the parent chain.
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        if let Some((parent, external)) = self.remapped(key) {
            return parent.get_entry(external);
        }
        if let Some(entry) = self.storage.read().entries.get(key) {
            return Some(entry.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_entry(key))
    }

    /// Read `key` as `T`.  Returns `None` when the key is absent or holds a
    /// different type.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get_entry(key)
            .and_then(|entry| entry.downcast_ref::<T>().cloned())
    }

    /// Like [`get`][Self::get] but distinguishes a missing key from a type
    /// mismatch.
    pub fn try_get<T: Any + Clone>(&self, key: &str) -> Result<T, BtError> {
        let entry = self
            .get_entry(key)
            .ok_or_else(|| BtError::MissingEntry(key.to_string()))?;
        entry
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| BtError::BlackboardType {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
                found: entry.type_name().to_string(),
            })
    }

    pub fn has_key(&self, key: &str) -> bool {
        if let Some((parent, external)) = self.remapped(key) {
            return parent.has_key(external);
        }
        self.storage.read().entries.contains_key(key)
            || self.parent.as_ref().is_some_and(|p| p.has_key(key))
    }

    /// Remove `key`.  Returns `true` if an entry was removed.
    pub fn unset(&self, key: &str) -> bool {
        if let Some((parent, external)) = self.remapped(key) {
            return parent.unset(external);
        }
        self.storage.write().entries.remove(key).is_some()
    }

    /// Remove every local entry.  Parent blackboards are untouched.
    pub fn clear(&self) {
        self.storage.write().entries.clear();
    }

    /// Local keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.keys())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_then_get_returns_value() {
        let bb = Blackboard::create();
        bb.set("target", "dock".to_string());
        assert_eq!(bb.get::<String>("target").as_deref(), Some("dock"));
        assert!(bb.has_key("target"));
    }

    #[test]
    fn get_with_wrong_type_is_none() {
        let bb = Blackboard::create();
        bb.set("count", 3_i32);
        assert_eq!(bb.get::<u64>("count"), None);
        assert!(matches!(
            bb.try_get::<u64>("count"),
            Err(BtError::BlackboardType { .. })
        ));
        assert!(matches!(
            bb.try_get::<u64>("missing"),
            Err(BtError::MissingEntry(_))
        ));
    }

    #[test]
    fn rewriting_same_value_bumps_sequence() {
        let bb = Blackboard::create();
        bb.set("flag", true);
        let first = bb.get_entry("flag").unwrap().sequence_id();
        bb.set("flag", true);
        let second = bb.get_entry("flag").unwrap().sequence_id();
        assert!(second > first);
    }

    #[test]
    fn recreated_key_never_repeats_a_sequence_id() {
        let bb = Blackboard::create();
        bb.set("k", 1_u8);
        let before = bb.get_entry("k").unwrap().sequence_id();
        assert!(bb.unset("k"));
        bb.set("k", 1_u8);
        assert!(bb.get_entry("k").unwrap().sequence_id() > before);
    }

    #[test]
    fn shadowing_write_in_a_scope_bumps_sequence() {
        let parent = Blackboard::create();
        parent.set("goal", 1_i32);
        let child = Blackboard::with_parent(Arc::clone(&parent));
        let inherited = child.get_entry("goal").unwrap().sequence_id();

        child.set("goal", 2_i32);
        let shadowed = child.get_entry("goal").unwrap().sequence_id();
        assert!(shadowed > inherited);
        assert_eq!(parent.get::<i32>("goal"), Some(1));
    }

    #[test]
    fn sibling_scopes_never_share_a_sequence_id() {
        let root = Blackboard::create();
        let left = Blackboard::with_parent(Arc::clone(&root));
        let right = Blackboard::with_parent(Arc::clone(&root));
        left.set("k", 0_u8);
        right.set("k", 0_u8);
        assert_ne!(
            left.get_entry("k").unwrap().sequence_id(),
            right.get_entry("k").unwrap().sequence_id()
        );
    }

    #[test]
    fn entry_reports_type_name() {
        let bb = Blackboard::create();
        bb.set("speed", 1.5_f64);
        assert_eq!(bb.get_entry("speed").unwrap().type_name(), "f64");
    }

    #[test]
    fn child_reads_fall_back_to_parent() {
        let parent = Blackboard::create();
        parent.set("shared", 7_i32);
        let child = Blackboard::with_parent(Arc::clone(&parent));

        assert_eq!(child.get::<i32>("shared"), Some(7));
        assert!(child.has_key("shared"));

        // Plain writes stay local and shadow the parent.
        child.set("shared", 9_i32);
        assert_eq!(child.get::<i32>("shared"), Some(9));
        assert_eq!(parent.get::<i32>("shared"), Some(7));
    }

    #[test]
    fn remapped_keys_write_through_to_parent() {
        let parent = Blackboard::create();
        let remap = HashMap::from([("goal".to_string(), "mission_goal".to_string())]);
        let child = Blackboard::scoped(Arc::clone(&parent), remap, false);

        child.set("goal", "kitchen".to_string());
        assert_eq!(
            parent.get::<String>("mission_goal").as_deref(),
            Some("kitchen")
        );
        assert!(child.keys().is_empty());
        assert!(child.unset("goal"));
        assert!(!parent.has_key("mission_goal"));
    }

    #[test]
    fn auto_remap_writes_existing_parent_keys() {
        let parent = Blackboard::create();
        parent.set("pose", 0_i32);
        let child = Blackboard::scoped(Arc::clone(&parent), HashMap::new(), true);

        child.set("pose", 5_i32);
        child.set("local_only", 1_i32);
        assert_eq!(parent.get::<i32>("pose"), Some(5));
        assert!(!parent.has_key("local_only"));
    }

    #[test]
    fn clear_only_touches_local_entries() {
        let parent = Blackboard::create();
        parent.set("a", 1_i32);
        let child = Blackboard::with_parent(Arc::clone(&parent));
        child.set("b", 2_i32);
        child.clear();
        assert!(!child.keys().contains(&"b".to_string()));
        assert!(child.has_key("a"));
    }

    #[test]
    fn concurrent_readers_and_writer() {
        let bb = Blackboard::create();
        bb.set("n", 0_u64);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let bb = Arc::clone(&bb);
                thread::spawn(move || {
                    for j in 0..100_u64 {
                        if i == 0 {
                            bb.set("n", j);
                        } else {
                            let _ = bb.get::<u64>("n");
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bb.get::<u64>("n"), Some(99));
    }
}
