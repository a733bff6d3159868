//! Identity-map cache owned by a repository session.
//!
//! # Invariants
//! - At most one shared object per key.
//! - Interior mutability is single-threaded (`RefCell`); the map is `!Sync`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// Key -> shared object cache guaranteeing one in-memory object per key.
pub struct IdentityMap<K, V> {
    entries: RefCell<HashMap<K, Rc<RefCell<V>>>>,
}

impl<K, V> Default for IdentityMap<K, V> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord, V> IdentityMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached object for `key`, sharing its identity.
    pub fn get(&self, key: K) -> Option<Rc<RefCell<V>>> {
        self.entries.borrow().get(&key).cloned()
    }

    /// Registers `value` under `key`, returning a displaced entry if any.
    pub fn insert(&self, key: K, value: Rc<RefCell<V>>) -> Option<Rc<RefCell<V>>> {
        self.entries.borrow_mut().insert(key, value)
    }

    pub fn remove(&self, key: K) -> Option<Rc<RefCell<V>>> {
        self.entries.borrow_mut().remove(&key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.borrow().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Cached keys in ascending order.
    pub fn ids(&self) -> Vec<K> {
        let mut ids: Vec<K> = self.entries.borrow().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
