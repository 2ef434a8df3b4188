//! Operator-editable watch-lists
//!
//! Holds one ordered, duplicate-free list of endpoints per category. Parsing and
//! name resolution happen before the write lock is taken, so a snapshot taken
//! concurrently always sees either the old or the new list, never a partial edit.

use log::info;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::{DEFAULT_HOSTS, DEFAULT_STRATUM_URLS};
use crate::endpoint::{self, has_stratum_scheme};
use crate::models::{Category, Endpoint, TargetError};

#[derive(Debug, Default)]
struct RegistryLists {
    stratum: Vec<Endpoint>,
    hosts: Vec<Endpoint>,
}

impl RegistryLists {
    fn list(&self, category: Category) -> &Vec<Endpoint> {
        match category {
            Category::Stratum => &self.stratum,
            Category::Host => &self.hosts,
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<Endpoint> {
        match category {
            Category::Stratum => &mut self.stratum,
            Category::Host => &mut self.hosts,
        }
    }
}

/// Shared target registry; written by the editing surface, read by the scheduler
#[derive(Debug, Default)]
pub struct TargetRegistry {
    lists: RwLock<RegistryLists>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the built-in stratum relays and resolvers
    pub fn with_defaults() -> Result<Self, TargetError> {
        let registry = Self::new();
        registry.seed(DEFAULT_STRATUM_URLS, DEFAULT_HOSTS)?;
        Ok(registry)
    }

    /// Add several targets at once; duplicates are skipped, other errors abort
    pub fn seed<S: AsRef<str>, H: AsRef<str>>(&self, stratum: &[S], hosts: &[H]) -> Result<(), TargetError> {
        let stratum = stratum.iter().map(|raw| (raw.as_ref(), Category::Stratum));
        let hosts = hosts.iter().map(|raw| (raw.as_ref(), Category::Host));

        for (raw, category) in stratum.chain(hosts) {
            match self.add(raw, category) {
                Ok(_) | Err(TargetError::Duplicate { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Parse and append a new target.
    pub fn add(&self, raw: &str, category: Category) -> Result<Endpoint, TargetError> {
        let endpoint = parse_for_registry(raw, category)?;

        let mut lists = self.write();
        let list = lists.list_mut(category);
        if list.iter().any(|existing| existing.key == endpoint.key) {
            return Err(TargetError::Duplicate {
                key: endpoint.key,
                category,
            });
        }
        list.push(endpoint.clone());
        drop(lists);

        info!("Added {} target {}", category, endpoint.key);
        Ok(endpoint)
    }

    /// Replace the entry stored under `old_key` with a freshly parsed value.
    ///
    /// The replacement keeps the old entry's position.
    pub fn edit(&self, old_key: &str, new_raw: &str, category: Category) -> Result<Endpoint, TargetError> {
        if !self.contains(old_key, category) {
            return Err(not_found(old_key, category));
        }

        let endpoint = parse_for_registry(new_raw, category)?;
        self.replace(old_key, endpoint, category)
    }

    /// Swap a parsed endpoint in for `old_key` under one write lock.
    ///
    /// Parsing may resolve names, so it happens before the lock is taken and
    /// `old_key` has to be looked up again here.
    fn replace(&self, old_key: &str, endpoint: Endpoint, category: Category) -> Result<Endpoint, TargetError> {
        let mut lists = self.write();
        let list = lists.list_mut(category);
        let Some(index) = list.iter().position(|existing| existing.key == old_key) else {
            return Err(not_found(old_key, category));
        };
        if endpoint.key != old_key && list.iter().any(|existing| existing.key == endpoint.key) {
            return Err(TargetError::Duplicate {
                key: endpoint.key,
                category,
            });
        }
        list[index] = endpoint.clone();
        drop(lists);

        info!("Edited {} target {} -> {}", category, old_key, endpoint.key);
        Ok(endpoint)
    }

    /// Delete the entry with exactly this key
    pub fn remove(&self, key: &str, category: Category) -> Result<Endpoint, TargetError> {
        let mut lists = self.write();
        let list = lists.list_mut(category);
        let Some(index) = list.iter().position(|existing| existing.key == key) else {
            return Err(not_found(key, category));
        };
        let removed = list.remove(index);
        drop(lists);

        info!("Removed {} target {}", category, removed.key);
        Ok(removed)
    }

    /// Independent copy of the current entries, in insertion order
    pub fn snapshot(&self, category: Category) -> Vec<Endpoint> {
        self.read().list(category).clone()
    }

    /// Copy both lists under a single read lock
    pub fn snapshot_all(&self) -> (Vec<Endpoint>, Vec<Endpoint>) {
        let lists = self.read();
        (lists.stratum.clone(), lists.hosts.clone())
    }

    /// Canonical keys in insertion order
    pub fn keys(&self, category: Category) -> Vec<String> {
        self.read().list(category).iter().map(|e| e.key.clone()).collect()
    }

    pub fn contains(&self, key: &str, category: Category) -> bool {
        self.read().list(category).iter().any(|e| e.key == key)
    }

    pub fn len(&self, category: Category) -> usize {
        self.read().list(category).len()
    }

    pub fn is_empty(&self) -> bool {
        let lists = self.read();
        lists.stratum.is_empty() && lists.hosts.is_empty()
    }

    // A panic while holding the lock cannot leave the lists half-edited, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, RegistryLists> {
        self.lists.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryLists> {
        self.lists.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_for_registry(raw: &str, category: Category) -> Result<Endpoint, TargetError> {
    let raw = raw.trim();
    match category {
        Category::Stratum if raw.is_empty() => Err(TargetError::EmptyInput),
        Category::Stratum if !has_stratum_scheme(raw) => Err(TargetError::InvalidFormat(raw.to_string())),
        _ => endpoint::parse(raw, category),
    }
}

fn not_found(key: &str, category: Category) -> TargetError {
    TargetError::NotFound {
        key: key.to_string(),
        category,
    }
}
