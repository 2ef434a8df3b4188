//! Append-only status history
//!
//! Keeps every emitted record per category in chronological order and
//! rebroadcasts new records to live consumers (renderers).

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::constants::SINK_CHANNEL_CAPACITY;
use crate::models::{Category, StatusRecord};

#[derive(Debug, Default)]
struct History {
    stratum: Vec<StatusRecord>,
    hosts: Vec<StatusRecord>,
}

impl History {
    fn list(&self, category: Category) -> &Vec<StatusRecord> {
        match category {
            Category::Stratum => &self.stratum,
            Category::Host => &self.hosts,
        }
    }

    fn push(&mut self, record: StatusRecord) {
        match record.category {
            Category::Stratum => self.stratum.push(record),
            Category::Host => self.hosts.push(record),
        }
    }
}

/// Ordered record history shared between the scheduler and its consumers
#[derive(Debug)]
pub struct StatusSink {
    history: RwLock<History>,
    live: broadcast::Sender<StatusRecord>,
}

impl StatusSink {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(SINK_CHANNEL_CAPACITY);
        Self {
            history: RwLock::new(History::default()),
            live,
        }
    }

    /// Append a single record
    pub fn append(&self, record: StatusRecord) {
        self.write().push(record.clone());
        // No subscribers is not an error
        let _ = self.live.send(record);
    }

    /// Append a whole cycle under one lock so readers never see half a cycle
    pub fn extend(&self, records: Vec<StatusRecord>) {
        {
            let mut history = self.write();
            for record in &records {
                history.push(record.clone());
            }
        }
        for record in records {
            let _ = self.live.send(record);
        }
    }

    /// Full history for one category, oldest first
    pub fn all(&self, category: Category) -> Vec<StatusRecord> {
        self.read().list(category).clone()
    }

    pub fn len(&self, category: Category) -> usize {
        self.read().list(category).len()
    }

    pub fn is_empty(&self) -> bool {
        let history = self.read();
        history.stratum.is_empty() && history.hosts.is_empty()
    }

    /// Receive every record appended from now on.
    ///
    /// Slow receivers lag rather than block the scheduler; the full history
    /// stays available through [`StatusSink::all`].
    pub fn subscribe(&self) -> broadcast::Receiver<StatusRecord> {
        self.live.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, History> {
        self.history.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, History> {
        self.history.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatusSink {
    fn default() -> Self {
        Self::new()
    }
}
