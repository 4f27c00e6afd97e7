//! Typed subscriber registration.
//!
//! Callbacks are registered against a [`Field`], or against every change.
//! The registry belongs to one coordinator; nothing here is process-wide.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::field::Field;

/// Zero-argument change callback. Subscribers re-read the snapshot from the
/// coordinator when invoked.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Handle returned on registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Table {
    next_id: u64,
    by_field: HashMap<Field, Vec<(SubscriptionId, Callback)>>,
    all: Vec<(SubscriptionId, Callback)>,
}

impl Table {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id = self.next_id.wrapping_add(1);
        SubscriptionId(self.next_id)
    }
}

/// Ordered callback lists keyed by field.
///
/// Callbacks are cloned out of the lock before being invoked, so a callback
/// may subscribe, unsubscribe, or read the coordinator without deadlocking.
#[derive(Default)]
pub struct SubscriberRegistry {
    table: Mutex<Table>,
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SubscriberRegistry")
            .field("fields", &table.by_field.len())
            .field("all", &table.all.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callback` for changes to `field`.
    pub fn subscribe(&self, field: Field, callback: Callback) -> SubscriptionId {
        let mut table = self.table();
        let id = table.allocate();
        table.by_field.entry(field).or_default().push((id, callback));
        id
    }

    /// Registers `callback` for every refresh and every applied patch.
    pub fn subscribe_all(&self, callback: Callback) -> SubscriptionId {
        let mut table = self.table();
        let id = table.allocate();
        table.all.push((id, callback));
        id
    }

    /// Removes a registration. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.table();
        let before = table.all.len();
        table.all.retain(|(sid, _)| *sid != id);
        if table.all.len() != before {
            return true;
        }
        let mut removed = false;
        table.by_field.retain(|_, callbacks| {
            let len = callbacks.len();
            callbacks.retain(|(sid, _)| *sid != id);
            removed |= callbacks.len() != len;
            !callbacks.is_empty()
        });
        removed
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        let table = self.table();
        table.all.len() + table.by_field.values().map(Vec::len).sum::<usize>()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every registered callback exactly once.
    pub fn notify_all(&self) {
        let callbacks: Vec<Callback> = {
            let table = self.table();
            let mut fields: Vec<_> = table.by_field.iter().collect();
            fields.sort_by_key(|(field, _)| **field);
            fields
                .into_iter()
                .flat_map(|(_, cbs)| cbs.iter())
                .chain(table.all.iter())
                .map(|(_, cb)| Arc::clone(cb))
                .collect()
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Invokes the callbacks of `fields`, then the catch-all callbacks.
    ///
    /// Does nothing when `fields` is empty.
    pub fn notify_fields(&self, fields: &[Field]) {
        if fields.is_empty() {
            return;
        }
        let callbacks: Vec<Callback> = {
            let table = self.table();
            fields
                .iter()
                .filter_map(|field| table.by_field.get(field))
                .flatten()
                .chain(table.all.iter())
                .map(|(_, cb)| Arc::clone(cb))
                .collect()
        };
        for callback in callbacks {
            callback();
        }
    }
}
