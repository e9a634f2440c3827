//! Storage for shared instances.

use std::{
    any::Any,
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use crate::{args::Arg, instance::Instance};

/// Holds the one live result of every shared target and singleton-capable
/// class, keyed by the name it was resolved under. Shared factories may
/// produce scalars, so entries are [`Arg`]s rather than only objects.
#[derive(Debug, Default)]
pub struct SingletonRegistry {
    entries: HashMap<String, Arg>,
}

impl SingletonRegistry {
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.entries.get(name)
    }

    pub fn get_instance(&self, name: &str) -> Option<&Instance> {
        self.get(name).and_then(Arg::as_instance)
    }

    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_instance(name).and_then(Instance::downcast::<T>)
    }

    /// Keeps the first result stored under `name` and returns it.
    pub fn get_or_insert(&mut self, name: &str, value: Arg) -> Arg {
        self.entries
            .entry(name.to_string())
            .or_insert(value)
            .clone()
    }

    /// Like [`get_or_insert`](Self::get_or_insert) for objects. A scalar
    /// stored under `name` is replaced.
    pub fn get_or_insert_instance(&mut self, name: &str, instance: Instance) -> Instance {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if let Arg::Object(existing) = entry.get() {
                    return existing.clone();
                }
                entry.insert(Arg::Object(instance.clone()));
                instance
            }
            Entry::Vacant(entry) => {
                entry.insert(Arg::Object(instance.clone()));
                instance
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Arg>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Arg> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
