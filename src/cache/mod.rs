//! Per-sample caches for the current window.
//!
//! A [`SampleCache`] maps every sample of the sample universe to a [`CallSlot`].
//! Slots start out [`CallSlot::Unloaded`]; that is distinct from a loaded but
//! empty value. Merging a backend response is a key-wise union: every sample in
//! the response overwrites its slot, every other slot is left alone. A loaded
//! slot therefore never goes back to unloaded, short of building a new cache.
//!
//! The [`AttributeCache`] holds one [`SampleCache`] per per-call attribute
//! (e.g. read depth), allocated the first time the attribute shows up and
//! seeded over the same sample universe.
//!
//! The [`loader`] module holds the [`DataLoader`] that fills these caches.
//!
//! [`DataLoader`]: crate::cache::loader::DataLoader

use indexmap::IndexMap;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::genotypes::SampleCalls;

pub mod loader;

/// The response of `POST /variant_calls`: calls and per-call attributes of
/// the requested samples only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallsPayload {
    #[serde(default)]
    pub calls: IndexMap<String, SampleCalls>,
    #[serde(default)]
    pub calls_metadata: IndexMap<String, IndexMap<String, Value>>,
}

/// The cache state of one sample.
#[derive(Clone, Debug, PartialEq)]
pub enum CallSlot<T> {
    Unloaded,
    Loaded(T),
}

impl<T> CallSlot<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, CallSlot::Loaded(_))
    }

    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            CallSlot::Loaded(value) => Some(value),
            CallSlot::Unloaded => None,
        }
    }
}

impl<T: Serialize> Serialize for CallSlot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CallSlot::Loaded(value) => serializer.serialize_some(value),
            CallSlot::Unloaded => serializer.serialize_none(),
        }
    }
}

/// Sample id to [`CallSlot`] mapping, in sample universe order.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleCache<T> {
    slots: IndexMap<String, CallSlot<T>>,
}

impl<T> Default for SampleCache<T> {
    fn default() -> Self {
        Self {
            slots: IndexMap::new(),
        }
    }
}

impl<T> SampleCache<T> {
    /// A cache with every sample of `universe` unloaded.
    pub fn new_unloaded(universe: &[String]) -> Self {
        let slots = universe
            .iter()
            .map(|id| (id.clone(), CallSlot::Unloaded))
            .collect();
        Self { slots }
    }

    pub fn get(&self, id: &str) -> Option<&CallSlot<T>> {
        self.slots.get(id)
    }

    /// The loaded value of a sample, if any.
    pub fn value(&self, id: &str) -> Option<&T> {
        self.get(id).and_then(CallSlot::as_loaded)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.get(id).map_or(false, CallSlot::is_loaded)
    }

    /// Merge fetched values: a key-wise union where fetched keys win.
    pub fn merge(&mut self, fetched: IndexMap<String, T>) {
        for (id, value) in fetched {
            self.slots.insert(id, CallSlot::Loaded(value));
        }
    }

    /// Those of `ids` that are in the cache but not loaded yet, in the order
    /// given and without duplicates. Ids outside the sample universe are
    /// never reported.
    pub fn unloaded(&self, ids: &[String]) -> Vec<String> {
        let mut unloaded: Vec<String> = Vec::new();
        for id in ids {
            if matches!(self.slots.get(id), Some(CallSlot::Unloaded)) && !unloaded.contains(id) {
                unloaded.push(id.clone());
            }
        }
        unloaded
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_loaded()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CallSlot<T>)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T: Serialize> Serialize for SampleCache<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (id, slot) in &self.slots {
            map.serialize_entry(id, slot)?;
        }
        map.end()
    }
}

/// Per-attribute sample caches, e.g. `dp` (read depth) or `dv` (variant depth).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeCache {
    universe: Vec<String>,
    attributes: IndexMap<String, SampleCache<Value>>,
}

impl AttributeCache {
    pub fn new(universe: &[String]) -> Self {
        Self {
            universe: universe.to_vec(),
            attributes: IndexMap::new(),
        }
    }

    /// Merge fetched attribute values, allocating an unloaded cache over the
    /// sample universe the first time an attribute is seen.
    pub fn merge(&mut self, fetched: IndexMap<String, IndexMap<String, Value>>) {
        for (attribute, values) in fetched {
            let universe = &self.universe;
            self.attributes
                .entry(attribute)
                .or_insert_with(|| SampleCache::new_unloaded(universe))
                .merge(values);
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&SampleCache<Value>> {
        self.attributes.get(attribute)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.attributes.keys()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Serialize for AttributeCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (attribute, cache) in &self.attributes {
            map.serialize_entry(attribute, cache)?;
        }
        map.end()
    }
}
