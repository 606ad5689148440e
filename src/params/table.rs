use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::schema::ParameterDescriptor;

/// Parameters keyed by name, iterated in order of first insertion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterTable {
    entries: Vec<ParameterDescriptor>,
    index: HashMap<Arc<str>, usize>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears entries while keeping allocations for the next pass.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParameterDescriptor> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }

    /// Adds or replaces the entry named `descriptor.name`. A replaced entry
    /// keeps its position and is returned.
    pub fn insert(&mut self, descriptor: ParameterDescriptor) -> Option<ParameterDescriptor> {
        match self.index.get(&descriptor.name) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], descriptor)),
            None => {
                self.index.insert(descriptor.name.clone(), self.entries.len());
                self.entries.push(descriptor);
                None
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterDescriptor> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ParameterDescriptor> {
        self.entries.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.entries.iter().map(|d| &d.name)
    }

    /// Removes every entry, yielding them in table order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, ParameterDescriptor> {
        self.index.clear();
        self.entries.drain(..)
    }
}

impl<'a> IntoIterator for &'a ParameterTable {
    type Item = &'a ParameterDescriptor;
    type IntoIter = std::slice::Iter<'a, ParameterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Shares one allocation per distinct parameter name across reloads.
#[derive(Debug, Default)]
pub struct NameInterner {
    names: HashSet<Arc<str>>,
}

impl NameInterner {
    pub fn intern(&mut self, name: &str) -> Arc<str> {
        if let Some(existing) = self.names.get(name) {
            return existing.clone();
        }
        let name: Arc<str> = Arc::from(name);
        self.names.insert(name.clone());
        name
    }
}
