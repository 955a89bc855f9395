//! Type registry: class definitions indexed by numeric id and by name.

use crate::model::Class;
use std::collections::HashMap;

/// Append-only mapping from class id and class name to [`Class`].
///
/// Built once from grammar input and treated as read-only afterwards
/// (lazy `ClassRef` resolution memoizes into it but never mutates it).
/// Re-adding a duplicate id or name rebinds the lookup to the newer class,
/// last write wins; callers are responsible for grammar correctness.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classes: Vec<Class>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u16, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one class, indexed by id and by name.
    pub fn add(&mut self, class: Class) {
        let slot = self.classes.len();
        self.by_name.insert(class.name.clone(), slot);
        self.by_id.insert(class.id, slot);
        self.classes.push(class);
    }

    /// Register several classes at once.
    pub fn extend(&mut self, classes: impl IntoIterator<Item = Class>) {
        for class in classes {
            self.add(class);
        }
    }

    pub fn find_by_id(&self, id: u16) -> Option<&Class> {
        self.by_id.get(&id).map(|&slot| &self.classes[slot])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Class> {
        self.by_name.get(name).map(|&slot| &self.classes[slot])
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub(crate) fn slot_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn class_at(&self, slot: usize) -> Option<&Class> {
        self.classes.get(slot)
    }
}
