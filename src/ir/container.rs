/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::ir::object::{Object, ObjectId};

/// The program-wide, name-indexed store of every [`Object`]. Objects are
/// never moved once inserted: the arena holds tombstones (`None`) for
/// removed slots so that every [`ObjectId`] handed out stays valid for as
/// long as the object it names is alive, and iteration order is always
/// insertion order.
#[derive(Debug, Default)]
pub struct IrContainer {
    arena: Vec<Option<Object>>,
    index: BTreeMap<String, ObjectId>,
}

impl IrContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `object`, failing with `DuplicateName` if its name is
    /// already registered or `Unnamed` if it has no name (the latter can't
    /// actually happen since `Object::new` itself rejects empty names, but
    /// the container re-asserts the invariant so it never depends on the
    /// caller having gone through that constructor).
    pub fn add(&mut self, object: Object) -> Result<ObjectId, CoreError> {
        if object.name().is_empty() {
            return Err(CoreError::Unnamed);
        }
        if self.index.contains_key(object.name()) {
            return Err(CoreError::DuplicateName(object.name().to_string()));
        }
        let id = ObjectId(self.arena.len() as u32);
        self.index.insert(object.name().to_string(), id);
        self.arena.push(Some(object));
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Result<ObjectId, CoreError> {
        self.index.get(name).copied().ok_or_else(|| CoreError::NotFound(name.to_string()))
    }

    pub fn find_opt(&self, name: &str) -> Option<ObjectId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: ObjectId) -> &Object {
        self.arena[id.index()]
            .as_ref()
            .expect("ObjectId referenced after its object was removed")
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        self.arena[id.index()]
            .as_mut()
            .expect("ObjectId referenced after its object was removed")
    }

    pub fn try_get(&self, id: ObjectId) -> Option<&Object> {
        self.arena.get(id.index()).and_then(|o| o.as_ref())
    }

    /// Used exclusively by the liveness pass to drop dead temps.
    pub fn remove(&mut self, name: &str) -> Result<(), CoreError> {
        let id = self.index.remove(name).ok_or_else(|| CoreError::NotFound(name.to_string()))?;
        self.arena[id.index()] = None;
        Ok(())
    }

    /// A restartable, insertion-ordered iterator over every live object.
    pub fn iterate(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|obj| (ObjectId(i as u32), obj)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::object::{ObjectKind, Prime, StorageClass};

    fn prime_object(name: &str) -> Object {
        Object::new(name, StorageClass::Private, ObjectKind::Prime(Prime::new())).unwrap()
    }

    #[test]
    fn add_and_find_round_trips() {
        let mut c = IrContainer::new();
        let id = c.add(prime_object("a")).unwrap();
        assert_eq!(c.find("a").unwrap(), id);
        assert_eq!(c.get(id).name(), "a");
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut c = IrContainer::new();
        c.add(prime_object("a")).unwrap();
        let err = c.add(prime_object("a")).unwrap_err();
        assert_eq!(err, CoreError::DuplicateName("a".to_string()));
    }

    #[test]
    fn find_missing_is_not_found() {
        let c = IrContainer::new();
        assert_eq!(c.find("nope").unwrap_err(), CoreError::NotFound("nope".to_string()));
    }

    #[test]
    fn remove_drops_object_and_preserves_other_ids() {
        let mut c = IrContainer::new();
        let a = c.add(prime_object("a")).unwrap();
        let b = c.add(prime_object("b")).unwrap();
        c.remove("a").unwrap();
        assert!(c.try_get(a).is_none());
        assert_eq!(c.get(b).name(), "b");
        assert_eq!(c.find("a").unwrap_err(), CoreError::NotFound("a".to_string()));
    }

    #[test]
    fn iterate_preserves_insertion_order_skipping_removed() {
        let mut c = IrContainer::new();
        c.add(prime_object("a")).unwrap();
        c.add(prime_object("b")).unwrap();
        c.add(prime_object("c")).unwrap();
        c.remove("b").unwrap();
        let names: Vec<&str> = c.iterate().map(|(_, o)| o.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
