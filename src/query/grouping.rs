//! Fold flat join rows (one row per child association) into nested entities
//!
//! Entities live in a `Vec` in first-seen order with a key -> index map beside it.
//! Children are pushed through `&mut` into the stored entity, so there is no
//! copy to write back after appending.

use std::collections::HashMap;
use std::hash::Hash;

/// An entity that owns an ordered list of children
pub trait Nested {
    type Key: Eq + Hash + Clone;
    type Child;

    fn key(&self) -> Self::Key;

    fn push_child(&mut self, child: Self::Child);
}

/// Insertion-ordered collection of entities under assembly
pub struct EntityCollection<E: Nested> {
    entities: Vec<E>,
    index: HashMap<E::Key, usize>,
}

impl<E: Nested> EntityCollection<E> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.index.contains_key(key)
    }

    pub fn get_mut(&mut self, key: &E::Key) -> Option<&mut E> {
        let idx = *self.index.get(key)?;
        self.entities.get_mut(idx)
    }

    /// Return the stored entity for `entity.key()`, inserting `entity` if the key is new
    pub fn get_or_insert(&mut self, entity: E) -> &mut E {
        let key = entity.key();
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.entities.push(entity);
                let idx = self.entities.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.entities[idx]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in first-seen order
    pub fn all(&self) -> &[E] {
        &self.entities
    }

    pub fn into_vec(self) -> Vec<E> {
        self.entities
    }
}

impl<E: Nested> Default for EntityCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold `(entity, optional child)` rows into entities with their children
///
/// An entity seen for the first time is stored as given (callers pass it with an
/// empty child list); a row's child is appended only when present.
pub fn fold_rows<E, I>(rows: I) -> Vec<E>
where
    E: Nested,
    I: IntoIterator<Item = (E, Option<E::Child>)>,
{
    let mut collection = EntityCollection::new();

    for (entity, child) in rows {
        let stored = collection.get_or_insert(entity);
        if let Some(child) = child {
            stored.push_child(child);
        }
    }

    collection.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        tags: Vec<&'static str>,
    }

    impl Item {
        fn bare(id: &'static str) -> Self {
            Self { id, tags: Vec::new() }
        }
    }

    impl Nested for Item {
        type Key = &'static str;
        type Child = &'static str;

        fn key(&self) -> Self::Key {
            self.id
        }

        fn push_child(&mut self, child: Self::Child) {
            self.tags.push(child);
        }
    }

    #[test]
    fn test_fold_groups_children_in_first_seen_order() {
        let rows = vec![
            (Item::bare("A"), Some("tag1")),
            (Item::bare("A"), Some("tag2")),
            (Item::bare("B"), None),
        ];

        let folded = fold_rows(rows);

        assert_eq!(
            folded,
            vec![
                Item { id: "A", tags: vec!["tag1", "tag2"] },
                Item { id: "B", tags: vec![] },
            ]
        );
    }

    #[test]
    fn test_interleaved_rows_keep_first_position() {
        let rows = vec![
            (Item::bare("B"), Some("x")),
            (Item::bare("A"), None),
            (Item::bare("B"), Some("y")),
        ];

        let folded = fold_rows(rows);

        assert_eq!(folded[0].id, "B");
        assert_eq!(folded[0].tags, vec!["x", "y"]);
        assert_eq!(folded[1].id, "A");
        assert!(folded[1].tags.is_empty());
    }

    #[test]
    fn test_collection_mutation_is_visible_without_reinsert() {
        let mut collection = EntityCollection::new();
        collection.get_or_insert(Item::bare("A"));

        if let Some(item) = collection.get_mut(&"A") {
            item.push_child("late");
        }

        assert!(collection.contains(&"A"));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.all()[0].tags, vec!["late"]);
    }

    #[test]
    fn test_empty_input() {
        let folded: Vec<Item> = fold_rows(Vec::new());
        assert!(folded.is_empty());
    }
}
