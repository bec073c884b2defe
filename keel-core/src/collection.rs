use crate::Entity;

/// Ordered sequence of entities of one type, as returned by the finders.
#[derive(Debug, Default, Clone)]
pub struct Collection {
    entities: Vec<Entity>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }
    /// Wrap entities that were just read from the database.
    pub fn persisted(entities: Vec<Entity>) -> Self {
        let mut collection = Self { entities };
        collection.set_persisted(true);
        collection
    }
    /// Mark every entity as persisted or transient.
    pub fn set_persisted(&mut self, persisted: bool) {
        for entity in &mut self.entities {
            entity.set_persisted(persisted);
        }
    }
    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }
    pub fn len(&self) -> usize {
        self.entities.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }
}

impl From<Vec<Entity>> for Collection {
    fn from(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl FromIterator<Entity> for Collection {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl Extend<Entity> for Collection {
    fn extend<T: IntoIterator<Item = Entity>>(&mut self, iter: T) {
        self.entities.extend(iter);
    }
}

impl IntoIterator for Collection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

impl<'a> IntoIterator for &'a mut Collection {
    type Item = &'a mut Entity;
    type IntoIter = std::slice::IterMut<'a, Entity>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter_mut()
    }
}
