/// Tag (variable) storage.
///
/// Storage is told the evaluation level on every call rather than holding a
/// reference back into the evaluator.

use rustc_hash::FxHashMap;

use crate::core::selector::Selector;

/// The expanded values of a tag. Reads re-sample through the selector.
#[derive(Debug, Clone)]
pub struct TagMapping {
    pub candidates: Vec<String>,
    pub selector: Selector,
}

pub trait TagStorage {
    fn store(&mut self, level: usize, name: &str, mapping: TagMapping);
    fn get(&self, level: usize, name: &str) -> Option<&TagMapping>;
    fn remove_all(&mut self);

    /// Evaluation has dropped back to `level`; forget anything stored above it.
    fn leave_level(&mut self, _level: usize) {}
}

/// Flat storage. Level is ignored.
#[derive(Debug, Default)]
pub struct UnilevelTagStorage {
    tags: FxHashMap<String, TagMapping>,
}

impl UnilevelTagStorage {
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl TagStorage for UnilevelTagStorage {
    fn store(&mut self, _level: usize, name: &str, mapping: TagMapping) {
        self.tags.insert(name.to_string(), mapping);
    }

    fn get(&self, _level: usize, name: &str) -> Option<&TagMapping> {
        self.tags.get(name)
    }

    fn remove_all(&mut self) {
        self.tags.clear();
    }
}

/// One flat map per evaluation level.
///
/// Reads search from the given level down to 0. Leaving a level drops every
/// tag stored above it, so a finished sub-rule never shadows its caller.
#[derive(Debug, Default)]
pub struct HierarchicalTagStorage {
    levels: Vec<UnilevelTagStorage>,
}

impl TagStorage for HierarchicalTagStorage {
    fn store(&mut self, level: usize, name: &str, mapping: TagMapping) {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, UnilevelTagStorage::default);
        }
        self.levels[level].store(level, name, mapping);
    }

    fn get(&self, level: usize, name: &str) -> Option<&TagMapping> {
        let top = level.min(self.levels.len().checked_sub(1)?);
        self.levels[..=top]
            .iter()
            .rev()
            .find_map(|tags| tags.get(level, name))
    }

    fn remove_all(&mut self) {
        self.levels.clear();
    }

    fn leave_level(&mut self, level: usize) {
        self.levels.truncate(level + 1);
    }
}
