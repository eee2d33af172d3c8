//! Interned names referenced by index from types, members and instances.

use std::collections::HashMap;

use crate::error::{FormatError, Result};

/// Insertion ordered name table
///
/// Writing a name returns the index of its first occurrence, reading checks every index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    items: Vec<String>,
    indices: HashMap<String, i64>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table holds no names
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Names in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|s| s.as_str())
    }

    /// Get the name stored at `index`
    pub fn get(&self, index: i64) -> Result<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .map(|s| s.as_str())
            .ok_or_else(|| FormatError::NameIndexOutOfRange(index).into())
    }

    /// Intern `text` and return its index
    pub fn put(&mut self, text: &str) -> i64 {
        if let Some(&index) = self.indices.get(text) {
            return index;
        }

        let index = self.items.len() as i64;
        self.items.push(text.to_owned());
        self.indices.insert(text.to_owned(), index);
        index
    }
}

/// Builds a table from names as stored on disk, keeping every position.
impl FromIterator<String> for StringTable {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let items = iter.into_iter().collect::<Vec<_>>();
        let mut indices = HashMap::with_capacity(items.len());
        for (i, name) in items.iter().enumerate() {
            indices.entry(name.clone()).or_insert(i as i64);
        }
        StringTable { items, indices }
    }
}
