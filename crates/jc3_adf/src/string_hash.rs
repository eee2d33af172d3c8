//! The set of strings a container can recover from their hashes.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{FormatError, Result};
use crate::hash::{format_hash_literal, hash_jenkins, parse_hash_literal};
use crate::types::StringHashInfo;

/// String hash entries keyed by hash
///
/// Iteration is always in ascending hash order, which is the order the table is written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringHashes {
    entries: BTreeMap<u32, StringHashInfo>,
}

impl StringHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending hash order
    pub fn iter(&self) -> impl Iterator<Item = &StringHashInfo> {
        self.entries.values()
    }

    /// Look up the entry for `hash`
    pub fn get(&self, hash: u32) -> Option<&StringHashInfo> {
        self.entries.get(&hash)
    }

    /// Add an entry, keeping the first one when the same text is registered twice.
    pub fn insert(&mut self, info: StringHashInfo) -> Result<()> {
        if let Some(existing) = self.entries.get(&info.value_hash) {
            if existing.value != info.value {
                return Err(FormatError::StringHashConflict {
                    hash: info.value_hash,
                    existing: existing.value.clone(),
                    value: info.value,
                }
                .into());
            }
            return Ok(());
        }

        self.entries.insert(info.value_hash, info);
        Ok(())
    }

    /// Turn text into the hash that should be stored for it.
    ///
    /// The empty string is `0`, `#AABBCCDD` is taken literally and anything else is hashed and
    /// registered so it can be resolved again later.
    pub fn compute(&mut self, value: &str) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }

        if let Some(literal) = parse_hash_literal(value) {
            return literal;
        }

        let hash = hash_jenkins(value);
        if hash != 0 {
            trace!(hash, value, "computed string hash");
            self.insert(StringHashInfo::new(value))?;
        }
        Ok(hash)
    }

    /// Turn a stored hash back into text, falling back to the `#AABBCCDD` literal form.
    pub fn resolve(&self, hash: u32) -> String {
        if hash == 0 {
            return String::new();
        }

        match self.entries.get(&hash) {
            Some(info) => info.value.clone(),
            None => format_hash_literal(hash),
        }
    }
}

impl<'a> IntoIterator for &'a StringHashes {
    type Item = &'a StringHashInfo;
    type IntoIter = std::collections::btree_map::Values<'a, u32, StringHashInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
