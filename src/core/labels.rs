//! The semantic class set.
//!
//! Built once from configuration at startup and shared read-only for the
//! lifetime of the process. Class ids are the indices into the configured
//! label table.

use crate::config::LabelEntry;
use crate::error::{Error, Result};

/// Bidirectional id ↔ name and id ↔ display-color mapping for the fixed
/// set of valid semantic classes.
#[derive(Clone, Debug)]
pub struct LabelSet {
    names: Vec<String>,
    colors: Vec<[u8; 3]>,
}

impl LabelSet {
    /// Build the label set from the configured table.
    ///
    /// Fails on an empty table or duplicate names; both would make the
    /// classifier output ambiguous.
    pub fn from_entries(entries: &[LabelEntry]) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Config("label table is empty".to_string()));
        }
        let mut names = Vec::with_capacity(entries.len());
        let mut colors = Vec::with_capacity(entries.len());
        for entry in entries {
            if names.contains(&entry.name) {
                return Err(Error::Config(format!("duplicate label name: {}", entry.name)));
            }
            names.push(entry.name.clone());
            colors.push(entry.color);
        }
        Ok(Self { names, colors })
    }

    /// Number of valid classes (C)
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// The set is never empty after construction
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for an id
    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(|s| s.as_str())
    }

    /// Class id for a name
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Display color for an id
    pub fn color(&self, id: usize) -> Option<[u8; 3]> {
        self.colors.get(id).copied()
    }

    /// All class names, index-aligned to class ids
    pub fn names(&self) -> Vec<String> {
        self.names.clone()
    }
}
