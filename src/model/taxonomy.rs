//! Class taxonomy: an ordered id -> name table.
//!
//! Ids are the zero-based ordinals of non-blank lines in the source listing
//! and are the only class identifiers ever persisted; names stay in memory.

/// Ordered mapping from class id to class name.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    names: Vec<String>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a class listing: one name per line, blank lines ignored,
    /// id = ordinal among non-blank lines.
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Look up the id for a class name.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate (id, name) pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.as_str()))
    }
}
