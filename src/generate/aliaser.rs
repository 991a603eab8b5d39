//! Table alias assignment.
//!
//! The input is the flattened list of chain links that will appear as FROM
//! and JOIN sources. An entry's inbound join is the outbound join of the entry
//! just before it, when that entry has one. An entry reuses the alias of the
//! earliest earlier entry on the same table whose inbound join matches (both
//! absent, or both the same join); otherwise it gets a fresh alias.
//!
//! Aliases are assigned by position, not by [`ColumnSpec`] value: two equal
//! links reached through different joins must not share an alias.

use crate::spec::{ColumnSpec, JoinSpec};

/// Per-query alias assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAliaser {
    indices: Vec<usize>,
}

impl TableAliaser {
    pub fn new(links: &[&ColumnSpec]) -> Self {
        let inbound: Vec<Option<(&ColumnSpec, &JoinSpec)>> = (0..links.len())
            .map(|i| {
                i.checked_sub(1)
                    .and_then(|p| links[p].join().map(|j| (links[p], j)))
            })
            .collect();

        let mut indices: Vec<usize> = Vec::with_capacity(links.len());
        let mut next = 1;

        for (i, link) in links.iter().enumerate() {
            let reused = (0..i).find(|&e| {
                links[e].same_table(link)
                    && match (inbound[e], inbound[i]) {
                        (None, None) => true,
                        (Some((ep, ej)), Some((ip, ij))) => ej.is_same_join(ep, ij, ip),
                        _ => false,
                    }
            });

            match reused {
                Some(e) => indices.push(indices[e]),
                None => {
                    indices.push(next);
                    next += 1;
                }
            }
        }

        Self { indices }
    }

    /// Alias index of the entry at `position`, starting at 1.
    pub fn index(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    /// Alias of the entry at `position`, e.g. `a1`.
    pub fn alias(&self, position: usize) -> Option<String> {
        self.index(position).map(|i| format!("a{}", i))
    }

    /// Whether `position` is the first entry carrying its alias.
    pub fn is_first_use(&self, position: usize) -> bool {
        match self.index(position) {
            Some(idx) => !self.indices[..position].contains(&idx),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of distinct aliases.
    pub fn alias_count(&self) -> usize {
        self.indices.iter().copied().max().unwrap_or(0)
    }
}
