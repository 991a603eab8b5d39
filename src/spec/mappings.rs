//! Code mappings: stored codes translated to proposition ids or property values.
//!
//! A mapping resource is a tab-delimited text file, one `code<TAB>target`
//! pair per line. Blank lines and lines starting with `#` are ignored. The
//! code `*` is the wildcard and matches every code without an entry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{SpecError, SpecResult};

/// The wildcard code.
pub const WILDCARD: &str = "*";

/// An ordered `code -> target` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mappings {
    resource: String,
    entries: Vec<(String, String)>,
}

impl Mappings {
    /// Build from entries in declaration order.
    ///
    /// A code mapped to two different targets is ambiguous and rejected.
    /// Repeating an identical pair is harmless and kept once.
    pub fn new(resource: impl Into<String>, entries: Vec<(String, String)>) -> SpecResult<Self> {
        let resource = resource.into();
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut kept = Vec::with_capacity(entries.len());

        for (code, target) in entries {
            if code.is_empty() || target.is_empty() {
                return Err(SpecError::mappings(&resource, "empty code or target"));
            }
            match seen.get(&code) {
                Some(existing) if *existing == target => continue,
                Some(existing) => {
                    return Err(SpecError::mappings(
                        &resource,
                        format!(
                            "code '{}' maps to both '{}' and '{}'",
                            code, existing, target
                        ),
                    ))
                }
                None => {
                    seen.insert(code.clone(), target.clone());
                    kept.push((code, target));
                }
            }
        }

        Ok(Self {
            resource,
            entries: kept,
        })
    }

    /// Parse the tab-delimited resource format.
    pub fn parse(resource: impl Into<String>, text: &str) -> SpecResult<Self> {
        let resource = resource.into();
        let mut entries = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(code), Some(target), None) => {
                    entries.push((code.trim().to_string(), target.trim().to_string()))
                }
                _ => {
                    return Err(SpecError::mappings(
                        &resource,
                        format!("line {}: expected code<TAB>target", lineno + 1),
                    ))
                }
            }
        }

        Self::new(resource, entries)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Target for a stored code, falling back to the wildcard entry.
    pub fn target(&self, code: &str) -> Option<&str> {
        self.exact(code).or_else(|| self.exact(WILDCARD))
    }

    fn exact(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, t)| t.as_str())
    }

    /// Codes mapping to `target`, in declaration order. Includes `*` when the
    /// wildcard maps there.
    pub fn codes_for(&self, target: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, t)| t == target)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// Distinct targets in declaration order.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for (_, t) in &self.entries {
            if !targets.contains(&t.as_str()) {
                targets.push(t);
            }
        }
        targets
    }

    /// Target of the wildcard entry, if any.
    pub fn wildcard_target(&self) -> Option<&str> {
        self.exact(WILDCARD)
    }
}

/// Resolves mapping resource names to parsed mappings.
pub trait MappingLoader {
    fn load(&self, resource: &str) -> SpecResult<Mappings>;
}

/// Loads mapping resources from files under a directory.
#[derive(Debug, Clone)]
pub struct DirMappingLoader {
    dir: PathBuf,
}

impl DirMappingLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl MappingLoader for DirMappingLoader {
    fn load(&self, resource: &str) -> SpecResult<Mappings> {
        let path = self.dir.join(resource);
        let text = fs::read_to_string(&path).map_err(|e| SpecError::MappingNotFound {
            resource: resource.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        Mappings::parse(resource, &text)
    }
}

/// Mapping resources held in memory, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingLoader {
    resources: HashMap<String, String>,
}

impl InMemoryMappingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, name: &str, text: &str) -> Self {
        self.resources.insert(name.into(), text.into());
        self
    }
}

impl MappingLoader for InMemoryMappingLoader {
    fn load(&self, resource: &str) -> SpecResult<Mappings> {
        let text = self
            .resources
            .get(resource)
            .ok_or_else(|| SpecError::MappingNotFound {
                resource: resource.to_string(),
                reason: "no such resource".into(),
            })?;
        Mappings::parse(resource, text)
    }
}
