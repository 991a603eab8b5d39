//! Entity specifications: how one logical entity maps onto tables.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::column::ColumnSpec;
use super::error::{SpecError, SpecResult};
use super::interval::Granularity;
use super::mappings::Mappings;
use super::value::ValueType;

/// The kind of domain object an entity decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Constant,
    Event,
    PrimitiveParameter,
}

/// How time columns are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionFormat {
    /// Date-time columns.
    #[default]
    Timestamp,
    /// Plain integer positions.
    Numeric,
}

/// Where a row's proposition id comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropositionIdSource {
    /// Every row has the entity's single proposition id.
    Fixed,
    /// The column holds the proposition id itself.
    Column(ColumnSpec),
    /// The column holds codes translated in SQL by a CASE expression.
    CaseMapped {
        column: ColumnSpec,
        mappings: Mappings,
    },
    /// The column holds codes translated while decoding.
    CodeTable {
        column: ColumnSpec,
        mappings: Mappings,
    },
}

impl PropositionIdSource {
    /// The column read for the proposition id, if any.
    pub fn column(&self) -> Option<&ColumnSpec> {
        match self {
            PropositionIdSource::Fixed => None,
            PropositionIdSource::Column(c) => Some(c),
            PropositionIdSource::CaseMapped { column, .. }
            | PropositionIdSource::CodeTable { column, .. } => Some(column),
        }
    }

    pub fn mappings(&self) -> Option<&Mappings> {
        match self {
            PropositionIdSource::CaseMapped { mappings, .. }
            | PropositionIdSource::CodeTable { mappings, .. } => Some(mappings),
            _ => None,
        }
    }
}

/// A property read from a column, optionally through a code mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertySpec {
    pub name: String,
    pub column: ColumnSpec,
    pub value_type: ValueType,
    pub mappings: Option<Mappings>,
}

impl PropertySpec {
    pub fn new(name: &str, column: ColumnSpec, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            column,
            value_type,
            mappings: None,
        }
    }

    pub fn with_mappings(mut self, mappings: Mappings) -> Self {
        self.mappings = Some(mappings);
        self
    }
}

/// A reference from this entity to rows of another entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceSpec {
    pub name: String,
    /// Name of the referenced entity spec.
    pub entity: String,
    /// The referenced entity's unique-id columns, reached from this entity.
    pub unique_ids: Vec<ColumnSpec>,
}

impl ReferenceSpec {
    pub fn new(name: &str, entity: &str, unique_ids: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            unique_ids,
        }
    }
}

/// A validated entity specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpec {
    name: String,
    description: String,
    kind: EntityKind,
    prop_ids: Vec<String>,
    base: ColumnSpec,
    unique_ids: Vec<ColumnSpec>,
    start: Option<ColumnSpec>,
    finish: Option<ColumnSpec>,
    position_format: PositionFormat,
    granularity: Option<Granularity>,
    prop_id_source: PropositionIdSource,
    value: Option<ColumnSpec>,
    value_type: ValueType,
    properties: Vec<PropertySpec>,
    references: Vec<ReferenceSpec>,
    constraints: Vec<ColumnSpec>,
    key_type: ValueType,
}

impl EntitySpec {
    /// Start building an entity. `base` is the chain to the key id column.
    pub fn builder(name: &str, kind: EntityKind, base: ColumnSpec) -> EntitySpecBuilder {
        EntitySpecBuilder {
            spec: EntitySpec {
                name: name.into(),
                description: String::new(),
                kind,
                prop_ids: Vec::new(),
                base,
                unique_ids: Vec::new(),
                start: None,
                finish: None,
                position_format: PositionFormat::default(),
                granularity: None,
                prop_id_source: PropositionIdSource::Fixed,
                value: None,
                value_type: ValueType::default(),
                properties: Vec::new(),
                references: Vec::new(),
                constraints: Vec::new(),
                key_type: ValueType::Nominal,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn prop_ids(&self) -> &[String] {
        &self.prop_ids
    }

    pub fn base(&self) -> &ColumnSpec {
        &self.base
    }

    pub fn unique_ids(&self) -> &[ColumnSpec] {
        &self.unique_ids
    }

    pub fn start(&self) -> Option<&ColumnSpec> {
        self.start.as_ref()
    }

    pub fn finish(&self) -> Option<&ColumnSpec> {
        self.finish.as_ref()
    }

    pub fn position_format(&self) -> PositionFormat {
        self.position_format
    }

    pub fn granularity(&self) -> Option<Granularity> {
        self.granularity
    }

    pub fn prop_id_source(&self) -> &PropositionIdSource {
        &self.prop_id_source
    }

    pub fn value(&self) -> Option<&ColumnSpec> {
        self.value.as_ref()
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn references(&self) -> &[ReferenceSpec] {
        &self.references
    }

    pub fn constraints(&self) -> &[ColumnSpec] {
        &self.constraints
    }

    pub fn key_type(&self) -> ValueType {
        self.key_type
    }

    /// Every chain the entity reads from, with the role it plays.
    pub fn chains(&self) -> Vec<(&'static str, &ColumnSpec)> {
        let mut chains = vec![("key", &self.base)];
        chains.extend(self.unique_ids.iter().map(|c| ("unique id", c)));
        if let Some(c) = self.prop_id_source.column() {
            chains.push(("proposition id", c));
        }
        chains.extend(self.start.iter().map(|c| ("start", c)));
        chains.extend(self.finish.iter().map(|c| ("finish", c)));
        chains.extend(self.value.iter().map(|c| ("value", c)));
        chains.extend(self.properties.iter().map(|p| ("property", &p.column)));
        for reference in &self.references {
            chains.extend(reference.unique_ids.iter().map(|c| ("reference", c)));
        }
        chains.extend(self.constraints.iter().map(|c| ("constraint", c)));
        chains
    }

    fn validate(&self) -> SpecResult<()> {
        let fail = |reason: String| Err(SpecError::entity(&self.name, reason));

        if self.prop_ids.is_empty() {
            return fail("no proposition ids".into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.prop_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return fail(format!("duplicate proposition id '{}'", dup));
        }
        if self.unique_ids.is_empty() {
            return fail("no unique id columns".into());
        }

        match &self.prop_id_source {
            PropositionIdSource::Fixed if self.prop_ids.len() != 1 => {
                return fail("a fixed proposition id needs exactly one proposition id".into())
            }
            PropositionIdSource::CaseMapped { mappings, .. }
            | PropositionIdSource::CodeTable { mappings, .. } => {
                if let Some(target) = mappings
                    .targets()
                    .into_iter()
                    .find(|t| !self.prop_ids.iter().any(|id| id == t))
                {
                    return fail(format!(
                        "mapping '{}' targets unknown proposition id '{}'",
                        mappings.resource(),
                        target
                    ));
                }
            }
            _ => {}
        }

        match self.kind {
            EntityKind::Constant if self.start.is_some() || self.finish.is_some() => {
                return fail("constants have no time columns".into())
            }
            EntityKind::Event if self.start.is_none() => {
                return fail("events need a start time column".into())
            }
            EntityKind::PrimitiveParameter if self.start.is_none() || self.value.is_none() => {
                return fail("primitive parameters need a start time column and a value column".into())
            }
            _ => {}
        }

        let root = &self.base;
        for (role, chain) in self.chains() {
            if !chain.same_table(root) {
                return fail(format!(
                    "{} chain starts at {} instead of {}",
                    role,
                    chain.qualified_table(),
                    root.qualified_table()
                ));
            }
            if role != "constraint" && chain.last().column().is_none() {
                return fail(format!("{} chain names no column", role));
            }
        }

        let mut names = HashSet::new();
        if let Some(p) = self.properties.iter().find(|p| !names.insert(p.name.as_str())) {
            return fail(format!("duplicate property '{}'", p.name));
        }
        let mut names = HashSet::new();
        if let Some(r) = self.references.iter().find(|r| !names.insert(r.name.as_str())) {
            return fail(format!("duplicate reference '{}'", r.name));
        }
        if let Some(r) = self.references.iter().find(|r| r.unique_ids.is_empty()) {
            return fail(format!("reference '{}' has no unique id columns", r.name));
        }

        Ok(())
    }
}

/// Builder for [`EntitySpec`]; `build` validates.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until built"]
pub struct EntitySpecBuilder {
    spec: EntitySpec,
}

impl EntitySpecBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn prop_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.spec.prop_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn unique_id(mut self, column: ColumnSpec) -> Self {
        self.spec.unique_ids.push(column);
        self
    }

    pub fn start(mut self, column: ColumnSpec) -> Self {
        self.spec.start = Some(column);
        self
    }

    pub fn finish(mut self, column: ColumnSpec) -> Self {
        self.spec.finish = Some(column);
        self
    }

    pub fn position_format(mut self, format: PositionFormat) -> Self {
        self.spec.position_format = format;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.spec.granularity = Some(granularity);
        self
    }

    pub fn prop_id_source(mut self, source: PropositionIdSource) -> Self {
        self.spec.prop_id_source = source;
        self
    }

    pub fn value(mut self, column: ColumnSpec, value_type: ValueType) -> Self {
        self.spec.value = Some(column);
        self.spec.value_type = value_type;
        self
    }

    pub fn property(mut self, property: PropertySpec) -> Self {
        self.spec.properties.push(property);
        self
    }

    pub fn reference(mut self, reference: ReferenceSpec) -> Self {
        self.spec.references.push(reference);
        self
    }

    pub fn constraint(mut self, column: ColumnSpec) -> Self {
        self.spec.constraints.push(column);
        self
    }

    pub fn key_type(mut self, key_type: ValueType) -> Self {
        self.spec.key_type = key_type;
        self
    }

    pub fn build(self) -> SpecResult<EntitySpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}
