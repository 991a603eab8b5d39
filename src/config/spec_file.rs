//! Backend specification files.
//!
//! Entity and staging specs are written in TOML and converted through the
//! validating constructors of [`crate::spec`]. Column chains are nested
//! inline tables:
//!
//! ```toml
//! [[entity]]
//! name = "Diagnosis"
//! kind = "event"
//! prop_ids = ["Diabetes", "Hypertension"]
//! base = { table = "patient", column = "id", join = { from = "id", to = "patient_id", next = { table = "dx", column = "patient_id" } } }
//! unique_ids = [{ table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "dx_id" } } }]
//! start = { table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "dx_date" } } }
//! prop_id = { source = "case", mappings = "icd9.txt", column = { table = "patient", join = { from = "id", to = "patient_id", next = { table = "dx", column = "code" } } } }
//!
//! [[staging]]
//! replaced = { table = "dx" }
//! staging_area = { table = "dx_stage" }
//! entities = ["Diagnosis"]
//! unique_column = "row_id"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::spec::{
    BackendSpec, ColumnOp, ColumnSpec, Comparator, Constraint, EntityKind, EntitySpec,
    Granularity, JoinSpec, MappingLoader, PositionFormat, PropertySpec, PropositionIdSource,
    ReferenceSpec, SpecError, StagedColumn, StagingSpec, TableSpec, Value, ValueType,
};
use crate::sql::JoinType;

/// Error type for backend specification files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read spec file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse spec file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Invalid spec file: {0}")]
    Invalid(String),
}

/// Load and validate a backend specification file.
pub fn load_backend_spec(
    path: impl AsRef<Path>,
    loader: &dyn MappingLoader,
) -> Result<BackendSpec, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_backend_spec(&text, loader)
}

/// Parse and validate backend specification text.
pub fn parse_backend_spec(text: &str, loader: &dyn MappingLoader) -> Result<BackendSpec, ConfigError> {
    let file: SpecFile = toml::from_str(text)?;
    let entities = file
        .entity
        .into_iter()
        .map(|e| e.into_spec(loader))
        .collect::<Result<Vec<_>, _>>()?;
    let staging = file
        .staging
        .into_iter()
        .map(StagingFile::into_spec)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BackendSpec::new(entities, staging)?)
}

// =============================================================================
// File Structure
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpecFile {
    #[serde(default)]
    entity: Vec<EntityFile>,
    #[serde(default)]
    staging: Vec<StagingFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityFile {
    name: String,
    #[serde(default)]
    description: String,
    kind: EntityKind,
    prop_ids: Vec<String>,
    base: ColumnFile,
    unique_ids: Vec<ColumnFile>,
    #[serde(default)]
    start: Option<ColumnFile>,
    #[serde(default)]
    finish: Option<ColumnFile>,
    #[serde(default)]
    position_format: PositionFormat,
    #[serde(default)]
    granularity: Option<Granularity>,
    #[serde(default)]
    prop_id: Option<PropIdFile>,
    #[serde(default)]
    value: Option<ColumnFile>,
    #[serde(default)]
    value_type: ValueType,
    #[serde(default)]
    key_type: ValueType,
    #[serde(default)]
    property: Vec<PropertyFile>,
    #[serde(default)]
    reference: Vec<ReferenceFile>,
    #[serde(default)]
    constraints: Vec<ColumnFile>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case", deny_unknown_fields)]
enum PropIdFile {
    Fixed,
    Column { column: ColumnFile },
    Case { column: ColumnFile, mappings: String },
    CodeTable { column: ColumnFile, mappings: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyFile {
    name: String,
    column: ColumnFile,
    #[serde(default, rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    mappings: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferenceFile {
    name: String,
    entity: String,
    unique_ids: Vec<ColumnFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnFile {
    #[serde(default)]
    schema: Option<String>,
    table: String,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    upper: bool,
    #[serde(default)]
    like: Option<String>,
    #[serde(default)]
    constraint: Option<ConstraintFile>,
    #[serde(default)]
    join: Option<Box<JoinFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstraintFile {
    comparator: Comparator,
    values: Vec<FileValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JoinFile {
    from: String,
    to: String,
    #[serde(default, rename = "type")]
    join_type: JoinTypeFile,
    next: ColumnFile,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum JoinTypeFile {
    #[default]
    Inner,
    LeftOuter,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    schema: Option<String>,
    table: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StagingFile {
    replaced: TableFile,
    staging_area: TableFile,
    entities: Vec<String>,
    unique_column: String,
    #[serde(default)]
    index_tablespace: Option<String>,
    #[serde(default)]
    column: Vec<StagedColumnFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StagedColumnFile {
    name: String,
    #[serde(default)]
    substitute: Option<String>,
    #[serde(default)]
    entity_specs: Vec<String>,
}

// =============================================================================
// Conversion
// =============================================================================

impl EntityFile {
    fn into_spec(self, loader: &dyn MappingLoader) -> Result<EntitySpec, ConfigError> {
        let mut builder = EntitySpec::builder(&self.name, self.kind, self.base.into_spec()?)
            .description(&self.description)
            .prop_ids(self.prop_ids)
            .position_format(self.position_format)
            .key_type(self.key_type);

        for unique_id in self.unique_ids {
            builder = builder.unique_id(unique_id.into_spec()?);
        }
        if let Some(start) = self.start {
            builder = builder.start(start.into_spec()?);
        }
        if let Some(finish) = self.finish {
            builder = builder.finish(finish.into_spec()?);
        }
        if let Some(granularity) = self.granularity {
            builder = builder.granularity(granularity);
        }
        if let Some(value) = self.value {
            builder = builder.value(value.into_spec()?, self.value_type);
        }

        let source = match self.prop_id.unwrap_or(PropIdFile::Fixed) {
            PropIdFile::Fixed => PropositionIdSource::Fixed,
            PropIdFile::Column { column } => PropositionIdSource::Column(column.into_spec()?),
            PropIdFile::Case { column, mappings } => PropositionIdSource::CaseMapped {
                column: column.into_spec()?,
                mappings: loader.load(&mappings)?,
            },
            PropIdFile::CodeTable { column, mappings } => PropositionIdSource::CodeTable {
                column: column.into_spec()?,
                mappings: loader.load(&mappings)?,
            },
        };
        builder = builder.prop_id_source(source);

        for property in self.property {
            let mut spec = PropertySpec::new(
                &property.name,
                property.column.into_spec()?,
                property.value_type,
            );
            if let Some(resource) = &property.mappings {
                spec = spec.with_mappings(loader.load(resource)?);
            }
            builder = builder.property(spec);
        }

        for reference in self.reference {
            let unique_ids = reference
                .unique_ids
                .into_iter()
                .map(ColumnFile::into_spec)
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.reference(ReferenceSpec::new(
                &reference.name,
                &reference.entity,
                unique_ids,
            ));
        }

        for constraint in self.constraints {
            builder = builder.constraint(constraint.into_spec()?);
        }

        Ok(builder.build()?)
    }
}

impl ColumnFile {
    fn into_spec(self) -> Result<ColumnSpec, ConfigError> {
        let mut spec = ColumnSpec::table(self.schema.as_deref(), &self.table);
        if let Some(column) = &self.column {
            spec = spec.with_column(column);
        }
        if self.upper {
            spec = spec.with_op(ColumnOp::Upper);
        }

        let constraint = match (self.like, self.constraint) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(format!(
                    "column on '{}' has both 'like' and 'constraint'",
                    self.table
                )))
            }
            (Some(pattern), None) => Some(Constraint::Like(pattern)),
            (None, Some(c)) => Some(Constraint::Compare {
                comparator: c.comparator,
                values: c.values.into_iter().map(FileValue::into_value).collect(),
            }),
            (None, None) => None,
        };
        if let Some(constraint) = constraint {
            spec = spec.with_constraint(constraint);
        }

        if let Some(join) = self.join {
            let join = *join;
            let join_type = match join.join_type {
                JoinTypeFile::Inner => JoinType::Inner,
                JoinTypeFile::LeftOuter => JoinType::LeftOuter,
            };
            spec = spec.with_join(JoinSpec::new(
                &join.from,
                &join.to,
                join_type,
                join.next.into_spec()?,
            ));
        }
        Ok(spec)
    }
}

impl FileValue {
    fn into_value(self) -> Value {
        match self {
            FileValue::Boolean(b) => Value::Boolean(b),
            FileValue::Integer(i) => Value::Number(i as f64),
            FileValue::Float(f) => Value::Number(f),
            FileValue::Text(s) => Value::Nominal(s),
        }
    }
}

impl StagingFile {
    fn into_spec(self) -> Result<StagingSpec, ConfigError> {
        let columns = self
            .column
            .into_iter()
            .map(|c| {
                let column = StagedColumn::new(&c.name);
                match &c.substitute {
                    Some(sub) => {
                        let scope: Vec<&str> = c.entity_specs.iter().map(String::as_str).collect();
                        column.with_substitute(sub, &scope)
                    }
                    None => column,
                }
            })
            .collect();

        Ok(StagingSpec::new(
            TableSpec::new(self.replaced.schema.as_deref(), &self.replaced.table),
            TableSpec::new(self.staging_area.schema.as_deref(), &self.staging_area.table),
            columns,
            self.entities,
            &self.unique_column,
            self.index_tablespace.as_deref(),
        )?)
    }
}
