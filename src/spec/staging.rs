//! Staging specifications: swap a table for a pre-materialized copy.

use super::error::{SpecError, SpecResult};

/// A `(schema, table)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableSpec {
    pub schema: Option<String>,
    pub table: String,
}

impl TableSpec {
    pub fn new(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(String::from),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(s) => write!(f, "{}.{}", s, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// A column of the replaced table as it appears in the staging table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagedColumn {
    pub column: String,
    /// Name of the column in the staging table, when it differs.
    pub substitute: Option<String>,
    /// Entity specs the substitute applies to; empty means all of the
    /// staging spec's entities.
    pub entity_specs: Vec<String>,
}

impl StagedColumn {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.into(),
            substitute: None,
            entity_specs: Vec::new(),
        }
    }

    pub fn with_substitute(mut self, substitute: &str, entity_specs: &[&str]) -> Self {
        self.substitute = Some(substitute.into());
        self.entity_specs = entity_specs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The name to use for `entity`.
    pub fn name_for(&self, entity: &str) -> &str {
        match &self.substitute {
            Some(sub) if self.entity_specs.is_empty() || self.entity_specs.iter().any(|e| e == entity) => sub,
            _ => &self.column,
        }
    }
}

/// A validated staging specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagingSpec {
    replaced: TableSpec,
    staging_area: TableSpec,
    columns: Vec<StagedColumn>,
    entity_specs: Vec<String>,
    unique_column: String,
    index_tablespace: Option<String>,
}

impl StagingSpec {
    pub fn new(
        replaced: TableSpec,
        staging_area: TableSpec,
        columns: Vec<StagedColumn>,
        entity_specs: Vec<String>,
        unique_column: &str,
        index_tablespace: Option<&str>,
    ) -> SpecResult<Self> {
        let fail = |reason: String| Err(SpecError::staging(replaced.to_string(), reason));

        if entity_specs.is_empty() {
            return fail("no entity specs".into());
        }
        if replaced == staging_area {
            return fail("staging area is the replaced table".into());
        }
        for column in &columns {
            if let Some(outside) = column
                .entity_specs
                .iter()
                .find(|e| !entity_specs.contains(e))
            {
                return fail(format!(
                    "column '{}' is scoped to entity spec '{}' outside the staging spec",
                    column.column, outside
                ));
            }
        }

        Ok(Self {
            replaced,
            staging_area,
            columns,
            entity_specs,
            unique_column: unique_column.into(),
            index_tablespace: index_tablespace.map(String::from),
        })
    }

    pub fn replaced(&self) -> &TableSpec {
        &self.replaced
    }

    pub fn staging_area(&self) -> &TableSpec {
        &self.staging_area
    }

    pub fn columns(&self) -> &[StagedColumn] {
        &self.columns
    }

    pub fn entity_specs(&self) -> &[String] {
        &self.entity_specs
    }

    pub fn unique_column(&self) -> &str {
        &self.unique_column
    }

    pub fn index_tablespace(&self) -> Option<&str> {
        self.index_tablespace.as_deref()
    }

    pub fn applies_to(&self, entity: &str) -> bool {
        self.entity_specs.iter().any(|e| e == entity)
    }

    /// Column name in the staging table for `entity`.
    pub fn column_name<'a>(&'a self, column: &'a str, entity: &str) -> &'a str {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.name_for(entity))
            .unwrap_or(column)
    }
}

/// Reject staging specs that both replace one table for one entity spec.
pub fn check_overlap(staging: &[StagingSpec]) -> SpecResult<()> {
    for (i, a) in staging.iter().enumerate() {
        for b in &staging[i + 1..] {
            if a.replaced != b.replaced {
                continue;
            }
            if let Some(shared) = a.entity_specs.iter().find(|e| b.applies_to(e)) {
                return Err(SpecError::InvalidBackend(format!(
                    "two staging specs replace '{}' for entity spec '{}'",
                    a.replaced, shared
                )));
            }
        }
    }
    Ok(())
}
