//! Decoding of a single result row.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::DecodeError;
use super::proposition::{Constant, Event, PrimitiveParameter, Proposition, PropositionData};
use super::unique_id::UniqueId;
use crate::exec::{Row, SqlValue};
use crate::generate::ResultLayout;
use crate::spec::{
    datetime_to_position, EntityKind, EntitySpec, Mappings, PositionFormat, PropositionIdSource,
    Value, ValueType,
};

static NULL: SqlValue = SqlValue::Null;

/// Turns rows of one generated query into propositions.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    entity: Arc<EntitySpec>,
    layout: ResultLayout,
    requested: Vec<String>,
}

impl RowDecoder {
    pub fn new(entity: Arc<EntitySpec>, layout: ResultLayout, requested: Vec<String>) -> Self {
        Self {
            entity,
            layout,
            requested,
        }
    }

    pub fn entity(&self) -> &EntitySpec {
        &self.entity
    }

    /// Decode row number `n` (1-based, for messages).
    pub fn decode(&self, n: u64, row: &Row) -> Result<Proposition, DecodeError> {
        let layout = &self.layout;
        if row.len() < layout.column_count {
            return Err(DecodeError::MissingColumn {
                row: n,
                expected: layout.column_count,
                actual: row.len(),
            });
        }
        let cell = |i: usize| row.get(i).unwrap_or(&NULL);
        let entity = &*self.entity;

        let key_id = cell(layout.key)
            .to_text()
            .ok_or(DecodeError::NullKeyId { row: n })?;

        let mut db_ids = Vec::with_capacity(layout.unique_ids.len());
        for &column in &layout.unique_ids {
            let id = cell(column)
                .to_text()
                .ok_or(DecodeError::NullUniqueId { row: n, column })?;
            db_ids.push(id);
        }
        let unique_id = UniqueId::new(entity.name(), db_ids);

        let id = self.prop_id(n, row)?;

        let mut properties = BTreeMap::new();
        for (name, column) in &layout.properties {
            let Some(spec) = entity.property(name) else {
                continue;
            };
            let value = decode_value(n, *column, cell(*column), spec.value_type, spec.mappings.as_ref())?;
            if let Some(value) = value {
                properties.insert(name.clone(), value);
            }
        }

        let mut references = BTreeMap::new();
        for ((name, columns), spec) in layout.references.iter().zip(entity.references()) {
            let ids: Option<Vec<String>> = columns.iter().map(|&c| cell(c).to_text()).collect();
            let refs = ids
                .map(|ids| vec![UniqueId::new(spec.entity.as_str(), ids)])
                .unwrap_or_default();
            references.insert(name.clone(), refs);
        }

        let data = PropositionData {
            id,
            unique_id,
            key_id,
            properties,
            references,
        };
        let granularity = entity.granularity();

        Ok(match entity.kind() {
            EntityKind::Constant => Proposition::Constant(Constant { data }),
            EntityKind::Event => {
                let start = self.required_position(n, layout.start, row)?;
                let finish = match layout.finish {
                    Some(column) => self.position(n, column, cell(column))?,
                    None => None,
                };
                Proposition::Event(Event {
                    data,
                    start,
                    finish,
                    granularity,
                })
            }
            EntityKind::PrimitiveParameter => {
                let position = self.required_position(n, layout.start, row)?;
                let value = match layout.value {
                    Some(column) => {
                        decode_value(n, column, cell(column), entity.value_type(), None)?
                    }
                    None => None,
                };
                Proposition::PrimitiveParameter(PrimitiveParameter {
                    data,
                    position,
                    value,
                    granularity,
                })
            }
        })
    }

    fn prop_id(&self, n: u64, row: &Row) -> Result<String, DecodeError> {
        let entity = &*self.entity;
        let source = entity.prop_id_source();
        let Some(column) = self.layout.prop_id else {
            return entity
                .prop_ids()
                .first()
                .cloned()
                .ok_or(DecodeError::NullPropositionId { row: n });
        };
        let text = row
            .get(column)
            .and_then(SqlValue::to_text)
            .ok_or(DecodeError::NullPropositionId { row: n })?;
        let is_requested = |id: &str| self.requested.iter().any(|r| r == id);

        match source {
            PropositionIdSource::Fixed => Ok(text),
            PropositionIdSource::Column(_) if is_requested(&text) => Ok(text),
            PropositionIdSource::Column(_) => Err(DecodeError::UnknownCode { row: n, code: text }),
            // The CASE only produces requested ids; anything else means the
            // projection and the entity spec disagree.
            PropositionIdSource::CaseMapped { .. } if is_requested(&text) => Ok(text),
            PropositionIdSource::CaseMapped { .. } => Err(DecodeError::UnexpectedPropositionId {
                row: n,
                prop_id: text,
            }),
            PropositionIdSource::CodeTable { mappings, .. } => match mappings.target(&text) {
                Some(target) if is_requested(target) => Ok(target.to_string()),
                _ => Err(DecodeError::UnknownCode { row: n, code: text }),
            },
        }
    }

    fn required_position(&self, n: u64, column: Option<usize>, row: &Row) -> Result<i64, DecodeError> {
        let column = column.ok_or(DecodeError::InvalidPosition {
            row: n,
            column: 0,
            value: "no time column".into(),
        })?;
        let value = row.get(column).unwrap_or(&NULL);
        self.position(n, column, value)?
            .ok_or_else(|| DecodeError::InvalidPosition {
                row: n,
                column,
                value: "NULL".into(),
            })
    }

    fn position(&self, n: u64, column: usize, value: &SqlValue) -> Result<Option<i64>, DecodeError> {
        let invalid = || DecodeError::InvalidPosition {
            row: n,
            column,
            value: value.to_string(),
        };
        let position = match (self.entity.position_format(), value) {
            (_, SqlValue::Null) => return Ok(None),
            (_, SqlValue::Timestamp(t)) => datetime_to_position(t),
            (PositionFormat::Numeric, SqlValue::Integer(i)) => *i,
            (PositionFormat::Numeric, SqlValue::Real(r)) if r.fract() == 0.0 => *r as i64,
            (PositionFormat::Numeric, SqlValue::Text(s)) => s.trim().parse().map_err(|_| invalid())?,
            (PositionFormat::Timestamp, SqlValue::Text(s)) => {
                let date = crate::spec::value::parse_datetime(s.trim()).ok_or_else(invalid)?;
                datetime_to_position(&date)
            }
            _ => return Err(invalid()),
        };
        Ok(Some(position))
    }
}

/// Convert a column to a value of `value_type`, translating codes first
/// when `mappings` is given. NULL decodes to no value.
fn decode_value(
    n: u64,
    column: usize,
    value: &SqlValue,
    value_type: ValueType,
    mappings: Option<&Mappings>,
) -> Result<Option<Value>, DecodeError> {
    let invalid = |text: String| DecodeError::InvalidValue {
        row: n,
        column,
        value: text,
        expected: value_type,
    };

    if let Some(mappings) = mappings {
        let Some(code) = value.to_text() else {
            return Ok(None);
        };
        let target = mappings.target(&code).ok_or_else(|| invalid(code.clone()))?;
        return Value::parse(target, value_type)
            .map(Some)
            .ok_or_else(|| invalid(target.to_string()));
    }

    let decoded = match (value_type, value) {
        (_, SqlValue::Null) => return Ok(None),
        (ValueType::Number, SqlValue::Integer(i)) => Value::Number(*i as f64),
        (ValueType::Number, SqlValue::Real(r)) => Value::Number(*r),
        (ValueType::Boolean, SqlValue::Integer(i)) => Value::Boolean(*i != 0),
        (ValueType::Date, SqlValue::Timestamp(t)) => Value::Date(*t),
        (value_type, other) => {
            let text = other.to_text().unwrap_or_default();
            Value::parse(&text, value_type).ok_or_else(|| invalid(text))?
        }
    };
    Ok(Some(decoded))
}
