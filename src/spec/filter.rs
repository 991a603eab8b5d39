//! Query filters.
//!
//! A request carries a list of filters that are ANDed together. Each filter
//! names the proposition ids it applies to; an entity ignores filters that do
//! not mention any of its ids.

use serde::{Deserialize, Serialize};

use super::error::{SpecError, SpecResult};
use super::interval::{Granularity, Interval};
use super::value::Value;

/// Comparison operators usable in property filters and column constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    In,
    NotIn,
}

impl Comparator {
    /// Whether the comparator takes a list of values.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Comparator::In | Comparator::NotIn)
    }

    /// Whether the comparator excludes its values.
    pub fn is_negated(self) -> bool {
        matches!(self, Comparator::NotEqualTo | Comparator::NotIn)
    }

    /// Whether the comparator is an equality test (possibly negated, possibly listed).
    pub fn is_membership(self) -> bool {
        matches!(
            self,
            Comparator::EqualTo | Comparator::NotEqualTo | Comparator::In | Comparator::NotIn
        )
    }
}

/// Which end of an entity's interval a position bound constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Start,
    Finish,
}

/// One end of a position filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    pub position: i64,
    pub granularity: Option<Granularity>,
    pub side: Side,
}

impl Bound {
    pub fn new(position: i64, granularity: Option<Granularity>, side: Side) -> Self {
        Self {
            position,
            granularity,
            side,
        }
    }
}

/// Restricts results to a time window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionFilter {
    prop_ids: Vec<String>,
    start: Option<Bound>,
    finish: Option<Bound>,
}

impl PositionFilter {
    /// Build a position filter; either bound may be open.
    pub fn new(
        prop_ids: Vec<String>,
        start: Option<Bound>,
        finish: Option<Bound>,
    ) -> SpecResult<Self> {
        check_prop_ids(&prop_ids)?;
        if let (Some(s), Some(f)) = (&start, &finish) {
            if s.position > f.position {
                return Err(SpecError::InvalidFilter(format!(
                    "position filter start {} is after finish {}",
                    s.position, f.position
                )));
            }
        }
        Ok(Self {
            prop_ids,
            start,
            finish,
        })
    }

    pub fn start(&self) -> Option<&Bound> {
        self.start.as_ref()
    }

    pub fn finish(&self) -> Option<&Bound> {
        self.finish.as_ref()
    }

    /// Expanded bounds of this filter's window.
    pub fn interval(&self) -> SpecResult<Interval> {
        Interval::new(
            self.start.map(|b| b.position),
            self.start.and_then(|b| b.granularity),
            self.finish.map(|b| b.position),
            self.finish.and_then(|b| b.granularity),
        )
    }
}

/// Restricts results by the value of one property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyValueFilter {
    prop_ids: Vec<String>,
    property: String,
    comparator: Comparator,
    values: Vec<Value>,
}

impl PropertyValueFilter {
    pub fn new(
        prop_ids: Vec<String>,
        property: impl Into<String>,
        comparator: Comparator,
        values: Vec<Value>,
    ) -> SpecResult<Self> {
        let property = property.into();
        check_prop_ids(&prop_ids)?;
        if values.is_empty() {
            return Err(SpecError::InvalidFilter(format!(
                "filter on '{}' has no values",
                property
            )));
        }
        if values.len() > 1 && !comparator.is_multi_valued() {
            return Err(SpecError::InvalidFilter(format!(
                "filter on '{}' has {} values but {:?} takes one",
                property,
                values.len(),
                comparator
            )));
        }
        if values.iter().any(Value::is_list) {
            return Err(SpecError::InvalidFilter(format!(
                "filter on '{}' has a list-valued value",
                property
            )));
        }
        Ok(Self {
            prop_ids,
            property,
            comparator,
            values,
        })
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A request filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Position(PositionFilter),
    PropertyValue(PropertyValueFilter),
}

impl Filter {
    /// Proposition ids this filter applies to.
    pub fn prop_ids(&self) -> &[String] {
        match self {
            Filter::Position(f) => &f.prop_ids,
            Filter::PropertyValue(f) => &f.prop_ids,
        }
    }

    /// Whether the filter mentions any of the given proposition ids.
    pub fn applies_to(&self, prop_ids: &[String]) -> bool {
        self.prop_ids().iter().any(|id| prop_ids.contains(id))
    }
}

impl From<PositionFilter> for Filter {
    fn from(f: PositionFilter) -> Self {
        Filter::Position(f)
    }
}

impl From<PropertyValueFilter> for Filter {
    fn from(f: PropertyValueFilter) -> Self {
        Filter::PropertyValue(f)
    }
}

fn check_prop_ids(prop_ids: &[String]) -> SpecResult<()> {
    if prop_ids.is_empty() {
        return Err(SpecError::InvalidFilter(
            "filter applies to no proposition ids".into(),
        ));
    }
    Ok(())
}
