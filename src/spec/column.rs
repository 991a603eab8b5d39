//! Column chains: where a value lives and how to reach it.
//!
//! A [`ColumnSpec`] names a table and optionally a column in it. When the
//! value lives in another table the column spec carries a [`JoinSpec`] leading to the
//! next link. The last link of a chain names the column that is read.

use super::filter::Comparator;
use super::value::Value;
use crate::sql::JoinType;

/// Transformation applied to a column before it is read or compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnOp {
    Upper,
}

/// Restriction on the rows of a link's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    Compare {
        comparator: Comparator,
        values: Vec<Value>,
    },
    Like(String),
}

/// One link of a column chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSpec {
    schema: Option<String>,
    table: String,
    column: Option<String>,
    op: Option<ColumnOp>,
    constraint: Option<Constraint>,
    join: Option<Box<JoinSpec>>,
}

impl ColumnSpec {
    /// A link into `table` that names no column yet.
    pub fn table(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(String::from),
            table: table.into(),
            column: None,
            op: None,
            constraint: None,
            join: None,
        }
    }

    /// A link reading `column` from `table`.
    pub fn new(schema: Option<&str>, table: &str, column: &str) -> Self {
        Self::table(schema, table).with_column(column)
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_op(mut self, op: ColumnOp) -> Self {
        self.op = Some(op);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.join = Some(Box::new(join));
        self
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn op(&self) -> Option<ColumnOp> {
        self.op
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn join(&self) -> Option<&JoinSpec> {
        self.join.as_deref()
    }

    /// Same schema and table.
    pub fn same_table(&self, other: &ColumnSpec) -> bool {
        self.schema == other.schema && self.table == other.table
    }

    /// Same schema and table as the given pair.
    pub fn is_table(&self, schema: Option<&str>, table: &str) -> bool {
        self.schema.as_deref() == schema && self.table == table
    }

    /// Links of the chain starting here, in order.
    pub fn links(&self) -> Vec<&ColumnSpec> {
        let mut links = vec![self];
        let mut current = self;
        while let Some(join) = current.join() {
            current = join.next();
            links.push(current);
        }
        links
    }

    /// The link whose column is read.
    pub fn last(&self) -> &ColumnSpec {
        let mut current = self;
        while let Some(join) = current.join() {
            current = join.next();
        }
        current
    }

    /// This chain with its last link replaced by `tail`.
    pub fn graft(&self, tail: ColumnSpec) -> ColumnSpec {
        let mut head = self.clone();
        head.join = match &self.join {
            Some(join) => {
                let mut join = (**join).clone();
                join.next = join.next.graft(tail);
                Some(Box::new(join))
            }
            None => return tail,
        };
        head
    }

    /// `schema.table` for messages.
    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.table),
            None => self.table.clone(),
        }
    }

    // Used by the staging pass, which rebuilds links with replaced names.
    pub(crate) fn set_table(&mut self, schema: Option<String>, table: String) {
        self.schema = schema;
        self.table = table;
    }

    pub(crate) fn set_column(&mut self, column: Option<String>) {
        self.column = column;
    }

    pub(crate) fn take_join(&mut self) -> Option<JoinSpec> {
        self.join.take().map(|j| *j)
    }
}

/// A directed join from one link to the next.
///
/// The near side of the join is the [`ColumnSpec`] that owns it; code that
/// needs it walks the chain rather than following a stored back reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinSpec {
    from_key: String,
    to_key: String,
    join_type: JoinType,
    next: ColumnSpec,
}

impl JoinSpec {
    pub fn new(from_key: &str, to_key: &str, join_type: JoinType, next: ColumnSpec) -> Self {
        Self {
            from_key: from_key.into(),
            to_key: to_key.into(),
            join_type,
            next,
        }
    }

    pub fn inner(from_key: &str, to_key: &str, next: ColumnSpec) -> Self {
        Self::new(from_key, to_key, JoinType::Inner, next)
    }

    pub fn left_outer(from_key: &str, to_key: &str, next: ColumnSpec) -> Self {
        Self::new(from_key, to_key, JoinType::LeftOuter, next)
    }

    pub fn from_key(&self) -> &str {
        &self.from_key
    }

    pub fn to_key(&self) -> &str {
        &self.to_key
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn next(&self) -> &ColumnSpec {
        &self.next
    }

    /// Whether two joins are the same join: equal keys and join type, and
    /// the same tables on both ends. `prev` and `other_prev` are the links
    /// owning each join.
    pub fn is_same_join(
        &self,
        prev: &ColumnSpec,
        other: &JoinSpec,
        other_prev: &ColumnSpec,
    ) -> bool {
        self.from_key == other.from_key
            && self.to_key == other.to_key
            && self.join_type == other.join_type
            && prev.same_table(other_prev)
            && self.next.same_table(&other.next)
    }

    pub(crate) fn into_parts(self) -> (String, String, JoinType, ColumnSpec) {
        (self.from_key, self.to_key, self.join_type, self.next)
    }
}
