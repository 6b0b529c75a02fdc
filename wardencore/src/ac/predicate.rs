use serde::{Deserialize, Serialize};

use super::{
    resource::AccessControlled,
    value::Value,
};

/// A boolean filter over the objects of one class.
///
/// The same predicate can be evaluated against an object snapshot or
/// rendered to a relational `WHERE` fragment; both give the same answer for
/// every object as long as the snapshot carries the associates referenced
/// by any `In` clause.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Predicate {
    True,
    False,
    Eq {
        column: String,
        value: Value,
    },
    AnyOf {
        column: String,
        values: Vec<Value>,
    },
    IsNull {
        column: String,
    },
    /// `column IN (select id from <filter.table> where <filter.predicate>)`,
    /// where `column` is the foreign key of the named association.
    In {
        column: String,
        association: String,
        filter: Box<IdFilter>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Selects the ids of the rows of `table` satisfying `predicate`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct IdFilter {
    pub table: String,
    pub predicate: Predicate,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn any_of(column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        let values = values.into_iter().collect::<Vec<_>>();
        if values.is_empty() {
            Self::False
        } else {
            Self::AnyOf {
                column: column.into(),
                values,
            }
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    /// Conjunction, folding constants; an empty conjunction is `True`.
    pub fn and(items: impl IntoIterator<Item = Predicate>) -> Self {
        let mut result = Vec::new();
        for item in items {
            match item {
                Self::True => (),
                Self::False => return Self::False,
                item => result.push(item),
            }
        }
        match result.len() {
            0 => Self::True,
            1 => result.remove(0),
            _ => Self::And(result),
        }
    }

    /// Disjunction, folding constants; an empty disjunction is `False`.
    pub fn or(items: impl IntoIterator<Item = Predicate>) -> Self {
        let mut result = Vec::new();
        for item in items {
            match item {
                Self::False => (),
                Self::True => return Self::True,
                item => result.push(item),
            }
        }
        match result.len() {
            0 => Self::False,
            1 => result.remove(0),
            _ => Self::Or(result),
        }
    }

    pub fn evaluate(&self, object: &dyn AccessControlled) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Eq { column, value } => object.attribute(column)
                .map(|v| &v == value)
                .unwrap_or(false),
            Self::AnyOf { column, values } => object.attribute(column)
                .map(|v| values.contains(&v))
                .unwrap_or(false),
            Self::IsNull { column } => object.attribute(column).is_none(),
            Self::In { column, association, filter } => {
                let fk = match object.attribute(column).and_then(|v| v.as_integer()) {
                    Some(fk) => fk,
                    None => return false,
                };
                object.associate(association)
                    .filter(|assoc| assoc.id() == Some(fk))
                    .map(|assoc| filter.predicate.evaluate(assoc))
                    .unwrap_or(false)
            }
            Self::And(items) => items.iter().all(|p| p.evaluate(object)),
            Self::Or(items) => items.iter().any(|p| p.evaluate(object)),
        }
    }
}

impl IdFilter {
    pub fn new(table: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            table: table.into(),
            predicate,
        }
    }
}

mod sql;
pub use sql::SqlFragment;
