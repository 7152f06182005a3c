//! Filter predicates rendered as SQL fragments with bound parameters.
//!
//! Values never appear in the emitted text: each one becomes a `?`
//! placeholder and travels in `params()`. Column names cannot be bound, so
//! they are checked against an identifier grammar and the filterable
//! allow-list instead.

use std::fmt;

use fills_schemas::FilterSpec;

/// Columns a caller may filter on.
pub const FILTERABLE_COLUMNS: &[&str] = &["symbol", "exchange", "side"];

/// Conservative per-statement limit on bound values (SQLite's historic
/// SQLITE_MAX_VARIABLE_NUMBER).
pub const MAX_BOUND_VALUES: usize = 999;

/// A filter cannot be rendered into a safe selection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Not a plain `[A-Za-z_][A-Za-z0-9_]*` identifier.
    InvalidIdentifier { ident: String },
    /// A well-formed column that is not filterable.
    UnknownColumn { column: String },
    TooManyValues { count: usize, max: usize },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier { ident } => write!(f, "invalid identifier: {ident:?}"),
            Self::UnknownColumn { column } => write!(
                f,
                "column '{column}' is not filterable (allowed: {})",
                FILTERABLE_COLUMNS.join(", ")
            ),
            Self::TooManyValues { count, max } => {
                write!(f, "filter binds {count} values; at most {max} are supported")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Accept only plain SQL identifiers.
pub fn validate_identifier(ident: &str) -> Result<&str, QueryError> {
    let mut chars = ident.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if ok {
        Ok(ident)
    } else {
        Err(QueryError::InvalidIdentifier {
            ident: ident.to_string(),
        })
    }
}

fn validate_filter_column(column: &str) -> Result<&str, QueryError> {
    validate_identifier(column)?;
    if FILTERABLE_COLUMNS.contains(&column) {
        Ok(column)
    } else {
        Err(QueryError::UnknownColumn {
            column: column.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// Restriction on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = ?`
    Eq { column: String, value: String },
    /// `column IN (?, ?, ...)`
    In { column: String, values: Vec<String> },
}

impl Predicate {
    pub fn sql(&self) -> String {
        match self {
            Predicate::Eq { column, .. } => format!("{column} = ?"),
            Predicate::In { column, values } => {
                let marks = vec!["?"; values.len()].join(", ");
                format!("{column} IN ({marks})")
            }
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            Predicate::Eq { value, .. } => std::slice::from_ref(value),
            Predicate::In { values, .. } => values,
        }
    }
}

/// One value renders as equality, several as membership, none as nothing.
pub fn build(column: &str, values: &[String]) -> Result<Option<Predicate>, QueryError> {
    match values {
        [] => Ok(None),
        [single] => Ok(Some(Predicate::Eq {
            column: validate_filter_column(column)?.to_string(),
            value: single.clone(),
        })),
        many => {
            if many.len() > MAX_BOUND_VALUES {
                return Err(QueryError::TooManyValues {
                    count: many.len(),
                    max: MAX_BOUND_VALUES,
                });
            }
            Ok(Some(Predicate::In {
                column: validate_filter_column(column)?.to_string(),
                values: many.to_vec(),
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Non-empty conjunction of predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    predicates: Vec<Predicate>,
}

impl Condition {
    /// AND-combine; `None` when there is nothing to restrict on.
    pub fn all(predicates: Vec<Predicate>) -> Option<Self> {
        if predicates.is_empty() {
            None
        } else {
            Some(Self { predicates })
        }
    }

    pub fn sql(&self) -> String {
        self.predicates
            .iter()
            .map(Predicate::sql)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> Vec<String> {
        self.predicates
            .iter()
            .flat_map(|p| p.params().iter().cloned())
            .collect()
    }
}

/// Render a whole filter spec. `Ok(None)` means "all rows".
pub fn condition_for(spec: &FilterSpec) -> Result<Option<Condition>, QueryError> {
    let mut predicates = Vec::new();
    let mut bound = 0usize;
    for (column, values) in spec.active() {
        if let Some(p) = build(column, values)? {
            bound += p.params().len();
            predicates.push(p);
        }
    }
    if bound > MAX_BOUND_VALUES {
        return Err(QueryError::TooManyValues {
            count: bound,
            max: MAX_BOUND_VALUES,
        });
    }
    Ok(Condition::all(predicates))
}
