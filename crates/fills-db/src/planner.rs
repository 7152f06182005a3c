use crate::predicate::{validate_identifier, Condition, QueryError};

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl PlannedQuery {
    /// A statement with no placeholders.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Compose `SELECT <columns|*> FROM <table> [WHERE <condition>]`.
///
/// Pure; identical inputs always produce identical output.
pub fn plan(
    table: &str,
    columns: Option<&[&str]>,
    condition: Option<&Condition>,
) -> Result<PlannedQuery, QueryError> {
    let table = validate_identifier(table)?;

    let projection = match columns {
        Some(cols) if !cols.is_empty() => cols
            .iter()
            .map(|c| validate_identifier(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {projection} FROM {table}");
    let params = match condition {
        Some(cond) => {
            sql.push_str(" WHERE ");
            sql.push_str(&cond.sql());
            cond.params()
        }
        None => Vec::new(),
    };

    Ok(PlannedQuery { sql, params })
}

/// `SELECT DISTINCT <column> FROM <table>`
pub fn plan_distinct(table: &str, column: &str) -> Result<PlannedQuery, QueryError> {
    let table = validate_identifier(table)?;
    let column = validate_identifier(column)?;
    Ok(PlannedQuery::raw(format!("SELECT DISTINCT {column} FROM {table}")))
}
