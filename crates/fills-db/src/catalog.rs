use std::collections::BTreeMap;

use fills_schemas::{Cell, CATALOG_COLUMNS};

use crate::{distinct_values, FillStore, FillsError};

/// Distinct values of the categorical columns, so callers can discover
/// legal filter inputs. Does not validate filter specs.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    columns: Vec<String>,
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::new(CATALOG_COLUMNS.iter().copied())
    }
}

impl FilterCatalog {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// column -> distinct values, in the order the store returns them.
    /// NULLs are skipped; numbers are rendered as text.
    pub async fn options(
        &self,
        store: &FillStore,
    ) -> Result<BTreeMap<String, Vec<String>>, FillsError> {
        let mut out = BTreeMap::new();
        for column in &self.columns {
            let values = distinct_values(store, column)
                .await?
                .into_iter()
                .filter(|c| !c.is_null())
                .map(|c| match c {
                    Cell::Text(s) => s,
                    other => other.to_string(),
                })
                .collect();
            out.insert(column.clone(), values);
        }
        Ok(out)
    }
}
