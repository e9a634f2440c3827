//! Result rows as explicit attribute maps.

use serde::de::DeserializeOwned;

use crate::{
    error::{QueryError, Result},
    value::SqlValue,
};

/// One result row: column names mapped to values, in select order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Raw value of `column`.
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value of `column` converted into `T`.
    pub fn get<T: DeserializeOwned>(&self, column: &str) -> Result<T> {
        let value = self.value(column).ok_or_else(|| {
            QueryError::Hydration {
                model: std::any::type_name::<T>().to_string(),
                reason: format!("column `{column}` is not in the row"),
            }
        })?;

        serde_json::from_value(value.to_json()).map_err(|err| {
            QueryError::Hydration {
                model: std::any::type_name::<T>().to_string(),
                reason: format!("column `{column}`: {err}"),
            }
        })
    }

    /// Sets `column`, replacing an existing value in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.value(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The row as a JSON object, for deserializing whole records.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}
