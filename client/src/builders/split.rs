//! Split (unpivot) configuration.
//!
//! A column is either an id column, a value column, or neither. Checking a
//! column on one side unchecks it on the other at selection time, so the two
//! sets can never overlap.

use std::collections::HashSet;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{DatasetHandle, SplitConfig, Slot, DEFAULT_VALUE_COLUMN, DEFAULT_VARIABLE_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSide {
    /// Kept on every produced row.
    Id,
    /// Unpivoted into variable/value pairs.
    Value,
}

impl SplitSide {
    pub fn other(&self) -> SplitSide {
        match self {
            SplitSide::Id => SplitSide::Value,
            SplitSide::Value => SplitSide::Id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitConfigBuilder {
    /// Dataset column order, used to order the output.
    columns: Vec<String>,
    id_columns: HashSet<String>,
    value_columns: HashSet<String>,
    variable_column_name: String,
    value_column_name: String,
}

impl SplitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a new dataset and clear both selections. Output names are
    /// kept.
    pub fn reset_for(&mut self, dataset: &DatasetHandle) {
        self.columns = dataset.columns.clone();
        self.id_columns.clear();
        self.value_columns.clear();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check or uncheck `column` on `side`. Checking removes it from the
    /// other side.
    pub fn set_checked(&mut self, side: SplitSide, column: &str, checked: bool) -> ValidationResult<()> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(ValidationError::UnknownColumn {
                slot: Slot::Split,
                column: column.to_string(),
            });
        }
        if checked {
            self.side_mut(side.other()).remove(column);
            self.side_mut(side).insert(column.to_string());
        } else {
            self.side_mut(side).remove(column);
        }
        Ok(())
    }

    /// Flip `column` on `side`, returning whether it is checked afterwards.
    pub fn toggle(&mut self, side: SplitSide, column: &str) -> ValidationResult<bool> {
        let checked = !self.is_checked(side, column);
        self.set_checked(side, column, checked)?;
        Ok(checked)
    }

    pub fn is_checked(&self, side: SplitSide, column: &str) -> bool {
        match side {
            SplitSide::Id => self.id_columns.contains(column),
            SplitSide::Value => self.value_columns.contains(column),
        }
    }

    /// Checked columns of `side` in dataset order.
    pub fn checked(&self, side: SplitSide) -> Vec<String> {
        let set = match side {
            SplitSide::Id => &self.id_columns,
            SplitSide::Value => &self.value_columns,
        };
        self.columns
            .iter()
            .filter(|c| set.contains(c.as_str()))
            .cloned()
            .collect()
    }

    pub fn set_variable_column_name(&mut self, name: &str) {
        self.variable_column_name = name.to_string();
    }

    pub fn set_value_column_name(&mut self, name: &str) {
        self.value_column_name = name.to_string();
    }

    /// Blank output names fall back to `Variable` / `Value`.
    pub fn build(&self) -> ValidationResult<SplitConfig> {
        let id_columns = self.checked(SplitSide::Id);
        if id_columns.is_empty() {
            return Err(ValidationError::EmptyIdColumns);
        }
        let value_columns = self.checked(SplitSide::Value);
        if value_columns.is_empty() {
            return Err(ValidationError::EmptyValueColumns);
        }
        Ok(SplitConfig {
            id_columns,
            value_columns,
            variable_column_name: name_or(&self.variable_column_name, DEFAULT_VARIABLE_COLUMN),
            value_column_name: name_or(&self.value_column_name, DEFAULT_VALUE_COLUMN),
        })
    }

    fn side_mut(&mut self, side: SplitSide) -> &mut HashSet<String> {
        match side {
            SplitSide::Id => &mut self.id_columns,
            SplitSide::Value => &mut self.value_columns,
        }
    }
}

fn name_or(name: &str, default: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::dataset;

    fn builder() -> SplitConfigBuilder {
        let mut b = SplitConfigBuilder::new();
        b.reset_for(&dataset(Slot::Split, &["id", "name", "q1", "q2", "q3"]));
        b
    }

    #[test]
    fn test_checking_moves_column_between_sides() {
        let mut b = builder();
        b.set_checked(SplitSide::Id, "q1", true).unwrap();
        b.set_checked(SplitSide::Value, "q1", true).unwrap();
        assert!(!b.is_checked(SplitSide::Id, "q1"));
        assert!(b.is_checked(SplitSide::Value, "q1"));
    }

    #[test]
    fn test_sets_never_overlap() {
        let mut b = builder();
        let ops = [
            (SplitSide::Id, "id"),
            (SplitSide::Value, "id"),
            (SplitSide::Id, "name"),
            (SplitSide::Value, "q2"),
            (SplitSide::Id, "q2"),
            (SplitSide::Value, "q2"),
        ];
        for (side, column) in ops {
            b.toggle(side, column).unwrap();
            let ids = b.checked(SplitSide::Id);
            let values = b.checked(SplitSide::Value);
            assert!(ids.iter().all(|c| !values.contains(c)));
        }
    }

    #[test]
    fn test_build_orders_by_dataset_and_defaults_names() {
        let mut b = builder();
        b.set_checked(SplitSide::Value, "q3", true).unwrap();
        b.set_checked(SplitSide::Value, "q1", true).unwrap();
        b.set_checked(SplitSide::Id, "id", true).unwrap();
        b.set_variable_column_name("  ");

        let config = b.build().unwrap();
        assert_eq!(config.id_columns, vec!["id"]);
        assert_eq!(config.value_columns, vec!["q1", "q3"]);
        assert_eq!(config.variable_column_name, "Variable");
        assert_eq!(config.value_column_name, "Value");
    }

    #[test]
    fn test_build_requires_both_sides() {
        let mut b = builder();
        assert_eq!(b.build(), Err(ValidationError::EmptyIdColumns));
        b.set_checked(SplitSide::Id, "id", true).unwrap();
        assert_eq!(b.build(), Err(ValidationError::EmptyValueColumns));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut b = builder();
        assert!(b.set_checked(SplitSide::Id, "q9", true).is_err());
    }

    #[test]
    fn test_reset_clears_selection_keeps_names() {
        let mut b = builder();
        b.set_checked(SplitSide::Id, "id", true).unwrap();
        b.set_value_column_name("Score");
        b.reset_for(&dataset(Slot::Split, &["code", "m1"]));
        assert!(b.checked(SplitSide::Id).is_empty());
        b.set_checked(SplitSide::Id, "code", true).unwrap();
        b.set_checked(SplitSide::Value, "m1", true).unwrap();
        assert_eq!(b.build().unwrap().value_column_name, "Score");
    }
}
