//! Compare configuration.

use super::checked_choice;
use crate::error::{ValidationError, ValidationResult};
use crate::models::{CompareConfig, CompareMode, DatasetHandle, Slot};

/// Mode plus optional column per side. Nothing is pre-selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareConfigBuilder {
    mode: CompareMode,
    left_column: Option<String>,
    right_column: Option<String>,
}

impl CompareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    /// Switching modes keeps column choices so toggling back restores them.
    pub fn set_mode(&mut self, mode: CompareMode) {
        self.mode = mode;
    }

    pub fn left_column(&self) -> Option<&str> {
        self.left_column.as_deref()
    }

    pub fn right_column(&self) -> Option<&str> {
        self.right_column.as_deref()
    }

    /// Choose the left column; it must exist in `dataset`. An empty name
    /// clears the choice.
    pub fn select_left(&mut self, dataset: &DatasetHandle, column: &str) -> ValidationResult<()> {
        self.left_column = checked_choice(dataset, column)?;
        Ok(())
    }

    pub fn select_right(&mut self, dataset: &DatasetHandle, column: &str) -> ValidationResult<()> {
        self.right_column = checked_choice(dataset, column)?;
        Ok(())
    }

    /// Forget the column picked for `slot` (after a re-upload).
    pub fn clear_side(&mut self, slot: Slot) {
        match slot {
            Slot::CompareLeft => self.left_column = None,
            Slot::CompareRight => self.right_column = None,
            _ => {}
        }
    }

    /// Validate. Whole-row mode drops any column choices from the output.
    pub fn build(&self) -> ValidationResult<CompareConfig> {
        match self.mode {
            CompareMode::WholeRow => Ok(CompareConfig {
                mode: CompareMode::WholeRow,
                left_column: None,
                right_column: None,
            }),
            CompareMode::SpecificColumns => {
                let left = self
                    .left_column
                    .clone()
                    .ok_or(ValidationError::MissingCompareColumn(Slot::CompareLeft))?;
                let right = self
                    .right_column
                    .clone()
                    .ok_or(ValidationError::MissingCompareColumn(Slot::CompareRight))?;
                Ok(CompareConfig {
                    mode: CompareMode::SpecificColumns,
                    left_column: Some(left),
                    right_column: Some(right),
                })
            }
        }
    }
}
