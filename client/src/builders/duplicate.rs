//! Duplicate detection configuration.
//!
//! Two methods: repeated values inside chosen columns, or fully identical
//! rows. Entering the by-values method fills the column checklist from the
//! dataset. Any method switch or dataset change discards a stored preview
//! and bumps [`DuplicateConfigBuilder::generation`]; a preview computed for
//! an older generation is never stored.

use std::collections::HashSet;

use crate::error::{ValidationError, ValidationResult};
use crate::interpret::DuplicatePreview;
use crate::models::{DatasetHandle, DuplicateConfig, DuplicateMode, Slot};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateConfigBuilder {
    mode: Option<DuplicateMode>,
    /// Columns of the bound dataset.
    columns: Vec<String>,
    /// Populated only while in by-values mode.
    checklist: Vec<String>,
    selected: HashSet<String>,
    preview: Option<DuplicatePreview>,
    /// Bumped on every method switch and dataset change.
    generation: u64,
}

impl DuplicateConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<DuplicateMode> {
        self.mode
    }

    /// Bind to a new dataset: checklist, selection and preview start over.
    pub fn reset_for(&mut self, dataset: &DatasetHandle) {
        self.columns = dataset.columns.clone();
        self.selected.clear();
        self.preview = None;
        self.generation += 1;
        self.checklist = if self.mode == Some(DuplicateMode::ByValues) {
            self.columns.clone()
        } else {
            Vec::new()
        };
    }

    /// Switch method. Entering by-values repopulates the checklist with no
    /// column checked.
    pub fn enter_mode(&mut self, mode: DuplicateMode) {
        self.mode = Some(mode);
        self.preview = None;
        self.generation += 1;
        self.selected.clear();
        self.checklist = match mode {
            DuplicateMode::ByValues => self.columns.clone(),
            DuplicateMode::ByRows => Vec::new(),
        };
    }

    pub fn checklist(&self) -> &[String] {
        &self.checklist
    }

    pub fn set_checked(&mut self, column: &str, checked: bool) -> ValidationResult<()> {
        if self.mode != Some(DuplicateMode::ByValues) {
            return Err(ValidationError::NotInValuesMode);
        }
        if !self.checklist.iter().any(|c| c == column) {
            return Err(ValidationError::UnknownColumn {
                slot: Slot::Duplicate,
                column: column.to_string(),
            });
        }
        if checked {
            self.selected.insert(column.to_string());
        } else {
            self.selected.remove(column);
        }
        Ok(())
    }

    pub fn is_checked(&self, column: &str) -> bool {
        self.selected.contains(column)
    }

    /// Checked columns in checklist order.
    pub fn selected_columns(&self) -> Vec<String> {
        self.checklist
            .iter()
            .filter(|c| self.selected.contains(c.as_str()))
            .cloned()
            .collect()
    }

    /// Last by-values preview, if still valid.
    pub fn preview(&self) -> Option<&DuplicatePreview> {
        self.preview.as_ref()
    }

    /// Configuration generation a preview request is taken against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Keep `preview` only if it was requested in the current generation.
    /// A switch away and back, or a new dataset, makes it stale.
    pub fn store_preview(&mut self, generation: u64, preview: DuplicatePreview) -> bool {
        if generation == self.generation && self.mode == Some(DuplicateMode::ByValues) {
            self.preview = Some(preview);
            true
        } else {
            false
        }
    }

    pub fn build(&self) -> ValidationResult<DuplicateConfig> {
        match self.mode {
            None => Err(ValidationError::NoDuplicateMethod),
            Some(DuplicateMode::ByRows) => Ok(DuplicateConfig::ByRows),
            Some(DuplicateMode::ByValues) => {
                let columns = self.selected_columns();
                if columns.is_empty() {
                    return Err(ValidationError::EmptyDuplicateColumns);
                }
                Ok(DuplicateConfig::ByValues { columns })
            }
        }
    }
}
