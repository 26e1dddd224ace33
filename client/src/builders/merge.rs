//! Merge group editor.
//!
//! Each group draws from the dataset's full column list and keeps the
//! columns it selected in selection order. The separator is shared: picking
//! one for a group pins it on that group and also becomes the default for
//! every group that has not picked its own.
//!
//! Incomplete groups (no columns or a blank name) are dropped silently by
//! [`MergeGroupBuilder::collect`]; only an empty result is an error.

use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{DatasetHandle, GroupId, MergeGroup, Slot};

/// Separator offered before the user picks one.
pub const DEFAULT_SEPARATOR: &str = " ";

// =============================================================================
// Separator presets
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeparatorChoice {
    Space,
    Comma,
    Semicolon,
    Dash,
    Underscore,
    Pipe,
    /// Concatenate without anything in between.
    Nothing,
    Custom(String),
}

impl SeparatorChoice {
    pub const PRESETS: [SeparatorChoice; 7] = [
        SeparatorChoice::Space,
        SeparatorChoice::Comma,
        SeparatorChoice::Semicolon,
        SeparatorChoice::Dash,
        SeparatorChoice::Underscore,
        SeparatorChoice::Pipe,
        SeparatorChoice::Nothing,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SeparatorChoice::Space => " ",
            SeparatorChoice::Comma => ", ",
            SeparatorChoice::Semicolon => "; ",
            SeparatorChoice::Dash => " - ",
            SeparatorChoice::Underscore => "_",
            SeparatorChoice::Pipe => " | ",
            SeparatorChoice::Nothing => "",
            SeparatorChoice::Custom(s) => s,
        }
    }

    /// Preset matching `separator`, or `Custom`.
    pub fn from_separator(separator: &str) -> Self {
        Self::PRESETS
            .iter()
            .find(|p| p.as_str() == separator)
            .cloned()
            .unwrap_or_else(|| SeparatorChoice::Custom(separator.to_string()))
    }
}

impl fmt::Display for SeparatorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&separator_label(self.as_str()))
    }
}

/// Human label for a separator: `Space` for a single space, `None` for the
/// empty string, the quoted text otherwise.
pub fn separator_label(separator: &str) -> String {
    match separator {
        " " => "Space".to_string(),
        "" => "None".to_string(),
        other => format!("\"{}\"", other),
    }
}

// =============================================================================
// Group drafts
// =============================================================================

/// A merge group as it is being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroupDraft {
    id: GroupId,
    available: Vec<String>,
    selected: Vec<String>,
    new_column_name: String,
    /// `None` follows the builder's shared separator.
    separator: Option<String>,
}

impl MergeGroupDraft {
    fn new(id: GroupId, dataset: &DatasetHandle) -> Self {
        Self {
            id,
            available: dataset.columns.clone(),
            selected: Vec::new(),
            new_column_name: String::new(),
            separator: None,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn available_columns(&self) -> &[String] {
        &self.available
    }

    /// Selected columns in selection order.
    pub fn selected_columns(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selected.iter().any(|c| c == column)
    }

    pub fn new_column_name(&self) -> &str {
        &self.new_column_name
    }

    pub fn pinned_separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        !self.selected.is_empty() && !self.new_column_name.trim().is_empty()
    }

    fn ensure_available(&self, column: &str) -> ValidationResult<()> {
        if self.available.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(ValidationError::UnknownColumn {
                slot: Slot::Merge,
                column: column.to_string(),
            })
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroupBuilder {
    groups: Vec<MergeGroupDraft>,
    current_separator: String,
    next_id: u64,
}

impl Default for MergeGroupBuilder {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            current_separator: DEFAULT_SEPARATOR.to_string(),
            next_id: 1,
        }
    }
}

impl MergeGroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[MergeGroupDraft] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&MergeGroupDraft> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn current_separator(&self) -> &str {
        &self.current_separator
    }

    /// Separator `id` would merge with right now.
    pub fn effective_separator(&self, id: GroupId) -> Option<&str> {
        self.group(id)
            .map(|g| g.separator.as_deref().unwrap_or(&self.current_separator))
    }

    /// Drop every group and start over with one empty group for `dataset`.
    /// The shared separator is kept.
    pub fn reset_for(&mut self, dataset: &DatasetHandle) -> GroupId {
        self.groups.clear();
        self.add_group(dataset)
    }

    pub fn add_group(&mut self, dataset: &DatasetHandle) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.groups.push(MergeGroupDraft::new(id, dataset));
        id
    }

    /// Remove a group. The last remaining group cannot be removed.
    pub fn remove_group(&mut self, id: GroupId) -> ValidationResult<()> {
        let index = self.index_of(id)?;
        if self.groups.len() <= 1 {
            return Err(ValidationError::LastMergeGroup);
        }
        self.groups.remove(index);
        Ok(())
    }

    /// Select `column` if it is not selected yet, otherwise deselect it.
    /// Returns whether the column is selected afterwards.
    pub fn toggle_column(&mut self, id: GroupId, column: &str) -> ValidationResult<bool> {
        let group = self.group_mut(id)?;
        group.ensure_available(column)?;
        if let Some(pos) = group.selected.iter().position(|c| c == column) {
            group.selected.remove(pos);
            Ok(false)
        } else {
            group.selected.push(column.to_string());
            Ok(true)
        }
    }

    /// Append `column` to the selection (no-op if already selected).
    pub fn select_column(&mut self, id: GroupId, column: &str) -> ValidationResult<()> {
        let group = self.group_mut(id)?;
        group.ensure_available(column)?;
        if !group.is_selected(column) {
            group.selected.push(column.to_string());
        }
        Ok(())
    }

    pub fn deselect_column(&mut self, id: GroupId, column: &str) -> ValidationResult<()> {
        let group = self.group_mut(id)?;
        group.selected.retain(|c| c != column);
        Ok(())
    }

    pub fn set_new_column_name(&mut self, id: GroupId, name: &str) -> ValidationResult<()> {
        self.group_mut(id)?.new_column_name = name.to_string();
        Ok(())
    }

    /// Pin `choice` on group `id` and make it the shared default.
    pub fn choose_separator(&mut self, id: GroupId, choice: &SeparatorChoice) -> ValidationResult<()> {
        let separator = choice.as_str().to_string();
        self.group_mut(id)?.separator = Some(separator.clone());
        self.current_separator = separator;
        Ok(())
    }

    /// Change the shared default without pinning it on any group.
    pub fn set_default_separator(&mut self, choice: &SeparatorChoice) {
        self.current_separator = choice.as_str().to_string();
    }

    /// Complete groups in editor order; incomplete ones are skipped.
    pub fn collect(&self) -> Vec<MergeGroup> {
        self.groups
            .iter()
            .filter(|g| g.is_complete())
            .map(|g| MergeGroup {
                source_columns: g.selected.clone(),
                new_column_name: g.new_column_name.trim().to_string(),
                separator: g
                    .separator
                    .clone()
                    .unwrap_or_else(|| self.current_separator.clone()),
            })
            .collect()
    }

    /// Like [`collect`](Self::collect), failing when nothing is complete.
    pub fn build(&self) -> ValidationResult<Vec<MergeGroup>> {
        let groups = self.collect();
        if groups.is_empty() {
            return Err(ValidationError::NoCompleteMergeGroup);
        }
        Ok(groups)
    }

    fn index_of(&self, id: GroupId) -> ValidationResult<usize> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(ValidationError::UnknownMergeGroup(id))
    }

    fn group_mut(&mut self, id: GroupId) -> ValidationResult<&mut MergeGroupDraft> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(ValidationError::UnknownMergeGroup(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::dataset;

    fn people() -> DatasetHandle {
        dataset(Slot::Merge, &["id", "first", "last", "city"])
    }

    #[test]
    fn test_reset_creates_single_group() {
        let mut builder = MergeGroupBuilder::new();
        assert!(builder.groups().is_empty());
        let id = builder.reset_for(&people());
        assert_eq!(builder.groups().len(), 1);
        assert_eq!(builder.group(id).unwrap().available_columns().len(), 4);
    }

    #[test]
    fn test_cannot_remove_last_group() {
        let mut builder = MergeGroupBuilder::new();
        let first = builder.reset_for(&people());
        assert_eq!(builder.remove_group(first), Err(ValidationError::LastMergeGroup));

        let second = builder.add_group(&people());
        builder.remove_group(first).unwrap();
        assert_eq!(builder.groups()[0].id(), second);
        assert_eq!(
            builder.remove_group(first),
            Err(ValidationError::UnknownMergeGroup(first))
        );
    }

    #[test]
    fn test_toggle_keeps_selection_order() {
        let mut builder = MergeGroupBuilder::new();
        let id = builder.reset_for(&people());
        assert!(builder.toggle_column(id, "last").unwrap());
        assert!(builder.toggle_column(id, "first").unwrap());
        assert!(builder.toggle_column(id, "city").unwrap());
        assert!(!builder.toggle_column(id, "last").unwrap());
        assert_eq!(builder.group(id).unwrap().selected_columns(), &["first", "city"]);

        assert!(builder.toggle_column(id, "zip").is_err());
    }

    #[test]
    fn test_incomplete_groups_filtered() {
        let mut builder = MergeGroupBuilder::new();
        let a = builder.reset_for(&people());
        let b = builder.add_group(&people());
        let c = builder.add_group(&people());

        builder.select_column(a, "first").unwrap();
        builder.select_column(a, "last").unwrap();
        builder.set_new_column_name(a, "full_name").unwrap();

        builder.select_column(b, "city").unwrap();
        builder.set_new_column_name(b, "   ").unwrap();

        builder.set_new_column_name(c, "empty").unwrap();

        let groups = builder.build().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].new_column_name, "full_name");
        assert_eq!(groups[0].separator, " ");
    }

    #[test]
    fn test_no_complete_group_is_error() {
        let mut builder = MergeGroupBuilder::new();
        let id = builder.reset_for(&people());
        builder.select_column(id, "first").unwrap();
        assert_eq!(builder.build(), Err(ValidationError::NoCompleteMergeGroup));
    }

    #[test]
    fn test_separator_pins_group_and_updates_default() {
        let mut builder = MergeGroupBuilder::new();
        let a = builder.reset_for(&people());
        let b = builder.add_group(&people());
        builder.choose_separator(a, &SeparatorChoice::Dash).unwrap();
        assert_eq!(builder.current_separator(), " - ");
        assert_eq!(builder.effective_separator(b), Some(" - "));

        builder.choose_separator(b, &SeparatorChoice::Nothing).unwrap();
        assert_eq!(builder.effective_separator(a), Some(" - "));
        assert_eq!(builder.effective_separator(b), Some(""));
    }

    #[test]
    fn test_separator_labels() {
        assert_eq!(separator_label(" "), "Space");
        assert_eq!(separator_label(""), "None");
        assert_eq!(separator_label(", "), "\", \"");
        assert_eq!(
            SeparatorChoice::from_separator("_"),
            SeparatorChoice::Underscore
        );
        assert_eq!(
            SeparatorChoice::from_separator("::"),
            SeparatorChoice::Custom("::".into())
        );
    }
}
