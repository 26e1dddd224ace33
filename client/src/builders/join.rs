//! Join mapping editor.
//!
//! The builder always holds at least one pair editor. Incomplete editors are
//! allowed while editing; [`JoinMappingBuilder::save`] rejects them all at
//! once so the user sees every incomplete pair.

use super::checked_choice;
use crate::error::{ValidationError, ValidationResult};
use crate::models::{DatasetHandle, JoinMapping};

/// One row of the mapping editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPairEditor {
    left: Option<String>,
    right: Option<String>,
}

impl JoinPairEditor {
    pub fn left(&self) -> Option<&str> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&str> {
        self.right.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMappingBuilder {
    editors: Vec<JoinPairEditor>,
}

impl Default for JoinMappingBuilder {
    fn default() -> Self {
        Self {
            editors: vec![JoinPairEditor::default()],
        }
    }
}

impl JoinMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editors(&self) -> &[JoinPairEditor] {
        &self.editors
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Append an empty editor and return its index.
    pub fn add_pair(&mut self) -> usize {
        self.editors.push(JoinPairEditor::default());
        self.editors.len() - 1
    }

    /// Remove an editor. The last remaining editor cannot be removed.
    pub fn remove_pair(&mut self, index: usize) -> ValidationResult<()> {
        if index >= self.editors.len() {
            return Err(ValidationError::UnknownJoinPair(index));
        }
        if self.editors.len() == 1 {
            return Err(ValidationError::LastJoinPair);
        }
        self.editors.remove(index);
        Ok(())
    }

    /// Set the left column of editor `index`; empty clears it.
    pub fn set_left(
        &mut self,
        index: usize,
        dataset: &DatasetHandle,
        column: &str,
    ) -> ValidationResult<()> {
        let value = checked_choice(dataset, column)?;
        self.editor_mut(index)?.left = value;
        Ok(())
    }

    pub fn set_right(
        &mut self,
        index: usize,
        dataset: &DatasetHandle,
        column: &str,
    ) -> ValidationResult<()> {
        let value = checked_choice(dataset, column)?;
        self.editor_mut(index)?.right = value;
        Ok(())
    }

    /// Back to a single empty editor.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replace the editors with one complete editor per suggested pair.
    /// An empty list resets to a single empty editor.
    pub fn apply_suggestions(&mut self, pairs: &[(String, String)]) {
        if pairs.is_empty() {
            self.reset();
            return;
        }
        self.editors = pairs
            .iter()
            .map(|(l, r)| JoinPairEditor {
                left: Some(l.clone()),
                right: Some(r.clone()),
            })
            .collect();
    }

    /// Produce the mapping, or list every incomplete editor (1-based).
    pub fn save(&self) -> ValidationResult<JoinMapping> {
        let incomplete: Vec<usize> = self
            .editors
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_complete())
            .map(|(i, _)| i + 1)
            .collect();
        if !incomplete.is_empty() {
            return Err(ValidationError::IncompleteJoinPairs { incomplete });
        }

        let pairs = self
            .editors
            .iter()
            .filter_map(|e| Some((e.left.clone()?, e.right.clone()?)))
            .collect();
        JoinMapping::new(pairs)
    }

    fn editor_mut(&mut self, index: usize) -> ValidationResult<&mut JoinPairEditor> {
        self.editors
            .get_mut(index)
            .ok_or(ValidationError::UnknownJoinPair(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::dataset;
    use crate::models::Slot;

    #[test]
    fn test_starts_with_one_empty_pair() {
        let builder = JoinMappingBuilder::new();
        assert_eq!(builder.len(), 1);
        assert!(!builder.editors()[0].is_complete());
    }

    #[test]
    fn test_cannot_remove_last_pair() {
        let mut builder = JoinMappingBuilder::new();
        assert_eq!(builder.remove_pair(0), Err(ValidationError::LastJoinPair));
        assert_eq!(builder.len(), 1);

        builder.add_pair();
        builder.remove_pair(1).unwrap();
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.remove_pair(5), Err(ValidationError::UnknownJoinPair(5)));
    }

    #[test]
    fn test_save_reports_all_incomplete_pairs() {
        let left = dataset(Slot::JoinLeft, &["id", "name"]);
        let right = dataset(Slot::JoinRight, &["id", "label"]);
        let mut builder = JoinMappingBuilder::new();
        builder.set_left(0, &left, "id").unwrap();
        builder.set_right(0, &right, "id").unwrap();
        let second = builder.add_pair();
        builder.set_left(second, &left, "name").unwrap();
        builder.add_pair();

        assert_eq!(
            builder.save().unwrap_err(),
            ValidationError::IncompleteJoinPairs {
                incomplete: vec![2, 3]
            }
        );
    }

    #[test]
    fn test_save_preserves_order() {
        let left = dataset(Slot::JoinLeft, &["id", "name"]);
        let right = dataset(Slot::JoinRight, &["uid", "label"]);
        let mut builder = JoinMappingBuilder::new();
        builder.set_left(0, &left, "name").unwrap();
        builder.set_right(0, &right, "label").unwrap();
        let i = builder.add_pair();
        builder.set_left(i, &left, "id").unwrap();
        builder.set_right(i, &right, "uid").unwrap();

        let mapping = builder.save().unwrap();
        assert_eq!(
            mapping.pairs(),
            &[
                ("name".to_string(), "label".to_string()),
                ("id".to_string(), "uid".to_string())
            ]
        );
    }

    #[test]
    fn test_set_unknown_column_leaves_editor_unchanged() {
        let left = dataset(Slot::JoinLeft, &["id"]);
        let mut builder = JoinMappingBuilder::new();
        builder.set_left(0, &left, "id").unwrap();
        assert!(builder.set_left(0, &left, "missing").is_err());
        assert_eq!(builder.editors()[0].left(), Some("id"));

        builder.set_left(0, &left, "").unwrap();
        assert_eq!(builder.editors()[0].left(), None);
    }

    #[test]
    fn test_apply_suggestions() {
        let mut builder = JoinMappingBuilder::new();
        builder.apply_suggestions(&[("id".into(), "id".into()), ("email".into(), "email".into())]);
        assert_eq!(builder.len(), 2);
        assert!(builder.save().is_ok());

        builder.apply_suggestions(&[]);
        assert_eq!(builder, JoinMappingBuilder::new());
    }
}
