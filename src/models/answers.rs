use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

/// Selected answer values for one question
pub type Selection = BTreeSet<String>;

/// Per-question selections, one entry for every question in quiz order
///
/// The length is fixed at construction. Skipped questions hold an empty set,
/// so positional lookups (e.g. the tie-breaker questions) never miss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AnswerMatrix(Vec<Selection>);

impl AnswerMatrix {
    /// Creates a matrix of `question_count` empty selections
    pub fn empty(question_count: usize) -> Self {
        Self(vec![Selection::new(); question_count])
    }

    /// Builds a matrix from client-supplied answers, checking the length
    pub fn from_entries(entries: Vec<Vec<String>>, expected_len: usize) -> AppResult<Self> {
        if entries.len() != expected_len {
            return Err(AppError::InvalidInput(format!(
                "Expected answers for {} questions, got {}",
                expected_len,
                entries.len()
            )));
        }

        Ok(Self(
            entries
                .into_iter()
                .map(|values| values.into_iter().collect())
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Selection> {
        self.0.get(index)
    }

    /// True when every question was skipped or left unanswered
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(Selection::is_empty)
    }

    /// Comma-joined values for one question, `None` if empty or out of range
    pub fn joined(&self, index: usize) -> Option<String> {
        self.0
            .get(index)
            .filter(|selection| !selection.is_empty())
            .map(|selection| selection.iter().cloned().collect::<Vec<_>>().join(", "))
    }

    /// All selected values in question order
    pub fn flattened(&self) -> Vec<&str> {
        self.0
            .iter()
            .flat_map(|selection| selection.iter().map(String::as_str))
            .filter(|value| !value.is_empty())
            .collect()
    }

    pub(crate) fn store(&mut self, index: usize, selection: Selection) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = selection;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_matrix_has_every_entry() {
        let matrix = AnswerMatrix::empty(15);
        assert_eq!(matrix.len(), 15);
        assert!(matrix.is_blank());
        assert!(matrix.get(14).unwrap().is_empty());
        assert!(matrix.get(15).is_none());
    }

    #[test]
    fn test_from_entries_rejects_wrong_length() {
        let result = AnswerMatrix::from_entries(vec![strings(&["a"])], 2);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_from_entries_deduplicates() {
        let matrix =
            AnswerMatrix::from_entries(vec![strings(&["b", "a", "b"]), vec![]], 2).unwrap();
        assert_eq!(matrix.get(0).unwrap().len(), 2);
        assert_eq!(matrix.joined(0).as_deref(), Some("a, b"));
        assert_eq!(matrix.joined(1), None);
        assert_eq!(matrix.joined(9), None);
    }

    #[test]
    fn test_flattened_keeps_question_order() {
        let matrix = AnswerMatrix::from_entries(
            vec![strings(&["z"]), vec![], strings(&["a"])],
            3,
        )
        .unwrap();
        assert_eq!(matrix.flattened(), vec!["z", "a"]);
        assert!(!matrix.is_blank());
    }

    #[test]
    fn test_serializes_as_nested_arrays() {
        let matrix = AnswerMatrix::from_entries(vec![strings(&["x"]), vec![]], 2).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(json, r#"[["x"],[]]"#);
    }
}
