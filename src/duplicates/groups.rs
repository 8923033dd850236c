//! Duplicate sets paired with their path analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FileRecord, Occurrence, PathAnalysis};
use crate::scanner::Classification;

/// A base name seen at two or more paths, with its common-path annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub name: String,
    /// Size of the first recorded occurrence.
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub classification: Classification,
    pub size_mismatch: bool,
    pub occurrences: Vec<Occurrence>,
    pub analysis: PathAnalysis,
}

impl DuplicateGroup {
    #[must_use]
    pub fn new(record: &FileRecord, analysis: PathAnalysis) -> Self {
        Self {
            name: record.name.clone(),
            size: record.size,
            modified: record.modified,
            classification: record.classification.clone(),
            size_mismatch: record.size_mismatch,
            occurrences: record.occurrences.clone(),
            analysis,
        }
    }

    /// Number of copies beyond the first.
    #[must_use]
    pub fn extra_copies(&self) -> usize {
        self.occurrences.len().saturating_sub(1)
    }

    /// Bytes held by every occurrence except the largest.
    #[must_use]
    pub fn redundant_bytes(&self) -> u64 {
        let total: u64 = self.occurrences.iter().map(|o| o.size).sum();
        let largest = self.occurrences.iter().map(|o| o.size).max().unwrap_or(0);
        total - largest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sizes: &[u64]) -> FileRecord {
        FileRecord {
            name: "photo.jpg".to_string(),
            size: sizes[0],
            modified: DateTime::<Utc>::default(),
            classification: Classification::unknown(),
            metadata: Default::default(),
            size_mismatch: sizes.windows(2).any(|w| w[0] != w[1]),
            occurrences: sizes
                .iter()
                .enumerate()
                .map(|(i, s)| Occurrence::new(format!("/d{i}/photo.jpg"), *s))
                .collect(),
        }
    }

    #[test]
    fn test_group_copies_record_fields() {
        let group = DuplicateGroup::new(&record(&[10, 30, 20]), PathAnalysis::default());
        assert_eq!(group.name, "photo.jpg");
        assert_eq!(group.size, 10);
        assert!(group.size_mismatch);
        assert_eq!(group.extra_copies(), 2);
        assert_eq!(group.redundant_bytes(), 30);
    }

    #[test]
    fn test_group_serializes_analysis() {
        let analysis = PathAnalysis {
            common_suffix: "photo.jpg".to_string(),
            common_ancestor: "/d".to_string(),
        };
        let group = DuplicateGroup::new(&record(&[5, 5]), analysis);
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["analysis"]["common_suffix"], "photo.jpg");
        assert_eq!(json["size_mismatch"], false);
    }
}
