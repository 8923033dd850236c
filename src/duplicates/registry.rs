//! Shared index of file records keyed by base name.
//!
//! Walker tasks only ever append through [`Registry::record`]. The whole
//! index sits behind one mutex; the critical section is a hash lookup and a
//! `Vec::push`, which is small next to the file I/O that precedes it.
//!
//! The read-only [`FileIndex`] is obtained by consuming the registry, so it
//! cannot exist while any walker still borrows it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common_path;
use super::groups::DuplicateGroup;
use crate::scanner::{Classification, MediaMetadata};

/// One physical file sharing a base name with others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub path: String,
    pub size: u64,
}

impl Occurrence {
    #[must_use]
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Accumulated record for one base name.
///
/// Seeded from the first sighting; later sightings only append occurrences
/// and may raise `size_mismatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub classification: Classification,
    #[serde(default)]
    pub metadata: MediaMetadata,
    pub size_mismatch: bool,
    /// Never empty. Discovery order, which is not deterministic.
    pub occurrences: Vec<Occurrence>,
}

impl FileRecord {
    fn seed(sighting: Sighting) -> Self {
        Self {
            size: sighting.occurrence.size,
            name: sighting.base_name,
            modified: sighting.modified,
            classification: sighting.classification,
            metadata: sighting.metadata,
            size_mismatch: false,
            occurrences: vec![sighting.occurrence],
        }
    }

    /// Whether more than one path carries this base name.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.occurrences.len() > 1
    }
}

/// One file event submitted by a walker task.
#[derive(Debug, Clone)]
pub struct Sighting {
    pub base_name: String,
    pub occurrence: Occurrence,
    pub modified: DateTime<Utc>,
    pub classification: Classification,
    pub metadata: MediaMetadata,
}

/// What [`Registry::record`] did with a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// A new record was created for the base name.
    pub created: bool,
    /// The sighting's size differs from the record's stored size.
    pub size_mismatch: bool,
}

/// Mutex-guarded index from base name to [`FileRecord`].
#[derive(Debug, Default)]
pub struct Registry {
    records: Mutex<HashMap<String, FileRecord>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sighting.
    ///
    /// Paths are not deduplicated here; the walker visits each path once.
    pub fn record(&self, sighting: Sighting) -> RecordOutcome {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        match records.get_mut(&sighting.base_name) {
            Some(record) => {
                let mismatch = record.size != sighting.occurrence.size;
                if mismatch {
                    log::debug!(
                        "Size mismatch for {}: {} vs {} ({})",
                        record.name,
                        record.size,
                        sighting.occurrence.size,
                        sighting.occurrence.path
                    );
                    record.size_mismatch = true;
                }
                record.occurrences.push(sighting.occurrence);
                RecordOutcome {
                    created: false,
                    size_mismatch: mismatch,
                }
            }
            None => {
                records.insert(sighting.base_name.clone(), FileRecord::seed(sighting));
                RecordOutcome {
                    created: true,
                    size_mismatch: false,
                }
            }
        }
    }

    /// Number of distinct base names seen so far. Best effort mid-walk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze the registry into its final read-only form.
    #[must_use]
    pub fn into_index(self) -> FileIndex {
        let records = self
            .records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        FileIndex {
            records: records.into_iter().collect(),
        }
    }
}

/// Final, read-only view of all file records, ordered by base name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIndex {
    records: BTreeMap<String, FileRecord>,
}

impl FileIndex {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.records.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Records with two or more occurrences.
    pub fn duplicates(&self) -> impl Iterator<Item = &FileRecord> {
        self.iter().filter(|r| r.is_duplicate())
    }

    /// Every duplicate set annotated with its path analysis.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.duplicates()
            .map(|record| DuplicateGroup::new(record, common_path::resolve(&record.occurrences)))
            .collect()
    }

    /// Records by modification time, oldest first; ties by name.
    #[must_use]
    pub fn sorted_by_date(&self) -> Vec<&FileRecord> {
        let mut records: Vec<_> = self.iter().collect();
        records.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        records
    }

    /// Records by size, largest first; ties by name.
    #[must_use]
    pub fn sorted_by_size(&self) -> Vec<&FileRecord> {
        let mut records: Vec<_> = self.iter().collect();
        records.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
        records
    }
}

impl FromIterator<FileRecord> for FileIndex {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }
}
