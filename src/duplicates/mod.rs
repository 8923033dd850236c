//! Duplicate-candidate aggregation.
//!
//! This module provides functionality for:
//! - The shared base-name registry fed by walker tasks
//! - Common-path inference for each duplicate set
//! - Duplicate group assembly for reports and storage
//! - Scan orchestration and the completion barrier

pub mod common_path;
pub mod finder;
pub mod groups;
pub mod registry;

pub use common_path::PathAnalysis;
pub use finder::{DuplicateFinder, FinderConfig, ScanOutcome, ScanSummary};
pub use groups::DuplicateGroup;
pub use registry::{FileIndex, FileRecord, Occurrence, RecordOutcome, Registry, Sighting};
