//! Common-path inference for a duplicate set.
//!
//! Given only the path strings of files sharing a base name, work out which
//! trailing segments they share (the *common suffix*) and which deeper
//! directory run they share once the diverging middle is skipped (the
//! *common ancestor*).
//!
//! The analysis counts how often each path component appears across all
//! occurrences, then walks the longest path from the leaf towards the root:
//!
//! 1. The suffix extends while components are at least as frequent as the
//!    leaf itself.
//! 2. Past that point, components are skipped until the frequency climbs
//!    back to the table's maximum; the contiguous run at the maximum is the
//!    ancestor.
//!
//! ```
//! use fastdu::duplicates::{common_path, Occurrence};
//!
//! let set = [
//!     Occurrence::new("/x/y/Drive/foobar/c/Desktop Pictures/.thumbnails/Flower 10.jpg", 9436),
//!     Occurrence::new("/m/n/Drive/foobar/c/Desktop Pictures/Flower 10.jpg", 22387196),
//! ];
//! let analysis = common_path::resolve_with_separator(&set, '/');
//! assert_eq!(analysis.common_suffix, "Flower 10.jpg");
//! assert_eq!(analysis.common_ancestor, "/Drive/foobar/c/Desktop Pictures");
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Occurrence;

/// Suffix and ancestor shared by a duplicate set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAnalysis {
    pub common_suffix: String,
    pub common_ancestor: String,
}

impl PathAnalysis {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.common_suffix.is_empty() && self.common_ancestor.is_empty()
    }
}

/// Analyse `occurrences` using the platform separator.
#[must_use]
pub fn resolve(occurrences: &[Occurrence]) -> PathAnalysis {
    resolve_with_separator(occurrences, std::path::MAIN_SEPARATOR)
}

/// Analyse `occurrences`, splitting paths on `sep`.
///
/// Sets with fewer than two occurrences are not duplicates and yield an
/// empty analysis.
#[must_use]
pub fn resolve_with_separator(occurrences: &[Occurrence], sep: char) -> PathAnalysis {
    if occurrences.len() < 2 {
        return PathAnalysis::default();
    }

    let split: Vec<Vec<&str>> = occurrences
        .iter()
        .map(|o| o.path.split(sep).collect())
        .collect();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for components in &split {
        for &component in components {
            *frequency.entry(component).or_default() += 1;
        }
    }
    let max_frequency = frequency.values().copied().max().unwrap_or(0);

    // First path with the strictly greatest component count.
    let mut reference: &[&str] = split[0].as_slice();
    for components in &split[1..] {
        if components.len() > reference.len() {
            reference = components.as_slice();
        }
    }
    // Relative inputs keep a relative ancestor.
    let absolute = reference.first().is_some_and(|c| c.is_empty());
    let reversed: Vec<&str> = reference.iter().rev().copied().collect();
    let freq = |component: &str| frequency.get(component).copied().unwrap_or(0);

    let leaf_frequency = freq(reversed[0]);
    let mut i = 0;
    while i < reversed.len() && freq(reversed[i]) >= leaf_frequency {
        i += 1;
    }
    let common_suffix = join_root_to_leaf(&reversed[..i], sep);

    let common_ancestor = if reversed.len() <= 1 {
        String::new()
    } else {
        while i < reversed.len() && freq(reversed[i]) != max_frequency {
            i += 1;
        }
        let start = i;
        while i < reversed.len() && freq(reversed[i]) == max_frequency {
            i += 1;
        }
        let segments: Vec<&str> = reversed[start..i]
            .iter()
            .rev()
            .copied()
            .filter(|c| !c.is_empty())
            .collect();
        if segments.is_empty() {
            String::new()
        } else if absolute {
            let mut ancestor = String::from(sep);
            ancestor.push_str(&segments.join(&sep.to_string()));
            ancestor
        } else {
            segments.join(&sep.to_string())
        }
    };

    PathAnalysis {
        common_suffix,
        common_ancestor,
    }
}

fn join_root_to_leaf(leaf_first: &[&str], sep: char) -> String {
    let root_first: Vec<&str> = leaf_first.iter().rev().copied().collect();
    root_first.join(&sep.to_string())
}
