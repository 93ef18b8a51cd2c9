//! Read-only statistics over a database.

use crate::database::CompilationEntries;
use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const NO_EXTENSION: &str = "no_extension";

/// Summary of a database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Number of translation units
    pub entries: usize,

    /// Entries per file suffix
    pub file_types: BTreeMap<String, usize>,

    /// Most used compiler flags, by base name
    pub top_flags: Vec<FlagUsage>,

    /// Distinct include paths across all entries
    pub distinct_includes: usize,

    /// Distinct defines across all entries
    pub distinct_defines: usize,

    /// Source paths that could not be resolved at load time
    pub unresolved_paths: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagUsage {
    pub flag: String,
    pub count: usize,
}

pub struct Analyzer<'a> {
    entries: &'a [Entry],
}

impl<'a> Analyzer<'a> {
    pub fn new<D: CompilationEntries + ?Sized>(db: &'a D) -> Self {
        Self {
            entries: db.entries(),
        }
    }

    /// Count entries by suffix (`.c`, `.cpp`, …).
    pub fn file_types(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries {
            let ext = entry
                .file()
                .suffix()
                .unwrap_or_else(|| NO_EXTENSION.to_string());
            *counts.entry(ext).or_insert(0) += 1;
        }
        counts
    }

    /// Usage of each compiler flag, folding `-std=c11` and `-std=c++17` into
    /// `-std`. Most used first, ties by name.
    pub fn compiler_flags_histogram(&self) -> Vec<FlagUsage> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in self.entries {
            for flag in &entry.parsed_flags().compiler_flags {
                let base = flag.split_once('=').map_or(flag.as_str(), |(base, _)| base);
                *counts.entry(base).or_insert(0) += 1;
            }
        }

        let mut usage: Vec<FlagUsage> = counts
            .into_iter()
            .map(|(flag, count)| FlagUsage {
                flag: flag.to_string(),
                count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.flag.cmp(&b.flag)));
        usage
    }

    /// Include paths used by at least `min_usage` entries.
    pub fn find_common_includes(&self, min_usage: usize) -> Vec<String> {
        used_at_least(
            self.entries.iter().map(|e| &e.parsed_flags().includes),
            min_usage,
        )
    }

    /// Defines used by at least `min_usage` entries.
    pub fn find_common_defines(&self, min_usage: usize) -> Vec<String> {
        used_at_least(
            self.entries.iter().map(|e| &e.parsed_flags().defines),
            min_usage,
        )
    }

    pub fn summary(&self, top: usize) -> DatabaseStats {
        let mut top_flags = self.compiler_flags_histogram();
        top_flags.truncate(top);

        DatabaseStats {
            entries: self.entries.len(),
            file_types: self.file_types(),
            top_flags,
            distinct_includes: self.find_common_includes(1).len(),
            distinct_defines: self.find_common_defines(1).len(),
            unresolved_paths: self.entries.iter().filter(|e| e.warning().is_some()).count(),
        }
    }
}

fn used_at_least<'a, I>(lists: I, min_usage: usize) -> Vec<String>
where
    I: Iterator<Item = &'a Vec<String>>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for list in lists {
        let mut seen: Vec<&str> = list.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for item in seen {
            *counts.entry(item).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= min_usage)
        .map(|(item, _)| item.to_string())
        .collect()
}
