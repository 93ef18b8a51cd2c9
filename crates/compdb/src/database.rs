use crate::entry::Entry;
use crate::error::{CompDbError, Result};
use crate::flags::CommonFlags;
use crate::grouping::{self, Group, GroupOptions, GroupPatterns};
use crate::paths::{resolve_best_effort, PathWarning, SourcePath};
use crate::record::{parse_records, CompileRecord};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use layerkit_protocol::path_filters::{normalize_filter_path, path_prefix_matches};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Read access and filtering shared by both database phases.
///
/// Every filter returns a fresh [`ExtractedDatabase`] whose globals are
/// derived from the surviving entries' parsed flags, so a chain of filters
/// never reuses an earlier extraction.
pub trait CompilationEntries {
    fn entries(&self) -> &[Entry];

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries().iter()
    }

    /// Paths that could not be resolved when the surviving entries were loaded.
    fn warnings(&self) -> Vec<&PathWarning> {
        self.entries().iter().filter_map(Entry::warning).collect()
    }

    /// Keep entries located under `root`.
    ///
    /// Stripped entries are compared as strings (`.` matches all of them),
    /// resolved entries by path containment against the resolved `root`.
    /// The recursive match is on whole components, not a raw string prefix:
    /// `runtime` keeps `runtime/x.c` but not `runtime2/x.c`.
    /// With `recursive == false` only direct children of `root` survive.
    fn filter_by_path(&self, root: &Path, recursive: bool) -> ExtractedDatabase {
        let relative_root = normalize_filter_path(&root.to_string_lossy());
        let absolute_root = resolve_best_effort(root);

        self.filter_by_predicate(|entry| match entry.file() {
            SourcePath::Stripped(path) => {
                if recursive {
                    path_prefix_matches(&relative_root, &path.to_string_lossy())
                } else {
                    path.parent().unwrap_or(Path::new("")) == Path::new(&relative_root)
                }
            }
            SourcePath::Resolved(path) => {
                if recursive {
                    path.starts_with(&absolute_root)
                } else {
                    path.parent() == Some(absolute_root.as_path())
                }
            }
        })
    }

    /// Keep entries whose suffix is one of `extensions` (`c` and `.c` are
    /// equivalent; comparison is case-sensitive).
    fn filter_by_extension<S: AsRef<str>>(&self, extensions: &[S]) -> ExtractedDatabase {
        let wanted: BTreeSet<String> = extensions
            .iter()
            .map(|ext| {
                let ext = ext.as_ref();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        self.filter_by_predicate(|entry| {
            entry
                .file()
                .suffix()
                .is_some_and(|suffix| wanted.contains(&suffix))
        })
    }

    /// Drop entries matching any glob. Each pattern is also tried as
    /// `*/pattern` so that a relative pattern matches absolute paths.
    fn exclude_by_patterns<S: AsRef<str>>(&self, patterns: &[S]) -> Result<ExtractedDatabase> {
        let excluded = build_exclusion_set(patterns)?;
        let filtered = self.filter_by_predicate(|entry| {
            !excluded.is_match(entry.file().to_string_lossy().as_str())
        });
        log::debug!(
            "Exclusion patterns removed {} of {} entries",
            self.len() - filtered.len(),
            self.len()
        );
        Ok(filtered)
    }

    fn filter_by_predicate<F>(&self, predicate: F) -> ExtractedDatabase
    where
        F: Fn(&Entry) -> bool,
    {
        let kept: Vec<Entry> = self
            .entries()
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect();
        ExtractedDatabase::from_entries(kept)
    }

    /// Every include path used by any entry, deduplicated and sorted.
    /// Absolute paths under `relative_to` are rewritten relative to it.
    fn all_includes(&self, relative_to: Option<&Path>) -> Vec<String> {
        let mut includes = BTreeSet::new();
        for entry in self.entries() {
            for include in &entry.parsed_flags().includes {
                let rewritten = relative_to
                    .and_then(|root| {
                        let path = Path::new(include);
                        if !path.is_absolute() {
                            return None;
                        }
                        path.strip_prefix(root).ok().map(relative_display)
                    })
                    .unwrap_or_else(|| include.clone());
                includes.insert(rewritten);
            }
        }
        includes.into_iter().collect()
    }

    fn all_defines(&self) -> Vec<String> {
        let defines: BTreeSet<&String> = self
            .entries()
            .iter()
            .flat_map(|entry| &entry.parsed_flags().defines)
            .collect();
        defines.into_iter().cloned().collect()
    }

    fn all_files(&self, relative_to: Option<&Path>) -> Vec<String> {
        let files: BTreeSet<String> = self
            .entries()
            .iter()
            .map(|entry| match relative_to {
                Some(root) => entry.relative_to(root),
                None => entry.file().to_string_lossy(),
            })
            .collect();
        files.into_iter().collect()
    }
}

/// `.` for the root itself, the relative path otherwise.
pub(crate) fn relative_display(relative: &Path) -> String {
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.to_string_lossy().into_owned()
    }
}

fn build_exclusion_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        for candidate in [pattern.to_string(), format!("*/{pattern}")] {
            let glob = GlobBuilder::new(&candidate)
                .literal_separator(false)
                .build()
                .map_err(|err| CompDbError::invalid_pattern(pattern, err))?;
            builder.add(glob);
        }
    }
    builder
        .build()
        .map_err(|err| CompDbError::invalid_pattern(patterns_label(patterns), err))
}

fn patterns_label<S: AsRef<str>>(patterns: &[S]) -> String {
    patterns
        .iter()
        .map(AsRef::<str>::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Entries as loaded: flags parsed, nothing promoted yet.
///
/// Extraction is deferred so that callers can narrow the set first; the
/// globals of a full database are rarely the ones a sub-tree needs.
#[derive(Debug, Clone, Default)]
pub struct RawDatabase {
    entries: Vec<Entry>,
}

impl RawDatabase {
    /// Load a `compile_commands.json` file.
    ///
    /// A file that matches one of `strip_prefixes` (tried in order) is kept
    /// relative to that prefix instead of being resolved.
    pub fn load(path: impl AsRef<Path>, strip_prefixes: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let db = Self::from_json_str(&json, strip_prefixes)?;
        log::info!(
            "Loaded {} compile commands from {}",
            db.entries.len(),
            path.display()
        );
        Ok(db)
    }

    pub fn from_json_str(json: &str, strip_prefixes: &[String]) -> Result<Self> {
        let records = parse_records(json)?;
        Self::from_records(&records, strip_prefixes)
    }

    pub fn from_records(records: &[CompileRecord], strip_prefixes: &[String]) -> Result<Self> {
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| Entry::from_record(index, record, strip_prefixes))
            .collect::<Result<Vec<_>>>()?;

        let unresolved = entries.iter().filter(|e| e.warning().is_some()).count();
        if unresolved > 0 {
            log::warn!(
                "{unresolved} of {} source paths could not be resolved; keeping them as written",
                entries.len()
            );
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Promote the flags shared by every entry.
    pub fn extract(self) -> ExtractedDatabase {
        ExtractedDatabase::from_entries(self.entries)
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl CompilationEntries for RawDatabase {
    fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Entries plus the includes, defines and flags common to all of them.
///
/// Every entry's residue is disjoint from the globals.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDatabase {
    entries: Vec<Entry>,
    globals: CommonFlags,
}

impl ExtractedDatabase {
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let mut db = Self {
            entries,
            globals: CommonFlags::default(),
        };
        db.extract_globals();
        db
    }

    /// Recompute the globals from the entries' parsed flags and subtract them
    /// from each entry. Running it again changes nothing.
    pub fn extract_globals(&mut self) {
        for entry in &mut self.entries {
            entry.reset_flags();
        }

        let globals = CommonFlags::intersection(self.entries.iter().map(Entry::parsed_flags));
        for entry in &mut self.entries {
            entry.subtract(&globals);
        }

        log::debug!(
            "Extracted {} includes, {} defines, {} flags common to {} entries",
            globals.includes.len(),
            globals.defines.len(),
            globals.compiler_flags.len(),
            self.entries.len()
        );
        self.globals = globals;
    }

    pub fn globals(&self) -> &CommonFlags {
        &self.globals
    }

    pub fn global_includes(&self) -> &[String] {
        &self.globals.includes
    }

    pub fn global_defines(&self) -> &[String] {
        &self.globals.defines
    }

    pub fn global_flags(&self) -> &[String] {
        &self.globals.compiler_flags
    }

    /// Partition the entries into named groups and promote what each group
    /// shares. The database itself is left untouched.
    pub fn group_by(&self, patterns: &GroupPatterns, options: &GroupOptions) -> Result<Vec<Group>> {
        grouping::group_entries(&self.entries, patterns, options)
    }

    /// A single group holding every entry. `None` for an empty database.
    pub fn group_all(&self, name: &str, options: &GroupOptions) -> Option<Group> {
        if self.entries.is_empty() {
            return None;
        }
        Some(Group::from_entries(
            name,
            self.entries.clone(),
            &options.policy,
        ))
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl CompilationEntries for ExtractedDatabase {
    fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a ExtractedDatabase {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a RawDatabase {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
