//! Named partitions of a database with group-scoped promotion.

use crate::entry::Entry;
use crate::error::{CompDbError, Result};
use crate::flags::{CommonFlags, PromotionPolicy};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the bucket collecting entries no pattern matched.
pub const OTHER_GROUP: &str = "Other";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Shell-style wildcards against the whole path; `*` crosses `/`
    #[default]
    Glob,
    /// Unanchored search anywhere in the path
    Regex,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPattern {
    pub name: String,
    pub pattern: String,
}

/// Ordered `name → pattern` list. Entries go to the first pattern that
/// matches, in list order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupPatterns {
    kind: MatchKind,
    patterns: Vec<GroupPattern>,
}

impl GroupPatterns {
    pub fn new(kind: MatchKind) -> Self {
        Self {
            kind,
            patterns: Vec::new(),
        }
    }

    pub fn glob() -> Self {
        Self::new(MatchKind::Glob)
    }

    pub fn regex() -> Self {
        Self::new(MatchKind::Regex)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.push(name, pattern);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.patterns.push(GroupPattern {
            name: name.into(),
            pattern: pattern.into(),
        });
    }

    /// One glob group per top-level folder: `runtime` becomes
    /// `Runtime → runtime/*`.
    pub fn from_folders<I, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Self::glob();
        for folder in folders {
            let folder = folder.as_ref().trim_matches('/');
            if folder.is_empty() {
                continue;
            }
            patterns.push(capitalize(folder), format!("{folder}/*"));
        }
        patterns
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupOptions {
    /// Collect unmatched entries in an [`OTHER_GROUP`] bucket. Regex grouping
    /// always does.
    pub include_other: bool,
    pub policy: PromotionPolicy,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            include_other: true,
            policy: PromotionPolicy::default(),
        }
    }
}

/// A named subset of entries plus what all of them share beyond the
/// database globals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    name: String,
    entries: Vec<Entry>,
    common: CommonFlags,
}

impl Group {
    /// Promote the items common to `entries`. Compiler flags refused by
    /// `policy` are not promoted and stay on every entry.
    pub fn from_entries(name: impl Into<String>, mut entries: Vec<Entry>, policy: &PromotionPolicy) -> Self {
        let mut common = CommonFlags::intersection(entries.iter().map(Entry::flags));
        common.apply_policy(policy);
        for entry in &mut entries {
            entry.subtract(&common);
        }
        Self {
            name: name.into(),
            entries,
            common,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn common(&self) -> &CommonFlags {
        &self.common
    }

    pub fn includes(&self) -> &[String] {
        &self.common.includes
    }

    pub fn defines(&self) -> &[String] {
        &self.common.defines
    }

    pub fn compiler_flags(&self) -> &[String] {
        &self.common.compiler_flags
    }
}

enum Matcher {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl Matcher {
    fn compile(kind: MatchKind, pattern: &str) -> Result<Self> {
        match kind {
            MatchKind::Glob => GlobBuilder::new(pattern)
                .literal_separator(false)
                .build()
                .map(|glob| Self::Glob(glob.compile_matcher()))
                .map_err(|err| CompDbError::invalid_pattern(pattern, err)),
            MatchKind::Regex => Regex::new(pattern)
                .map(Self::Regex)
                .map_err(|err| CompDbError::invalid_pattern(pattern, err)),
        }
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(path),
            Self::Regex(regex) => regex.is_match(path),
        }
    }
}

struct Bucket {
    name: String,
    entries: Vec<Entry>,
    seen: HashSet<String>,
}

impl Bucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn insert(&mut self, key: String, entry: &Entry) {
        if self.seen.insert(key) {
            self.entries.push(entry.clone());
        }
    }
}

/// Bucket `entries` by first matching pattern, drop empty buckets and
/// promote each bucket's shared items. Every pattern is compiled before any
/// entry is looked at.
pub(crate) fn group_entries(
    entries: &[Entry],
    patterns: &GroupPatterns,
    options: &GroupOptions,
) -> Result<Vec<Group>> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut matchers: Vec<(Matcher, usize)> = Vec::with_capacity(patterns.len());
    for group in patterns.iter() {
        let matcher = Matcher::compile(patterns.kind(), &group.pattern)?;
        let slot = match buckets.iter().position(|b| b.name == group.name) {
            Some(slot) => slot,
            None => {
                buckets.push(Bucket::new(&group.name));
                buckets.len() - 1
            }
        };
        matchers.push((matcher, slot));
    }

    let include_other = options.include_other || patterns.kind() == MatchKind::Regex;
    let mut other = Bucket::new(OTHER_GROUP);

    for entry in entries {
        let path = entry.file().to_string_lossy();
        match matchers.iter().find(|(matcher, _)| matcher.is_match(&path)) {
            Some((_, slot)) => buckets[*slot].insert(path, entry),
            None if include_other => other.insert(path, entry),
            None => log::debug!("No group for {path}; leaving it out"),
        }
    }

    if include_other {
        match buckets.iter_mut().find(|b| b.name == OTHER_GROUP) {
            Some(existing) => {
                for entry in other.entries {
                    let key = entry.file().to_string_lossy();
                    existing.insert(key, &entry);
                }
            }
            None => buckets.push(other),
        }
    }

    let groups: Vec<Group> = buckets
        .into_iter()
        .filter(|bucket| !bucket.entries.is_empty())
        .map(|bucket| Group::from_entries(bucket.name, bucket.entries, &options.policy))
        .collect();

    log::info!(
        "Grouped {} entries into {} groups",
        groups.iter().map(Group::len).sum::<usize>(),
        groups.len()
    );
    Ok(groups)
}
