use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Includes, defines and compiler flags of one translation unit, in command
/// line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub compiler_flags: Vec<String>,
}

impl FlagSet {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.defines.is_empty() && self.compiler_flags.is_empty()
    }

    /// Drop every occurrence of each promoted item.
    pub fn subtract(&mut self, promoted: &CommonFlags) {
        retain_missing(&mut self.includes, &promoted.includes);
        retain_missing(&mut self.defines, &promoted.defines);
        retain_missing(&mut self.compiler_flags, &promoted.compiler_flags);
    }
}

fn retain_missing(items: &mut Vec<String>, sorted_promoted: &[String]) {
    if sorted_promoted.is_empty() {
        return;
    }
    items.retain(|item| sorted_promoted.binary_search(item).is_err());
}

/// Items shared by every member of a scope. Each list is sorted and free of
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonFlags {
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub compiler_flags: Vec<String>,
}

impl CommonFlags {
    /// Intersection across all given sets; empty when there are none.
    pub fn intersection<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a FlagSet>,
    {
        let mut sets = sets.into_iter();
        let Some(first) = sets.next() else {
            return Self::default();
        };

        let mut includes: BTreeSet<&str> = first.includes.iter().map(String::as_str).collect();
        let mut defines: BTreeSet<&str> = first.defines.iter().map(String::as_str).collect();
        let mut flags: BTreeSet<&str> = first.compiler_flags.iter().map(String::as_str).collect();

        for set in sets {
            if includes.is_empty() && defines.is_empty() && flags.is_empty() {
                break;
            }
            intersect_in_place(&mut includes, &set.includes);
            intersect_in_place(&mut defines, &set.defines);
            intersect_in_place(&mut flags, &set.compiler_flags);
        }

        Self {
            includes: to_sorted(includes),
            defines: to_sorted(defines),
            compiler_flags: to_sorted(flags),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.defines.is_empty() && self.compiler_flags.is_empty()
    }

    /// Keep only the compiler flags `policy` allows to be promoted.
    pub fn apply_policy(&mut self, policy: &PromotionPolicy) {
        if policy.is_noop() {
            return;
        }
        self.compiler_flags.retain(|flag| policy.allows(flag));
    }
}

fn intersect_in_place(acc: &mut BTreeSet<&str>, items: &[String]) {
    if acc.is_empty() {
        return;
    }
    let present: BTreeSet<&str> = items.iter().map(String::as_str).collect();
    acc.retain(|item| present.contains(item));
}

fn to_sorted(set: BTreeSet<&str>) -> Vec<String> {
    set.into_iter().map(str::to_string).collect()
}

/// Decides which common compiler flags may leave their entries. Flags that
/// are refused stay on every member entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionPolicy {
    /// Refuse any flag containing one of these substrings.
    #[serde(default)]
    pub filter_flags: Vec<String>,
    /// Refuse flags equal to one of these.
    #[serde(default)]
    pub remove_flags: Vec<String>,
}

impl PromotionPolicy {
    pub fn is_noop(&self) -> bool {
        self.filter_flags.is_empty() && self.remove_flags.is_empty()
    }

    pub fn allows(&self, flag: &str) -> bool {
        !self
            .filter_flags
            .iter()
            .any(|needle| flag.contains(needle.as_str()))
            && !self.remove_flags.iter().any(|exact| exact == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(includes: &[&str], defines: &[&str], flags: &[&str]) -> FlagSet {
        FlagSet {
            includes: includes.iter().map(|s| s.to_string()).collect(),
            defines: defines.iter().map(|s| s.to_string()).collect(),
            compiler_flags: flags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn intersection_of_nothing_is_empty() {
        let common = CommonFlags::intersection(std::iter::empty());
        assert!(common.is_empty());
    }

    #[test]
    fn intersection_is_sorted_and_deduplicated() {
        let a = set(&["z", "a", "a"], &["B", "A"], &["-Wall", "-O2"]);
        let b = set(&["a", "z"], &["A", "B", "C"], &["-O2", "-Wall", "-g"]);
        let common = CommonFlags::intersection([&a, &b]);
        assert_eq!(common.includes, vec!["a", "z"]);
        assert_eq!(common.defines, vec!["A", "B"]);
        assert_eq!(common.compiler_flags, vec!["-O2", "-Wall"]);
    }

    #[test]
    fn subtract_removes_every_occurrence_and_keeps_order() {
        let mut entry = set(&["x", "inc", "inc", "y"], &[], &["-g", "-Wall", "-O0"]);
        let promoted = CommonFlags {
            includes: vec!["inc".into()],
            defines: vec![],
            compiler_flags: vec!["-Wall".into()],
        };
        entry.subtract(&promoted);
        assert_eq!(entry.includes, vec!["x", "y"]);
        assert_eq!(entry.compiler_flags, vec!["-g", "-O0"]);
    }

    #[test]
    fn policy_filters_substrings_and_exact_matches() {
        let policy = PromotionPolicy {
            filter_flags: vec!["-MF".into(), "sanitize".into()],
            remove_flags: vec!["-fPIC".into()],
        };
        assert!(!policy.allows("-fsanitize=address"));
        assert!(!policy.allows("-fPIC"));
        assert!(policy.allows("-fPIE"));
        assert!(policy.allows("-O2"));

        let mut common = CommonFlags {
            includes: vec!["inc".into()],
            defines: vec!["D".into()],
            compiler_flags: vec!["-O2".into(), "-fPIC".into()],
        };
        common.apply_policy(&policy);
        assert_eq!(common.compiler_flags, vec!["-O2"]);
        assert_eq!(common.includes, vec!["inc"]);
    }
}
