//! Conversion of extracted databases and groups into manifest shapes.

use crate::database::{relative_display, CompilationEntries, ExtractedDatabase};
use crate::flags::CommonFlags;
use crate::grouping::Group;
use layerkit_protocol::path_filters::strip_literal_prefix;
use layerkit_protocol::{
    DefineValue, EntryRef, GroupManifest, LayerManifest, ScopeFlags, MANIFEST_SCHEMA_VERSION,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub name: String,
    /// Base for entry paths and absolute include paths
    pub root: PathBuf,
    /// Prefixes removed from include paths, first match wins
    pub strip_prefixes: Vec<String>,
}

pub fn layer_manifest(
    db: &ExtractedDatabase,
    groups: &[Group],
    options: &ManifestOptions,
) -> LayerManifest {
    LayerManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        name: options.name.clone(),
        description: format!("Generated from compile_commands.json ({} files)", db.len()),
        root: options.root.to_string_lossy().into_owned(),
        globals: scope_flags(db.globals(), options),
        groups: groups
            .iter()
            .map(|group| group_manifest(group, options))
            .collect(),
    }
}

pub fn group_manifest(group: &Group, options: &ManifestOptions) -> GroupManifest {
    let mut entries: Vec<String> = group
        .entries()
        .iter()
        .map(|entry| {
            entry
                .relative_to(&options.root)
                .trim_start_matches(['/', '\\'])
                .to_string()
        })
        .collect();
    entries.sort();
    entries.dedup();

    GroupManifest {
        name: group.name().to_string(),
        entries: entries
            .into_iter()
            .map(|relative_path| EntryRef { relative_path })
            .collect(),
        flags: scope_flags(group.common(), options),
    }
}

fn scope_flags(common: &CommonFlags, options: &ManifestOptions) -> ScopeFlags {
    let mut seen = HashSet::new();
    let includes = common
        .includes
        .iter()
        .map(|include| rewrite_include(include, options))
        .filter(|include| seen.insert(include.clone()))
        .collect();

    ScopeFlags {
        includes,
        defines: common
            .defines
            .iter()
            .map(|define| DefineValue::parse(define))
            .collect(),
        compiler_flags: common.compiler_flags.clone(),
    }
}

/// Strip the first matching prefix; otherwise make absolute paths under the
/// root relative to it. The prefix or root itself becomes `.`. Anything else
/// is returned as written.
pub fn rewrite_include(include: &str, options: &ManifestOptions) -> String {
    for prefix in options.strip_prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(rest) = strip_literal_prefix(include, prefix) {
            return relative_display(Path::new(rest.trim_start_matches(['/', '\\'])));
        }
    }

    let path = Path::new(include);
    if path.is_absolute() && !options.root.as_os_str().is_empty() {
        if let Ok(relative) = path.strip_prefix(&options.root) {
            return relative_display(relative);
        }
    }
    include.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::RawDatabase;
    use crate::entry::Entry;
    use crate::grouping::{GroupOptions, GroupPatterns};
    use crate::paths::SourcePath;
    use pretty_assertions::assert_eq;

    fn entry(file: &str, args: &[&str]) -> Entry {
        Entry::new(
            SourcePath::Stripped(PathBuf::from(file)),
            "/build",
            args.iter().map(|s| s.to_string()).collect(),
            None,
        )
    }

    #[test]
    fn manifest_carries_globals_and_groups() {
        let db = RawDatabase::from_entries(vec![
            entry("runtime/b.c", &["-I/ws/et/runtime", "-DET=1", "-O2", "-g"]),
            entry("runtime/a.c", &["-I/ws/et/runtime", "-DET=1", "-O2", "-g"]),
            entry("kernels/k.c", &["-I/ws/et/runtime", "-DET=1", "-O2"]),
        ])
        .extract();
        let groups = db
            .group_by(
                &GroupPatterns::from_folders(["runtime", "kernels"]),
                &GroupOptions::default(),
            )
            .unwrap();

        let options = ManifestOptions {
            name: "Engine".into(),
            root: PathBuf::from("."),
            strip_prefixes: vec!["/ws/et".into()],
        };
        let manifest = layer_manifest(&db, &groups, &options);

        assert_eq!(manifest.name, "Engine");
        assert_eq!(manifest.globals.includes, vec!["runtime"]);
        assert_eq!(manifest.globals.defines, vec![DefineValue::parse("ET=1")]);
        assert_eq!(manifest.globals.compiler_flags, vec!["-O2"]);

        let runtime = &manifest.groups[0];
        assert_eq!(runtime.name, "Runtime");
        let paths: Vec<&str> = runtime.entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["runtime/a.c", "runtime/b.c"]);
        assert_eq!(runtime.flags.compiler_flags, vec!["-g"]);

        let kernels = &manifest.groups[1];
        assert!(kernels.flags.is_empty());
    }

    #[test]
    fn include_rewrite_prefers_strip_prefixes() {
        let options = ManifestOptions {
            name: String::new(),
            root: PathBuf::from("/repo"),
            strip_prefixes: vec!["/ws".into()],
        };
        assert_eq!(rewrite_include("/ws/inc", &options), "inc");
        assert_eq!(rewrite_include("/repo/include", &options), "include");
        assert_eq!(rewrite_include("/usr/include", &options), "/usr/include");
        assert_eq!(rewrite_include("rel/inc", &options), "rel/inc");
    }

    #[test]
    fn include_equal_to_prefix_or_root_becomes_dot() {
        let options = ManifestOptions {
            name: String::new(),
            root: PathBuf::from("/repo"),
            strip_prefixes: vec!["/ws/et".into()],
        };
        assert_eq!(rewrite_include("/ws/et", &options), ".");
        assert_eq!(rewrite_include("/ws/et/", &options), ".");
        assert_eq!(rewrite_include("/repo", &options), ".");
    }
}
