//! # Layerkit Compilation Database
//!
//! Turns a `compile_commands.json` into per-scope minimal flag sets for
//! packaging a C/C++ tree as smaller build layers.
//!
//! ## Pipeline
//!
//! ```text
//! compile_commands.json
//!     │
//!     ├──> Records (file, directory, arguments | command)
//!     │      ├─> Command parser → includes / defines / compiler flags
//!     │      └─> Path normalizer → stripped-relative or resolved path
//!     │
//!     ├──> RawDatabase (nothing promoted yet)
//!     │      └─> filters: path, extension, exclusion globs, predicate
//!     │
//!     ├──> ExtractedDatabase (globals = intersection over all entries)
//!     │
//!     └──> Groups (first matching pattern, group-scoped promotion)
//!            └─> LayerManifest
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use layerkit_compdb::{CompilationEntries, GroupOptions, GroupPatterns, RawDatabase};
//! use std::path::Path;
//!
//! fn main() -> layerkit_compdb::Result<()> {
//!     let db = RawDatabase::load("compile_commands.json", &["/workspace/executorch".into()])?
//!         .filter_by_path(Path::new("runtime"), true);
//!
//!     let groups = db.group_by(
//!         &GroupPatterns::from_folders(["runtime", "kernels"]),
//!         &GroupOptions::default(),
//!     )?;
//!     for group in &groups {
//!         println!("{}: {} files, {:?}", group.name(), group.len(), group.compiler_flags());
//!     }
//!     Ok(())
//! }
//! ```

mod analyzer;
mod command;
mod database;
mod entry;
mod error;
mod export;
mod flags;
mod grouping;
mod paths;
mod record;

pub use analyzer::{Analyzer, DatabaseStats, FlagUsage};
pub use command::{is_structural, parse_arguments, split_command, STRUCTURAL_FLAGS};
pub use database::{CompilationEntries, ExtractedDatabase, RawDatabase};
pub use entry::Entry;
pub use error::{CompDbError, Result};
pub use export::{group_manifest, layer_manifest, rewrite_include, ManifestOptions};
pub use flags::{CommonFlags, FlagSet, PromotionPolicy};
pub use grouping::{Group, GroupOptions, GroupPattern, GroupPatterns, MatchKind, OTHER_GROUP};
pub use paths::{lexical_clean, normalize_source_path, NormalizedPath, PathWarning, SourcePath};
pub use record::{parse_records, CompileRecord};
