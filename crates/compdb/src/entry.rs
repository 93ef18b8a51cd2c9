use crate::command::parse_arguments;
use crate::error::Result;
use crate::flags::{CommonFlags, FlagSet};
use crate::paths::{normalize_source_path, resolve_best_effort, PathWarning, SourcePath};
use crate::record::CompileRecord;
use std::path::{Path, PathBuf};

/// One translation unit.
///
/// Identity (`file`, `directory`, `raw_arguments`) is fixed at load time.
/// The flags parsed from the arguments are kept untouched next to a working
/// copy that shrinks as scopes promote shared items away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    file: SourcePath,
    directory: PathBuf,
    raw_arguments: Vec<String>,
    output: Option<PathBuf>,
    parsed: FlagSet,
    flags: FlagSet,
    warning: Option<PathWarning>,
}

impl Entry {
    pub fn new(
        file: SourcePath,
        directory: impl Into<PathBuf>,
        raw_arguments: Vec<String>,
        output: Option<PathBuf>,
    ) -> Self {
        let parsed = parse_arguments(&raw_arguments);
        Self {
            file,
            directory: directory.into(),
            flags: parsed.clone(),
            parsed,
            raw_arguments,
            output,
            warning: None,
        }
    }

    /// Build an entry from the record at position `index`.
    pub fn from_record(index: usize, record: &CompileRecord, strip_prefixes: &[String]) -> Result<Self> {
        let raw_arguments = record.argv(index)?;
        let raw_directory = Path::new(&record.directory);
        let normalized = normalize_source_path(&record.file, raw_directory, strip_prefixes);
        let directory = resolve_best_effort(raw_directory);
        let output = record.output.as_deref().map(|output| {
            let output = Path::new(output);
            if output.is_absolute() {
                resolve_best_effort(output)
            } else {
                resolve_best_effort(&raw_directory.join(output))
            }
        });

        let mut entry = Self::new(normalized.path, directory, raw_arguments, output);
        if let Some(reason) = normalized.unresolved {
            log::debug!(
                "Record #{index}: keeping unresolved path {} ({reason})",
                entry.file
            );
            entry.warning = Some(PathWarning {
                record: index,
                path: entry.file.as_path().to_path_buf(),
                reason,
            });
        }
        Ok(entry)
    }

    pub fn file(&self) -> &SourcePath {
        &self.file
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn raw_arguments(&self) -> &[String] {
        &self.raw_arguments
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Includes left after promotion to the enclosing scopes.
    pub fn includes(&self) -> &[String] {
        &self.flags.includes
    }

    pub fn defines(&self) -> &[String] {
        &self.flags.defines
    }

    pub fn compiler_flags(&self) -> &[String] {
        &self.flags.compiler_flags
    }

    /// Current per-entry residue.
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Everything parsed from the arguments, before any promotion.
    pub fn parsed_flags(&self) -> &FlagSet {
        &self.parsed
    }

    pub fn warning(&self) -> Option<&PathWarning> {
        self.warning.as_ref()
    }

    pub fn relative_to(&self, root: &Path) -> String {
        self.file.relative_to(root)
    }

    pub(crate) fn reset_flags(&mut self) {
        self.flags.clone_from(&self.parsed);
    }

    pub(crate) fn subtract(&mut self, promoted: &CommonFlags) {
        self.flags.subtract(promoted);
    }
}
