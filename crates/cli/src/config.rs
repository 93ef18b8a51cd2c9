use anyhow::{anyhow, bail, Context, Result};
use layerkit_compdb::{GroupOptions, GroupPattern, GroupPatterns, MatchKind, PromotionPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPILE_COMMANDS: &str = "compile_commands.json";
pub const DEFAULT_LAYER_NAME: &str = "MyLayer";
pub const SINGLE_GROUP_NAME: &str = "Source";

/// Layer settings read from a JSON or TOML file. Command line flags are
/// merged on top.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    pub compile_commands: Option<PathBuf>,
    pub layer_root: Option<PathBuf>,
    pub name: Option<String>,
    pub output: Option<PathBuf>,
    pub strip_paths: Vec<String>,
    /// Top-level folders, each becoming one glob group
    pub groups: Vec<String>,
    /// Explicit groups, tried after the folder groups
    pub group_patterns: Vec<GroupPattern>,
    pub match_kind: MatchKind,
    pub include_other: Option<bool>,
    pub filter_flags: Vec<String>,
    pub remove_flags: Vec<String>,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
}

impl LayerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// JSON first, then TOML.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(json_err) => {
                let toml_value: toml::Value = toml::from_str(raw).map_err(|toml_err| {
                    anyhow!(
                        "Config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    )
                })?;
                serde_json::to_value(toml_value)
                    .map_err(|err| anyhow!("Failed to convert TOML config to JSON: {err}"))?
            }
        };
        serde_json::from_value(value).map_err(|err| anyhow!("Config parse error: {err}"))
    }

    /// Overlay command line values: scalars replace, lists extend.
    pub fn merge(mut self, overrides: LayerConfig) -> Self {
        if overrides.compile_commands.is_some() {
            self.compile_commands = overrides.compile_commands;
        }
        if overrides.layer_root.is_some() {
            self.layer_root = overrides.layer_root;
        }
        if overrides.name.is_some() {
            self.name = overrides.name;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
        if overrides.include_other.is_some() {
            self.include_other = overrides.include_other;
        }
        if overrides.match_kind != MatchKind::default() {
            self.match_kind = overrides.match_kind;
        }
        self.strip_paths.extend(overrides.strip_paths);
        self.groups.extend(overrides.groups);
        self.group_patterns.extend(overrides.group_patterns);
        self.filter_flags.extend(overrides.filter_flags);
        self.remove_flags.extend(overrides.remove_flags);
        self.exclude.extend(overrides.exclude);
        self.extensions.extend(overrides.extensions);
        self
    }

    pub fn into_plan(self) -> Result<LayerPlan> {
        let Some(layer_root) = self.layer_root else {
            bail!("A layer root is required (--layer-root or `layer_root` in the config)");
        };

        if !self.groups.is_empty() && self.match_kind == MatchKind::Regex {
            bail!("Folder groups are glob patterns and cannot be combined with match_kind = regex");
        }

        let patterns = if self.groups.is_empty() && self.group_patterns.is_empty() {
            None
        } else {
            let mut patterns = if self.groups.is_empty() {
                GroupPatterns::new(self.match_kind)
            } else {
                GroupPatterns::from_folders(&self.groups)
            };
            for group in self.group_patterns {
                patterns.push(group.name, group.pattern);
            }
            Some(patterns)
        };

        Ok(LayerPlan {
            compile_commands: self
                .compile_commands
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILE_COMMANDS)),
            layer_root,
            name: self.name.unwrap_or_else(|| DEFAULT_LAYER_NAME.to_string()),
            output: self.output,
            strip_paths: self.strip_paths,
            patterns,
            group_options: GroupOptions {
                // Explicit groups leave unmatched files out unless asked otherwise.
                include_other: self.include_other.unwrap_or(false),
                policy: PromotionPolicy {
                    filter_flags: self.filter_flags,
                    remove_flags: self.remove_flags,
                },
            },
            exclude: self.exclude,
            extensions: self.extensions,
        })
    }
}

/// Validated settings for one `layer` run.
#[derive(Clone, Debug)]
pub struct LayerPlan {
    pub compile_commands: PathBuf,
    pub layer_root: PathBuf,
    pub name: String,
    pub output: Option<PathBuf>,
    pub strip_paths: Vec<String>,
    /// `None` puts every entry in a single group
    pub patterns: Option<GroupPatterns>,
    pub group_options: GroupOptions,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
}
