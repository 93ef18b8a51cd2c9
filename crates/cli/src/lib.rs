use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{LayerConfig, LayerPlan, DEFAULT_COMPILE_COMMANDS, SINGLE_GROUP_NAME};
use layerkit_compdb::{
    layer_manifest, Analyzer, CompilationEntries, GroupPattern, ManifestOptions, MatchKind,
    RawDatabase,
};
use layerkit_protocol::serialize_json_pretty;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod config;
mod report;

const WARNING_PREVIEW: usize = 5;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "ccdb2layer")]
#[command(
    about = "Derive minimal per-scope flag sets from compile_commands.json",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a layer manifest for a sub-tree
    Layer(LayerArgs),

    /// Summarize a compilation database
    Stats(StatsArgs),

    /// Print every file, include path, or define in the database
    List(ListArgs),
}

#[derive(Args)]
struct LayerArgs {
    /// Layer config (JSON or TOML); command line values are applied on top
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compilation database [default: compile_commands.json]
    #[arg(short = 'i', long)]
    compile_commands: Option<PathBuf>,

    /// Root of the layer; only entries under it are kept
    #[arg(short = 'r', long)]
    layer_root: Option<PathBuf>,

    /// Layer name [default: MyLayer]
    #[arg(short, long)]
    name: Option<String>,

    /// Write the manifest here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Prefix removed from source and include paths (repeatable)
    #[arg(long = "strip-path", value_name = "PREFIX")]
    strip_paths: Vec<String>,

    /// Top-level folder that becomes its own group (repeatable)
    #[arg(short, long = "group", value_name = "FOLDER")]
    groups: Vec<String>,

    /// Explicit group as NAME=PATTERN (repeatable, tried in order)
    #[arg(short, long = "pattern", value_name = "NAME=PATTERN")]
    patterns: Vec<String>,

    /// How group patterns are interpreted
    #[arg(long, value_enum)]
    match_kind: Option<MatchArg>,

    /// Collect unmatched entries into an `Other` group
    #[arg(long)]
    include_other: bool,

    /// Never promote common flags containing this substring (repeatable)
    #[arg(long = "filter-flag", value_name = "FLAG", allow_hyphen_values = true)]
    filter_flags: Vec<String>,

    /// Never promote common flags equal to this one (repeatable)
    #[arg(long = "remove-flag", value_name = "FLAG", allow_hyphen_values = true)]
    remove_flags: Vec<String>,

    /// Drop entries whose path matches this glob (repeatable)
    #[arg(short, long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Keep only these file extensions (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,
}

impl LayerArgs {
    fn overrides(&self) -> Result<LayerConfig> {
        let group_patterns = self
            .patterns
            .iter()
            .map(|raw| parse_group_pattern(raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(LayerConfig {
            compile_commands: self.compile_commands.clone(),
            layer_root: self.layer_root.clone(),
            name: self.name.clone(),
            output: self.output.clone(),
            strip_paths: self.strip_paths.clone(),
            groups: self.groups.clone(),
            group_patterns,
            match_kind: MatchKind::default(),
            include_other: self.include_other.then_some(true),
            filter_flags: self.filter_flags.clone(),
            remove_flags: self.remove_flags.clone(),
            exclude: self.exclude.clone(),
            extensions: self.extensions.clone(),
        })
    }
}

#[derive(Args)]
struct StatsArgs {
    /// Compilation database
    #[arg(default_value = DEFAULT_COMPILE_COMMANDS)]
    compile_commands: PathBuf,

    /// Prefix removed from source paths (repeatable)
    #[arg(long = "strip-path", value_name = "PREFIX")]
    strip_paths: Vec<String>,

    /// Only consider entries under this directory
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Number of compiler flags to show
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ListArgs {
    /// What to list
    #[arg(value_enum)]
    what: ListKind,

    /// Compilation database
    #[arg(default_value = DEFAULT_COMPILE_COMMANDS)]
    compile_commands: PathBuf,

    /// Prefix removed from source paths (repeatable)
    #[arg(long = "strip-path", value_name = "PREFIX")]
    strip_paths: Vec<String>,

    /// Only consider entries under this directory
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Print files and include paths relative to this directory
    #[arg(long)]
    relative_to: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MatchArg {
    Glob,
    Regex,
}

impl From<MatchArg> for MatchKind {
    fn from(value: MatchArg) -> Self {
        match value {
            MatchArg::Glob => MatchKind::Glob,
            MatchArg::Regex => MatchKind::Regex,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListKind {
    Files,
    Includes,
    Defines,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Layer(args) => run_layer(args),
        Commands::Stats(args) => run_stats(args),
        Commands::List(args) => run_list(args),
    }
}

fn parse_group_pattern(raw: &str) -> Result<GroupPattern> {
    let Some((name, pattern)) = raw.split_once('=') else {
        bail!("Invalid group pattern '{raw}': expected NAME=PATTERN");
    };
    let (name, pattern) = (name.trim(), pattern.trim());
    if name.is_empty() || pattern.is_empty() {
        bail!("Invalid group pattern '{raw}': name and pattern must be non-empty");
    }
    Ok(GroupPattern {
        name: name.to_string(),
        pattern: pattern.to_string(),
    })
}

fn load_database(path: &Path, strip_paths: &[String]) -> Result<RawDatabase> {
    let db = RawDatabase::load(path, strip_paths)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    for line in report::render_warnings(&db.warnings(), WARNING_PREVIEW) {
        log::warn!("  {line}");
    }
    Ok(db)
}

fn run_layer(args: LayerArgs) -> Result<()> {
    let base = match &args.config {
        Some(path) => LayerConfig::load(path)?,
        None => LayerConfig::default(),
    };
    let mut config = base.merge(args.overrides()?);
    if let Some(kind) = args.match_kind {
        config.match_kind = kind.into();
    }
    let plan = config.into_plan()?;
    write_layer(&plan)
}

fn write_layer(plan: &LayerPlan) -> Result<()> {
    let raw = load_database(&plan.compile_commands, &plan.strip_paths)?;
    let total = raw.len();

    let mut db = raw.filter_by_path(&plan.layer_root, true);
    log::debug!(
        "{} of {} entries under {}",
        db.len(),
        total,
        plan.layer_root.display()
    );
    if !plan.exclude.is_empty() {
        db = db.exclude_by_patterns(&plan.exclude)?;
    }
    if !plan.extensions.is_empty() {
        db = db.filter_by_extension(&plan.extensions);
    }

    if db.is_empty() {
        log::warn!(
            "No entries left under {} after filtering; nothing written",
            plan.layer_root.display()
        );
        return Ok(());
    }

    let groups = match &plan.patterns {
        Some(patterns) => db.group_by(patterns, &plan.group_options)?,
        None => db
            .group_all(SINGLE_GROUP_NAME, &plan.group_options)
            .into_iter()
            .collect(),
    };

    let manifest = layer_manifest(
        &db,
        &groups,
        &ManifestOptions {
            name: plan.name.clone(),
            root: plan.layer_root.clone(),
            strip_prefixes: plan.strip_paths.clone(),
        },
    );
    let json = serialize_json_pretty(&manifest)?;

    match &plan.output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote layer '{}' to {}", plan.name, path.display());
        }
        None => print_stdout(&json)?,
    }

    log::info!(
        "{} files, {} global includes, {} global defines, {} global flags",
        db.len(),
        db.global_includes().len(),
        db.global_defines().len(),
        db.global_flags().len()
    );
    for group in &groups {
        log::info!(
            "  {}: {} files, {} includes, {} defines, {} flags",
            group.name(),
            group.len(),
            group.includes().len(),
            group.defines().len(),
            group.compiler_flags().len()
        );
    }
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let raw = load_database(&args.compile_commands, &args.strip_paths)?;
    let stats = match &args.root {
        Some(root) => Analyzer::new(&raw.filter_by_path(root, true)).summary(args.top),
        None => Analyzer::new(&raw).summary(args.top),
    };

    if args.json {
        print_stdout(&serialize_json_pretty(&stats)?)
    } else {
        let source = args.compile_commands.display().to_string();
        print_stdout(&report::render_stats(&source, &stats))
    }
}

fn run_list(args: ListArgs) -> Result<()> {
    let raw = load_database(&args.compile_commands, &args.strip_paths)?;
    let relative_to = args.relative_to.as_deref();
    let items = match &args.root {
        Some(root) => list_items(&raw.filter_by_path(root, true), args.what, relative_to),
        None => list_items(&raw, args.what, relative_to),
    };

    if items.is_empty() {
        return Ok(());
    }
    print_stdout(&items.join("\n"))
}

fn list_items<D: CompilationEntries>(
    db: &D,
    what: ListKind,
    relative_to: Option<&Path>,
) -> Vec<String> {
    match what {
        ListKind::Files => db.all_files(relative_to),
        ListKind::Includes => db.all_includes(relative_to),
        ListKind::Defines => db.all_defines(),
    }
}
