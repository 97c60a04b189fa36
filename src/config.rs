//! Configuration types for allfiles
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The optional TOML configuration file
//! - The validated runtime configuration handed to the listing session
//!
//! Precedence is CLI flag, then config file, then built-in default.

use crate::backup::DEFAULT_PREFIX;
use crate::error::{ConfigError, WalkError};
use crate::fields::{FieldDescriptor, FieldSpec};
use crate::progress::DEFAULT_STAGE_SIZE;
use crate::store::{StoreKind, StoreOptions, DEFAULT_SEPARATOR, DEFAULT_TABLE};
use crate::walker::{PruneRules, WalkerKind, DEFAULT_PRUNE};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default output file name, relative to the working directory
pub const DEFAULT_OUTPUT: &str = "allfiles.db";

/// Largest accepted stage size
const MAX_STAGE_SIZE: usize = 10_000_000;

/// Create a flat listing of every file below one or more roots
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "allfiles",
    version,
    about = "Create a flat listing of every file below one or more roots",
    long_about = "Walks one or more root directories and writes one row per regular file \
                  (human readable size and path by default) to a text, JSON or SQLite output.\n\n\
                  The leading '.' of every path is replaced by the root's replacement string, \
                  so a listing made from /cygdrive/c reads c:/...",
    after_help = "EXAMPLES:\n    \
        allfiles -f /cygdrive/c\n    \
        allfiles -f /mnt/data --new-root R: -o data.tsv --store text\n    \
        allfiles -f --config roots.toml --store sqlite -o allfiles.db --progress"
)]
pub struct CliArgs {
    /// Root directory to list (overrides roots from the config file)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Actually create the listing
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Quick update of an existing listing (not implemented)
    #[arg(short = 'q', long)]
    pub quick: bool,

    /// Output file [default: allfiles.db]
    #[arg(short = 'o', long = "outputfile", value_name = "PATH")]
    pub outputfile: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output flavor: text, json or sqlite [default: text]
    #[arg(long, value_name = "FLAVOR")]
    pub store: Option<String>,

    /// Replacement for the leading '.' of paths below ROOT
    #[arg(long = "new-root", value_name = "PREFIX")]
    pub new_root: Option<String>,

    /// Field separator for text output [default: tab]
    #[arg(long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Table name for SQLite output [default: items]
    #[arg(long, value_name = "NAME")]
    pub table: Option<String>,

    /// Paths between two progress reports [default: 1024]
    #[arg(long, value_name = "NUM")]
    pub stage_size: Option<usize>,

    /// Traversal: native or find [default: native]
    #[arg(long, value_name = "KIND")]
    pub walker: Option<String>,

    /// Skip paths matching this fragment (can be repeated; replaces the defaults)
    #[arg(long = "prune", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub prune: Vec<String>,

    /// Write one output per root instead of one shared output
    #[arg(long)]
    pub per_root_output: bool,

    /// Emit strictly valid JSON (no trailing comma)
    #[arg(long)]
    pub strict_json: bool,

    /// Program run with a message when the listing is done
    #[arg(long, value_name = "PROGRAM")]
    pub notify_command: Option<String>,

    /// Show a live progress spinner
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// One `[[roots]]` entry of the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootEntry {
    pub source: PathBuf,
    pub replacement: Option<String>,
}

/// Contents of the TOML configuration file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub output: Option<PathBuf>,
    pub store: Option<String>,
    pub separator: Option<String>,
    pub table: Option<String>,
    pub stage_size: Option<usize>,
    pub walker: Option<String>,
    pub prune: Option<Vec<String>>,
    pub per_root_output: Option<bool>,
    pub strict_json: Option<bool>,
    pub notify_command: Option<String>,
    pub backup_prefix: Option<String>,
    pub roots: Vec<RootEntry>,
    pub fields: Option<Vec<FieldDescriptor>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// A traversal root and the string its leading '.' is replaced with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMapping {
    pub source: PathBuf,
    pub replacement: String,
}

impl RootMapping {
    /// Map `source`, deriving the replacement from the path when none is given
    pub fn new(source: PathBuf, replacement: Option<String>) -> Self {
        let replacement = replacement.unwrap_or_else(|| default_replacement(&source));
        Self {
            source,
            replacement,
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub roots: Vec<RootMapping>,
    pub output: PathBuf,
    pub store: StoreKind,
    pub store_options: StoreOptions,
    pub table: String,
    pub fields: FieldSpec,
    pub stage_size: usize,
    pub walker: WalkerKind,
    pub prune: PruneRules,
    pub per_root_output: bool,
    pub backup_prefix: String,
    pub notify_command: Option<String>,
    pub show_progress: bool,
}

impl ListingConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::from_parts(args, file)
    }

    /// Merge CLI arguments over an already loaded config file
    pub fn from_parts(args: CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        // A positional root replaces the configured roots
        let roots = match args.root {
            Some(root) => vec![RootMapping::new(root, args.new_root.clone())],
            None => file
                .roots
                .into_iter()
                .map(|r| RootMapping::new(r.source, r.replacement))
                .collect(),
        };
        if roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        for root in &roots {
            if !root.source.is_dir() {
                return Err(ConfigError::RootNotDirectory {
                    path: root.source.clone(),
                });
            }
        }

        let store: StoreKind = args
            .store
            .or(file.store)
            .as_deref()
            .unwrap_or("text")
            .parse()?;

        let walker: WalkerKind = match args.walker.or(file.walker) {
            Some(name) => name.parse()?,
            None => WalkerKind::default(),
        };

        let separator = args
            .separator
            .or(file.separator)
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        if separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }

        let stage_size = args
            .stage_size
            .or(file.stage_size)
            .unwrap_or(DEFAULT_STAGE_SIZE);
        if stage_size == 0 || stage_size > MAX_STAGE_SIZE {
            return Err(ConfigError::InvalidStageSize {
                size: stage_size,
                max: MAX_STAGE_SIZE,
            });
        }

        let prune_patterns: Vec<String> = if !args.prune.is_empty() {
            args.prune
        } else {
            file.prune
                .unwrap_or_else(|| DEFAULT_PRUNE.iter().map(|s| s.to_string()).collect())
        };
        let prune = PruneRules::new(&prune_patterns).map_err(|e| match e {
            WalkError::InvalidPrunePattern { pattern, reason } => {
                ConfigError::InvalidPrunePattern { pattern, reason }
            }
            other => ConfigError::InvalidPrunePattern {
                pattern: prune_patterns.join(", "),
                reason: other.to_string(),
            },
        })?;

        let fields = match file.fields {
            Some(fields) => FieldSpec::new(fields)?,
            None => FieldSpec::default(),
        };

        let output = args
            .outputfile
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        validate_output(&output)?;

        let table = args
            .table
            .or(file.table)
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());

        Ok(Self {
            roots,
            output,
            store,
            store_options: StoreOptions {
                separator,
                strict_json: args.strict_json || file.strict_json.unwrap_or(false),
            },
            table,
            fields,
            stage_size,
            walker,
            prune,
            per_root_output: args.per_root_output || file.per_root_output.unwrap_or(false),
            backup_prefix: file
                .backup_prefix
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            notify_command: args
                .notify_command
                .or(file.notify_command)
                .filter(|c| !c.trim().is_empty()),
            show_progress: args.progress,
        })
    }

    /// Output path used for `root`
    pub fn output_for(&self, root: &RootMapping) -> PathBuf {
        if self.per_root_output {
            per_root_path(&self.output, &root.replacement)
        } else {
            self.output.clone()
        }
    }
}

fn validate_output(output: &Path) -> Result<(), ConfigError> {
    if output.as_os_str().is_empty() {
        return Err(ConfigError::InvalidOutputPath {
            path: output.to_path_buf(),
            reason: "Path is empty".to_string(),
        });
    }
    if output.is_dir() {
        return Err(ConfigError::InvalidOutputPath {
            path: output.to_path_buf(),
            reason: "Path is a directory".to_string(),
        });
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidOutputPath {
                path: output.to_path_buf(),
                reason: format!("Parent directory '{}' does not exist", parent.display()),
            });
        }
    }
    Ok(())
}

/// Replacement derived from a root path: `/cygdrive/c/x` becomes `c:/x`,
/// anything else is used as written (without a trailing slash)
pub fn default_replacement(root: &Path) -> String {
    let text = root.to_string_lossy().replace('\\', "/");
    let text = text.trim_end_matches('/');
    if let Some(rest) = text.strip_prefix("/cygdrive/") {
        let mut chars = rest.chars();
        if let Some(drive) = chars.next() {
            let tail = chars.as_str();
            if tail.is_empty() || tail.starts_with('/') {
                return format!("{}:{}", drive, tail);
            }
        }
    }
    text.to_string()
}

/// `<stem>.<sanitized replacement><.ext>` next to `output`
pub fn per_root_path(output: &Path, replacement: &str) -> PathBuf {
    let sanitized: String = replacement
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let sanitized = sanitized.trim_matches('_');
    let tag = if sanitized.is_empty() { "root" } else { sanitized };

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "allfiles".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.{}.{}", stem, tag, ext.to_string_lossy()),
        None => format!("{}.{}", stem, tag),
    };
    output.with_file_name(name)
}
