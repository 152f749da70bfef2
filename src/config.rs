//! Layered application configuration.
//!
//! Sources, lowest to highest priority:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`<config_dir>/dedupinator/config.toml`, or `--config PATH`)
//! 3. Environment variables prefixed `DEDUPINATOR_` (e.g. `DEDUPINATOR_BATCH_SIZE=500`)
//! 4. Command-line flags ([`Config::apply_scan_args`])
//!
//! `min_size` and `max_size` are read in `size_unit`. Loading converts them to
//! bytes, so a loaded [`Config`] always reports `size_unit = "b"`.
//!
//! # Example
//!
//! ```toml
//! min_size = 1
//! max_size = 2
//! size_unit = "gb"
//! skip_extensions = [".tmp", ".log"]
//! keep = "oldest"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::{ConfirmMode, DeleteMode};
use crate::cli::ScanArgs;
use crate::duplicates::{FinderConfig, RetentionRule, DEFAULT_PROGRESS_INTERVAL};
use crate::error::ConfigurationError;
use crate::scanner::{HashAlgorithm, SizeExtensionFilter, DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DEDUPINATOR_";

/// Extensions skipped unless configured otherwise.
pub const DEFAULT_SKIP_EXTENSIONS: [&str; 4] = [".tmp", ".temp", ".log", ".cache"];

/// Unit for `min_size`/`max_size`. Multiples of 1024.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    /// Bytes
    #[default]
    B,
    /// Kibibytes
    Kb,
    /// Mebibytes
    Mb,
    /// Gibibytes
    Gb,
    /// Tebibytes
    Tb,
}

impl SizeUnit {
    /// Bytes per unit.
    #[must_use]
    pub fn multiplier(self) -> u64 {
        match self {
            Self::B => 1,
            Self::Kb => 1 << 10,
            Self::Mb => 1 << 20,
            Self::Gb => 1 << 30,
            Self::Tb => 1 << 40,
        }
    }

    /// Convert `amount` of this unit to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSize`] on overflow.
    pub fn to_bytes(self, amount: u64) -> Result<u64, ConfigurationError> {
        amount
            .checked_mul(self.multiplier())
            .ok_or_else(|| ConfigurationError::InvalidSize(format!("{amount} {self:?}")))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Smallest file considered, in `size_unit`
    pub min_size: u64,
    /// Largest file considered, in `size_unit`; absent means unbounded
    pub max_size: Option<u64>,
    /// Unit for the size bounds
    pub size_unit: SizeUnit,
    /// Extensions never considered (case-insensitive)
    pub skip_extensions: Vec<String>,
    /// Candidates per traversal batch
    pub batch_size: usize,
    /// Bytes per read while hashing
    pub chunk_size: usize,
    /// Hashing workers; absent means available CPUs minus one
    pub workers: Option<usize>,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Which copy to keep
    pub keep: RetentionRule,
    /// Delete without asking
    pub auto_delete: bool,
    /// Ask per set or once per scan
    pub confirm_mode: ConfirmMode,
    /// Unlink or move to trash
    pub delete_mode: DeleteMode,
    /// Minimum spacing between progress updates
    pub progress_interval_ms: u64,
    /// Directory for CSV exports without an explicit path
    pub csv_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: None,
            size_unit: SizeUnit::B,
            skip_extensions: DEFAULT_SKIP_EXTENSIONS.iter().map(ToString::to_string).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            algorithm: HashAlgorithm::default(),
            keep: RetentionRule::default(),
            auto_delete: false,
            confirm_mode: ConfirmMode::default(),
            delete_mode: DeleteMode::default(),
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL.as_millis() as u64,
            csv_dir: None,
        }
    }
}

impl Config {
    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dedupinator").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load defaults, the TOML file and environment overrides.
    ///
    /// With `path` the file must exist; without it the default location is
    /// used when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] if a source cannot be parsed, and
    /// [`ConfigurationError::InvalidSize`] if a bound overflows.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let file = match path {
            Some(p) if !p.is_file() => {
                return Err(ConfigurationError::Load(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().filter(|p| p.is_file()),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Loading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let mut config: Self = figment
            .extract()
            .map_err(|e| ConfigurationError::Load(e.to_string()))?;
        config.normalize_sizes()?;
        Ok(config)
    }

    /// Convert the size bounds to bytes.
    fn normalize_sizes(&mut self) -> Result<(), ConfigurationError> {
        let unit = self.size_unit;
        self.min_size = unit.to_bytes(self.min_size)?;
        self.max_size = self.max_size.map(|max| unit.to_bytes(max)).transpose()?;
        self.size_unit = SizeUnit::B;
        Ok(())
    }

    /// Apply command-line overrides for a scan.
    ///
    /// Unsuffixed CLI sizes are read in `--unit` (bytes by default).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSize`] if a size overflows.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) -> Result<(), ConfigurationError> {
        let unit = args.unit.unwrap_or(SizeUnit::B);
        if let Some(min) = args.min_size {
            self.min_size = min.to_bytes(unit)?;
        }
        if let Some(max) = args.max_size {
            self.max_size = Some(max.to_bytes(unit)?);
        }
        if !args.skip_extensions.is_empty() {
            self.skip_extensions.clone_from(&args.skip_extensions);
        }
        if let Some(batch_size) = args.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(chunk_size) = args.chunk_size {
            self.chunk_size = usize::try_from(chunk_size.to_bytes(SizeUnit::B)?)
                .map_err(|_| ConfigurationError::InvalidSize(format!("{chunk_size}")))?;
        }
        if args.workers.is_some() {
            self.workers = args.workers;
        }
        if let Some(algorithm) = args.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(keep) = args.keep {
            self.keep = keep;
        }
        if args.auto_delete {
            self.auto_delete = true;
        }
        if args.dry_run {
            self.auto_delete = false;
        }
        if let Some(mode) = args.confirm_mode {
            self.confirm_mode = mode;
        }
        if args.trash {
            self.delete_mode = DeleteMode::Trash;
        }
        if let Some(ms) = args.progress_interval_ms {
            self.progress_interval_ms = ms;
        }
        Ok(())
    }

    /// Largest size in bytes; unbounded when not set.
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size.unwrap_or(u64::MAX)
    }

    /// Check settings that do not depend on the scan root.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self
            .skip_extensions
            .iter()
            .any(|ext| ext.trim().trim_start_matches('.').is_empty())
        {
            return Err(ConfigurationError::BlankExtension);
        }
        self.to_finder_config_unchecked().validate()
    }

    /// Size and extension filter for the walker.
    #[must_use]
    pub fn filter(&self) -> SizeExtensionFilter {
        SizeExtensionFilter::new(self.min_size, self.max_size_bytes(), &self.skip_extensions)
    }

    fn to_finder_config_unchecked(&self) -> FinderConfig {
        let mut config = FinderConfig::default()
            .with_filter(self.filter())
            .with_batch_size(self.batch_size)
            .with_chunk_size(self.chunk_size)
            .with_algorithm(self.algorithm)
            .with_retention(self.keep)
            .with_progress_interval(Duration::from_millis(self.progress_interval_ms));
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }

    /// Engine configuration after validation.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn to_finder_config(&self) -> Result<FinderConfig, ConfigurationError> {
        self.validate()?;
        Ok(self.to_finder_config_unchecked())
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Load(e.to_string()))
    }

    /// Write the default configuration to `path` (or the default location).
    ///
    /// An existing file is only replaced with `force`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] if no location is known, the file
    /// exists, or writing fails.
    pub fn write_default(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigurationError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path().ok_or_else(|| {
                ConfigurationError::Load("cannot determine configuration directory".to_string())
            })?,
        };
        if path.exists() && !force {
            return Err(ConfigurationError::Load(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        let content = Self::default().to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigurationError::Load(e.to_string()))?;
        }
        fs::write(&path, content).map_err(|e| ConfigurationError::Load(e.to_string()))?;
        log::info!("Wrote default configuration to {}", path.display());
        Ok(path)
    }
}
