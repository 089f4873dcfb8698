//! Batch import configuration
//!
//! A batch of imports is described by a TOML file listing one `[[imports]]` table per file:
//!
//! ```toml
//! [[imports]]
//! path = "devices/pump.eds"
//! node_id = 5
//!
//! [[imports]]
//! path = "devices/valve.dcf"
//! node_id = 6
//! canopen_manager = true
//! ```
//!
//! # Import fields
//!
//! - `path`: The EDS or DCF file. Relative paths are resolved against the directory containing
//!   the config file when it is loaded with [`ImportConfig::load`].
//! - `node_id`: The node ID substituted for `$NODEID`.
//! - `canopen_manager`: Optional, defaults to false. Import for a CANopen manager.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ResultExt as _, Snafu};

use crate::diagnostics::DiagnosticSink;
use crate::errors::ImportError;
use crate::import::{import_with_sink, ImportResult};

/// Error returned when loading an import config fails
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// An IO error occured while reading the file
    #[snafu(display("IO error reading {}: {source}", path.display()))]
    Io {
        /// The config file
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },
    /// An error occured in the TOML parser
    #[snafu(display("Toml parse error: {source}"))]
    TomlParsing {
        /// The toml error which led to this error
        source: toml::de::Error,
    },
    /// The same file is imported twice with the same options
    #[snafu(display("Duplicate import of {}", path.display()))]
    DuplicateImport {
        /// The file which is listed more than once
        path: PathBuf,
    },
}

/// One file to import
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImportJob {
    /// The EDS or DCF file
    pub path: PathBuf,
    /// Node ID substituted for `$NODEID`
    pub node_id: u8,
    /// Import for a CANopen manager
    #[serde(default)]
    pub canopen_manager: bool,
}

impl ImportJob {
    /// Run the import
    pub fn run(&self, sink: &dyn DiagnosticSink) -> Result<ImportResult, ImportError> {
        import_with_sink(&self.path, self.node_id, self.canopen_manager, sink)
    }
}

/// A list of imports
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// The imports, in the order they are listed
    #[serde(default)]
    pub imports: Vec<ImportJob>,
}

impl ImportConfig {
    /// Read a config from a TOML file
    ///
    /// Relative import paths are resolved against the directory of the config file.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        let config_str =
            std::fs::read_to_string(config_path).context(IoSnafu { path: config_path })?;
        let mut config = Self::load_from_str(&config_str)?;

        if let Some(base) = config_path.parent() {
            for job in &mut config.imports {
                if job.path.is_relative() {
                    job.path = base.join(&job.path);
                }
            }
        }
        Ok(config)
    }

    /// Read a config from a &str
    ///
    /// Paths are kept as written.
    pub fn load_from_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = toml::from_str(config_str).context(TomlParsingSnafu)?;
        config.validate_unique()?;
        Ok(config)
    }

    fn validate_unique(&self) -> Result<(), ConfigError> {
        for (i, job) in self.imports.iter().enumerate() {
            if self.imports[..i].contains(job) {
                return DuplicateImportSnafu {
                    path: job.path.clone(),
                }
                .fail();
            }
        }
        Ok(())
    }
}
