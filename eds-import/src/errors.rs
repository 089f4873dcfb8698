//! Error types returned by the importer
use std::path::PathBuf;

use snafu::Snafu;

/// Error returned when an import fails
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ImportError {
    /// The input file does not exist
    #[snafu(display("File not found: {}", path.display()))]
    NotFound {
        /// The path which was requested
        path: PathBuf,
    },
    /// The input file has an extension other than `.eds` or `.dcf`
    #[snafu(display("Unsupported file type: {} (expected .eds or .dcf)", path.display()))]
    UnsupportedExtension {
        /// The path which was requested
        path: PathBuf,
    },
    /// The object dictionary could not be read from the file
    #[snafu(display("Error parsing object dictionary: {source}"))]
    Parse {
        /// The error reported by the dictionary reader
        source: eds_parser::LoadError,
    },
    /// The node ID is outside of the range allowed for EDS imports
    #[snafu(display("Node ID {node_id} is not allowed, expected a value from 1 to 127"))]
    NodeIdNotAllowed {
        /// The rejected node ID
        node_id: u8,
    },
    /// A required object is missing or holds an invalid value
    #[snafu(display("Invalid configuration: {message}"))]
    ConfigInvalid {
        /// Description of the problem
        message: String,
    },
    /// An object uses a data type which cannot be mapped to a signal
    #[snafu(display("Unsupported data type 0x{data_type:04X}"))]
    UnsupportedType {
        /// The CANopen data type code
        data_type: u16,
    },
}

/// Coarse classification of an [`ImportError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input file is missing
    NotFound,
    /// The file type is not supported or the file could not be parsed
    InvalidParameter,
    /// The node ID is out of range
    NodeIdNotAllowed,
    /// The object dictionary content is invalid
    ConfigInvalid,
    /// A data type is not supported
    UnsupportedType,
}

impl ImportError {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::NotFound { .. } => ErrorKind::NotFound,
            ImportError::UnsupportedExtension { .. } | ImportError::Parse { .. } => {
                ErrorKind::InvalidParameter
            }
            ImportError::NodeIdNotAllowed { .. } => ErrorKind::NodeIdNotAllowed,
            ImportError::ConfigInvalid { .. } => ErrorKind::ConfigInvalid,
            ImportError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
        }
    }

    /// The error text of the dictionary reader, if the file could not be parsed
    pub fn parsing_error(&self) -> Option<String> {
        match self {
            ImportError::Parse { source } => Some(source.to_string()),
            _ => None,
        }
    }
}
