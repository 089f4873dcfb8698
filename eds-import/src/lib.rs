//! Derives CAN messages and signals from the PDO configuration of CANopen EDS and DCF files
//!
//! The PDO communication parameters (0x1400 for RPDOs, 0x1800 for TPDOs) and the mapping
//! parameters (0x1600, 0x1A00) of a device are read from its electronic data sheet and turned into
//! [`Message`]s, each carrying the [`Signal`]s mapped into it.
//!
//! Two modes are supported:
//!
//! - A plain layer 2 import, where messages get a generic transmission method derived from the
//!   PDO transmission type.
//! - An import for a CANopen manager (`restrict_for_canopen`), which keeps the CANopen
//!   transmission type, timing, and a reference from each signal back to its object.
//!
//! ```no_run
//! let result = eds_import::import("device.eds", 5, false).unwrap();
//! for imported in &result.tx.messages {
//!     println!("{} 0x{:x}", imported.message.name, imported.message.can_id);
//! }
//! ```
//!
//! Anything the importer converts, defaults or skips is recorded as a note on the message and
//! reported to a [`DiagnosticSink`].
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod diagnostics;
pub mod dummy;
mod errors;
mod import;
pub mod message;
pub mod node_id;
pub mod signal;
pub mod values;

pub use diagnostics::{CollectingSink, DiagnosticSink, LogSink, NoopSink};
pub use dummy::DummyRegistry;
pub use errors::{ErrorKind, ImportError};
pub use import::{import, import_with_sink, ImportResult};
pub use message::{CanOpenManagerInfo, DirectionResult, ImportedMessage, Message, TxMethod};
pub use node_id::NodeId;
pub use signal::{Signal, SignalValue, StorageType};

pub use eds_parser;
