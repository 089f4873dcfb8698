//! Command-line front end for `eds-import`
//!
//! # eds-import
//!
//! Reads the PDO configuration of an EDS or DCF file and prints the resulting messages and
//! signals, along with every note recorded during the import.
//!
//! Usage examples:
//!
//! - `eds-import import device.eds --node-id 5`
//! - `eds-import import node.dcf --node-id 0x10 --canopen-manager`
//! - `eds-import batch imports.toml`

pub mod command;
pub mod report;
