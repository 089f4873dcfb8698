//! Import of the PDO configuration of an EDS or DCF file
use std::path::Path;

use eds_parser::{DeviceCommissioning, DeviceInfo, ObjectDictionary};
use snafu::{ensure, ResultExt as _};

use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::dummy::DummyRegistry;
use crate::errors::{
    ImportError, NodeIdNotAllowedSnafu, NotFoundSnafu, ParseSnafu, UnsupportedExtensionSnafu,
};
use crate::message::{assemble_messages, AssemblyParams, DirectionResult};
use crate::message::{FIRST_RX_PDO_INDEX, FIRST_TX_PDO_INDEX};
use crate::node_id::NodeId;

/// The messages imported from one file
#[derive(Clone, Debug, Default)]
pub struct ImportResult {
    /// Messages received by the node being configured
    pub rx: DirectionResult,
    /// Messages sent by the node being configured
    pub tx: DirectionResult,
    /// The `[DeviceInfo]` section of the file
    pub device_info: DeviceInfo,
    /// The `[DeviceComissioning]` section, present in DCF files
    pub device_commissioning: Option<DeviceCommissioning>,
}

impl ImportResult {
    /// General notes which are not tied to an imported message, Rx first
    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.rx
            .notes
            .iter()
            .chain(self.tx.notes.iter())
            .map(|s| s.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileKind {
    Eds,
    Dcf,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "eds" => Some(FileKind::Eds),
        "dcf" => Some(FileKind::Dcf),
        _ => None,
    }
}

/// Import the PDOs of an EDS or DCF file, logging diagnostics through the `log` crate
///
/// See [`import_with_sink`].
pub fn import(
    path: impl AsRef<Path>,
    node_id: u8,
    restrict_for_canopen: bool,
) -> Result<ImportResult, ImportError> {
    import_with_sink(path, node_id, restrict_for_canopen, &LogSink)
}

/// Import the PDOs of an EDS or DCF file
///
/// # Arguments
///
/// * `path` - The file; the extension `.eds` or `.dcf` (any case) selects the file kind
/// * `node_id` - Substituted for `$NODEID` in COB-IDs. For EDS files it must be in 1..=127.
/// * `restrict_for_canopen` - Import for a CANopen manager. The directions are seen from the
///   manager: its Rx messages are the device's TPDOs and its Tx messages the device's RPDOs.
/// * `sink` - Receives every note recorded during the import
pub fn import_with_sink(
    path: impl AsRef<Path>,
    node_id: u8,
    restrict_for_canopen: bool,
    sink: &dyn DiagnosticSink,
) -> Result<ImportResult, ImportError> {
    let path = path.as_ref();
    ensure!(path.is_file(), NotFoundSnafu { path });

    let Some(kind) = file_kind(path) else {
        return UnsupportedExtensionSnafu { path }.fail();
    };
    if kind == FileKind::Eds {
        ensure!(NodeId::new(node_id).is_ok(), NodeIdNotAllowedSnafu { node_id });
    }

    log::debug!("Importing {} for node {}", path.display(), node_id);
    let od = ObjectDictionary::load(path).context(ParseSnafu)?;
    let dummies = DummyRegistry::load(path);

    let (rx_base, tx_base) = if restrict_for_canopen {
        (FIRST_TX_PDO_INDEX, FIRST_RX_PDO_INDEX)
    } else {
        (FIRST_RX_PDO_INDEX, FIRST_TX_PDO_INDEX)
    };
    let (od_ref, dummies_ref) = (&od, &dummies);
    let params = move |base_index: u16, is_tx: bool| AssemblyParams {
        base_index,
        node_id,
        od: od_ref,
        dummies: dummies_ref,
        is_eds: kind == FileKind::Eds,
        is_tx,
        restricted: restrict_for_canopen,
    };

    let rx = assemble_messages(&params(rx_base, false), sink)?;
    let tx = assemble_messages(&params(tx_base, true), sink)?;

    log::debug!(
        "Imported {} Rx and {} Tx messages from {}",
        rx.messages.len(),
        tx.messages.len(),
        path.display()
    );
    Ok(ImportResult {
        rx,
        tx,
        device_info: od.device_info.clone(),
        device_commissioning: od.device_commissioning.clone(),
    })
}
