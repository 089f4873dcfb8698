//! Assembly of CAN messages from PDO communication and mapping parameters
//!
//! Each PDO is described by two objects:
//!
//! - The communication parameter (0x1400 + n for RPDOs, 0x1800 + n for TPDOs), with the COB-ID in
//!   sub 1, the transmission type in sub 2, the inhibit time in sub 3 and the event timer in sub 5
//! - The mapping parameter (0x1600 + n, 0x1A00 + n), with the number of mapped objects in sub 0
//!   and one mapping entry per sub index after that
//!
//! A mapping entry packs the referenced object as `index << 16 | sub << 8 | bit_length`.
//!
//! Each PDO is turned into a [`Message`] by passing a [`PdoState`] through a fixed sequence of
//! stages; each stage reads one parameter and returns the updated state.
use eds_parser::ObjectDictionary;

use crate::diagnostics::DiagnosticSink;
use crate::dummy::DummyRegistry;
use crate::errors::{ConfigInvalidSnafu, ImportError};
use crate::signal::{create_signal, Signal, SignalContext};
use crate::values::{parse_macro_integer, parse_u32, select_value};

/// Index of the first RPDO communication parameter
pub const FIRST_RX_PDO_INDEX: u16 = 0x1400;
/// Index of the first TPDO communication parameter
pub const FIRST_TX_PDO_INDEX: u16 = 0x1800;
/// Number of PDOs which may be defined in each direction
pub const MAX_PDOS: u16 = 0x200;
/// Maximum number of objects mapped into one PDO
pub const MAX_MAPPED_OBJECTS: u32 = 0x40;

/// Offset from a communication parameter object to its mapping parameter object
const MAPPING_OFFSET: u16 = 0x200;

const SUB_COB_ID: u8 = 1;
const SUB_TRANSMISSION_TYPE: u8 = 2;
const SUB_INHIBIT_TIME: u8 = 3;
const SUB_EVENT_TIMER: u8 = 5;

const COB_ID_INVALID_BIT: u32 = 1 << 31;
const COB_ID_EXTENDED_BIT: u32 = 1 << 29;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;
const STD_ID_MASK: u32 = 0x7FF;

const ACTIVITY: &str = "Import EDS/DCF";

/// Determines when a message is sent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TxMethod {
    /// Sent periodically with the cycle time
    #[default]
    Cyclic,
    /// Sent by the application when it chooses
    OnEvent,
    /// Sent when a signal value changes
    OnChange,
    /// CANopen transmission type 0: synchronous, acyclic
    CanOpenType0,
    /// CANopen transmission types 1 to 240: sent on every Nth SYNC
    CanOpenType1To240(u8),
    /// CANopen transmission type 254: event driven, manufacturer specific
    CanOpenType254,
    /// CANopen transmission type 255: event driven, device profile specific
    CanOpenType255,
}

/// Extra information recorded on messages imported for a CANopen manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanOpenManagerInfo {
    /// The COB-ID was given relative to the node ID, e.g. `$NODEID+0x180`
    pub cob_id_includes_node_id: bool,
    /// The COB-ID without the node ID, if it was included
    pub cob_id_offset: u32,
    /// Zero based number of the PDO within its direction
    pub pdo_index: u16,
    /// False if the COB-ID marks the PDO as invalid
    pub active: bool,
}

/// A CAN message derived from a PDO
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Message name, e.g. `TPDO1`
    pub name: String,
    /// The CAN ID; 29 bits if `is_extended`, else 11 bits
    pub can_id: u32,
    /// Uses a 29-bit identifier
    pub is_extended: bool,
    /// Data length in bytes
    pub dlc: u16,
    /// Cycle time in milliseconds
    pub cycle_time_ms: u32,
    /// Receive timeout in milliseconds
    pub timeout_ms: u32,
    /// Minimum time between two transmissions in milliseconds
    pub delay_time_ms: u16,
    /// When the message is sent
    pub tx_method: TxMethod,
    /// The signals, in mapping order
    pub signals: Vec<Signal>,
    /// Only set for CANopen manager imports
    pub canopen: Option<CanOpenManagerInfo>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            name: String::new(),
            can_id: 0,
            is_extended: false,
            dlc: 8,
            cycle_time_ms: 100,
            timeout_ms: 310,
            delay_time_ms: 0,
            tx_method: TxMethod::default(),
            signals: Vec::new(),
            canopen: None,
        }
    }
}

/// A message together with the notes recorded while importing it
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedMessage {
    /// The message
    pub message: Message,
    /// Human readable notes about conversions and skipped content, in the order they occurred
    pub notes: Vec<String>,
}

/// The messages imported for one direction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectionResult {
    /// Messages which were imported
    pub messages: Vec<ImportedMessage>,
    /// Messages which could not be used and were set aside, with their signals
    pub skipped: Vec<ImportedMessage>,
    /// Notes about PDOs which produced no message at all
    pub notes: Vec<String>,
}

/// Parameters for assembling the messages of one PDO block
#[derive(Clone, Copy, Debug)]
pub struct AssemblyParams<'a> {
    /// First communication parameter index; [`FIRST_RX_PDO_INDEX`] or [`FIRST_TX_PDO_INDEX`]
    pub base_index: u16,
    /// Node ID substituted for `$NODEID`
    pub node_id: u8,
    /// The dictionary being imported
    pub od: &'a ObjectDictionary,
    /// Data types usable as dummy mappings
    pub dummies: &'a DummyRegistry,
    /// True for an EDS, false for a DCF
    pub is_eds: bool,
    /// The messages are sent by the node being configured
    pub is_tx: bool,
    /// Import for a CANopen manager
    pub restricted: bool,
}

/// Intermediate state of one PDO while it is being assembled
#[derive(Debug)]
struct PdoState {
    comm_index: u16,
    pdo_index: u16,
    message: Message,
    bit_cursor: u16,
    skip: bool,
    notes: Vec<String>,
}

enum CobIdOutcome {
    Keep(PdoState),
    Inactive { note: String },
}

fn config_invalid(message: String) -> ImportError {
    ConfigInvalidSnafu { message }.build()
}

impl PdoState {
    fn new(p: &AssemblyParams, comm_index: u16) -> Self {
        let pdo_index = comm_index - p.base_index;
        let prefix = if p.base_index == FIRST_TX_PDO_INDEX {
            "TPDO"
        } else {
            "RPDO"
        };
        Self {
            comm_index,
            pdo_index,
            message: Message {
                name: format!("{}{}", prefix, pdo_index + 1),
                ..Default::default()
            },
            bit_cursor: 0,
            skip: false,
            notes: Vec::new(),
        }
    }

    fn info(&mut self, sink: &dyn DiagnosticSink, note: String) {
        sink.info(ACTIVITY, &format!("{}: {}", self.message.name, note));
        self.notes.push(note);
    }

    fn warn(&mut self, sink: &dyn DiagnosticSink, note: String) {
        sink.warn(ACTIVITY, &format!("{}: {}", self.message.name, note));
        self.notes.push(note);
    }

    /// Read an optional numeric communication parameter
    ///
    /// A missing entry yields None silently; an unreadable one yields None with a note.
    fn optional_param(
        &mut self,
        p: &AssemblyParams,
        sub: u8,
        what: &str,
        sink: &dyn DiagnosticSink,
    ) -> Option<u32> {
        let entry = p.od.find(self.comm_index, sub)?;
        let text = select_value(entry, p.is_eds);
        match parse_u32(text) {
            Ok(v) => Some(v),
            Err(e) => {
                self.warn(sink, format!("Could not read {}: {}. Value ignored.", what, e));
                None
            }
        }
    }

    fn apply_cob_id(
        mut self,
        p: &AssemblyParams,
        sink: &dyn DiagnosticSink,
    ) -> Result<CobIdOutcome, ImportError> {
        let Some(entry) = p.od.find(self.comm_index, SUB_COB_ID) else {
            return Err(config_invalid(format!(
                "{}: COB-ID object 0x{:04X}sub{:X} is missing",
                self.message.name, self.comm_index, SUB_COB_ID
            )));
        };
        let cob = parse_macro_integer(select_value(entry, p.is_eds), p.node_id).map_err(|e| {
            config_invalid(format!(
                "{}: invalid COB-ID in 0x{:04X}sub{:X}: {}",
                self.message.name, self.comm_index, SUB_COB_ID, e
            ))
        })?;

        let active = cob.value & COB_ID_INVALID_BIT == 0;
        if !active && !p.restricted {
            let note = format!(
                "{}: PDO with COB-ID 0x{:X} is disabled and was not imported",
                self.message.name,
                cob.value & EXTENDED_ID_MASK
            );
            sink.warn(ACTIVITY, &note);
            return Ok(CobIdOutcome::Inactive { note });
        }

        self.message.is_extended = cob.value & COB_ID_EXTENDED_BIT != 0;
        self.message.can_id = if self.message.is_extended {
            cob.value & EXTENDED_ID_MASK
        } else {
            cob.value & STD_ID_MASK
        };

        if p.restricted {
            let cob_id_offset = if cob.includes_node_id {
                self.message.can_id.wrapping_sub(p.node_id as u32)
            } else {
                self.message.can_id
            };
            self.message.canopen = Some(CanOpenManagerInfo {
                cob_id_includes_node_id: cob.includes_node_id,
                cob_id_offset,
                pdo_index: self.pdo_index,
                active,
            });
        }
        Ok(CobIdOutcome::Keep(self))
    }

    fn apply_transmission_type(
        mut self,
        p: &AssemblyParams,
        sink: &dyn DiagnosticSink,
    ) -> Result<Self, ImportError> {
        let entry = p.od.find(self.comm_index, SUB_TRANSMISSION_TYPE);

        if !p.restricted {
            let Some(entry) = entry else {
                return Err(config_invalid(format!(
                    "{}: transmission type object 0x{:04X}sub{:X} is missing",
                    self.message.name, self.comm_index, SUB_TRANSMISSION_TYPE
                )));
            };
            let ty = parse_u32(select_value(entry, p.is_eds)).map_err(|e| {
                config_invalid(format!(
                    "{}: invalid transmission type: {}",
                    self.message.name, e
                ))
            })?;
            match ty {
                1..=0xF0 => {
                    self.message.tx_method = TxMethod::Cyclic;
                    let note = format!(
                        "Message type synchronous converted to cyclic. Cycle time could not be \
                         imported, the current cycle time of {}ms is used.",
                        self.message.cycle_time_ms
                    );
                    self.info(sink, note);
                }
                0xFC | 0xFD => {
                    return Err(config_invalid(format!(
                        "{}: transmission type {} (RTR only) is not supported",
                        self.message.name, ty
                    )));
                }
                _ => self.message.tx_method = TxMethod::OnEvent,
            }
            return Ok(self);
        }

        let Some(entry) = entry else {
            self.message.tx_method = TxMethod::CanOpenType254;
            self.skip = true;
            self.info(
                sink,
                "Transmission type is missing. The message is not imported.".to_string(),
            );
            return Ok(self);
        };
        let text = select_value(entry, p.is_eds);
        match parse_u32(text) {
            Ok(0) => self.message.tx_method = TxMethod::CanOpenType0,
            Ok(n @ 1..=240) => self.message.tx_method = TxMethod::CanOpenType1To240(n as u8),
            Ok(254) => self.message.tx_method = TxMethod::CanOpenType254,
            Ok(255) => self.message.tx_method = TxMethod::CanOpenType255,
            _ => {
                self.message.tx_method = TxMethod::CanOpenType254;
                if entry.access_type.is_writable() {
                    self.info(
                        sink,
                        format!(
                            "Transmission type '{}' is not supported and was changed to 254.",
                            text
                        ),
                    );
                } else {
                    self.skip = true;
                    self.info(
                        sink,
                        format!(
                            "Transmission type '{}' is not supported and is read-only. The \
                             message is not imported.",
                            text
                        ),
                    );
                }
            }
        }
        Ok(self)
    }

    fn apply_event_timer(mut self, p: &AssemblyParams, sink: &dyn DiagnosticSink) -> Self {
        if !p.restricted && p.is_tx {
            return self;
        }
        let Some(timer) = self.optional_param(p, SUB_EVENT_TIMER, "event timer", sink) else {
            return self;
        };

        if p.restricted {
            self.message.cycle_time_ms = timer;
            self.message.timeout_ms = if p.is_tx || timer == 0 {
                timer
            } else {
                timer.saturating_mul(3).saturating_add(10)
            };
            return self;
        }

        match self.message.tx_method {
            TxMethod::OnEvent => self.message.timeout_ms = timer,
            TxMethod::Cyclic | TxMethod::OnChange => {
                if timer == 0 {
                    let note = format!(
                        "Event timer is 0. The default timeout of {}ms is used.",
                        self.message.timeout_ms
                    );
                    self.info(sink, note);
                } else {
                    self.message.timeout_ms = timer;
                }
            }
            _ => {}
        }
        self
    }

    fn apply_inhibit_time(mut self, p: &AssemblyParams, sink: &dyn DiagnosticSink) -> Self {
        if !p.restricted {
            return self;
        }
        let Some(inhibit) = self.optional_param(p, SUB_INHIBIT_TIME, "inhibit time", sink) else {
            return self;
        };
        // Inhibit time is in units of 100us
        let delay_ms = inhibit.div_ceil(10).min(u16::MAX as u32) as u16;
        self.message.delay_time_ms = delay_ms;
        if inhibit % 10 != 0 {
            let note = format!(
                "Inhibit time of {}us is not a multiple of 1ms and was rounded up to {}ms.",
                inhibit as u64 * 100,
                delay_ms
            );
            self.info(sink, note);
        }
        self
    }

    fn apply_mapping(
        mut self,
        p: &AssemblyParams,
        sink: &dyn DiagnosticSink,
    ) -> Result<Self, ImportError> {
        let mapping_index = self.comm_index + MAPPING_OFFSET;
        let Some(count_entry) = p.od.find(mapping_index, 0) else {
            self.info(sink, "PDO has no mapping.".to_string());
            return Ok(self);
        };
        let count = parse_u32(select_value(count_entry, p.is_eds)).map_err(|e| {
            config_invalid(format!(
                "{}: invalid number of mapped objects in 0x{:04X}sub0: {}",
                self.message.name, mapping_index, e
            ))
        })?;
        if count > MAX_MAPPED_OBJECTS {
            return Err(config_invalid(format!(
                "{}: {} mapped objects in 0x{:04X}sub0 exceed the maximum of {}",
                self.message.name, count, mapping_index, MAX_MAPPED_OBJECTS
            )));
        }

        let ctx = SignalContext {
            od: p.od,
            restricted: p.restricted,
            is_eds: p.is_eds,
        };
        for sub in 1..=count as u8 {
            let Some(entry) = p.od.find(mapping_index, sub) else {
                self.warn(
                    sink,
                    format!("Mapping entry 0x{:04X}sub{:X} is missing.", mapping_index, sub),
                );
                continue;
            };
            let raw = match parse_u32(select_value(entry, p.is_eds)) {
                Ok(raw) => raw,
                Err(e) => {
                    self.warn(
                        sink,
                        format!(
                            "Could not read mapping entry 0x{:04X}sub{:X}: {}",
                            mapping_index, sub, e
                        ),
                    );
                    continue;
                }
            };
            let ref_index = (raw >> 16) as u16;
            let ref_sub = (raw >> 8) as u8;
            let mapped_bits = (raw & 0xFF) as u16;

            if p.dummies.contains(ref_index) {
                self.bit_cursor = self.bit_cursor.saturating_add(mapped_bits);
                self.info(
                    sink,
                    format!(
                        "Dummy mapping of data type 0x{:04X} reserves {} bits.",
                        ref_index, mapped_bits
                    ),
                );
                continue;
            }

            match create_signal(&ctx, ref_index, ref_sub, self.bit_cursor) {
                Ok(signal) => {
                    if signal.bit_length != mapped_bits {
                        let note = format!(
                            "Signal \"{}\" is mapped with {} bits, but its data type has {} bits. \
                             {} bits are used.",
                            signal.name, mapped_bits, signal.bit_length, signal.bit_length
                        );
                        self.info(sink, note);
                    }
                    self.bit_cursor = self.bit_cursor.saturating_add(signal.bit_length);
                    self.message.signals.push(signal);
                }
                Err(e) => {
                    self.warn(
                        sink,
                        format!(
                            "Mapped object 0x{:04X}sub{:X} was not imported: {}",
                            ref_index, ref_sub, e
                        ),
                    );
                }
            }
        }

        if self.message.signals.is_empty() {
            self.info(sink, "PDO has no mapping.".to_string());
        }
        Ok(self)
    }

    /// Finalize the message; returns it with a flag set if it belongs in the skipped set
    fn finish(mut self, p: &AssemblyParams) -> (ImportedMessage, bool) {
        if p.restricted {
            let bytes = self
                .message
                .signals
                .iter()
                .map(|s| (s.bit_start as u32 + s.bit_length as u32).div_ceil(8))
                .max()
                .unwrap_or(0);
            self.message.dlc = bytes.min(8) as u16;
        }
        (
            ImportedMessage {
                message: self.message,
                notes: self.notes,
            },
            self.skip,
        )
    }
}

/// Build the messages for all PDOs of one block
///
/// Every whole object in `base_index..base_index + 0x200` is treated as a PDO communication
/// parameter. A message level error (missing COB-ID, invalid transmission type or mapping count)
/// aborts the whole block; problems with single mapping entries are recorded as notes on the
/// message.
pub fn assemble_messages(
    p: &AssemblyParams,
    sink: &dyn DiagnosticSink,
) -> Result<DirectionResult, ImportError> {
    let mut result = DirectionResult::default();
    let start = p.base_index as u32;

    for entry in p.od.whole_objects_in(start..start + MAX_PDOS as u32) {
        let state = PdoState::new(p, entry.index);
        let state = match state.apply_cob_id(p, sink)? {
            CobIdOutcome::Keep(state) => state,
            CobIdOutcome::Inactive { note } => {
                result.notes.push(note);
                continue;
            }
        };
        let state = state
            .apply_transmission_type(p, sink)?
            .apply_event_timer(p, sink)
            .apply_inhibit_time(p, sink)
            .apply_mapping(p, sink)?;

        let (imported, skip) = state.finish(p);
        if skip {
            result.skipped.push(imported);
        } else {
            result.messages.push(imported);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, NoopSink};
    use crate::errors::ErrorKind;
    use crate::signal::SignalValue;
    use eds_parser::{AccessType, DataType, ObjectCode};

    /// Builds dictionaries from a compact list of entries for the tests below
    fn od_from(entries: &[(u16, Option<u8>, DataType, AccessType, &str)]) -> ObjectDictionary {
        let mut text = String::from("[OptionalObjects]\n");
        let mut indices: Vec<u16> = entries.iter().map(|e| e.0).collect();
        indices.dedup();
        text += &format!("SupportedObjects={}\n", indices.len());
        for (i, idx) in indices.iter().enumerate() {
            text += &format!("{}=0x{:04X}\n", i + 1, idx);
        }
        for idx in &indices {
            let subs: Vec<_> = entries
                .iter()
                .filter(|e| e.0 == *idx && e.1.is_some())
                .collect();
            if subs.is_empty() {
                let e = entries.iter().find(|e| e.0 == *idx).unwrap();
                text += &format!(
                    "[{:X}]\nParameterName=Object {:X}\nObjectType=0x7\nDataType=0x{:04X}\nAccessType={}\nDefaultValue={}\nPDOMapping=1\n",
                    idx, idx, e.2.code(), access_str(e.3), e.4
                );
            } else {
                text += &format!(
                    "[{:X}]\nParameterName=Object {:X}\nObjectType=0x9\nSubNumber={}\n",
                    idx,
                    idx,
                    subs.len()
                );
                for e in subs {
                    text += &format!(
                        "[{:X}sub{:X}]\nParameterName=Sub {:X}\nObjectType=0x7\nDataType=0x{:04X}\nAccessType={}\nDefaultValue={}\nPDOMapping=0\n",
                        idx, e.1.unwrap(), e.1.unwrap(), e.2.code(), access_str(e.3), e.4
                    );
                }
            }
        }
        ObjectDictionary::from_str(text).unwrap()
    }

    fn access_str(a: AccessType) -> &'static str {
        match a {
            AccessType::Ro => "ro",
            AccessType::Rw => "rw",
            AccessType::Const => "const",
            _ => "rw",
        }
    }

    use AccessType::{Ro, Rw};
    use DataType::{Int16, UInt16, UInt32, UInt8};

    fn params<'a>(
        od: &'a ObjectDictionary,
        dummies: &'a DummyRegistry,
        base_index: u16,
        is_tx: bool,
        restricted: bool,
    ) -> AssemblyParams<'a> {
        AssemblyParams {
            base_index,
            node_id: 5,
            od,
            dummies,
            is_eds: true,
            is_tx,
            restricted,
        }
    }

    fn tpdo_od(cob_id: &str, transmission_type: &str, inhibit: &str, timer: &str) -> ObjectDictionary {
        od_from(&[
            (0x1800, Some(0), UInt8, Ro, "5"),
            (0x1800, Some(1), UInt32, Rw, cob_id),
            (0x1800, Some(2), UInt8, Rw, transmission_type),
            (0x1800, Some(3), UInt16, Rw, inhibit),
            (0x1800, Some(5), UInt16, Rw, timer),
            (0x1A00, Some(0), UInt8, Rw, "2"),
            (0x1A00, Some(1), UInt32, Rw, "0x20000010"),
            (0x1A00, Some(2), UInt32, Rw, "0x20010008"),
            (0x2000, None, Int16, Ro, "0"),
            (0x2001, None, UInt8, Ro, "0"),
        ])
    }

    #[test]
    fn test_layer2_tpdo() {
        let od = tpdo_od("$NODEID+0x180", "254", "0", "100");
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();

        assert_eq!(1, result.messages.len());
        assert!(result.skipped.is_empty());
        let msg = &result.messages[0].message;
        assert_eq!("TPDO1", msg.name);
        assert_eq!(0x185, msg.can_id);
        assert!(!msg.is_extended);
        assert_eq!(TxMethod::OnEvent, msg.tx_method);
        assert_eq!(8, msg.dlc);
        assert!(msg.canopen.is_none());
        // Tx messages keep their default timing in a layer 2 import
        assert_eq!(100, msg.cycle_time_ms);
        assert_eq!(310, msg.timeout_ms);

        assert_eq!(2, msg.signals.len());
        assert_eq!(0, msg.signals[0].bit_start);
        assert_eq!(16, msg.signals[0].bit_length);
        assert_eq!(16, msg.signals[1].bit_start);
        assert_eq!(SignalValue::U8(255), msg.signals[1].max);
        assert_eq!(None, msg.signals[0].od_index);
    }

    #[test]
    fn test_layer2_rpdo_event_timer_becomes_timeout() {
        let od = od_from(&[
            (0x1400, Some(1), UInt32, Rw, "0x205"),
            (0x1400, Some(2), UInt8, Rw, "255"),
            (0x1400, Some(5), UInt16, Rw, "250"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_RX_PDO_INDEX, false, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert_eq!("RPDO1", imported.message.name);
        assert_eq!(TxMethod::OnEvent, imported.message.tx_method);
        assert_eq!(250, imported.message.timeout_ms);
        assert!(imported.notes.iter().any(|n| n == "PDO has no mapping."));
    }

    #[test]
    fn test_layer2_cyclic_with_zero_timer_keeps_default_timeout() {
        let od = od_from(&[
            (0x1400, Some(1), UInt32, Rw, "0x205"),
            (0x1400, Some(2), UInt8, Rw, "1"),
            (0x1400, Some(5), UInt16, Rw, "0"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_RX_PDO_INDEX, false, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert_eq!(TxMethod::Cyclic, imported.message.tx_method);
        assert_eq!(310, imported.message.timeout_ms);
        assert!(imported.notes[0].contains("current cycle time of 100ms"));
        assert!(imported.notes[1].contains("default timeout of 310ms"));
    }

    #[test]
    fn test_layer2_rtr_transmission_type_fails() {
        let od = tpdo_od("0x185", "0xFD", "0", "0");
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let err = assemble_messages(&p, &NoopSink).unwrap_err();
        assert_eq!(ErrorKind::ConfigInvalid, err.kind());
    }

    #[test]
    fn test_missing_cob_id_aborts() {
        let od = od_from(&[(0x1800, Some(2), UInt8, Rw, "254")]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, true);
        let err = assemble_messages(&p, &NoopSink).unwrap_err();
        assert_eq!(ErrorKind::ConfigInvalid, err.kind());
        assert!(err.to_string().contains("COB-ID"));
    }

    #[test]
    fn test_inactive_pdo_policy() {
        let od = tpdo_od("0x80000185", "254", "0", "0");
        let dummies = DummyRegistry::default();

        let sink = CollectingSink::new();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &sink).unwrap();
        assert!(result.messages.is_empty());
        assert!(result.skipped.is_empty());
        assert_eq!(1, result.notes.len());
        assert!(result.notes[0].contains("0x185"));
        assert_eq!(1, sink.take().len());

        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        assert_eq!(1, result.messages.len());
        let info = result.messages[0].message.canopen.unwrap();
        assert!(!info.active);
        assert!(!info.cob_id_includes_node_id);
        assert_eq!(0x185, info.cob_id_offset);
    }

    #[test]
    fn test_extended_cob_id() {
        let od = tpdo_od("0x20012345", "254", "0", "0");
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let msg = &result.messages[0].message;
        assert!(msg.is_extended);
        assert_eq!(0x12345, msg.can_id);
    }

    #[test]
    fn test_manager_timing_and_dlc() {
        let od = tpdo_od("$NODEID+0x180", "1", "25", "100");
        let dummies = DummyRegistry::default();

        // Received by the manager
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        let msg = &imported.message;
        assert_eq!(TxMethod::CanOpenType1To240(1), msg.tx_method);
        assert_eq!(100, msg.cycle_time_ms);
        assert_eq!(310, msg.timeout_ms);
        assert_eq!(3, msg.delay_time_ms);
        assert_eq!(3, msg.dlc);
        assert!(imported.notes.iter().any(|n| n.contains("2500us")));
        let info = msg.canopen.unwrap();
        assert!(info.active);
        assert!(info.cob_id_includes_node_id);
        assert_eq!(0x180, info.cob_id_offset);
        assert_eq!(0, info.pdo_index);
        assert_eq!(Some(0x2000), msg.signals[0].od_index);
        assert_eq!(Some(0), msg.signals[0].od_sub_index);

        // Sent by the manager
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        assert_eq!(100, result.messages[0].message.timeout_ms);
    }

    #[test]
    fn test_manager_inhibit_without_rounding() {
        let od = tpdo_od("0x185", "254", "30", "0");
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert_eq!(3, imported.message.delay_time_ms);
        assert_eq!(0, imported.message.timeout_ms);
        assert!(imported.notes.is_empty());
    }

    #[test]
    fn test_manager_unsupported_transmission_type() {
        // Writeable: coerced to 254
        let od = tpdo_od("0x185", "252", "0", "0");
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        assert_eq!(1, result.messages.len());
        assert_eq!(TxMethod::CanOpenType254, result.messages[0].message.tx_method);

        // Read only: the message is diverted with its signals
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Ro, "252"),
            (0x1A00, Some(0), UInt8, Rw, "1"),
            (0x1A00, Some(1), UInt32, Rw, "0x20000010"),
            (0x2000, None, Int16, Ro, "0"),
        ]);
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        assert!(result.messages.is_empty());
        assert_eq!(1, result.skipped.len());
        assert_eq!(1, result.skipped[0].message.signals.len());
    }

    #[test]
    fn test_manager_missing_transmission_type_is_skipped() {
        let od = od_from(&[(0x1800, Some(1), UInt32, Rw, "0x185")]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        assert_eq!(1, result.skipped.len());
        assert_eq!(
            TxMethod::CanOpenType254,
            result.skipped[0].message.tx_method
        );
    }

    #[test]
    fn test_dummy_mapping_advances_cursor() {
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "2"),
            (0x1A00, Some(1), UInt32, Rw, "0x00050008"),
            (0x1A00, Some(2), UInt32, Rw, "0x20000010"),
            (0x2000, None, Int16, Ro, "0"),
        ]);
        let mut dummies = DummyRegistry::default();
        dummies.insert(5);
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, false, true);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let msg = &result.messages[0].message;
        assert_eq!(1, msg.signals.len());
        assert_eq!(8, msg.signals[0].bit_start);
        assert_eq!(3, msg.dlc);
    }

    #[test]
    fn test_unregistered_dummy_is_a_failed_signal() {
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "1"),
            (0x1A00, Some(1), UInt32, Rw, "0x00050008"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert!(imported.message.signals.is_empty());
        assert!(imported.notes.iter().any(|n| n.contains("0x0005sub0")));
        assert!(imported.notes.iter().any(|n| n == "PDO has no mapping."));
    }

    #[test]
    fn test_mapping_length_mismatch_uses_type_length() {
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "2"),
            (0x1A00, Some(1), UInt32, Rw, "0x20000008"),
            (0x1A00, Some(2), UInt32, Rw, "0x20010008"),
            (0x2000, None, Int16, Ro, "0"),
            (0x2001, None, UInt8, Ro, "0"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert_eq!(16, imported.message.signals[1].bit_start);
        assert!(imported.notes[0].contains("mapped with 8 bits"));
    }

    #[test]
    fn test_mapping_count_limits() {
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "0x41"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let err = assemble_messages(&p, &NoopSink).unwrap_err();
        assert_eq!(ErrorKind::ConfigInvalid, err.kind());

        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "many"),
        ]);
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        assert!(assemble_messages(&p, &NoopSink).is_err());
    }

    #[test]
    fn test_mapping_whole_record_is_rejected() {
        let od = od_from(&[
            (0x1800, Some(1), UInt32, Rw, "0x185"),
            (0x1800, Some(2), UInt8, Rw, "254"),
            (0x1A00, Some(0), UInt8, Rw, "1"),
            (0x1A00, Some(1), UInt32, Rw, "0x30000020"),
            (0x3000, Some(1), UInt32, Rw, "0"),
        ]);
        let dummies = DummyRegistry::default();
        let p = params(&od, &dummies, FIRST_TX_PDO_INDEX, true, false);
        let result = assemble_messages(&p, &NoopSink).unwrap();
        let imported = &result.messages[0];
        assert!(imported.message.signals.is_empty());
        assert!(imported.notes[0].contains("array or record"));
        assert_eq!(ObjectCode::Record, od.find(0x3000, 0).unwrap().object_type);
    }
}
