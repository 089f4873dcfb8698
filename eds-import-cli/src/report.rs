//! Human readable summary of an import
use std::fmt::{self, Display};

use eds_import::{DirectionResult, ImportResult, ImportedMessage, Signal, TxMethod};

/// Formats an [`ImportResult`] for the terminal
#[derive(Debug)]
pub struct Report<'a>(pub &'a ImportResult);

fn tx_method_str(method: TxMethod) -> String {
    match method {
        TxMethod::Cyclic => "cyclic".to_string(),
        TxMethod::OnEvent => "on event".to_string(),
        TxMethod::OnChange => "on change".to_string(),
        TxMethod::CanOpenType0 => "type 0".to_string(),
        TxMethod::CanOpenType1To240(n) => format!("type {n}"),
        TxMethod::CanOpenType254 => "type 254".to_string(),
        TxMethod::CanOpenType255 => "type 255".to_string(),
    }
}

fn write_signal(f: &mut fmt::Formatter<'_>, signal: &Signal) -> fmt::Result {
    write!(
        f,
        "    {:<32} bit {:>2} len {:>2} {:?} [{} .. {}] default {}",
        signal.name,
        signal.bit_start,
        signal.bit_length,
        signal.storage_type,
        signal.min,
        signal.max,
        signal.default
    )?;
    if let (Some(index), Some(sub)) = (signal.od_index, signal.od_sub_index) {
        write!(f, " (0x{index:04X}sub{sub:X})")?;
    }
    writeln!(f)
}

fn write_message(f: &mut fmt::Formatter<'_>, imported: &ImportedMessage) -> fmt::Result {
    let msg = &imported.message;
    let id_width = if msg.is_extended { 8 } else { 3 };
    write!(
        f,
        "  {} id 0x{:0width$X} dlc {} {} cycle {}ms timeout {}ms",
        msg.name,
        msg.can_id,
        msg.dlc,
        tx_method_str(msg.tx_method),
        msg.cycle_time_ms,
        msg.timeout_ms,
        width = id_width
    )?;
    if let Some(info) = &msg.canopen {
        write!(f, " inhibit {}ms", msg.delay_time_ms)?;
        if !info.active {
            write!(f, " (inactive)")?;
        }
    }
    writeln!(f)?;
    for signal in &msg.signals {
        write_signal(f, signal)?;
    }
    for note in &imported.notes {
        writeln!(f, "    note: {note}")?;
    }
    Ok(())
}

fn write_direction(f: &mut fmt::Formatter<'_>, label: &str, dir: &DirectionResult) -> fmt::Result {
    writeln!(f, "{label} messages: {}", dir.messages.len())?;
    for imported in &dir.messages {
        write_message(f, imported)?;
    }
    if !dir.skipped.is_empty() {
        writeln!(f, "Skipped {label} messages: {}", dir.skipped.len())?;
        for imported in &dir.skipped {
            write_message(f, imported)?;
        }
    }
    Ok(())
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let info = &result.device_info;
        if !info.vendor_name.is_empty() || !info.product_name.is_empty() {
            writeln!(f, "Device: {} {}", info.vendor_name, info.product_name)?;
        }
        if let Some(dc) = &result.device_commissioning {
            if let Some(node_id) = dc.node_id {
                writeln!(f, "Commissioned node ID: {node_id}")?;
            }
        }
        write_direction(f, "Rx", &result.rx)?;
        write_direction(f, "Tx", &result.tx)?;

        let mut notes = result.notes().peekable();
        if notes.peek().is_some() {
            writeln!(f, "Notes:")?;
            for note in notes {
                writeln!(f, "  {note}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assertables::assert_contains;
    use eds_import::{CanOpenManagerInfo, Message, SignalValue, StorageType};

    use super::*;

    fn signal() -> Signal {
        Signal {
            byte_order: Default::default(),
            bit_start: 0,
            bit_length: 16,
            storage_type: StorageType::S16,
            name: "Temperature".into(),
            is_array: false,
            data_set_values: vec![SignalValue::S16(0)],
            min: SignalValue::S16(-40),
            max: SignalValue::S16(125),
            default: SignalValue::S16(0),
            uses_default_min_max: false,
            od_index: Some(0x2000),
            od_sub_index: Some(0),
        }
    }

    #[test]
    fn test_report() {
        let mut result = ImportResult::default();
        result.device_info.vendor_name = "Acme".into();
        result.device_info.product_name = "Widget".into();
        result.rx.messages.push(ImportedMessage {
            message: Message {
                name: "TPDO1".into(),
                can_id: 0x185,
                dlc: 2,
                tx_method: TxMethod::CanOpenType254,
                signals: vec![signal()],
                canopen: Some(CanOpenManagerInfo {
                    cob_id_includes_node_id: true,
                    cob_id_offset: 0x180,
                    pdo_index: 0,
                    active: false,
                }),
                ..Default::default()
            },
            notes: vec!["Inhibit time rounded".into()],
        });
        result.tx.notes.push("RPDO2: PDO is disabled".into());

        let text = Report(&result).to_string();
        assert_contains!(text, "Device: Acme Widget");
        assert_contains!(text, "Rx messages: 1");
        assert_contains!(text, "TPDO1 id 0x185 dlc 2 type 254");
        assert_contains!(text, "(inactive)");
        assert_contains!(text, "[-40 .. 125] default 0 (0x2000sub0)");
        assert_contains!(text, "note: Inhibit time rounded");
        assert_contains!(text, "Tx messages: 0");
        assert_contains!(text, "Notes:\n  RPDO2: PDO is disabled");
        assert!(!text.contains("Skipped"));
    }
}
