//! Coercion of the string values found in EDS/DCF files into integers
//!
//! Numbers may be written in decimal, in hex with a `0x` prefix, or in octal with a leading `0`.
//! COB-IDs may additionally use the `$NODEID` macro, e.g. `$NODEID+0x180`.
use eds_parser::ObjectEntry;
use snafu::{ensure, OptionExt as _, Snafu};

/// Error returned when a string value cannot be coerced to an integer
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
pub enum ParseError {
    /// The value is empty
    #[snafu(display("value is empty"))]
    Empty,
    /// The value is not a valid integer literal
    #[snafu(display("'{text}' is not a valid integer"))]
    InvalidInteger {
        /// The offending text
        text: String,
    },
}

/// Result of [`parse_macro_integer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacroValue {
    /// The computed value
    pub value: u32,
    /// True if the expression referenced the node ID
    pub includes_node_id: bool,
}

fn strip_macro_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect()
}

/// Parse an unsigned literal, detecting the base from its prefix
///
/// The whole string must be consumed.
fn parse_literal(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        let octal = &text[1..];
        if !octal.chars().all(|c| ('0'..='7').contains(&c)) {
            return None;
        }
        u64::from_str_radix(octal, 8).ok()
    } else if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_literal_u32(text: &str) -> Result<u32, ParseError> {
    parse_literal(text)
        .and_then(|v| u32::try_from(v).ok())
        .context(InvalidIntegerSnafu { text })
}

/// Evaluate an integer expression which may reference the node ID
///
/// Whitespace and `$` are removed and the text is split on `+`. Each part is either an integer
/// literal or `nodeid` (case insensitive), which contributes `node_id`. The parts are summed.
pub fn parse_macro_integer(text: &str, node_id: u8) -> Result<MacroValue, ParseError> {
    let cleaned = strip_macro_chars(text).to_lowercase();
    ensure!(!cleaned.is_empty(), EmptySnafu);

    let mut value = 0u32;
    let mut includes_node_id = false;
    let mut parts = 0;
    for token in cleaned.split('+').filter(|t| !t.is_empty()) {
        parts += 1;
        if token == "nodeid" {
            value = value.wrapping_add(node_id as u32);
            includes_node_id = true;
        } else {
            value = value.wrapping_add(parse_literal_u32(token)?);
        }
    }
    ensure!(parts > 0, EmptySnafu);

    Ok(MacroValue {
        value,
        includes_node_id,
    })
}

/// Parse a signed 64-bit value, as used by `LowLimit` and `HighLimit`
///
/// Literals larger than `i64::MAX` but within the u64 range are accepted and reinterpreted as the
/// same 64-bit pattern, so `0xFFFFFFFFFFFFFFFF` yields -1.
pub fn parse_i64(text: &str) -> Result<i64, ParseError> {
    let cleaned = strip_macro_chars(text);
    ensure!(!cleaned.is_empty(), EmptySnafu);

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let magnitude = parse_literal(digits).context(InvalidIntegerSnafu { text })?;

    if negative {
        ensure!(
            magnitude <= i64::MIN.unsigned_abs(),
            InvalidIntegerSnafu { text }
        );
        Ok((magnitude as i64).wrapping_neg())
    } else {
        Ok(magnitude as i64)
    }
}

/// Strictly parse an unsigned 32-bit value
///
/// Only surrounding whitespace is tolerated; the node ID macro is not supported.
pub fn parse_u32(text: &str) -> Result<u32, ParseError> {
    let text = text.trim();
    ensure!(!text.is_empty(), EmptySnafu);
    parse_literal_u32(text)
}

/// Select the effective value string of an entry
///
/// A DCF carries the configured value in `ParameterValue`; when it is empty, or the file is an
/// EDS, the `DefaultValue` is used.
pub fn select_value(entry: &ObjectEntry, is_eds: bool) -> &str {
    if !is_eds && !entry.parameter_value.is_empty() {
        &entry.parameter_value
    } else {
        &entry.default_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_with_node_id() {
        assert_eq!(
            Ok(MacroValue {
                value: 15,
                includes_node_id: true
            }),
            parse_macro_integer("$NODEID+10", 5)
        );
        assert_eq!(
            Ok(MacroValue {
                value: 0x185,
                includes_node_id: true
            }),
            parse_macro_integer("0x180 + $NodeId", 5)
        );
    }

    #[test]
    fn test_macro_plain_literal() {
        assert_eq!(
            Ok(MacroValue {
                value: 0x181,
                includes_node_id: false
            }),
            parse_macro_integer("0x181", 5)
        );
        assert_eq!(8, parse_macro_integer("010", 5).unwrap().value);
    }

    #[test]
    fn test_macro_failures() {
        assert_eq!(Err(ParseError::Empty), parse_macro_integer("", 5));
        assert_eq!(Err(ParseError::Empty), parse_macro_integer(" $ ", 5));
        assert_eq!(Err(ParseError::Empty), parse_macro_integer("+", 5));
        assert!(parse_macro_integer("$NODEID+0x18G", 5).is_err());
        assert!(parse_macro_integer("nodeidx", 5).is_err());
        assert!(parse_macro_integer("0x1FFFFFFFF", 5).is_err());
    }

    #[test]
    fn test_parse_i64() {
        assert_eq!(Ok(-50), parse_i64("-50"));
        assert_eq!(Ok(100), parse_i64(" 100 "));
        assert_eq!(Ok(-16), parse_i64("-0x10"));
        assert_eq!(Ok(-1), parse_i64("0xFFFFFFFFFFFFFFFF"));
        assert_eq!(Ok(i64::MIN), parse_i64("-9223372036854775808"));
        assert_eq!(Err(ParseError::Empty), parse_i64(""));
        assert!(parse_i64("12abc").is_err());
        assert!(parse_i64("-").is_err());
        assert!(parse_i64("-9223372036854775809").is_err());
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(Ok(0x60000108), parse_u32("0x60000108"));
        assert_eq!(Ok(2), parse_u32(" 2"));
        assert!(parse_u32("$NODEID").is_err());
        assert!(parse_u32("2 3").is_err());
        assert!(parse_u32("09").is_err());
        assert_eq!(Err(ParseError::Empty), parse_u32(""));
    }

    #[test]
    fn test_select_value() {
        let mut entry = ObjectEntry {
            default_value: "1".into(),
            parameter_value: "2".into(),
            ..Default::default()
        };
        assert_eq!("1", select_value(&entry, true));
        assert_eq!("2", select_value(&entry, false));
        entry.parameter_value.clear();
        assert_eq!("1", select_value(&entry, false));
    }
}
