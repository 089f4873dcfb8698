//! Signals derived from PDO mapping entries
//!
//! Each mapping entry of a PDO references an object in the dictionary. The object's data type
//! determines the bit length and storage type of the signal, and its `LowLimit`, `HighLimit` and
//! value strings determine the signal's range and default value.
use eds_parser::{DataType, ObjectCode, ObjectDictionary, ObjectEntry};
use snafu::ensure;

use crate::errors::{ConfigInvalidSnafu, ImportError, UnsupportedTypeSnafu};
use crate::values::{parse_i64, select_value};

/// Byte order of a signal in the CAN payload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// Intel byte order; the only order used by CANopen PDOs
    #[default]
    LittleEndian,
}

/// The numeric type used to store a signal value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum StorageType {
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    F32,
    F64,
}

impl StorageType {
    /// Width of the type in bits
    pub fn bits(&self) -> u16 {
        match self {
            StorageType::U8 | StorageType::S8 => 8,
            StorageType::U16 | StorageType::S16 => 16,
            StorageType::U32 | StorageType::S32 | StorageType::F32 => 32,
            StorageType::U64 | StorageType::S64 | StorageType::F64 => 64,
        }
    }

    /// True for the signed integer types
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            StorageType::S8 | StorageType::S16 | StorageType::S32 | StorageType::S64
        )
    }

    /// True for F32 and F64
    pub fn is_float(&self) -> bool {
        matches!(self, StorageType::F32 | StorageType::F64)
    }
}

/// A value with one of the [`StorageType`]s
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum SignalValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
    F32(f32),
    F64(f64),
}

impl SignalValue {
    /// Build an unsigned value of the given storage type
    ///
    /// Values which do not fit the type saturate.
    fn from_u64(storage: StorageType, v: u64) -> Self {
        match storage {
            StorageType::U8 => SignalValue::U8(v.min(u8::MAX as u64) as u8),
            StorageType::U16 => SignalValue::U16(v.min(u16::MAX as u64) as u16),
            StorageType::U32 => SignalValue::U32(v.min(u32::MAX as u64) as u32),
            _ => SignalValue::U64(v),
        }
    }

    /// Build a signed value of the given storage type
    ///
    /// Values which do not fit the type saturate.
    fn from_i64(storage: StorageType, v: i64) -> Self {
        match storage {
            StorageType::S8 => SignalValue::S8(v.clamp(i8::MIN as i64, i8::MAX as i64) as i8),
            StorageType::S16 => SignalValue::S16(v.clamp(i16::MIN as i64, i16::MAX as i64) as i16),
            StorageType::S32 => SignalValue::S32(v.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
            _ => SignalValue::S64(v),
        }
    }

    /// The storage type of this value
    pub fn storage_type(&self) -> StorageType {
        match self {
            SignalValue::U8(_) => StorageType::U8,
            SignalValue::U16(_) => StorageType::U16,
            SignalValue::U32(_) => StorageType::U32,
            SignalValue::U64(_) => StorageType::U64,
            SignalValue::S8(_) => StorageType::S8,
            SignalValue::S16(_) => StorageType::S16,
            SignalValue::S32(_) => StorageType::S32,
            SignalValue::S64(_) => StorageType::S64,
            SignalValue::F32(_) => StorageType::F32,
            SignalValue::F64(_) => StorageType::F64,
        }
    }
}

impl core::fmt::Display for SignalValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SignalValue::U8(v) => write!(f, "{v}"),
            SignalValue::U16(v) => write!(f, "{v}"),
            SignalValue::U32(v) => write!(f, "{v}"),
            SignalValue::U64(v) => write!(f, "{v}"),
            SignalValue::S8(v) => write!(f, "{v}"),
            SignalValue::S16(v) => write!(f, "{v}"),
            SignalValue::S32(v) => write!(f, "{v}"),
            SignalValue::S64(v) => write!(f, "{v}"),
            SignalValue::F32(v) => write!(f, "{v}"),
            SignalValue::F64(v) => write!(f, "{v}"),
        }
    }
}

/// A signal within a PDO
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    /// Always little endian for CANopen
    pub byte_order: ByteOrder,
    /// Position of the first bit in the payload
    pub bit_start: u16,
    /// Number of bits
    pub bit_length: u16,
    /// How the value is stored
    pub storage_type: StorageType,
    /// Signal name; the object's denotation if it has one, otherwise its parameter name
    pub name: String,
    /// Always false; array objects cannot be mapped as a single signal
    pub is_array: bool,
    /// Initial value for each data set; holds exactly one element equal to `default`
    pub data_set_values: Vec<SignalValue>,
    /// Lowest allowed value
    pub min: SignalValue,
    /// Highest allowed value
    pub max: SignalValue,
    /// Default value, within `min..=max`
    pub default: SignalValue,
    /// False if the object's `LowLimit` or `HighLimit` narrowed the range of the type
    pub uses_default_min_max: bool,
    /// Index of the mapped object; only set for CANopen manager imports
    pub od_index: Option<u16>,
    /// Sub index of the mapped object; only set for CANopen manager imports
    pub od_sub_index: Option<u8>,
}

/// Range and default value of a signal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    /// Lowest allowed value
    pub min: SignalValue,
    /// Highest allowed value
    pub max: SignalValue,
    /// Default value, clamped into `min..=max`
    pub default: SignalValue,
    /// False if either limit came from the object rather than the type
    pub uses_default_min_max: bool,
}

/// Select the storage type for a value of `data_type` occupying `bit_length` bits
///
/// Integers use the smallest type of matching signedness which holds all bits. BOOLEAN is stored
/// as unsigned.
pub fn storage_type_for(data_type: DataType, bit_length: u16) -> Result<StorageType, ImportError> {
    let size_class = match bit_length {
        0..=8 => 0,
        9..=16 => 1,
        17..=32 => 2,
        _ => 3,
    };
    if data_type.is_float() {
        return Ok(if bit_length <= 32 {
            StorageType::F32
        } else {
            StorageType::F64
        });
    }
    if data_type.bit_length().is_none() {
        return UnsupportedTypeSnafu {
            data_type: data_type.code(),
        }
        .fail();
    }
    let signed = [
        StorageType::S8,
        StorageType::S16,
        StorageType::S32,
        StorageType::S64,
    ];
    let unsigned = [
        StorageType::U8,
        StorageType::U16,
        StorageType::U32,
        StorageType::U64,
    ];
    Ok(if data_type.is_signed() {
        signed[size_class]
    } else {
        unsigned[size_class]
    })
}

/// Compute min, max and default for a signal
///
/// The limits of the type are narrowed by the entry's `HighLimit` (if below the type maximum) and
/// then by its `LowLimit` (if above the type minimum and below the resulting maximum). The
/// default value is clamped into the resulting range. Float signals always use the full range of
/// the type and a default of zero.
pub fn derive_limits(
    storage: StorageType,
    bit_length: u16,
    entry: &ObjectEntry,
    is_eds: bool,
) -> Result<Limits, ImportError> {
    ensure!(
        bit_length > 0 && bit_length <= storage.bits(),
        ConfigInvalidSnafu {
            message: format!(
                "{} bits do not fit into storage type {:?}",
                bit_length, storage
            )
        }
    );

    if storage.is_float() {
        let (min, max, default) = match storage {
            StorageType::F32 => (
                SignalValue::F32(f32::MIN),
                SignalValue::F32(f32::MAX),
                SignalValue::F32(0.0),
            ),
            _ => (
                SignalValue::F64(f64::MIN),
                SignalValue::F64(f64::MAX),
                SignalValue::F64(0.0),
            ),
        };
        return Ok(Limits {
            min,
            max,
            default,
            uses_default_min_max: true,
        });
    }

    let value = parse_i64(select_value(entry, is_eds)).unwrap_or(0);
    let mut uses_default_min_max = true;

    if storage.is_signed() {
        let natural_max = if bit_length >= 64 {
            i64::MAX
        } else {
            (1i64 << (bit_length - 1)) - 1
        };
        let natural_min = -natural_max - 1;

        let mut max = natural_max;
        let mut min = natural_min;
        if let Ok(high) = parse_i64(&entry.high_limit) {
            if high < natural_max {
                max = high;
                uses_default_min_max = false;
            }
        }
        if let Ok(low) = parse_i64(&entry.low_limit) {
            if low > natural_min && low < max {
                min = low;
                uses_default_min_max = false;
            }
        }

        let mut default = value;
        if default > max {
            default = max;
        }
        if default < min {
            default = min;
        }

        Ok(Limits {
            min: SignalValue::from_i64(storage, min),
            max: SignalValue::from_i64(storage, max),
            default: SignalValue::from_i64(storage, default),
            uses_default_min_max,
        })
    } else {
        let natural_max = if bit_length >= 64 {
            u64::MAX
        } else {
            (1u64 << bit_length) - 1
        };

        let mut max = natural_max;
        let mut min = 0u64;
        if let Ok(high) = parse_i64(&entry.high_limit) {
            if (high as u64) < natural_max {
                max = high as u64;
                uses_default_min_max = false;
            }
        }
        if let Ok(low) = parse_i64(&entry.low_limit) {
            if (low as u64) < max {
                min = low as u64;
                uses_default_min_max = false;
            }
        }

        let mut default = value as u64;
        if default > max {
            default = max;
        }
        if default < min {
            default = min;
        }

        Ok(Limits {
            min: SignalValue::from_u64(storage, min),
            max: SignalValue::from_u64(storage, max),
            default: SignalValue::from_u64(storage, default),
            uses_default_min_max,
        })
    }
}

/// Inputs shared by all signals created during one import
#[derive(Clone, Copy, Debug)]
pub struct SignalContext<'a> {
    /// The dictionary being imported
    pub od: &'a ObjectDictionary,
    /// CANopen manager import; records the mapped object on each signal
    pub restricted: bool,
    /// True for an EDS file, false for a DCF
    pub is_eds: bool,
}

/// Create the signal for a mapped object
///
/// # Arguments
///
/// * `index`, `sub` - The object referenced by the mapping entry
/// * `bit_start` - Position of the signal in the PDO payload
pub fn create_signal(
    ctx: &SignalContext,
    index: u16,
    sub: u8,
    bit_start: u16,
) -> Result<Signal, ImportError> {
    let Some(entry) = ctx.od.find(index, sub) else {
        return ConfigInvalidSnafu {
            message: format!("Object 0x{:04X}sub{:X} does not exist", index, sub),
        }
        .fail();
    };

    ensure!(
        !(entry.is_whole_object()
            && matches!(entry.object_type, ObjectCode::Array | ObjectCode::Record)),
        ConfigInvalidSnafu {
            message: format!(
                "Object 0x{:04X} is an array or record and cannot be mapped as one signal",
                index
            )
        }
    );

    let name = if entry.denotation.is_empty() {
        entry.name.clone()
    } else {
        entry.denotation.clone()
    };

    let bit_length = match entry.data_type.bit_length() {
        Some(len) => len,
        None => {
            return UnsupportedTypeSnafu {
                data_type: entry.data_type.code(),
            }
            .fail()
        }
    };
    let storage_type = storage_type_for(entry.data_type, bit_length)?;
    let limits = derive_limits(storage_type, bit_length, entry, ctx.is_eds)?;

    Ok(Signal {
        byte_order: ByteOrder::LittleEndian,
        bit_start,
        bit_length,
        storage_type,
        name,
        is_array: false,
        data_set_values: vec![limits.default],
        min: limits.min,
        max: limits.max,
        default: limits.default,
        uses_default_min_max: limits.uses_default_min_max,
        od_index: ctx.restricted.then_some(index),
        od_sub_index: ctx.restricted.then_some(sub),
    })
}
