//! Object Definitions
//!
//! Types describing the entries of an object dictionary as they appear in an EDS or DCF file.

/// Object Code value
///
/// Defines the type of an object, as given by the `ObjectType` key of an object section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectCode {
    /// An empty object
    Null,
    /// A large chunk of data
    Domain,
    /// A type definition
    DefType,
    /// A structure definition
    DefStruct,
    /// An object which has a single value
    #[default]
    Var,
    /// An array of sub-objects all with the same data type
    Array,
    /// A collection of sub-objects with varying types
    Record,
    /// A code not defined by CiA 306
    Unknown(u8),
}

impl From<u8> for ObjectCode {
    fn from(value: u8) -> Self {
        match value {
            0 => ObjectCode::Null,
            2 => ObjectCode::Domain,
            5 => ObjectCode::DefType,
            6 => ObjectCode::DefStruct,
            7 => ObjectCode::Var,
            8 => ObjectCode::Array,
            9 => ObjectCode::Record,
            _ => ObjectCode::Unknown(value),
        }
    }
}

/// Access type enum
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AccessType {
    /// Read-only
    #[default]
    Ro,
    /// Write-only
    Wo,
    /// Read-write
    Rw,
    /// Read-write, only readable via process data (RPDO side)
    Rwr,
    /// Read-write, only writeable via process data (TPDO side)
    Rww,
    /// Read-only, and also will never be changed, even internally by the device
    Const,
}

impl AccessType {
    /// Parse the value of an `AccessType` key
    ///
    /// Matching is case insensitive. Returns None for unknown strings.
    pub fn from_eds_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ro" => Some(AccessType::Ro),
            "wo" => Some(AccessType::Wo),
            "rw" => Some(AccessType::Rw),
            "rwr" => Some(AccessType::Rwr),
            "rww" => Some(AccessType::Rww),
            "const" => Some(AccessType::Const),
            _ => None,
        }
    }

    /// Returns true if an object with this access type can be read
    pub fn is_readable(&self) -> bool {
        !matches!(self, AccessType::Wo)
    }

    /// Returns true if an object with this access type can be written
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            AccessType::Rw | AccessType::Wo | AccessType::Rwr | AccessType::Rww
        )
    }
}

/// Indicate the type of data stored in an object
///
/// The discriminants are the CANopen data type codes used by the `DataType` key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Real32,
    VisibleString,
    OctetString,
    UnicodeString,
    TimeOfDay,
    TimeDifference,
    Domain,
    Int24,
    Real64,
    Int40,
    Int48,
    Int56,
    Int64,
    UInt24,
    UInt40,
    UInt48,
    UInt56,
    UInt64,
    Other(u16),
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Other(0)
    }
}

impl From<u16> for DataType {
    fn from(value: u16) -> Self {
        use DataType::*;
        match value {
            0x01 => Boolean,
            0x02 => Int8,
            0x03 => Int16,
            0x04 => Int32,
            0x05 => UInt8,
            0x06 => UInt16,
            0x07 => UInt32,
            0x08 => Real32,
            0x09 => VisibleString,
            0x0a => OctetString,
            0x0b => UnicodeString,
            0x0c => TimeOfDay,
            0x0d => TimeDifference,
            0x0f => Domain,
            0x10 => Int24,
            0x11 => Real64,
            0x12 => Int40,
            0x13 => Int48,
            0x14 => Int56,
            0x15 => Int64,
            0x16 => UInt24,
            0x18 => UInt40,
            0x19 => UInt48,
            0x1a => UInt56,
            0x1b => UInt64,
            _ => Other(value),
        }
    }
}

impl DataType {
    /// The numeric CANopen code of this data type
    pub fn code(&self) -> u16 {
        use DataType::*;
        match self {
            Boolean => 0x01,
            Int8 => 0x02,
            Int16 => 0x03,
            Int32 => 0x04,
            UInt8 => 0x05,
            UInt16 => 0x06,
            UInt32 => 0x07,
            Real32 => 0x08,
            VisibleString => 0x09,
            OctetString => 0x0a,
            UnicodeString => 0x0b,
            TimeOfDay => 0x0c,
            TimeDifference => 0x0d,
            Domain => 0x0f,
            Int24 => 0x10,
            Real64 => 0x11,
            Int40 => 0x12,
            Int48 => 0x13,
            Int56 => 0x14,
            Int64 => 0x15,
            UInt24 => 0x16,
            UInt40 => 0x18,
            UInt48 => 0x19,
            UInt56 => 0x1a,
            UInt64 => 0x1b,
            Other(code) => *code,
        }
    }

    /// Number of bits a value of this type occupies in a PDO
    ///
    /// Returns None for non-primitive types (strings, domains, time types) and unknown codes.
    pub fn bit_length(&self) -> Option<u16> {
        use DataType::*;
        match self {
            Boolean => Some(1),
            Int8 | UInt8 => Some(8),
            Int16 | UInt16 => Some(16),
            Int24 | UInt24 => Some(24),
            Int32 | UInt32 | Real32 => Some(32),
            Int40 | UInt40 => Some(40),
            Int48 | UInt48 => Some(48),
            Int56 | UInt56 => Some(56),
            Int64 | UInt64 | Real64 => Some(64),
            _ => None,
        }
    }

    /// Returns true for the signed integer types
    pub fn is_signed(&self) -> bool {
        use DataType::*;
        matches!(self, Int8 | Int16 | Int24 | Int32 | Int40 | Int48 | Int56 | Int64)
    }

    /// Returns true for REAL32 and REAL64
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Real32 | DataType::Real64)
    }

    /// Returns true if data type is one of the string types
    pub fn is_str(&self) -> bool {
        matches!(
            self,
            Self::VisibleString | Self::OctetString | Self::UnicodeString
        )
    }
}

/// A single entry of the object dictionary
///
/// A whole object (a VAR, or the header of an ARRAY/RECORD) has `sub_index == None`. Each
/// `[XXXXsubN]` section of an array or record produces its own entry with `sub_index == Some(N)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectEntry {
    /// Object index
    pub index: u16,
    /// The sub index, or None for a whole object
    pub sub_index: Option<u8>,
    /// The value of the `SubNumber` key for whole objects, 0 otherwise
    pub sub_number: u8,
    /// The object code from the `ObjectType` key
    pub object_type: ObjectCode,
    /// The data type; `DataType::Other(0)` when the section has no `DataType` key
    pub data_type: DataType,
    /// Human readable name from `ParameterName`
    pub name: String,
    /// DCF only: the configured name from `Denotation`
    pub denotation: String,
    /// The manufacturer default value string
    pub default_value: String,
    /// DCF only: the configured value string
    pub parameter_value: String,
    /// Raw `LowLimit` string, empty if absent
    pub low_limit: String,
    /// Raw `HighLimit` string, empty if absent
    pub high_limit: String,
    /// Access permissions
    pub access_type: AccessType,
    /// True if this entry can be mapped into a PDO
    pub pdo_mapping: bool,
}

impl ObjectEntry {
    /// Returns true if this entry describes a whole object rather than a sub index
    pub fn is_whole_object(&self) -> bool {
        self.sub_index.is_none()
    }
}
