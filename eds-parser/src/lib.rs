//! Reader for CANopen electronic data sheets (EDS) and device configuration files (DCF)
//!
//! Both formats are INI files laid out according to CiA 306. The object lists
//! (`[MandatoryObjects]`, `[OptionalObjects]`, `[ManufacturerObjects]`) name the objects present
//! on the device, and each object is described by a section named after its hex index, with one
//! additional `[XXXXsubN]` section per sub index for arrays and records.
//!
//! The result is an [`ObjectDictionary`]: a flat list of [`ObjectEntry`] values ordered by index
//! and sub index.
#![warn(missing_docs, missing_debug_implementations)]

use configparser::ini::Ini;
use snafu::{ResultExt as _, Snafu};
use std::{collections::HashMap, path::Path};

pub mod objects;

pub use objects::{AccessType, DataType, ObjectCode, ObjectEntry};

/// Error returned when an EDS or DCF file cannot be read
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    /// The file is not valid INI
    #[snafu(display("INI format error: {message}"))]
    IniFormatError {
        /// Message from the INI reader
        message: String,
    },
    /// The file is valid INI, but is missing content required by CiA 306
    #[snafu(display("EDS format error: {message}"))]
    EdsFormatError {
        /// Description of the problem
        message: String,
    },
    /// A numeric field could not be parsed
    #[snafu(display("{message}: {source}"))]
    ParseIntError {
        /// Which field was being parsed
        message: String,
        /// The underlying error
        source: std::num::ParseIntError,
    },
}

/// Contents of the `[FileInfo]` section
#[derive(Clone, Debug, Default)]
#[allow(missing_docs)]
pub struct FileInfo {
    pub file_name: String,
    pub file_version: Option<u32>,
    pub file_revision: Option<u32>,
    pub eds_version: String,
    pub description: String,
    pub created_by: String,
    pub modified_by: String,
}

/// Contents of the `[DeviceInfo]` section
#[derive(Clone, Debug, Default)]
#[allow(missing_docs)]
pub struct DeviceInfo {
    pub vendor_name: String,
    pub vendor_number: Option<u32>,
    pub product_name: String,
    pub product_number: Option<u32>,
    pub revision_number: Option<u32>,
    pub rpdo_count: Option<u32>,
    pub tpdo_count: Option<u32>,
    pub lss_supported: bool,
}

/// Contents of the `[DeviceComissioning]` section, which is only present in DCF files
#[derive(Clone, Debug, Default)]
pub struct DeviceCommissioning {
    /// The node ID the device was configured with
    pub node_id: Option<u32>,
    /// Name given to the node in the network
    pub node_name: String,
    /// Configured baudrate in kbit/s
    pub baudrate: Option<u32>,
}

/// An object dictionary read from an EDS or DCF file
#[derive(Clone, Debug, Default)]
pub struct ObjectDictionary {
    /// File metadata
    pub file_info: FileInfo,
    /// Device description
    pub device_info: DeviceInfo,
    /// Commissioning data, if the file has a `[DeviceComissioning]` section
    pub device_commissioning: Option<DeviceCommissioning>,
    entries: Vec<ObjectEntry>,
}

struct Section<'a> {
    map: &'a HashMap<String, Option<String>>,
    section: String,
}

type IniMap = HashMap<String, HashMap<String, Option<String>>>;

/// Parse an integer which may carry a `0x` prefix
///
/// Without the prefix the value is taken as decimal.
fn parse_int(s: &str) -> Result<u32, std::num::ParseIntError> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Parse a hex integer, with or without the `0x` prefix
fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16)
}

impl<'a> Section<'a> {
    pub fn from_map(map: &'a IniMap, section: &str) -> Result<Self, LoadError> {
        match Self::from_map_opt(map, section) {
            Some(s) => Ok(s),
            None => EdsFormatSnafu {
                message: format!("Missing required section '{}'", section),
            }
            .fail(),
        }
    }

    pub fn from_map_opt(map: &'a IniMap, section: &str) -> Option<Self> {
        map.get(&section.to_lowercase()).map(|section_map| Self {
            map: section_map,
            section: section.to_string(),
        })
    }

    fn raw(&self, field: &str) -> Option<&'a str> {
        self.map
            .get(&field.to_lowercase())
            .map(|v| v.as_deref().unwrap_or("").trim())
    }

    pub fn get_string(&self, field: &str) -> Result<String, LoadError> {
        match self.raw(field) {
            Some(value) => Ok(value.to_string()),
            None => EdsFormatSnafu {
                message: format!("Missing required field '{}' in '{}'", field, self.section),
            }
            .fail(),
        }
    }

    /// Read an optional string field, returning an empty string if it is absent
    pub fn get_string_or_empty(&self, field: &str) -> String {
        self.raw(field).unwrap_or("").to_string()
    }

    /// Read a field as an unsigned int, decimal or `0x` prefixed hex
    ///
    /// The field must contain a valid integer value or an error is returned
    pub fn get_u32(&self, field: &str) -> Result<u32, LoadError> {
        let value = self.get_string(field)?;
        parse_int(&value).context(ParseIntSnafu {
            message: format!("Parsing '{}' in section '{}'", field, self.section),
        })
    }

    /// Read an optional field as an unsigned int
    ///
    /// If the field is absent or empty, None is returned. If the field has a non-empty value that
    /// is not a valid integer, it will return a LoadError::ParseIntError.
    pub fn get_u32_opt(&self, field: &str) -> Result<Option<u32>, LoadError> {
        match self.raw(field) {
            None | Some("") => Ok(None),
            Some(value) => Ok(Some(parse_int(value).context(ParseIntSnafu {
                message: format!("Parsing '{}' in section '{}'", field, self.section),
            })?)),
        }
    }

    pub fn get_bool(&self, field: &str) -> Result<bool, LoadError> {
        // Boolean is stored as 0 or 1
        Ok(self.get_u32_opt(field)?.unwrap_or(0) == 1)
    }
}

fn read_entry(section: &Section, index: u16, sub_index: Option<u8>) -> Result<ObjectEntry, LoadError> {
    let access_str = section.get_string("AccessType")?;
    let access_type = match AccessType::from_eds_str(&access_str) {
        Some(a) => a,
        None => {
            return EdsFormatSnafu {
                message: format!(
                    "Invalid AccessType '{}' in '{}'",
                    access_str, section.section
                ),
            }
            .fail()
        }
    };

    Ok(ObjectEntry {
        index,
        sub_index,
        sub_number: 0,
        object_type: ObjectCode::from(section.get_u32_opt("ObjectType")?.unwrap_or(7) as u8),
        data_type: DataType::from(section.get_u32("DataType")? as u16),
        name: section.get_string("ParameterName")?,
        denotation: section.get_string_or_empty("Denotation"),
        default_value: section.get_string_or_empty("DefaultValue"),
        parameter_value: section.get_string_or_empty("ParameterValue"),
        low_limit: section.get_string_or_empty("LowLimit"),
        high_limit: section.get_string_or_empty("HighLimit"),
        access_type,
        pdo_mapping: section.get_bool("PDOMapping")?,
    })
}

fn read_object(map: &IniMap, index: u16, entries: &mut Vec<ObjectEntry>) -> Result<(), LoadError> {
    let obj_section = Section::from_map(map, &format!("{:x}", index))?;
    let sub_number = obj_section.get_u32_opt("SubNumber")?.unwrap_or(0);
    let object_type = ObjectCode::from(obj_section.get_u32_opt("ObjectType")?.unwrap_or(7) as u8);

    if sub_number == 0 {
        // There are no explicit subobjects; the top level section describes the whole value
        entries.push(read_entry(&obj_section, index, None)?);
        return Ok(());
    }

    entries.push(ObjectEntry {
        index,
        sub_index: None,
        sub_number: sub_number.min(u8::MAX as u32) as u8,
        object_type,
        data_type: DataType::from(obj_section.get_u32_opt("DataType")?.unwrap_or(0) as u16),
        name: obj_section.get_string("ParameterName")?,
        denotation: obj_section.get_string_or_empty("Denotation"),
        ..Default::default()
    });

    let mut found = 0;
    for sub in 0..=255u8 {
        // Not all subs are necessarily defined; e.g. there may be a sub1 and a sub3, but no sub2
        let Some(sub_section) = Section::from_map_opt(map, &format!("{:x}sub{:x}", index, sub))
        else {
            continue;
        };
        entries.push(read_entry(&sub_section, index, Some(sub))?);
        found += 1;
        if found == sub_number {
            break;
        }
    }
    Ok(())
}

fn read_object_list(map: &IniMap, name: &str, entries: &mut Vec<ObjectEntry>) -> Result<bool, LoadError> {
    let Some(top_section) = Section::from_map_opt(map, name) else {
        return Ok(false);
    };
    let num_objects = top_section.get_u32("SupportedObjects")?;
    for i in 1..num_objects + 1 {
        let raw = top_section.get_string(&i.to_string())?;
        let obj_num = parse_hex(&raw).context(ParseIntSnafu {
            message: format!("Parsing '{}' in section '{}'", i, name),
        })?;
        if obj_num > u16::MAX as u32 {
            return EdsFormatSnafu {
                message: format!("Object index 0x{:x} in '{}' is out of range", obj_num, name),
            }
            .fail();
        }
        read_object(map, obj_num as u16, entries)?;
    }
    Ok(true)
}

fn read_file_info(map: &IniMap) -> Result<FileInfo, LoadError> {
    let Some(cfg) = Section::from_map_opt(map, "FileInfo") else {
        return Ok(FileInfo::default());
    };
    Ok(FileInfo {
        file_name: cfg.get_string_or_empty("FileName"),
        file_version: cfg.get_u32_opt("FileVersion")?,
        file_revision: cfg.get_u32_opt("FileRevision")?,
        eds_version: cfg.get_string_or_empty("EDSVersion"),
        description: cfg.get_string_or_empty("Description"),
        created_by: cfg.get_string_or_empty("CreatedBy"),
        modified_by: cfg.get_string_or_empty("ModifiedBy"),
    })
}

fn read_device_info(map: &IniMap) -> Result<DeviceInfo, LoadError> {
    let Some(cfg) = Section::from_map_opt(map, "DeviceInfo") else {
        return Ok(DeviceInfo::default());
    };
    Ok(DeviceInfo {
        vendor_name: cfg.get_string_or_empty("VendorName"),
        vendor_number: cfg.get_u32_opt("VendorNumber")?,
        product_name: cfg.get_string_or_empty("ProductName"),
        product_number: cfg.get_u32_opt("ProductNumber")?,
        revision_number: cfg.get_u32_opt("RevisionNumber")?,
        rpdo_count: cfg.get_u32_opt("NrOfRXPDO")?,
        tpdo_count: cfg.get_u32_opt("NrOfTXPDO")?,
        lss_supported: cfg.get_bool("LSS_Supported")?,
    })
}

fn read_device_commissioning(map: &IniMap) -> Result<Option<DeviceCommissioning>, LoadError> {
    let Some(cfg) = Section::from_map_opt(map, "DeviceComissioning") else {
        return Ok(None);
    };
    Ok(Some(DeviceCommissioning {
        node_id: cfg.get_u32_opt("NodeID")?,
        node_name: cfg.get_string_or_empty("NodeName"),
        baudrate: cfg.get_u32_opt("Baudrate")?,
    }))
}

impl ObjectDictionary {
    /// Build the dictionary from an already parsed INI map
    pub fn from_config_map(map: &IniMap) -> Result<ObjectDictionary, LoadError> {
        let mut entries = Vec::new();
        let mut any_list = false;
        for list in ["MandatoryObjects", "OptionalObjects", "ManufacturerObjects"] {
            any_list |= read_object_list(map, list, &mut entries)?;
        }
        if !any_list {
            return EdsFormatSnafu {
                message: "No object list section found",
            }
            .fail();
        }

        // Whole objects sort ahead of their sub indices
        entries.sort_by_key(|e| (e.index, e.sub_index.map(|s| s as i16).unwrap_or(-1)));
        entries.dedup_by_key(|e| (e.index, e.sub_index));

        Ok(ObjectDictionary {
            file_info: read_file_info(map)?,
            device_info: read_device_info(map)?,
            device_commissioning: read_device_commissioning(map)?,
            entries,
        })
    }

    #[allow(clippy::should_implement_trait)]
    /// Read a dictionary from the contents of an EDS or DCF file
    pub fn from_str<S: Into<String>>(eds_file: S) -> Result<ObjectDictionary, LoadError> {
        let s = eds_file.into();
        let mut config = Ini::new();
        let map = config
            .read(s)
            .map_err(|e| IniFormatSnafu { message: e }.build())?;
        Self::from_config_map(&map)
    }

    /// Read a dictionary from an EDS or DCF file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ObjectDictionary, LoadError> {
        let mut config = Ini::new();
        let map = config
            .load(path)
            .map_err(|e| IniFormatSnafu { message: e }.build())?;
        Self::from_config_map(&map)
    }

    /// All entries, ordered by index and then sub index
    pub fn entries(&self) -> &[ObjectEntry] {
        &self.entries
    }

    /// Iterate over the whole-object entries with an index in `range`
    pub fn whole_objects_in(
        &self,
        range: std::ops::Range<u32>,
    ) -> impl Iterator<Item = &ObjectEntry> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.is_whole_object() && range.contains(&(e.index as u32)))
    }

    /// Find an entry by index and sub index
    ///
    /// For sub index 0 the explicit `sub0` entry of an array or record is returned when it exists,
    /// otherwise the whole object with that index. Any other sub index only matches an entry read
    /// from an `[XXXXsubN]` section.
    pub fn find(&self, index: u16, sub: u8) -> Option<&ObjectEntry> {
        let sub_entry = self
            .entries
            .iter()
            .find(|e| e.index == index && e.sub_index == Some(sub));
        if sub_entry.is_some() || sub != 0 {
            return sub_entry;
        }
        self.entries
            .iter()
            .find(|e| e.index == index && e.is_whole_object())
    }
}
