//! Registry of the data types a file allows as PDO mapping padding
//!
//! A mapping entry referencing a data type index (e.g. 0x0005 for UNSIGNED8) instead of a real
//! object is a "dummy" mapping: it reserves space in the PDO without carrying data. The
//! `[DummyUsage]` section declares which of these are supported by the device:
//!
//! ```ini
//! [DummyUsage]
//! Dummy0001=0
//! Dummy0005=1
//! Dummy000a=0
//! ```
use std::path::Path;

use configparser::ini::Ini;

/// Highest data type code which may be used as a dummy
pub const MAX_DUMMY_TYPE: u16 = 0x1B;

/// The set of data types declared usable as dummy mappings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DummyRegistry {
    // bit n set means data type n is usable
    enabled: u32,
}

impl DummyRegistry {
    /// Read the registry from the contents of an EDS/DCF file
    ///
    /// Returns an empty registry if the file cannot be parsed or has no `[DummyUsage]` section.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        let mut ini = Ini::new();
        match ini.read(content.to_string()) {
            Ok(_) => Self::from_ini(&ini),
            Err(_) => Self::default(),
        }
    }

    /// Read the registry from an EDS/DCF file
    ///
    /// Returns an empty registry if the file cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let mut ini = Ini::new();
        match ini.load(path) {
            Ok(_) => Self::from_ini(&ini),
            Err(_) => Self::default(),
        }
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut registry = Self::default();
        for code in 1..=MAX_DUMMY_TYPE {
            let key = format!("Dummy{:04x}", code);
            if let Ok(Some(true)) = ini.getboolcoerce("DummyUsage", &key) {
                registry.insert(code);
            }
        }
        registry
    }

    /// Mark a data type as usable
    ///
    /// Codes outside of 1..=0x1B are ignored.
    pub fn insert(&mut self, code: u16) {
        if (1..=MAX_DUMMY_TYPE).contains(&code) {
            self.enabled |= 1 << code;
        }
    }

    /// Returns true if a mapping to `index` is a dummy mapping
    pub fn contains(&self, index: u16) -> bool {
        (1..=MAX_DUMMY_TYPE).contains(&index) && self.enabled & (1 << index) != 0
    }

    /// Iterate the usable data type codes in ascending order
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        (1..=MAX_DUMMY_TYPE).filter(|c| self.contains(*c))
    }

    /// Returns true if no dummy type is usable
    pub fn is_empty(&self) -> bool {
        self.enabled == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_usage() {
        let content = r#"
[DummyUsage]
Dummy0001=0
Dummy0002=1
Dummy0005=1
Dummy000A=true
Dummy001B=1
Dummy001C=1
"#;
        let registry = DummyRegistry::from_str(content);
        assert_eq!(vec![2, 5, 0xa, 0x1b], registry.codes().collect::<Vec<_>>());
        assert!(!registry.contains(1));
        assert!(!registry.contains(0x1c));
        assert!(!registry.contains(0x2000));
    }

    #[test]
    fn test_missing_section_is_empty() {
        assert!(DummyRegistry::from_str("[FileInfo]\nFileName=a.eds\n").is_empty());
    }
}
