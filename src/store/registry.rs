use super::ConfigStore;
use crate::error::StoreError;
use crate::setting::SettingValue;

/// [`ConfigStore`] over `HKEY_LOCAL_MACHINE`.
///
/// Integers are written as `REG_DWORD` (or `REG_QWORD` past `u32::MAX`),
/// strings as `REG_SZ`, booleans as `REG_DWORD` 0/1. Writing to a missing key
/// creates it. Values of other types read as [`StoreError::Unreadable`] so
/// that a snapshot never restores them with a different type. On other
/// platforms every operation returns [`StoreError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryStore;

impl RegistryStore {
    const NAME: &'static str = "registry";
}

/// Registry value types as far as the store cares about them.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Dword,
    Qword,
    String,
    ExpandString,
    MultiString,
    Other,
}

#[cfg_attr(not(windows), allow(dead_code))]
impl ValueType {
    /// Why a value of this type cannot be captured, or `None` if it can.
    ///
    /// Writes only produce `REG_DWORD`, `REG_QWORD` and `REG_SZ`, so a
    /// captured value must come back with the same type on restore.
    /// `REG_EXPAND_SZ` reads back its unexpanded text and `REG_SZ` keeps it.
    const fn unreadable_reason(self) -> Option<&'static str> {
        match self {
            Self::Dword | Self::Qword | Self::String | Self::ExpandString => None,
            Self::MultiString => Some("REG_MULTI_SZ cannot be restored without changing its type"),
            Self::Other => Some("unsupported value type"),
        }
    }
}

#[cfg(windows)]
mod native {
    use std::io;

    use winreg::RegKey;
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WRITE, RegType};
    use winreg::types::FromRegValue;

    use super::ValueType;
    use crate::error::StoreError;
    use crate::setting::SettingValue;

    const fn value_type(vtype: &RegType) -> ValueType {
        match vtype {
            RegType::REG_DWORD => ValueType::Dword,
            RegType::REG_QWORD => ValueType::Qword,
            RegType::REG_SZ => ValueType::String,
            RegType::REG_EXPAND_SZ => ValueType::ExpandString,
            RegType::REG_MULTI_SZ => ValueType::MultiString,
            _ => ValueType::Other,
        }
    }

    pub(super) fn open(key: &str, writable: bool, name: &str) -> Result<RegKey, StoreError> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let flags = if writable { KEY_READ | KEY_WRITE } else { KEY_READ };
        hklm.open_subkey_with_flags(key, flags)
            .map_err(|e| StoreError::from_io(key, name, e))
    }

    pub(super) fn read(key: &str, name: &str) -> Result<Option<SettingValue>, StoreError> {
        let reg = open(key, false, name)?;
        let raw = match reg.get_raw_value(name) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::from_io(key, name, e)),
        };
        let unreadable = |reason: String| StoreError::Unreadable {
            key: key.to_string(),
            name: name.to_string(),
            reason,
        };
        let vtype = value_type(&raw.vtype);
        let value = match vtype {
            ValueType::Dword => u32::from_reg_value(&raw)
                .map(|n| SettingValue::Integer(i64::from(n)))
                .map_err(|e| unreadable(e.to_string()))?,
            ValueType::Qword => {
                let n = u64::from_reg_value(&raw).map_err(|e| unreadable(e.to_string()))?;
                i64::try_from(n)
                    .map(SettingValue::Integer)
                    .map_err(|e| unreadable(e.to_string()))?
            }
            ValueType::String | ValueType::ExpandString => String::from_reg_value(&raw)
                .map(SettingValue::String)
                .map_err(|e| unreadable(e.to_string()))?,
            ValueType::MultiString | ValueType::Other => {
                let reason = vtype.unreadable_reason().unwrap_or("unsupported value type");
                return Err(unreadable(format!("{reason} ({:?})", raw.vtype)));
            }
        };
        Ok(Some(value))
    }

    /// Open `key` for writing, creating it and any missing parents.
    fn create(key: &str, name: &str) -> Result<RegKey, StoreError> {
        RegKey::predef(HKEY_LOCAL_MACHINE)
            .create_subkey_with_flags(key, KEY_READ | KEY_WRITE)
            .map(|(reg, _)| reg)
            .map_err(|e| StoreError::from_io(key, name, e))
    }

    pub(super) fn write(key: &str, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        let reg = create(key, name)?;
        let result = match value {
            SettingValue::Integer(n) => match u32::try_from(*n) {
                Ok(dword) => reg.set_value(name, &dword),
                Err(_) => u64::try_from(*n)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
                    .and_then(|qword| reg.set_value(name, &qword)),
            },
            SettingValue::String(s) => reg.set_value(name, s),
            SettingValue::Boolean(b) => reg.set_value(name, &u32::from(*b)),
        };
        result.map_err(|e| StoreError::from_io(key, name, e))
    }

    pub(super) fn delete(key: &str, name: &str) -> Result<(), StoreError> {
        open(key, true, name)?
            .delete_value(name)
            .map_err(|e| StoreError::from_io(key, name, e))
    }
}

impl ConfigStore for RegistryStore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, key: &str, name: &str) -> Result<Option<SettingValue>, StoreError> {
        #[cfg(windows)]
        {
            native::read(key, name)
        }
        #[cfg(not(windows))]
        {
            let _ = (key, name);
            Err(StoreError::Unsupported {
                store: Self::NAME,
                operation: "read",
            })
        }
    }

    fn write(&self, key: &str, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        #[cfg(windows)]
        {
            native::write(key, name, value)
        }
        #[cfg(not(windows))]
        {
            let _ = (key, name, value);
            Err(StoreError::Unsupported {
                store: Self::NAME,
                operation: "write",
            })
        }
    }

    fn delete(&self, key: &str, name: &str) -> Result<(), StoreError> {
        #[cfg(windows)]
        {
            native::delete(key, name)
        }
        #[cfg(not(windows))]
        {
            let _ = (key, name);
            Err(StoreError::Unsupported {
                store: Self::NAME,
                operation: "delete",
            })
        }
    }

    fn key_exists(&self, key: &str) -> bool {
        #[cfg(windows)]
        {
            native::open(key, false, "").is_ok()
        }
        #[cfg(not(windows))]
        {
            let _ = key;
            false
        }
    }
}
