//! Key/value configuration stores addressed by `(key, name)`.
//!
//! A store never checks privileges itself; permission failures come back from
//! the OS as [`StoreError::PermissionDenied`]. There is no multi-key
//! atomicity: every call stands alone.
mod memory;
mod netsh;
mod registry;

pub use memory::MemoryStore;
pub use netsh::NetshStore;
pub use registry::RegistryStore;

use crate::error::StoreError;
use crate::setting::SettingValue;

/// A readable and writable configuration store.
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    /// Short store name for messages.
    fn name(&self) -> &'static str;

    /// Read a value. `Ok(None)` means the value is absent, which is distinct
    /// from a present zero or empty string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key itself does not exist,
    /// [`StoreError::Unreadable`] if the value cannot be interpreted, and
    /// other variants for OS-level failures.
    fn read(&self, key: &str, name: &str) -> Result<Option<SettingValue>, StoreError>;

    /// Create or overwrite a value, creating the key if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PermissionDenied`] when the OS refuses the write.
    fn write(&self, key: &str, name: &str, value: &SettingValue) -> Result<(), StoreError>;

    /// Delete a value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the value is already absent and
    /// [`StoreError::Unsupported`] for stores that cannot delete.
    fn delete(&self, key: &str, name: &str) -> Result<(), StoreError>;

    /// Whether `key` can be opened.
    fn key_exists(&self, key: &str) -> bool;
}
