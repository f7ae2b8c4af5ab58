//! Resolution of a resource to the store key holding its settings.
use super::Resource;
use crate::store::ConfigStore;

/// Registry class key for network adapters; per-adapter subkeys are the
/// zero-padded device id.
pub const NET_CLASS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Class\{4d36e972-e325-11ce-bfc1-08002be10318}";

/// TCP/IP per-interface parameters, keyed by interface GUID.
pub const TCPIP_INTERFACES_KEY: &str =
    r"SYSTEM\CurrentControlSet\Services\Tcpip\Parameters\Interfaces";

/// How a domain addresses a resource in its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStrategy {
    /// Try registry-style keys under each base, then the adapter class key.
    RegistryKey {
        /// Base keys tried in order.
        bases: &'static [&'static str],
    },
    /// The store is addressed by the resource's connection name.
    InterfaceName,
}

/// Finds the first store key that exists for a resource.
#[derive(Debug)]
pub struct HandleResolver<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> HandleResolver<'a> {
    /// Create a resolver probing `store`.
    #[must_use]
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Resolve `resource` under `strategy`. `None` when no candidate exists.
    #[must_use]
    pub fn resolve(&self, resource: &Resource, strategy: HandleStrategy) -> Option<String> {
        match strategy {
            HandleStrategy::InterfaceName => Some(resource.name.clone()),
            HandleStrategy::RegistryKey { bases } => candidates(resource, bases)
                .into_iter()
                .find(|key| self.store.key_exists(key)),
        }
    }
}

/// Candidate keys in lookup order, without duplicates.
///
/// For each id (GUID first, then device id) and each base: the id as-is,
/// wrapped in braces, and zero-padded to four digits. The adapter class key
/// with the padded device id is always tried last.
pub fn candidates(resource: &Resource, bases: &[&str]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    if let Some(guid) = &resource.guid {
        let bare = guid.trim_matches(|c| c == '{' || c == '}');
        if !bare.is_empty() {
            ids.push(bare.to_string());
        }
    }
    if !resource.id.is_empty() {
        ids.push(resource.id.clone());
    }

    let mut out: Vec<String> = Vec::new();
    let mut push = |key: String| {
        if !out.iter().any(|k| k.eq_ignore_ascii_case(&key)) {
            out.push(key);
        }
    };
    for id in &ids {
        for base in bases {
            push(format!(r"{base}\{id}"));
            push(format!(r"{base}\{{{id}}}"));
            push(format!(r"{base}\{id:0>4}"));
        }
    }
    if !resource.id.is_empty() {
        push(format!(r"{NET_CLASS_KEY}\{:0>4}", resource.id));
    }
    out
}
