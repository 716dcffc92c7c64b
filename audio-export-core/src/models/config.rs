use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Configuration section all export settings live in.
pub const EXPORT_SECTION: &str = "Export";

/// Key for one settings field of one backend, e.g. `"WAV_Samplerate"`.
pub fn setting_key(encoder_settings_name: &str, field: &str) -> String {
    format!("{}_{}", encoder_settings_name, field)
}

/// Durable key/value configuration owned by the host application.
///
/// Values are typed through `serde_json::Value`; readers supply a typed
/// default that is used when the key is missing or holds the wrong type.
pub trait ConfigStore: Send + Sync {
    fn get(&self, section: &str, key: &str) -> Option<Value>;

    fn set(&self, section: &str, key: &str, value: Value);
}

/// Reads a typed value, falling back to `default`.
pub fn read_or<T: DeserializeOwned>(store: &dyn ConfigStore, section: &str, key: &str, default: T) -> T {
    match store.get(section, key) {
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Ignoring malformed config value [{}] {}: {}", section, key, e);
                default
            }
        },
        None => default,
    }
}

/// Writes a typed value.
pub fn write<T: Serialize>(store: &dyn ConfigStore, section: &str, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(value) => store.set(section, key, value),
        Err(e) => log::error!("Failed to serialize config value [{}] {}: {}", section, key, e),
    }
}

/// In-memory configuration store, shareable between threads.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    sections: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sections(sections: BTreeMap<String, BTreeMap<String, Value>>) -> Self {
        Self {
            sections: RwLock::new(sections),
        }
    }

    /// Copy of the whole store, section by section.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.sections.read().clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, section: &str, key: &str) -> Option<Value> {
        self.sections.read().get(section).and_then(|keys| keys.get(key)).cloned()
    }

    fn set(&self, section: &str, key: &str, value: Value) {
        self.sections
            .write()
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}
