use std::fs;
use std::path::Path;

use crate::models::config::MemoryConfigStore;
use crate::models::error::ExportError;

/// Persist a configuration store as pretty-printed JSON.
pub fn save_config(store: &MemoryConfigStore, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(&store.snapshot())
        .map_err(|e| ExportError::Config(format!("failed to serialize configuration: {}", e)))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ExportError::Config(format!("failed to create directory: {}", e)))?;
    }
    fs::write(path, json).map_err(|e| ExportError::Config(format!("failed to write configuration: {}", e)))?;
    Ok(())
}

/// Load a configuration store. A missing file yields an empty store.
pub fn load_config(path: &Path) -> Result<MemoryConfigStore, ExportError> {
    if !path.exists() {
        log::debug!("No configuration at {}, starting empty", path.display());
        return Ok(MemoryConfigStore::new());
    }
    let json = fs::read_to_string(path)
        .map_err(|e| ExportError::Config(format!("failed to read configuration: {}", e)))?;
    let sections = serde_json::from_str(&json)
        .map_err(|e| ExportError::Config(format!("failed to parse configuration: {}", e)))?;
    Ok(MemoryConfigStore::from_sections(sections))
}
