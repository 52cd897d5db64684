//! Metadata derived from a source's path and its optional JSON sidecar

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ml_warehouse_core::{MetaValue, Metadata};
use tracing::debug;

use crate::error::{Error, Result};

/// All metadata available for one source
///
/// Path-derived keys are `source`, `file_name`, `file_stem` and `folder`.
/// Entries of a sidecar JSON object take precedence over them.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    values: HashMap<String, MetaValue>,
}

impl SourceMetadata {
    /// Collect path-derived metadata plus the sidecar next to `path`, if any
    pub fn collect(path: &Path, sidecar_suffix: &str) -> Result<Self> {
        let mut values = HashMap::new();
        values.insert("source".to_string(), MetaValue::from(path.to_string_lossy().into_owned()));

        let name_of = |p: Option<&std::ffi::OsStr>| p.and_then(|s| s.to_str()).map(str::to_string);
        if let Some(name) = name_of(path.file_name()) {
            values.insert("file_name".to_string(), MetaValue::Str(name));
        }
        if let Some(stem) = name_of(path.file_stem()) {
            values.insert("file_stem".to_string(), MetaValue::Str(stem));
        }
        if let Some(folder) = name_of(path.parent().and_then(Path::file_name)) {
            values.insert("folder".to_string(), MetaValue::Str(folder));
        }

        let sidecar = Self::sidecar_path(path, sidecar_suffix);
        if sidecar.is_file() {
            let content = std::fs::read_to_string(&sidecar)?;
            let json: serde_json::Value = serde_json::from_str(&content)?;
            let object = json.as_object().ok_or_else(|| {
                Error::Format(format!("metadata sidecar {} must hold a JSON object", sidecar.display()))
            })?;
            for (key, value) in object {
                values.insert(key.clone(), MetaValue::from_json(value)?);
            }
            debug!(sidecar = %sidecar.display(), keys = object.len(), "Read metadata sidecar");
        }

        Ok(Self { values })
    }

    /// Location of the sidecar: the path with its extension replaced by `suffix`
    pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        path.with_file_name(format!("{stem}{suffix}"))
    }

    /// Keep only the requested keys, in request order
    ///
    /// Requested keys with no available value are skipped.
    pub fn restrict(&self, keys: &[String]) -> Metadata {
        let mut metadata = Metadata::new();
        for key in keys {
            match self.values.get(key) {
                Some(value) => {
                    metadata.insert(key.clone(), value.clone());
                }
                None => debug!(key = %key, "Requested metadata key not available for source"),
            }
        }
        metadata
    }
}
