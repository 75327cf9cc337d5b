//! Pool prewarm manifest.
//!
//! A JSON file listing the pools to create at startup and how many objects
//! each should start with:
//!
//! ```json
//! {
//!   "pools": [
//!     { "key": "coin", "count": 16 },
//!     { "key": "bullet", "count": 64 }
//!   ]
//! }
//! ```
//!
//! Feed the loaded manifest to
//! [`prewarm_pools`](crate::systems::objectpool::prewarm_pools).

use std::path::Path;

use bevy_ecs::prelude::Resource;
use log::info;
use serde::{Deserialize, Serialize};

/// One pool to prewarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolManifestEntry {
    pub key: String,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

/// Pools to create at startup.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolManifest {
    #[serde(default)]
    pub pools: Vec<PoolManifestEntry>,
}

impl PoolManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse pool manifest: {}", e))
    }

    /// Load a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read pool manifest {:?}: {}", path, e))?;
        let manifest = Self::from_json(&text)?;
        info!(
            "Loaded pool manifest {:?} with {} pool(s)",
            path,
            manifest.pools.len()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = PoolManifest::from_json(
            r#"{ "pools": [ { "key": "coin", "count": 3 }, { "key": "spark" } ] }"#,
        )
        .unwrap();
        assert_eq!(manifest.pools.len(), 2);
        assert_eq!(manifest.pools[0].key, "coin");
        assert_eq!(manifest.pools[0].count, 3);
        assert_eq!(manifest.pools[1].count, 1);
    }

    #[test]
    fn test_empty_object_is_empty_manifest() {
        assert_eq!(PoolManifest::from_json("{}").unwrap(), PoolManifest::default());
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let err = PoolManifest::from_json("{ pools: ").unwrap_err();
        assert!(err.starts_with("Failed to parse pool manifest"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(PoolManifest::load("./definitely/not/here.json").is_err());
    }
}
