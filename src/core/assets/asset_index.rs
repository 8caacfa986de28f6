use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure: logical name → content-addressed object.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// Hashes are lowercase SHA-1 hex; anything else cannot be addressed.
    pub fn has_valid_hash(&self) -> bool {
        hash_prefix(&self.hash).is_some()
    }
}

impl AssetIndex {
    /// Read and parse an index file from disk.
    pub fn read(path: &Path) -> LauncherResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Objects ordered by hash with duplicates (shared content) removed.
    pub fn unique_objects(&self) -> Vec<&AssetObject> {
        let mut by_hash: BTreeMap<&str, &AssetObject> = BTreeMap::new();
        for object in self.objects.values().filter(|o| o.has_valid_hash()) {
            by_hash.entry(object.hash.as_str()).or_insert(object);
        }
        by_hash.into_values().collect()
    }
}

/// `assets/indexes/<id>.json`, relative to the store root.
pub fn index_relative_path(index_id: &str) -> PathBuf {
    PathBuf::from("assets")
        .join("indexes")
        .join(format!("{index_id}.json"))
}

/// Two-character shard directory, or `None` for a hash that is not SHA-1 hex.
fn hash_prefix(hash: &str) -> Option<&str> {
    let valid = hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit());
    valid.then(|| &hash[..2])
}

/// `assets/objects/<hash[0:2]>/<hash>`, relative to the store root.
pub fn object_relative_path(hash: &str) -> Option<PathBuf> {
    let prefix = hash_prefix(hash)?;
    Some(PathBuf::from("assets").join("objects").join(prefix).join(hash))
}

pub fn object_url(base: &str, hash: &str) -> Option<String> {
    let prefix = hash_prefix(hash)?;
    Some(format!("{}/{}/{}", base.trim_end_matches('/'), prefix, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "bdf48ef6b5d0d23bbb02e17d04865216179f510a";
    const H2: &str = "05ffca39cde9b0ecc7c17cbda0f7e5a2ea1bb3f5";

    #[test]
    fn unique_objects_sorted_and_deduplicated() {
        let index: AssetIndex = serde_json::from_value(serde_json::json!({
            "objects": {
                "minecraft/sounds/a.ogg": {"hash": H1, "size": 10},
                "minecraft/sounds/b.ogg": {"hash": H1, "size": 10},
                "icons/icon.png": {"hash": H2, "size": 5},
                "broken": {"hash": "zz", "size": 1}
            }
        }))
        .unwrap();

        let hashes: Vec<_> = index.unique_objects().iter().map(|o| o.hash.as_str()).collect();
        assert_eq!(hashes, vec![H2, H1]);
    }

    #[test]
    fn object_addressing() {
        assert_eq!(
            object_relative_path(H1),
            Some(PathBuf::from(format!("assets/objects/bd/{H1}")))
        );
        assert_eq!(
            object_url("https://resources.download.minecraft.net/", H1),
            Some(format!("https://resources.download.minecraft.net/bd/{H1}"))
        );
        assert_eq!(index_relative_path("6"), PathBuf::from("assets/indexes/6.json"));
    }

    #[test]
    fn malformed_hashes_have_no_address() {
        let split_char = format!("aé{}", &H1[..37]);
        assert_eq!(split_char.len(), 40);
        for hash in ["", "a", "zz", "é", split_char.as_str()] {
            assert_eq!(object_relative_path(hash), None, "{hash:?}");
            assert_eq!(object_url(RESOURCES_URL, hash), None, "{hash:?}");
        }
    }

    #[test]
    fn read_reports_corrupt_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("6.json");
        std::fs::write(&path, "{\"objects\": 3}").unwrap();
        assert!(AssetIndex::read(&path).is_err());
    }
}
