use crate::registry::tree::RegistryTree;
use crate::util;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CACHE_VERSION: u32 = 1;

/// Persisted registry cache: the serialized tree plus the content hash
/// of every file that contributed to it, used to skip unchanged files
/// on partial updates.
#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    files: BTreeMap<String, String>,
    tree: Value,
}

pub struct RegistryCache {
    pub tree: RegistryTree,
    pub files: BTreeMap<String, String>,
}

pub fn cache_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".ridx").join("registry.json")
}

/// Load the cache, or None when it is missing, stale, or corrupt.
/// Corrupt caches warn and fall through to a rebuild; they are never an
/// error.
pub fn load(workspace_root: &Path) -> Option<RegistryCache> {
    let path = cache_path(workspace_root);
    let raw = fs::read_to_string(&path).ok()?;
    let parsed: CacheFile = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("ridx: warning: discarding corrupt cache {}: {err}", path.display());
            return None;
        }
    };
    if parsed.version != CACHE_VERSION {
        return None;
    }
    let tree = match RegistryTree::from_json(&parsed.tree) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("ridx: warning: discarding corrupt cache {}: {err}", path.display());
            return None;
        }
    };
    Some(RegistryCache {
        tree,
        files: parsed.files,
    })
}

/// Write the cache atomically: temp file in the same directory, then
/// rename over the old one.
pub fn store(
    workspace_root: &Path,
    tree: &RegistryTree,
    files: &BTreeMap<String, String>,
) -> Result<()> {
    let path = cache_path(workspace_root);
    util::ensure_parent_dir(&path)?;
    let payload = CacheFile {
        version: CACHE_VERSION,
        files: files.clone(),
        tree: tree.to_json(),
    };
    let serialized = serde_json::to_string(&payload)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serialized).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}
