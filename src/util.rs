use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn normalize_rel_path(workspace_root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(workspace_root).with_context(|| {
        format!(
            "strip prefix {} from {}",
            workspace_root.display(),
            path.display()
        )
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Slice a byte range out of file content, clamping the end and
/// rejecting ranges that start past the content or split a char.
pub fn slice_bytes(content: &str, start_byte: usize, end_byte: usize) -> Option<String> {
    if end_byte <= start_byte {
        return None;
    }
    let len = content.len();
    if start_byte > len {
        return None;
    }
    let end = end_byte.min(len);
    content.get(start_byte..end).map(|value| value.to_string())
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    Ok(())
}

pub fn hash_content(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
