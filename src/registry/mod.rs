use crate::syntax::SyntaxIndex;
use crate::util;
use anyhow::{Result, anyhow};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::thread;

pub mod category;
pub mod extract;
pub mod tree;

use category::CategorySpec;
use tree::RegistryTree;

#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildStats {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub parse_warnings: usize,
}

impl BuildStats {
    fn absorb(&mut self, other: BuildStats) {
        self.files_scanned += other.files_scanned;
        self.files_indexed += other.files_indexed;
        self.files_skipped += other.files_skipped;
        self.parse_warnings += other.parse_warnings;
    }
}

/// Outcome of a full workspace build: the merged tree, counters, and
/// per-file content hashes for the persisted cache.
pub struct BuildResult {
    pub tree: RegistryTree,
    pub stats: BuildStats,
    pub file_hashes: BTreeMap<String, String>,
}

/// Partial rebuild of a single category file.
pub struct PartialBuild {
    pub tree: RegistryTree,
    pub rel_path: String,
    pub hash: String,
}

pub struct IndexBuilder {
    workspace_root: PathBuf,
}

impl IndexBuilder {
    pub fn new(workspace_root: PathBuf) -> Self {
        let workspace_root = std::fs::canonicalize(&workspace_root).unwrap_or(workspace_root);
        Self { workspace_root }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Build the whole workspace into a fresh tree. The five category
    /// passes parse independently and run concurrently; merging is
    /// sequential. One malformed file never fails the build.
    pub fn build_full(&self) -> Result<BuildResult> {
        let specs = category::category_specs();
        let outcomes = thread::scope(|scope| {
            let handles: Vec<_> = specs
                .iter()
                .map(|spec| scope.spawn(move || self.build_category(spec)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("category build thread panicked"))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut tree = RegistryTree::new();
        let mut stats = BuildStats::default();
        let mut file_hashes = BTreeMap::new();
        for outcome in outcomes {
            tree.merge(outcome.tree);
            stats.absorb(outcome.stats);
            file_hashes.extend(outcome.file_hashes);
        }
        Ok(BuildResult {
            tree,
            stats,
            file_hashes,
        })
    }

    /// Rebuild one file's subtree, keyed off its name suffix. None when
    /// the name matches no category or the file does not follow the
    /// category's convention.
    pub fn build_partial(&self, path: &Path) -> Result<Option<PartialBuild>> {
        let file_name = match path.file_name().and_then(OsStr::to_str) {
            Some(value) => value,
            None => return Ok(None),
        };
        let Some(spec) = category::category_for_file_name(file_name) else {
            return Ok(None);
        };
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        let rel_path = util::normalize_rel_path(&self.workspace_root, &abs)?;
        let content = util::read_to_string(&abs)?;
        let hash = util::hash_content(&content);
        let Some(tree) = extract_file(&content, spec, &rel_path) else {
            return Ok(None);
        };
        Ok(Some(PartialBuild {
            tree,
            rel_path,
            hash,
        }))
    }

    fn build_category(&self, spec: &CategorySpec) -> BuildResult {
        let mut tree = RegistryTree::new();
        let mut stats = BuildStats::default();
        let mut file_hashes = BTreeMap::new();

        for (abs_path, rel_path) in self.scan_category_files(spec) {
            stats.files_scanned += 1;
            let content = match util::read_to_string(&abs_path) {
                Ok(value) => value,
                Err(err) => {
                    eprintln!("ridx: warning: {err:#}");
                    stats.files_skipped += 1;
                    stats.parse_warnings += 1;
                    continue;
                }
            };
            file_hashes.insert(rel_path.clone(), util::hash_content(&content));
            match extract_checked(&content, spec, &rel_path) {
                Extracted::Tree(subtree) => {
                    stats.files_indexed += 1;
                    tree.merge(subtree);
                }
                Extracted::ParseFailure => {
                    eprintln!("ridx: warning: failed to parse {rel_path}");
                    stats.files_skipped += 1;
                    stats.parse_warnings += 1;
                }
                Extracted::NoMatch => {
                    stats.files_skipped += 1;
                }
            }
        }

        BuildResult {
            tree,
            stats,
            file_hashes,
        }
    }

    /// Category files under the workspace, named `*-<suffix>.js`,
    /// honoring ignore files and excluding dependency directories.
    /// Sorted by relative path for deterministic merge order.
    fn scan_category_files(&self, spec: &CategorySpec) -> Vec<(PathBuf, String)> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.workspace_root)
            .hidden(false)
            .require_git(false)
            .filter_entry(|entry| !is_ignored_entry(entry))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(value) => value,
                Err(err) => {
                    eprintln!("ridx: walk error: {err}");
                    continue;
                }
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(".js") else {
                continue;
            };
            if !stem.ends_with(&format!("-{}", spec.suffix)) {
                continue;
            }
            let rel_path = match util::normalize_rel_path(&self.workspace_root, path) {
                Ok(value) => value,
                Err(_) => continue,
            };
            files.push((path.to_path_buf(), rel_path));
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        files
    }
}

enum Extracted {
    Tree(RegistryTree),
    ParseFailure,
    NoMatch,
}

fn extract_checked(content: &str, spec: &CategorySpec, rel_path: &str) -> Extracted {
    let index = match SyntaxIndex::parse(content) {
        Ok(value) => value,
        Err(_) => return Extracted::ParseFailure,
    };
    if index.has_errors() {
        return Extracted::ParseFailure;
    }
    match extract::extract_category(&index, spec, rel_path) {
        Some(tree) => Extracted::Tree(tree),
        None => Extracted::NoMatch,
    }
}

fn extract_file(content: &str, spec: &CategorySpec, rel_path: &str) -> Option<RegistryTree> {
    match extract_checked(content, spec, rel_path) {
        Extracted::Tree(tree) => Some(tree),
        _ => None,
    }
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_name() {
        name if name == OsStr::new("node_modules") => true,
        name if name == OsStr::new(".git") => true,
        name if name == OsStr::new(".ridx") => true,
        _ => false,
    }
}
