//! Building the tree from the filesystem.
//!
//! Directories become containers, files become unloaded placeholders. No
//! file content is read here; that happens when a file is populated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::TreeError;

use super::{NodeId, SpectrumNode, SpectrumTree};

/// Sort key: directories first, then case-insensitive stem, then the full
/// name so that `a.txt` and `a.csv` keep a stable order.
fn entry_key(path: &Path) -> (bool, String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    (!path.is_dir(), stem, name)
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

impl SpectrumTree {
    /// Add `path` as a top-level node. Directories are walked recursively.
    pub fn build(&mut self, path: &Path) -> Result<NodeId, TreeError> {
        if path.is_dir() {
            let id = self.add_root(SpectrumNode::directory(path));
            self.walk(id, path)?;
            Ok(id)
        } else if path.is_file() {
            Ok(self.add_root(SpectrumNode::file(path)))
        } else {
            Err(TreeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is neither a file nor a directory", path.display()),
            )))
        }
    }

    /// Add every non-ignored entry of `dir` as a top-level node.
    pub fn open_folder(&mut self, dir: &Path) -> Result<Vec<NodeId>, TreeError> {
        let entries = self.sorted_entries(dir)?;
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            ids.push(self.build(&entry)?);
        }
        log::info!("Opened folder {} ({} entries)", dir.display(), ids.len());
        Ok(ids)
    }

    /// Add files (or directories) picked individually as top-level nodes.
    pub fn open_files(&mut self, paths: &[PathBuf]) -> Result<Vec<NodeId>, TreeError> {
        paths.iter().map(|p| self.build(p)).collect()
    }

    fn walk(&mut self, parent: NodeId, dir: &Path) -> Result<(), TreeError> {
        log::debug!("Iterating over dir={}", dir.display());
        for entry in self.sorted_entries(dir)? {
            if entry.is_dir() {
                let id = self.add_child(parent, SpectrumNode::directory(&entry))?;
                if is_symlink(&entry) {
                    log::debug!("Not following symlinked directory {}", entry.display());
                    continue;
                }
                self.walk(id, &entry)?;
            } else if entry.is_file() {
                self.add_child(parent, SpectrumNode::file(&entry))?;
            }
        }
        Ok(())
    }

    fn sorted_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, TreeError> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| !self.config.is_ignored(p))
            .collect();
        entries.sort_by_cached_key(|p| entry_key(p));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::tree::NodeOrigin;

    fn sample_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("B")).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a").join("inner.txt"), "1 2\n").unwrap();
        for name in ["Zeta.txt", "alpha.txt", "beta.csv", "_draft.txt", ".hidden", "plot.png", "fit.py"] {
            fs::write(root.join(name), "1 2\n").unwrap();
        }
        dir
    }

    fn labels(tree: &SpectrumTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.node(*id).unwrap().label().to_string())
            .collect()
    }

    #[test]
    fn test_build_orders_and_filters() {
        let dir = sample_folder();
        let mut tree = SpectrumTree::new();
        let root = tree.build(dir.path()).unwrap();

        assert_eq!(tree.roots(), &[root]);
        let children = tree.children(root).to_vec();
        assert_eq!(labels(&tree, &children), vec!["a", "B", "alpha.txt", "beta.csv", "Zeta.txt"]);

        let a = children[0];
        assert_eq!(tree.node(a).unwrap().origin(), NodeOrigin::Directory);
        assert_eq!(labels(&tree, tree.children(a)), vec!["inner.txt"]);

        let alpha = tree.node(children[2]).unwrap();
        assert_eq!(alpha.origin(), NodeOrigin::File);
        assert!(!alpha.is_loaded());
        assert!(alpha.buffer().is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let dir = sample_folder();
        fs::write(dir.path().join("alpha.csv"), "1 2\n").unwrap();
        let mut first = SpectrumTree::new();
        let mut second = SpectrumTree::new();
        let r1 = first.build(dir.path()).unwrap();
        let r2 = second.build(dir.path()).unwrap();
        let l1: Vec<String> = first.descendants(r1).iter().map(|id| first.node(*id).unwrap().label().to_string()).collect();
        let l2: Vec<String> = second.descendants(r2).iter().map(|id| second.node(*id).unwrap().label().to_string()).collect();
        assert_eq!(l1, l2);
        let pos_csv = l1.iter().position(|l| l == "alpha.csv").unwrap();
        let pos_txt = l1.iter().position(|l| l == "alpha.txt").unwrap();
        assert!(pos_csv < pos_txt);
    }

    #[test]
    fn test_open_folder_adds_top_level_entries() {
        let dir = sample_folder();
        let mut tree = SpectrumTree::new();
        let ids = tree.open_folder(dir.path()).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(tree.roots(), ids.as_slice());
        assert_eq!(tree.children(ids[0]).len(), 1);
    }

    #[test]
    fn test_open_files_and_missing_path() {
        let dir = sample_folder();
        let mut tree = SpectrumTree::new();
        let ids = tree
            .open_files(&[dir.path().join("alpha.txt"), dir.path().join("beta.csv")])
            .unwrap();
        assert_eq!(labels(&tree, &ids), vec!["alpha.txt", "beta.csv"]);

        let err = tree.build(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, TreeError::Io(_)));
    }
}
