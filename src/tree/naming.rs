//! Human-readable node names.

use super::{NodeId, NodeOrigin, SpectrumTree};

impl SpectrumTree {
    /// Whether `id` stands for a file as a whole, rather than for a unit
    /// inside a file. Reload and "open containing folder" make sense only
    /// for these.
    pub fn is_file_node(&self, id: NodeId) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if node.origin == NodeOrigin::Directory {
            return false;
        }
        let parent_is_dir = node
            .parent
            .and_then(|p| self.get(p))
            .map(|p| p.origin == NodeOrigin::Directory)
            .unwrap_or(true);
        !node.is_content || parent_is_dir
    }

    /// Path-like name, e.g. `run3/cam.spe: ROI1` or `run3/kinetic.sif: kinetic 4`.
    ///
    /// With `shorten` only the node's own part is returned. Stale handles
    /// give an empty string.
    pub fn display_name(&self, id: NodeId, shorten: bool) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        let file_name = node
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let stem = if node.origin == NodeOrigin::Directory {
            format!("/{}", file_name)
        } else if node.is_content {
            if (self.is_file_node(id) && node.label.is_empty()) || node.label == file_name {
                format!("/{}", file_name)
            } else {
                let index = node.content_index.map(|i| i.to_string()).unwrap_or_default();
                format!(": {} {}", node.label, index)
            }
        } else if self.is_file_node(id) {
            format!("/{}", file_name)
        } else {
            node.label.clone()
        };

        if shorten {
            return stem
                .trim()
                .trim_matches('/')
                .trim_start_matches(':')
                .trim()
                .to_string();
        }
        let parent = node
            .parent
            .map(|p| self.display_name(p, false))
            .unwrap_or_default();
        format!("{}{}", parent, stem)
            .trim()
            .trim_matches('/')
            .trim_matches(':')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::data::dataset::Dataset;
    use crate::tree::testing::*;

    #[test]
    fn test_names_in_folder() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run3");
        fs::create_dir(&run).unwrap();
        fs::write(run.join("cam.spe"), b"").unwrap();
        fs::write(run.join("kinetic.sif"), b"").unwrap();
        fs::write(run.join("single.txt"), b"").unwrap();

        let mut tree = SpectrumTree::new();
        let root = tree.build(&run).unwrap();
        let files = tree.children(root).to_vec();
        let (cam, kinetic, single) = (files[0], files[1], files[2]);

        tree.populate(
            cam,
            &fixed(vec![
                Dataset::single("ROI1", axis(2), vec![0.0; 2]),
                Dataset::single("ROI2", axis(2), vec![0.0; 2]),
            ]),
        )
        .unwrap();
        tree.populate(kinetic, &fixed(vec![Dataset::channels("kinetic", axis(2), vec![vec![0.0; 2]; 5])]))
            .unwrap();
        tree.populate(single, &fixed(vec![Dataset::single("", axis(2), vec![0.0; 2])]))
            .unwrap();

        assert_eq!(tree.display_name(root, false), "run3");
        assert_eq!(tree.display_name(cam, false), "run3/cam.spe");
        let roi1 = tree.children(cam)[0];
        assert_eq!(tree.display_name(roi1, false), "run3/cam.spe: ROI1");
        assert_eq!(tree.display_name(roi1, true), "ROI1");
        let frame = tree.children(kinetic)[4];
        assert_eq!(tree.display_name(frame, false), "run3/kinetic.sif: kinetic 4");
        assert_eq!(tree.display_name(single, false), "run3/single.txt");
        assert_eq!(tree.display_name(single, true), "single.txt");

        assert!(tree.is_file_node(cam));
        assert!(tree.is_file_node(single));
        assert!(!tree.is_file_node(roi1));
        assert!(!tree.is_file_node(root));
    }

    #[test]
    fn test_top_level_file_and_stale_handle() {
        let mut tree = SpectrumTree::new();
        let x = leaf(&mut tree, "x", vec![1.0]);
        assert!(tree.is_file_node(x));
        assert_eq!(tree.display_name(x, false), "x.txt");

        tree.remove(x).unwrap();
        assert!(!tree.is_file_node(x));
        assert_eq!(tree.display_name(x, false), "");
    }
}
