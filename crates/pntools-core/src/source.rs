//! Where skeletons and connector details come from.
//!
//! Analyses take these collaborators as arguments, so a tracing-server client,
//! a directory of SWC exports and an in-memory fixture are interchangeable.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{ConnectorDetail, LocatedNode};
use crate::error::{PnError, Result};
use crate::skeleton::swc::read_swc;
use crate::skeleton::Skeleton;

/// Read access to skeletons by skeleton ID.
pub trait SkeletonSource {
    fn get_skeleton(&self, skeleton_id: i64) -> Result<Skeleton>;
}

/// Read access to connector details and to nodes of other skeletons.
pub trait ConnectorSource {
    /// Details for each requested connector that the source knows about.
    fn get_connector_details(&self, connector_ids: &[i64]) -> Result<Vec<ConnectorDetail>>;

    /// Locate nodes by node ID, across all skeletons.
    fn find_nodes(&self, node_ids: &[i64]) -> Result<Vec<LocatedNode>>;
}

/// Skeletons and connectors held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    skeletons: BTreeMap<i64, Skeleton>,
    connectors: HashMap<i64, ConnectorDetail>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_skeleton(&mut self, skeleton: Skeleton) {
        self.skeletons.insert(skeleton.id(), skeleton);
    }

    pub fn insert_connector(&mut self, detail: ConnectorDetail) {
        self.connectors.insert(detail.connector_id, detail);
    }

    pub fn skeleton_ids(&self) -> Vec<i64> {
        self.skeletons.keys().copied().collect()
    }
}

impl SkeletonSource for MemorySource {
    fn get_skeleton(&self, skeleton_id: i64) -> Result<Skeleton> {
        self.skeletons
            .get(&skeleton_id)
            .cloned()
            .ok_or(PnError::SkeletonNotFound(skeleton_id))
    }
}

impl ConnectorSource for MemorySource {
    fn get_connector_details(&self, connector_ids: &[i64]) -> Result<Vec<ConnectorDetail>> {
        Ok(connector_ids
            .iter()
            .filter_map(|id| self.connectors.get(id).cloned())
            .collect())
    }

    fn find_nodes(&self, node_ids: &[i64]) -> Result<Vec<LocatedNode>> {
        let mut found = Vec::with_capacity(node_ids.len());
        for &node_id in node_ids {
            let hit = self
                .skeletons
                .values()
                .find_map(|s| s.node(node_id).map(|n| (s.id(), n.clone())));
            if let Some((skeleton_id, node)) = hit {
                found.push(LocatedNode { skeleton_id, node });
            }
        }
        Ok(found)
    }
}

/// A directory holding one `<skeleton_id>.swc` file per skeleton.
#[derive(Debug, Clone)]
pub struct SwcDirectory {
    root: PathBuf,
}

impl SwcDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Skeleton IDs of every `*.swc` file directly in the directory, sorted.
    /// Files whose stem is not an integer are ignored.
    pub fn skeleton_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = WalkDir::new(&self.root)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "swc"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse().ok())
            })
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl SkeletonSource for SwcDirectory {
    fn get_skeleton(&self, skeleton_id: i64) -> Result<Skeleton> {
        let path = self.root.join(format!("{skeleton_id}.swc"));
        if !path.is_file() {
            return Err(PnError::SkeletonNotFound(skeleton_id));
        }
        read_swc(skeleton_id, &path)
    }
}
