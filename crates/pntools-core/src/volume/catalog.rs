//! Named volume lookup.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{PnError, Result};
use crate::geometry::Point;
use crate::volume::Volume;

/// Anything that can hand out volumes by name (a tracing server, a directory
/// of meshes, a test fixture).
pub trait VolumeLookup {
    fn get_volume(&self, name: &str) -> Result<Volume>;

    /// Names of every volume this lookup can provide.
    fn volume_names(&self) -> Vec<String>;

    /// Fetch several volumes, failing on the first missing name.
    fn get_volumes(&self, names: &[String]) -> Result<Vec<Volume>> {
        names.iter().map(|n| self.get_volume(n)).collect()
    }
}

/// In-memory volume store, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct VolumeCatalog {
    volumes: BTreeMap<String, Volume>,
}

impl VolumeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, volume: Volume) {
        self.volumes.insert(volume.name().to_string(), volume);
    }

    pub fn with(mut self, volume: Volume) -> Self {
        self.insert(volume);
        self
    }

    /// Load every `*.json` mesh under `dir`. Files that fail to parse are
    /// skipped with a warning.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(PnError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let mut catalog = Self::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping unreadable entry under {}: {e}", dir.display());
                    continue;
                }
            };
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if !entry.file_type().is_file() || !is_json {
                continue;
            }
            match Volume::read_json(path) {
                Ok(volume) => catalog.insert(volume),
                Err(e) => log::warn!("skipping volume file {}: {e}", path.display()),
            }
        }
        log::debug!("loaded {} volumes from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.values()
    }

    /// Name of the first volume (in name order) containing `point`.
    pub fn locate(&self, point: &Point) -> Option<&str> {
        self.volumes
            .values()
            .find(|v| v.contains(point))
            .map(Volume::name)
    }
}

impl VolumeLookup for VolumeCatalog {
    fn get_volume(&self, name: &str) -> Result<Volume> {
        self.volumes
            .get(name)
            .cloned()
            .ok_or_else(|| PnError::VolumeNotFound(name.to_string()))
    }

    fn volume_names(&self) -> Vec<String> {
        self.volumes.keys().cloned().collect()
    }
}
