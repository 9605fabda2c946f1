//! Core data records and configuration for PNtools analyses.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PnError, Result};
use crate::geometry::Point;

/// Structural type of a skeleton node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Root,
    Branch,
    End,
    Regular,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Branch => "branch",
            Self::End => "end",
            Self::Regular => "regular",
        }
    }

    /// Parse from string. `leaf` and `slab` are accepted as aliases.
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "root" => Some(Self::Root),
            "branch" => Some(Self::Branch),
            "end" | "leaf" => Some(Self::End),
            "regular" | "slab" => Some(Self::Regular),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single traced node of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub node_id: i64,
    pub parent_id: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    -1.0
}

impl TreeNode {
    pub fn new(node_id: i64, parent_id: Option<i64>, x: f64, y: f64, z: f64) -> Self {
        Self {
            node_id,
            parent_id,
            x,
            y,
            z,
            radius: default_radius(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y, self.z)
    }
}

/// Which side of a synapse a skeleton is on at a connector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Presynaptic,
    Postsynaptic,
}

/// A synapse site linked to one node of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub connector_id: i64,
    pub node_id: i64,
    pub relation: Relation,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Connector {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y, self.z)
    }
}

/// Server-side view of a connector and every skeleton linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDetail {
    pub connector_id: i64,
    pub presynaptic_to: Option<i64>,
    pub presynaptic_to_node: Option<i64>,
    #[serde(default)]
    pub postsynaptic_to: Vec<i64>,
    #[serde(default)]
    pub postsynaptic_to_node: Vec<i64>,
}

/// A node together with the skeleton it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedNode {
    pub skeleton_id: i64,
    pub node: TreeNode,
}

/// How cable-length matrices are normalised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Normalisation {
    /// Divide each row by the neuron's total cable across all volumes.
    Neuron,
    /// Divide each column by the enclosed size of the volume.
    Volume,
}

/// Settings for the axon pruning heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneConfig {
    #[serde(default = "default_seed_volumes")]
    pub seed_volumes: [String; 2],
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_max_terminal_candidates")]
    pub max_terminal_candidates: usize,
}

fn default_seed_volumes() -> [String; 2] {
    ["AL_R_manual".to_string(), "AL_L".to_string()]
}
fn default_scale() -> f64 {
    1.0
}
fn default_max_terminal_candidates() -> usize {
    15
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            seed_volumes: default_seed_volumes(),
            scale: default_scale(),
            max_terminal_candidates: default_max_terminal_candidates(),
        }
    }
}

/// Settings for pruning a neuron to a single volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumePruneConfig {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub prevent_fragments: bool,
}

impl Default for VolumePruneConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            prevent_fragments: false,
        }
    }
}

/// Settings for cable-length matrices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub normalisation: Option<Normalisation>,
    /// Zero cable in volumes that hold no end nodes of the neuron.
    #[serde(default)]
    pub mask_by_ends: bool,
}

/// Top-level configuration, loadable from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub prune: PruneConfig,
    #[serde(default)]
    pub volume_prune: VolumePruneConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
}

impl ToolsConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: ToolsConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validate_scale(self.prune.scale)?;
        validate_scale(self.volume_prune.scale)?;
        if self.prune.max_terminal_candidates == 0 {
            return Err(PnError::InvalidConfig(
                "max_terminal_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Volume scale factors must be positive and finite.
pub(crate) fn validate_scale(scale: f64) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(PnError::InvalidConfig(format!(
            "scale must be positive and finite, got {scale}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_roundtrip() {
        for nt in [
            NodeType::Root,
            NodeType::Branch,
            NodeType::End,
            NodeType::Regular,
        ] {
            assert_eq!(NodeType::from_str_value(nt.as_str()), Some(nt));
        }
        assert_eq!(NodeType::from_str_value("leaf"), Some(NodeType::End));
        assert_eq!(NodeType::from_str_value("slab"), Some(NodeType::Regular));
        assert_eq!(NodeType::from_str_value("Branch"), None);
    }

    #[test]
    fn prune_config_defaults() {
        let cfg = PruneConfig::default();
        assert_eq!(cfg.seed_volumes, ["AL_R_manual", "AL_L"]);
        assert_eq!(cfg.scale, 1.0);
        assert_eq!(cfg.max_terminal_candidates, 15);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg = ToolsConfig::from_json_str(
            r#"{"prune": {"scale": 1.5}, "matrix": {"normalisation": "volume"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.prune.scale, 1.5);
        assert_eq!(cfg.prune.max_terminal_candidates, 15);
        assert_eq!(cfg.matrix.normalisation, Some(Normalisation::Volume));
        assert!(!cfg.volume_prune.prevent_fragments);
    }

    #[test]
    fn rejects_bad_scale() {
        let err = ToolsConfig::from_json_str(r#"{"prune": {"scale": 0.0}}"#).unwrap_err();
        assert!(matches!(err, PnError::InvalidConfig(_)));
        assert!(validate_scale(f64::NAN).is_err());
        assert!(validate_scale(-2.0).is_err());
    }

    #[test]
    fn tree_node_radius_defaults() {
        let node: TreeNode =
            serde_json::from_str(r#"{"node_id": 3, "parent_id": null, "x": 1, "y": 2, "z": 3}"#)
                .unwrap();
        assert_eq!(node.radius, -1.0);
        assert_eq!(node.parent_id, None);
        assert_eq!(node.position(), Point::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn relation_serialises_lowercase() {
        let json = serde_json::to_string(&Relation::Postsynaptic).unwrap();
        assert_eq!(json, "\"postsynaptic\"");
    }
}
