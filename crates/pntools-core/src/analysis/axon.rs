//! Rough pruning of projection neurons to their axon.
//!
//! The primary neurite is followed out to the volume it terminates in and cut
//! just before its first branch point there. The stretch of neurite before the
//! cut is protected from the seed volumes (the antennal lobes, where the
//! dendrites live) but does not belong to the axon either, so the result is
//! what lies outside both seeds minus that stretch.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::{validate_scale, NodeType, PruneConfig};
use crate::error::{PnError, Result};
use crate::skeleton::{Pruned, Skeleton};
use crate::volume::{Volume, VolumeLookup};

/// How the cut point on the primary neurite was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutRule {
    /// Branch point closest to the root among those inside the terminal volume.
    FirstBranchInTerminal,
    /// No branch point inside the terminal volume: the branch point farthest
    /// from the root along the whole neurite.
    LastBranchOnNeurite,
    /// The neurite has no branch points; nothing is protected.
    Unbranched,
}

/// Result of pruning one skeleton, with the intermediate sets kept for
/// inspection.
#[derive(Debug, Clone)]
pub struct AxonPrune {
    pub skeleton_id: i64,
    pub terminal_volume: String,
    /// Root (soma) first, terminal leaf last.
    pub primary_neurite: Vec<i64>,
    pub cut_branch: Option<i64>,
    pub cut_rule: CutRule,
    /// Neurite nodes from the root up to the parent of the cut branch. They
    /// are never counted as removed and never part of `result`.
    pub protected: BTreeSet<i64>,
    /// Nodes dropped because they lie inside a seed volume.
    pub removed: BTreeSet<i64>,
    pub result: Pruned,
}

/// Axon pruning with its volumes resolved and the seed volumes already scaled.
#[derive(Debug, Clone)]
pub struct AxonPruner {
    terminal_volumes: Vec<Volume>,
    seeds: [Volume; 2],
    max_candidates: usize,
}

impl AxonPruner {
    /// Fetch the terminal and seed volumes from `lookup` and scale the seeds
    /// by `config.scale` about their centroids.
    pub fn new(
        lookup: &dyn VolumeLookup,
        terminal_volumes: &[String],
        config: &PruneConfig,
    ) -> Result<Self> {
        let [right, left] = &config.seed_volumes;
        let seeds = [lookup.get_volume(right)?, lookup.get_volume(left)?];
        Self::from_volumes(
            lookup.get_volumes(terminal_volumes)?,
            seeds,
            config.scale,
            config.max_terminal_candidates,
        )
    }

    pub fn from_volumes(
        terminal_volumes: Vec<Volume>,
        seeds: [Volume; 2],
        scale: f64,
        max_candidates: usize,
    ) -> Result<Self> {
        validate_scale(scale)?;
        if max_candidates == 0 {
            return Err(PnError::InvalidConfig(
                "max_terminal_candidates must be at least 1".to_string(),
            ));
        }
        let [a, b] = seeds;
        Ok(Self {
            terminal_volumes,
            seeds: [a.resized(scale)?, b.resized(scale)?],
            max_candidates,
        })
    }

    /// The scaled seed volumes.
    pub fn seeds(&self) -> &[Volume; 2] {
        &self.seeds
    }

    pub fn terminal_volumes(&self) -> &[Volume] {
        &self.terminal_volumes
    }

    pub fn prune(&self, skeleton: &Skeleton) -> Result<AxonPrune> {
        let soma = skeleton.soma().ok_or(PnError::MissingSoma {
            skeleton_id: skeleton.id(),
        })?;
        let mut rooted = skeleton.clone();
        rooted.reroot(soma)?;

        let (leaf, terminal) = self.find_terminal(&rooted)?;
        let neurite = rooted.neurite_to(leaf)?;
        let dist = rooted.root_distances();

        let branch_points: Vec<i64> = neurite
            .iter()
            .copied()
            .filter(|&id| rooted.node_type(id) == Some(NodeType::Branch))
            .collect();
        let in_terminal: Vec<i64> = branch_points
            .iter()
            .copied()
            .filter(|&id| rooted.position(id).is_some_and(|p| terminal.contains(&p)))
            .collect();

        let (cut_branch, cut_rule) = if !in_terminal.is_empty() {
            (nearest_to_root(&in_terminal, &dist), CutRule::FirstBranchInTerminal)
        } else if !branch_points.is_empty() {
            // Kept from the original heuristic; it may be meant to be the
            // nearest branch as above.
            (farthest_from_root(&branch_points, &dist), CutRule::LastBranchOnNeurite)
        } else {
            (None, CutRule::Unbranched)
        };

        let protected: BTreeSet<i64> = match cut_branch {
            Some(branch) => neurite
                .iter()
                .copied()
                .take_while(|&id| id != branch)
                .collect(),
            None => BTreeSet::new(),
        };

        let removed: BTreeSet<i64> = self
            .seeds
            .iter()
            .flat_map(|seed| rooted.nodes_within(seed))
            .filter(|id| !protected.contains(id))
            .collect();
        let keep: HashSet<i64> = rooted
            .node_ids()
            .into_iter()
            .filter(|id| !removed.contains(id) && !protected.contains(id))
            .collect();
        let result = Pruned::from_fragments(&rooted, rooted.subset(&keep)?);

        log::debug!(
            "skeleton {}: terminal volume {}, cut at {:?} ({:?}), \
             {} protected, {} removed, {} left",
            skeleton.id(),
            terminal.name(),
            cut_branch,
            cut_rule,
            protected.len(),
            removed.len(),
            result.node_count()
        );

        Ok(AxonPrune {
            skeleton_id: skeleton.id(),
            terminal_volume: terminal.name().to_string(),
            primary_neurite: neurite,
            cut_branch,
            cut_rule,
            protected,
            removed,
            result,
        })
    }

    /// Bounded search over leaves, longest path first, for one that ends
    /// inside a terminal volume.
    fn find_terminal<'a>(&'a self, rooted: &Skeleton) -> Result<(i64, &'a Volume)> {
        let candidates = rooted.leaves_by_distance();
        let attempts = candidates.len().min(self.max_candidates);
        for &(leaf, _) in candidates.iter().take(self.max_candidates) {
            let Some(pos) = rooted.position(leaf) else {
                continue;
            };
            if let Some(volume) = self.terminal_volumes.iter().find(|v| v.contains(&pos)) {
                return Ok((leaf, volume));
            }
        }
        Err(PnError::NoTerminalVolume {
            skeleton_id: rooted.id(),
            attempts,
        })
    }
}

fn distance_of(id: i64, dist: &HashMap<i64, f64>) -> f64 {
    dist.get(&id).copied().unwrap_or(0.0)
}

fn nearest_to_root(ids: &[i64], dist: &HashMap<i64, f64>) -> Option<i64> {
    ids.iter().copied().min_by(|a, b| {
        distance_of(*a, dist)
            .total_cmp(&distance_of(*b, dist))
            .then(a.cmp(b))
    })
}

fn farthest_from_root(ids: &[i64], dist: &HashMap<i64, f64>) -> Option<i64> {
    ids.iter().copied().max_by(|a, b| {
        distance_of(*a, dist)
            .total_cmp(&distance_of(*b, dist))
            .then(b.cmp(a))
    })
}

/// Prune one skeleton to its axon, resolving volumes through `lookup`.
pub fn prune_to_axon(
    skeleton: &Skeleton,
    lookup: &dyn VolumeLookup,
    terminal_volumes: &[String],
    config: &PruneConfig,
) -> Result<AxonPrune> {
    AxonPruner::new(lookup, terminal_volumes, config)?.prune(skeleton)
}
