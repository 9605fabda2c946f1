//! Pruning a neuron to the part of its arbor inside one volume.

use std::collections::HashSet;

use crate::config::{NodeType, VolumePruneConfig};
use crate::error::{PnError, Result};
use crate::skeleton::{Pruned, Skeleton};
use crate::volume::Volume;

/// Keep the cable inside `volume` that is likely to carry synapses.
///
/// Nodes inside the (scaled) volume are closed to a connected subtree. The
/// primary neurite passing through is then discarded: if it ends inside the
/// volume, only the stretch up to its first branch point there goes;
/// otherwise the whole neurite goes.
pub fn prune_to_volume(
    skeleton: &Skeleton,
    volume: &Volume,
    config: &VolumePruneConfig,
) -> Result<Pruned> {
    let soma = skeleton.soma().ok_or(PnError::MissingSoma {
        skeleton_id: skeleton.id(),
    })?;
    let mut rooted = skeleton.clone();
    rooted.reroot(soma)?;
    let volume = volume.resized(config.scale)?;

    let inside = rooted.connected_closure(&rooted.nodes_within(&volume));
    let neurite = rooted.longest_neurite();
    let ends_inside = neurite
        .last()
        .and_then(|&leaf| rooted.position(leaf))
        .is_some_and(|p| volume.contains(&p));

    let dist = rooted.root_distances();
    let first_branch = neurite
        .iter()
        .copied()
        .filter(|id| inside.contains(id))
        .filter(|&id| rooted.node_type(id) == Some(NodeType::Branch))
        .min_by(|a, b| {
            let da = dist.get(a).copied().unwrap_or(0.0);
            let db = dist.get(b).copied().unwrap_or(0.0);
            da.total_cmp(&db).then(a.cmp(b))
        });

    let discarded: HashSet<i64> = match (ends_inside, first_branch) {
        (true, Some(branch)) => neurite
            .iter()
            .copied()
            .take_while(|&id| id != branch)
            .collect(),
        _ => neurite.iter().copied().collect(),
    };

    let mut keep: HashSet<i64> = inside.difference(&discarded).copied().collect();
    if config.prevent_fragments {
        keep = rooted.connected_closure(&keep);
    }

    log::debug!(
        "skeleton {}: {} of {} nodes kept inside {}",
        skeleton.id(),
        keep.len(),
        skeleton.len(),
        volume.name()
    );
    Ok(Pruned::from_fragments(&rooted, rooted.subset(&keep)?))
}
