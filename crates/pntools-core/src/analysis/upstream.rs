//! Upstream partner sheets for reconstruction work.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Result;
use crate::skeleton::Skeleton;
use crate::source::ConnectorSource;
use crate::volume::Volume;

/// An input site whose presynaptic side has no node yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingUpstream {
    pub connector_id: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One upstream node feeding the neuron.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRow {
    pub skeleton_id: i64,
    pub connector_id: i64,
    pub node_id: i64,
    pub parent_id: Option<i64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Rows on the sheet that come from the same upstream skeleton.
    pub hits: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpstreamSheet {
    pub rows: Vec<UpstreamRow>,
    pub missing: Vec<MissingUpstream>,
}

impl UpstreamSheet {
    /// Distinct upstream skeletons, most hits first.
    pub fn partners(&self) -> Vec<(i64, usize)> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.skeleton_id))
            .map(|r| (r.skeleton_id, r.hits))
            .collect()
    }
}

/// Postsynaptic connector IDs of `skeleton`, restricted to nodes inside
/// `volume` when one is given.
fn input_sites(skeleton: &Skeleton, volume: Option<&Volume>) -> Vec<i64> {
    let inside = volume.map(|v| skeleton.nodes_within(v));
    let mut ids: Vec<i64> = skeleton
        .postsynapses()
        .filter(|c| inside.as_ref().map_or(true, |set| set.contains(&c.node_id)))
        .map(|c| c.connector_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Input sites of `skeleton` whose connector has no presynaptic node.
pub fn missing_upstream(
    skeleton: &Skeleton,
    volume: Option<&Volume>,
    source: &dyn ConnectorSource,
) -> Result<Vec<MissingUpstream>> {
    let sites = input_sites(skeleton, volume);
    let details = source.get_connector_details(&sites)?;
    let missing: HashSet<i64> = details
        .iter()
        .filter(|d| d.presynaptic_to_node.is_none())
        .map(|d| d.connector_id)
        .collect();

    let mut out: Vec<MissingUpstream> = Vec::new();
    let mut reported = HashSet::new();
    for c in skeleton.postsynapses() {
        if missing.contains(&c.connector_id) && reported.insert(c.connector_id) {
            out.push(MissingUpstream {
                connector_id: c.connector_id,
                x: c.x,
                y: c.y,
                z: c.z,
            });
        }
    }
    out.sort_by_key(|m| m.connector_id);
    Ok(out)
}

/// Every upstream node presynaptic to `skeleton`, ranked by how many inputs
/// its skeleton contributes.
pub fn upstream_sheet(
    skeleton: &Skeleton,
    volume: Option<&Volume>,
    source: &dyn ConnectorSource,
) -> Result<UpstreamSheet> {
    let sites = input_sites(skeleton, volume);
    let details = source.get_connector_details(&sites)?;

    // Upstream node -> (expected skeleton, lowest connector id).
    let mut by_node: BTreeMap<i64, (Option<i64>, i64)> = BTreeMap::new();
    for d in &details {
        if let Some(node_id) = d.presynaptic_to_node {
            by_node
                .entry(node_id)
                .and_modify(|e| e.1 = e.1.min(d.connector_id))
                .or_insert((d.presynaptic_to, d.connector_id));
        }
    }

    let node_ids: Vec<i64> = by_node.keys().copied().collect();
    let located = source.find_nodes(&node_ids)?;

    let mut rows: Vec<UpstreamRow> = located
        .into_iter()
        .filter_map(|ln| {
            let &(expected, connector_id) = by_node.get(&ln.node.node_id)?;
            if expected.is_some_and(|sk| sk != ln.skeleton_id) {
                log::warn!(
                    "node {} found on skeleton {}, connector {} says {:?}",
                    ln.node.node_id,
                    ln.skeleton_id,
                    connector_id,
                    expected
                );
                return None;
            }
            Some(UpstreamRow {
                skeleton_id: ln.skeleton_id,
                connector_id,
                node_id: ln.node.node_id,
                parent_id: ln.node.parent_id,
                x: ln.node.x,
                y: ln.node.y,
                z: ln.node.z,
                hits: 0,
            })
        })
        .collect();

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for r in &rows {
        *counts.entry(r.skeleton_id).or_default() += 1;
    }
    for r in &mut rows {
        r.hits = counts.get(&r.skeleton_id).copied().unwrap_or(0);
    }
    rows.sort_by(|a, b| {
        b.hits
            .cmp(&a.hits)
            .then(a.skeleton_id.cmp(&b.skeleton_id))
            .then(a.connector_id.cmp(&b.connector_id))
    });

    let missing = missing_upstream(skeleton, volume, source)?;
    if !missing.is_empty() {
        log::info!(
            "skeleton {}: {} input sites without an upstream node",
            skeleton.id(),
            missing.len()
        );
    }
    Ok(UpstreamSheet { rows, missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Connector, ConnectorDetail, Relation, TreeNode};
    use crate::geometry::Point;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    fn line(id: i64, first_node: i64, n: i64, y: f64) -> Skeleton {
        let nodes = (0..n)
            .map(|i| {
                TreeNode::new(
                    first_node + i,
                    (i > 0).then(|| first_node + i - 1),
                    i as f64,
                    y,
                    0.0,
                )
            })
            .collect();
        Skeleton::from_nodes(id, nodes).unwrap()
    }

    fn input(connector_id: i64, node_id: i64, x: f64) -> Connector {
        Connector {
            connector_id,
            node_id,
            relation: Relation::Postsynaptic,
            x,
            y: 0.5,
            z: 0.0,
        }
    }

    fn detail(connector_id: i64, pre: Option<(i64, i64)>, post_node: i64) -> ConnectorDetail {
        ConnectorDetail {
            connector_id,
            presynaptic_to: pre.map(|p| p.0),
            presynaptic_to_node: pre.map(|p| p.1),
            postsynaptic_to: vec![1],
            postsynaptic_to_node: vec![post_node],
        }
    }

    /// Target skeleton 1 (nodes 10..15) receives from 2 (three sites), from
    /// 3 (one site) and from two orphan connectors.
    fn world() -> (Skeleton, MemorySource) {
        let target = line(1, 10, 6, 0.0).with_connectors(vec![
            input(100, 10, 0.0),
            input(101, 11, 1.0),
            input(102, 12, 2.0),
            input(103, 13, 3.0),
            input(104, 14, 4.0),
            input(105, 15, 5.0),
        ]);
        let mut src = MemorySource::new();
        src.insert_skeleton(target.clone());
        src.insert_skeleton(line(2, 20, 4, 1.0));
        src.insert_skeleton(line(3, 30, 2, 1.0));
        for d in [
            detail(100, Some((2, 20)), 10),
            detail(101, Some((3, 31)), 11),
            detail(102, Some((2, 21)), 12),
            detail(103, None, 13),
            detail(104, Some((2, 23)), 14),
            detail(105, None, 15),
        ] {
            src.insert_connector(d);
        }
        (target, src)
    }

    #[test]
    fn sheet_ranks_by_hits() {
        let (target, src) = world();
        let sheet = upstream_sheet(&target, None, &src).unwrap();
        let order: Vec<(i64, i64, usize)> = sheet
            .rows
            .iter()
            .map(|r| (r.skeleton_id, r.connector_id, r.hits))
            .collect();
        assert_eq!(
            order,
            vec![(2, 100, 3), (2, 102, 3), (2, 104, 3), (3, 101, 1)]
        );
        assert_eq!(sheet.rows[3].parent_id, Some(30));
        assert_eq!(sheet.partners(), vec![(2, 3), (3, 1)]);
        assert_eq!(
            sheet.missing.iter().map(|m| m.connector_id).collect::<Vec<_>>(),
            vec![103, 105]
        );
    }

    #[test]
    fn volume_restricts_input_sites() {
        let (target, src) = world();
        // Covers target nodes at x=0..2 only.
        let vol = Volume::cuboid("DA1", Point::new(-0.5, -0.5, -1.0), Point::new(2.5, 0.5, 1.0));
        let sheet = upstream_sheet(&target, Some(&vol), &src).unwrap();
        assert_eq!(
            sheet.rows.iter().map(|r| r.connector_id).collect::<Vec<_>>(),
            vec![100, 102, 101]
        );
        assert!(sheet.missing.is_empty());

        let wide = Volume::cuboid("DA1", Point::new(-0.5, -0.5, -1.0), Point::new(5.5, 0.5, 1.0));
        let missing = missing_upstream(&target, Some(&wide), &src).unwrap();
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].x, 3.0);
    }

    #[test]
    fn no_inputs_gives_empty_sheet() {
        let (_, src) = world();
        let lonely = line(9, 90, 3, 0.0);
        let sheet = upstream_sheet(&lonely, None, &src).unwrap();
        assert!(sheet.rows.is_empty());
        assert!(sheet.missing.is_empty());
    }
}
