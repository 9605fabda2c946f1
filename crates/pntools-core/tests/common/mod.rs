//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use pntools_core::analysis::AxonPruner;
use pntools_core::config::TreeNode;
use pntools_core::geometry::Point;
use pntools_core::skeleton::Skeleton;
use pntools_core::volume::{Volume, VolumeCatalog};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

// ---------------------------------------------------------------------------
// Volumes
// ---------------------------------------------------------------------------

pub fn boxed(name: &str, min: (f64, f64, f64), max: (f64, f64, f64)) -> Volume {
    Volume::cuboid(
        name,
        Point::new(min.0, min.1, min.2),
        Point::new(max.0, max.1, max.2),
    )
}

/// A seed volume nowhere near any fixture skeleton.
pub fn far_away(name: &str) -> Volume {
    boxed(name, (-500.0, -500.0, -5.0), (-400.0, -400.0, 5.0))
}

/// Catalog matching the layout of [`pn_neuron`]: antennal lobe around the
/// dendrite, calyx and lateral horn further along x.
pub fn pn_catalog() -> VolumeCatalog {
    VolumeCatalog::new()
        .with(boxed("AL_R", (5.0, -5.0, -5.0), (35.0, 40.0, 5.0)))
        .with(far_away("AL_L"))
        .with(boxed("LH_R", (75.0, -15.0, -5.0), (105.0, 15.0, 5.0)))
        .with(boxed("MB_CA_R", (55.0, 5.0, -5.0), (65.0, 25.0, 5.0)))
}

pub fn terminal_names() -> Vec<String> {
    vec!["MB_CA_R".to_string(), "LH_R".to_string()]
}

// ---------------------------------------------------------------------------
// Skeletons
// ---------------------------------------------------------------------------

/// Nodes `first..first+n` along x with the given spacing, each the parent of
/// the next.
pub fn chain(first: i64, n: i64, spacing: f64) -> Vec<TreeNode> {
    (0..n)
        .map(|i| {
            TreeNode::new(
                first + i,
                (i > 0).then(|| first + i - 1),
                i as f64 * spacing,
                0.0,
                0.0,
            )
        })
        .collect()
}

/// Ten nodes at x = 0..9, soma at node 1, no branches.
pub fn ten_node_line() -> Skeleton {
    Skeleton::from_nodes(10, chain(1, 10, 1.0))
        .unwrap()
        .with_soma(1)
        .unwrap()
}

/// Projection-neuron shaped skeleton.
///
/// ```text
///            22        31        41
///            |         |         |
///            21        30        40
///            |         |         |
/// 1 -- 2 -- 3 -- 4 -- ... 7 -- 8 -- 9 -- 10 -- 11
/// ```
///
/// Trunk nodes sit every 10 units along x; the dendrite off 3 lies in AL_R,
/// the twig off 7 in MB_CA_R and the trunk tip plus the twig off 9 in LH_R.
pub fn pn_neuron() -> Skeleton {
    let mut nodes = chain(1, 11, 10.0);
    nodes.extend([
        TreeNode::new(20, Some(3), 20.0, 10.0, 0.0),
        TreeNode::new(21, Some(20), 20.0, 20.0, 0.0),
        TreeNode::new(22, Some(21), 25.0, 30.0, 0.0),
        TreeNode::new(30, Some(7), 60.0, 10.0, 0.0),
        TreeNode::new(31, Some(30), 60.0, 20.0, 0.0),
        TreeNode::new(40, Some(9), 80.0, 8.0, 0.0),
        TreeNode::new(41, Some(40), 85.0, 12.0, 0.0),
    ]);
    Skeleton::from_nodes(101, nodes)
        .unwrap()
        .with_name("DA1 PN")
        .with_soma(1)
        .unwrap()
}

/// Spine 1..=20 along x with a one-unit tooth off each of 1..=19, so leaf
/// `100 + i` sits at distance `i` from the root.
pub fn comb() -> Skeleton {
    let mut nodes = chain(1, 20, 1.0);
    for i in 1..=19 {
        nodes.push(TreeNode::new(100 + i, Some(i), (i - 1) as f64, 1.0, 0.0));
    }
    Skeleton::from_nodes(77, nodes).unwrap().with_soma(1).unwrap()
}

pub fn pn_pruner(scale: f64) -> AxonPruner {
    let catalog = pn_catalog();
    let config = pntools_core::config::PruneConfig {
        seed_volumes: ["AL_R".to_string(), "AL_L".to_string()],
        scale,
        max_terminal_candidates: 15,
    };
    AxonPruner::new(&catalog, &terminal_names(), &config).unwrap()
}
