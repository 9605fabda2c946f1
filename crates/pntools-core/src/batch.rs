//! Sequential axon pruning over many skeletons, with timing.

use serde::Serialize;
use std::time::Instant;

use crate::analysis::axon::{AxonPrune, AxonPruner};
use crate::error::Result;
use crate::source::SkeletonSource;

/// Progress callback type: (index, total, skeleton_id), called before each
/// skeleton is processed.
pub type ProgressCallback = Box<dyn FnMut(usize, usize, i64)>;

/// A skeleton the batch moved past without a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSkeleton {
    pub skeleton_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Successful prunes, in input order.
    pub pruned: Vec<AxonPrune>,
    pub skipped: Vec<SkippedSkeleton>,
    pub elapsed_ms: f64,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.pruned.len() + self.skipped.len()
    }
}

/// Fetch and prune each skeleton in `skeleton_ids` in turn.
///
/// Skeletons without a terminal volume are logged and skipped; any other
/// error aborts the batch.
pub fn run_axon_batch(
    source: &dyn SkeletonSource,
    pruner: &AxonPruner,
    skeleton_ids: &[i64],
    mut progress_callback: Option<ProgressCallback>,
) -> Result<BatchReport> {
    let total_start = Instant::now();
    let total = skeleton_ids.len();
    let mut pruned = Vec::with_capacity(total);
    let mut skipped = Vec::new();

    for (index, &skeleton_id) in skeleton_ids.iter().enumerate() {
        if let Some(ref mut cb) = progress_callback {
            cb(index, total, skeleton_id);
        }

        let start = Instant::now();
        let skeleton = source.get_skeleton(skeleton_id)?;
        match pruner.prune(&skeleton) {
            Ok(out) => {
                log::debug!(
                    "skeleton {skeleton_id} pruned in {:.1} ms",
                    start.elapsed().as_secs_f64() * 1000.0
                );
                pruned.push(out);
            }
            Err(e) if e.is_skippable() => {
                log::warn!("skipping skeleton {skeleton_id}: {e}");
                skipped.push(SkippedSkeleton {
                    skeleton_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let elapsed_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    log::info!(
        "pruned {} of {} skeletons in {:.1} ms ({} skipped)",
        pruned.len(),
        total,
        elapsed_ms,
        skipped.len()
    );
    Ok(BatchReport {
        pruned,
        skipped,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeNode;
    use crate::error::PnError;
    use crate::geometry::Point;
    use crate::skeleton::Skeleton;
    use crate::source::MemorySource;
    use crate::volume::Volume;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Straight line along x from `x0`, soma at the first node.
    fn line(id: i64, x0: f64) -> Skeleton {
        let nodes = (0..5)
            .map(|i| TreeNode::new(i + 1, (i > 0).then_some(i), x0 + i as f64, 0.0, 0.0))
            .collect();
        Skeleton::from_nodes(id, nodes).unwrap().with_soma(1).unwrap()
    }

    fn pruner() -> AxonPruner {
        let far = |name: &str| {
            Volume::cuboid(name, Point::new(500.0, 500.0, 500.0), Point::new(501.0, 501.0, 501.0))
        };
        let lh = Volume::cuboid("LH_R", Point::new(3.5, -1.0, -1.0), Point::new(4.5, 1.0, 1.0));
        AxonPruner::from_volumes(vec![lh], [far("AL_R"), far("AL_L")], 1.0, 15).unwrap()
    }

    #[test]
    fn skips_skeletons_without_terminal_volume() {
        let mut src = MemorySource::new();
        src.insert_skeleton(line(1, 0.0));
        src.insert_skeleton(line(2, 100.0));
        src.insert_skeleton(line(3, 0.0));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let cb: ProgressCallback = Box::new(move |i, n, id| sink.borrow_mut().push((i, n, id)));

        let report = run_axon_batch(&src, &pruner(), &[1, 2, 3], Some(cb)).unwrap();
        assert_eq!(
            report.pruned.iter().map(|p| p.skeleton_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].skeleton_id, 2);
        assert!(report.skipped[0].reason.contains("no terminal volume"));
        assert_eq!(report.processed(), 3);
        assert_eq!(*seen.borrow(), vec![(0, 3, 1), (1, 3, 2), (2, 3, 3)]);
    }

    #[test]
    fn other_errors_abort() {
        let mut src = MemorySource::new();
        src.insert_skeleton(line(1, 0.0));
        let err = run_axon_batch(&src, &pruner(), &[1, 42], None).unwrap_err();
        assert!(matches!(err, PnError::SkeletonNotFound(42)));

        let no_soma =
            Skeleton::from_nodes(5, vec![TreeNode::new(1, None, 0.0, 0.0, 0.0)]).unwrap();
        src.insert_skeleton(no_soma);
        let err = run_axon_batch(&src, &pruner(), &[5], None).unwrap_err();
        assert!(matches!(err, PnError::MissingSoma { skeleton_id: 5 }));
    }
}
