//! JSON summaries of pruning runs and matrices.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::analysis::axon::{AxonPrune, CutRule};
use crate::batch::{BatchReport, SkippedSkeleton};
use crate::error::Result;

/// Per-skeleton outcome of axon pruning.
#[derive(Debug, Clone, Serialize)]
pub struct PruneSummary {
    pub skeleton_id: i64,
    pub terminal_volume: String,
    pub cut_branch: Option<i64>,
    pub cut_rule: CutRule,
    pub protected: usize,
    pub removed: usize,
    pub remaining: usize,
    pub fragments: usize,
    pub cable_length: f64,
}

impl From<&AxonPrune> for PruneSummary {
    fn from(p: &AxonPrune) -> Self {
        Self {
            skeleton_id: p.skeleton_id,
            terminal_volume: p.terminal_volume.clone(),
            cut_branch: p.cut_branch,
            cut_rule: p.cut_rule,
            protected: p.protected.len(),
            removed: p.removed.len(),
            remaining: p.result.node_count(),
            fragments: p.result.fragments().len(),
            cable_length: (p.result.cable_length() * 10.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub pruned: Vec<PruneSummary>,
    pub skipped: Vec<SkippedSkeleton>,
}

/// Summarise a batch run with timestamp and version metadata.
pub fn build_summary(report: &BatchReport) -> BatchSummary {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "generated_at".to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "pntools_version".to_string(),
        serde_json::Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    metadata.insert(
        "duration_ms".to_string(),
        serde_json::json!((report.elapsed_ms * 10.0).round() / 10.0),
    );
    metadata.insert(
        "skeletons".to_string(),
        serde_json::json!(report.processed()),
    );

    BatchSummary {
        metadata,
        pruned: report.pruned.iter().map(PruneSummary::from).collect(),
        skipped: report.skipped.clone(),
    }
}

/// Write any serialisable value as pretty JSON, creating parent directories.
pub fn write_output<T: Serialize + ?Sized>(value: &T, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
