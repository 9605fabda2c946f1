//! SWC reader and writer.
//!
//! Each data line is `id type x y z radius parent`; `#` starts a comment and a
//! negative parent marks the root. Structure type `1` marks the soma.

use std::fmt::Write as _;
use std::path::Path;

use crate::config::TreeNode;
use crate::error::{PnError, Result};
use crate::skeleton::tree::Skeleton;

const SOMA_TYPE: i32 = 1;
const UNDEFINED_TYPE: i32 = 0;

/// Parse SWC text into a skeleton.
pub fn parse_swc(skeleton_id: i64, text: &str) -> Result<Skeleton> {
    let mut nodes = Vec::new();
    let mut soma = None;
    let mut name = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        if let Some(n) = raw.trim().strip_prefix("# name ") {
            name = Some(n.trim().to_string());
            continue;
        }
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 7 {
            return Err(PnError::Parse {
                line: line_no,
                message: format!("expected 7 fields, found {}", fields.len()),
            });
        }

        let node_id: i64 = parse_field(fields[0], "id", line_no)?;
        let kind: i32 = parse_field(fields[1], "type", line_no)?;
        let x: f64 = parse_field(fields[2], "x", line_no)?;
        let y: f64 = parse_field(fields[3], "y", line_no)?;
        let z: f64 = parse_field(fields[4], "z", line_no)?;
        let radius: f64 = parse_field(fields[5], "radius", line_no)?;
        let parent: i64 = parse_field(fields[6], "parent", line_no)?;

        if kind == SOMA_TYPE && soma.is_none() {
            soma = Some(node_id);
        }
        nodes.push(TreeNode {
            node_id,
            parent_id: (parent >= 0).then_some(parent),
            x,
            y,
            z,
            radius,
        });
    }

    let mut skeleton = Skeleton::from_nodes(skeleton_id, nodes)?;
    if let Some(name) = name {
        skeleton = skeleton.with_name(name);
    }
    match soma {
        Some(s) => skeleton.with_soma(s),
        None => Ok(skeleton),
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str, line: usize) -> Result<T> {
    raw.parse().map_err(|_| PnError::Parse {
        line,
        message: format!("invalid {name} '{raw}'"),
    })
}

/// Read an SWC file from disk.
pub fn read_swc(skeleton_id: i64, path: impl AsRef<Path>) -> Result<Skeleton> {
    let text = std::fs::read_to_string(path)?;
    parse_swc(skeleton_id, &text)
}

/// Render a skeleton as SWC text, nodes in ID order.
pub fn to_swc(skeleton: &Skeleton) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# skeleton_id {}", skeleton.id());
    if let Some(name) = skeleton.name() {
        let _ = writeln!(out, "# name {name}");
    }
    for node in skeleton.to_nodes() {
        let kind = if skeleton.soma() == Some(node.node_id) {
            SOMA_TYPE
        } else {
            UNDEFINED_TYPE
        };
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {}",
            node.node_id,
            kind,
            node.x,
            node.y,
            node.z,
            node.radius,
            node.parent_id.unwrap_or(-1)
        );
    }
    out
}
