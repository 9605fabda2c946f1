//! Neuron skeletons: the rooted tree model and the SWC file format.

pub mod swc;
pub mod tree;

pub use tree::{Pruned, Skeleton};
