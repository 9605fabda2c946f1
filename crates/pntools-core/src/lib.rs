//! PNtools Core: skeleton pruning and volume analysis for fly connectomics.
//!
//! Neurons are rooted trees of 3D nodes; brain regions are closed triangle
//! meshes. This crate holds the axon pruning heuristic for projection
//! neurons, volume pruning, neuron-by-volume matrices, upstream partner
//! sheets and the sources they read skeletons, connectors and volumes from.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod skeleton;
pub mod source;
pub mod stats;
pub mod volume;

pub use error::{PnError, Result};
