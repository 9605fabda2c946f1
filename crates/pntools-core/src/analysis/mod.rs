pub mod axon;
pub mod matrices;
pub mod upstream;
pub mod volume_prune;

pub use axon::{prune_to_axon, AxonPrune, AxonPruner, CutRule};
pub use matrices::{
    cable_length_matrix, cable_length_matrix_with, ends_matrix, volume_sizes, Matrix,
};
pub use upstream::{missing_upstream, upstream_sheet, MissingUpstream, UpstreamRow, UpstreamSheet};
pub use volume_prune::prune_to_volume;
