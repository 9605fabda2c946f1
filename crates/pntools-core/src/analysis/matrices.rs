//! Neuron-by-volume matrices: end-node counts and cable length.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{MatrixConfig, Normalisation};
use crate::error::{PnError, Result};
use crate::skeleton::Skeleton;
use crate::volume::Volume;

/// Dense labelled table: one row per skeleton, one column per volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    pub rows: Vec<i64>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<T>>,
}

impl<T: Copy> Matrix<T> {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn get(&self, row: i64, column: &str) -> Option<T> {
        let r = self.rows.iter().position(|&id| id == row)?;
        let c = self.columns.iter().position(|name| name == column)?;
        Some(self.values[r][c])
    }

    pub fn row(&self, row: i64) -> Option<&[T]> {
        let r = self.rows.iter().position(|&id| id == row)?;
        Some(self.values[r].as_slice())
    }

    pub fn column(&self, column: &str) -> Option<Vec<T>> {
        let c = self.columns.iter().position(|name| name == column)?;
        Some(self.values.iter().map(|row| row[c]).collect())
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows.clone(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|row| row.iter().map(|&v| f(v)).collect())
                .collect(),
        }
    }
}

impl Matrix<usize> {
    /// `true` wherever the count is non-zero.
    pub fn as_mask(&self) -> Matrix<bool> {
        self.map(|v| v > 0)
    }
}

fn volume_names(volumes: &[Volume]) -> Vec<String> {
    volumes.iter().map(|v| v.name().to_string()).collect()
}

/// Number of end nodes (nodes without children) of each skeleton inside
/// each volume. Tags are ignored.
pub fn ends_matrix(skeletons: &[Skeleton], volumes: &[Volume]) -> Matrix<usize> {
    let values = skeletons
        .par_iter()
        .map(|s| {
            let ends: Vec<_> = s.leaves().into_iter().filter_map(|id| s.position(id)).collect();
            volumes
                .iter()
                .map(|v| ends.iter().filter(|p| v.contains(p)).count())
                .collect()
        })
        .collect();
    Matrix {
        rows: skeletons.iter().map(Skeleton::id).collect(),
        columns: volume_names(volumes),
        values,
    }
}

/// Cable length of each skeleton inside each volume.
///
/// Only edges with both ends inside a volume count towards it. Cells where
/// `mask` is false are zeroed before normalisation.
pub fn cable_length_matrix(
    skeletons: &[Skeleton],
    volumes: &[Volume],
    mask: Option<&Matrix<bool>>,
    normalisation: Option<Normalisation>,
) -> Result<Matrix<f64>> {
    let expected = (skeletons.len(), volumes.len());
    if let Some(mask) = mask {
        if mask.shape() != expected {
            return Err(PnError::ShapeMismatch {
                expected,
                actual: mask.shape(),
            });
        }
    }

    let mut values: Vec<Vec<f64>> = skeletons
        .par_iter()
        .map(|s| {
            volumes
                .iter()
                .map(|v| s.cable_within(&s.nodes_within(v)))
                .collect()
        })
        .collect();

    if let Some(mask) = mask {
        for (row, mask_row) in values.iter_mut().zip(&mask.values) {
            for (cell, &keep) in row.iter_mut().zip(mask_row) {
                if !keep {
                    *cell = 0.0;
                }
            }
        }
    }

    match normalisation {
        Some(Normalisation::Neuron) => {
            for row in &mut values {
                let total: f64 = row.iter().sum();
                if total > 0.0 {
                    row.iter_mut().for_each(|v| *v /= total);
                }
            }
        }
        Some(Normalisation::Volume) => {
            let sizes: Vec<f64> = volumes.iter().map(Volume::enclosed_volume).collect();
            for row in &mut values {
                for (v, size) in row.iter_mut().zip(&sizes) {
                    *v = if *size > 0.0 { *v / size } else { 0.0 };
                }
            }
        }
        None => {}
    }

    Ok(Matrix {
        rows: skeletons.iter().map(Skeleton::id).collect(),
        columns: volume_names(volumes),
        values,
    })
}

/// Cable length matrix as configured: masked by [`ends_matrix`] when
/// `mask_by_ends` is set, then normalised.
pub fn cable_length_matrix_with(
    skeletons: &[Skeleton],
    volumes: &[Volume],
    config: &MatrixConfig,
) -> Result<Matrix<f64>> {
    let mask = config
        .mask_by_ends
        .then(|| ends_matrix(skeletons, volumes).as_mask());
    cable_length_matrix(skeletons, volumes, mask.as_ref(), config.normalisation)
}

/// Enclosed size of each volume, in the cube of the mesh units.
pub fn volume_sizes(volumes: &[Volume]) -> Vec<(String, f64)> {
    volumes
        .iter()
        .map(|v| (v.name().to_string(), v.enclosed_volume()))
        .collect()
}
