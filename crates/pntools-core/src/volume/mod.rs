//! Anatomical volumes as closed triangle meshes.

pub mod catalog;
pub mod neuropils;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::validate_scale;
use crate::error::{PnError, Result};
use crate::geometry::{self, ray_triangle_intersection, BoundingBox, Point, Vector};

pub use catalog::{VolumeCatalog, VolumeLookup};

/// Ray direction for containment tests. Skewed off every axis so rays do not
/// run along the edges of axis-aligned meshes.
fn ray_dir() -> Vector {
    Vector::new(1.0, 0.318_309_886_183_790_7, 0.207_879_576_350_761_9)
}

/// JSON layout of a mesh: `{"name", "vertices": [[x,y,z]...], "faces": [[i,j,k]...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VolumeMesh {
    name: String,
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

/// A named, closed region of neuropil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VolumeMesh", into = "VolumeMesh")]
pub struct Volume {
    name: String,
    vertices: Vec<Point>,
    faces: Vec<[usize; 3]>,
    bbox: BoundingBox,
}

impl TryFrom<VolumeMesh> for Volume {
    type Error = PnError;

    fn try_from(mesh: VolumeMesh) -> Result<Self> {
        Volume::new(
            mesh.name,
            mesh.vertices.into_iter().map(|[x, y, z]| Point::new(x, y, z)).collect(),
            mesh.faces,
        )
    }
}

impl From<Volume> for VolumeMesh {
    fn from(volume: Volume) -> Self {
        VolumeMesh {
            name: volume.name,
            vertices: volume.vertices.iter().map(|p| [p.x, p.y, p.z]).collect(),
            faces: volume.faces,
        }
    }
}

impl Volume {
    /// Build a volume from a triangle mesh. Faces should be consistently
    /// oriented for `enclosed_volume` to be meaningful.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Point>,
        faces: Vec<[usize; 3]>,
    ) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| PnError::InvalidVolume {
            name: name.clone(),
            reason,
        };

        if vertices.len() < 4 || faces.len() < 4 {
            return Err(invalid(format!(
                "a closed mesh needs at least 4 vertices and 4 faces, got {} and {}",
                vertices.len(),
                faces.len()
            )));
        }
        if let Some(v) = vertices.iter().find(|v| !geometry::is_finite(v)) {
            return Err(invalid(format!("non-finite vertex {v:?}")));
        }
        if let Some(face) = faces.iter().find(|f| f.iter().any(|&i| i >= vertices.len())) {
            return Err(invalid(format!(
                "face {face:?} indexes past {} vertices",
                vertices.len()
            )));
        }

        let bbox = BoundingBox::from_points(&vertices)
            .ok_or_else(|| invalid("mesh has no vertices".to_string()))?;
        Ok(Self {
            name,
            vertices,
            faces,
            bbox,
        })
    }

    /// Axis-aligned box between two corners, with outward-facing triangles.
    pub fn cuboid(name: impl Into<String>, min: Point, max: Point) -> Self {
        let (lo, hi) = (min.inf(&max), min.sup(&max));
        let vertices = vec![
            Point::new(lo.x, lo.y, lo.z),
            Point::new(hi.x, lo.y, lo.z),
            Point::new(hi.x, hi.y, lo.z),
            Point::new(lo.x, hi.y, lo.z),
            Point::new(lo.x, lo.y, hi.z),
            Point::new(hi.x, lo.y, hi.z),
            Point::new(hi.x, hi.y, hi.z),
            Point::new(lo.x, hi.y, hi.z),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self {
            name: name.into(),
            vertices,
            faces,
            bbox: BoundingBox { min: lo, max: hi },
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Point-in-mesh test by ray parity.
    pub fn contains(&self, point: &Point) -> bool {
        if !self.bbox.contains(point) {
            return false;
        }
        let ray_dir = ray_dir();
        let crossings = self
            .faces
            .iter()
            .filter(|[a, b, c]| {
                ray_triangle_intersection(
                    point,
                    &ray_dir,
                    &self.vertices[*a],
                    &self.vertices[*b],
                    &self.vertices[*c],
                )
                .is_some()
            })
            .count();
        crossings % 2 == 1
    }

    pub fn contains_points(&self, points: &[Point]) -> Vec<bool> {
        points.iter().map(|p| self.contains(p)).collect()
    }

    /// Mean of the mesh vertices.
    pub fn centroid(&self) -> Point {
        let n = self.vertices.len() as f64;
        let sum = self
            .vertices
            .iter()
            .fold(Vector::zeros(), |acc, v| acc + v.coords);
        Point::from(sum / n)
    }

    /// Scale the mesh uniformly about its centroid.
    pub fn resize(&mut self, factor: f64) -> Result<()> {
        validate_scale(factor)?;
        let centre = self.centroid();
        for v in &mut self.vertices {
            *v = centre + (*v - centre) * factor;
        }
        if let Some(bbox) = BoundingBox::from_points(&self.vertices) {
            self.bbox = bbox;
        }
        Ok(())
    }

    /// A scaled copy; the original is left untouched.
    pub fn resized(&self, factor: f64) -> Result<Volume> {
        let mut copy = self.clone();
        copy.resize(factor)?;
        Ok(copy)
    }

    /// Enclosed volume in cubic units of the vertex coordinates.
    pub fn enclosed_volume(&self) -> f64 {
        let signed: f64 = self
            .faces
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (&self.vertices[*a], &self.vertices[*b], &self.vertices[*c]);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum();
        signed.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Volume {
        Volume::cuboid("box", Point::new(0.0, 0.0, 0.0), Point::new(2.0, 2.0, 2.0))
    }

    #[test]
    fn cuboid_containment() {
        let v = unit_box();
        assert!(v.contains(&Point::new(1.0, 1.0, 1.0)));
        assert!(v.contains(&Point::new(0.1, 1.9, 0.5)));
        assert!(!v.contains(&Point::new(3.0, 1.0, 1.0)));
        assert!(!v.contains(&Point::new(-0.1, 1.0, 1.0)));
        assert_eq!(
            v.contains_points(&[Point::new(1.0, 1.0, 1.0), Point::new(5.0, 5.0, 5.0)]),
            vec![true, false]
        );
    }

    #[test]
    fn enclosed_volume_of_box() {
        let v = Volume::cuboid("b", Point::new(1.0, 1.0, 1.0), Point::new(3.0, 4.0, 5.0));
        assert!((v.enclosed_volume() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn resize_scales_about_centroid() {
        let v = unit_box();
        assert_eq!(v.centroid(), Point::new(1.0, 1.0, 1.0));

        let big = v.resized(2.0).unwrap();
        assert_eq!(big.bounding_box().min, Point::new(-1.0, -1.0, -1.0));
        assert_eq!(big.bounding_box().max, Point::new(3.0, 3.0, 3.0));
        assert!(big.contains(&Point::new(2.5, 1.0, 1.0)));
        assert!(!v.contains(&Point::new(2.5, 1.0, 1.0)));
        assert!((big.enclosed_volume() - 64.0).abs() < 1e-9);

        let same = v.resized(1.0).unwrap();
        assert_eq!(same, v);
        assert!(v.resized(0.0).is_err());
    }

    #[test]
    fn rejects_bad_faces() {
        let verts = unit_box().vertices().to_vec();
        let err = Volume::new("bad", verts, vec![[0, 1, 2], [0, 1, 3], [1, 2, 3], [0, 2, 99]])
            .unwrap_err();
        assert!(matches!(err, PnError::InvalidVolume { .. }));
    }

    #[test]
    fn loads_from_json() {
        let json = serde_json::to_string(&unit_box()).unwrap();
        assert!(json.contains("\"faces\""));
        let v = Volume::from_json_str(&json).unwrap();
        assert_eq!(v.name(), "box");
        assert_eq!(v.faces().len(), 12);
        assert!(v.contains(&Point::new(1.0, 1.0, 1.0)));

        let broken = Volume::from_json_str(r#"{"name": "x", "vertices": [], "faces": []}"#);
        assert!(broken.is_err());
    }
}
