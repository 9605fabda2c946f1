//! 3D geometry for skeleton nodes and volume meshes, on nalgebra.

pub use nalgebra::{Point3, Vector3};

/// A position in nanometre space.
pub type Point = Point3<f64>;
/// A displacement between two positions.
pub type Vector = Vector3<f64>;

const EPSILON: f64 = 1e-12;

pub fn is_finite(p: &Point) -> bool {
    p.coords.iter().all(|v| v.is_finite())
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Bounding box of a set of points, or `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(
            BoundingBox {
                min: first,
                max: first,
            },
            |bbox, p| BoundingBox {
                min: bbox.min.inf(p),
                max: bbox.max.sup(p),
            },
        ))
    }

    pub fn contains(&self, p: &Point) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

/// Möller–Trumbore test: distance along `dir` from `origin` at which the ray
/// crosses triangle `(a, b, c)`, if it does so in front of the origin.
pub fn ray_triangle_intersection(
    origin: &Point,
    dir: &Vector,
    a: &Point,
    b: &Point,
    c: &Point,
) -> Option<f64> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = inv_det * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = inv_det * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv_det * edge2.dot(&q);
    (t > EPSILON).then_some(t)
}
