//! Footprint polygons built from asset outlines.
//!
//! Outlines come straight from asset poses and can be malformed: a vertex can
//! be NaN after a bad step, or the ring can cross itself. A crossing ring is
//! repaired by a zero-width union (the `buffer(0)` trick), which splits it into
//! valid parts. The repair is best-effort. A ring that collapses to no area
//! yields `GeometryError::Degenerate` instead of a footprint.

use geo::{Area, BooleanOps, Coord, Distance, Euclidean, Intersects, Line, LineString, MultiPolygon, Polygon};

use super::error::GeometryError;
use super::types::{Asset, Point};

const COINCIDENT_EPSILON: f64 = 1e-12;
const AREA_EPSILON: f64 = 1e-12;

/// A valid 2D footprint, possibly made of several parts after repair
#[derive(Debug, Clone)]
pub struct Footprint {
    shape: MultiPolygon<f64>,
    repaired: bool,
}

impl Footprint {
    /// Build a footprint from a closed outline (the closing vertex is optional)
    pub fn from_points(points: &[Point]) -> Result<Self, GeometryError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite { index });
        }

        let ring = dedupe_ring(points);
        if ring.len() < 3 {
            return Err(GeometryError::TooFewVertices { count: ring.len() });
        }

        let coords: Vec<Coord<f64>> = ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        let polygon = Polygon::new(LineString::new(coords), vec![]);

        if is_simple_ring(&ring) && polygon.unsigned_area() > AREA_EPSILON {
            return Ok(Self {
                shape: MultiPolygon::new(vec![polygon]),
                repaired: false,
            });
        }

        let repaired = MultiPolygon::new(vec![polygon]).union(&MultiPolygon::new(vec![]));
        if repaired.0.is_empty() || repaired.unsigned_area() <= AREA_EPSILON {
            return Err(GeometryError::degenerate(
                "outline has no area after zero-width repair",
            ));
        }
        Ok(Self {
            shape: repaired,
            repaired: true,
        })
    }

    /// Whether the outline needed zero-width repair
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }

    /// Boundary contact counts as intersecting
    pub fn intersects(&self, other: &Footprint) -> bool {
        self.shape.intersects(&other.shape)
    }

    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    pub fn intersection_area(&self, other: &Footprint) -> f64 {
        self.shape.intersection(&other.shape).unsigned_area()
    }

    /// Smallest gap between the two footprints, zero when they intersect
    pub fn distance(&self, other: &Footprint) -> f64 {
        let mut best = f64::INFINITY;
        for ours in &self.shape.0 {
            for theirs in &other.shape.0 {
                best = best.min(Euclidean::distance(ours, theirs));
            }
        }
        best
    }
}

impl Asset {
    /// The asset's footprint polygon at its current pose
    pub fn footprint(&self) -> Result<Footprint, GeometryError> {
        Footprint::from_points(&self.footprint_points())
    }
}

/// Drop repeated consecutive vertices and an explicit closing vertex
fn dedupe_ring(points: &[Point]) -> Vec<Point> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if ring
            .last()
            .map_or(true, |last| last.distance(point) > COINCIDENT_EPSILON)
        {
            ring.push(*point);
        }
    }
    while ring.len() > 1 && ring[0].distance(&ring[ring.len() - 1]) <= COINCIDENT_EPSILON {
        ring.pop();
    }
    ring
}

/// True when no two non-adjacent edges of the closed ring touch
fn is_simple_ring(ring: &[Point]) -> bool {
    let n = ring.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            Line::new(Coord { x: a.x, y: a.y }, Coord { x: b.x, y: b.y })
        })
        .collect();

    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, side: f64) -> Footprint {
        let h = side / 2.0;
        Footprint::from_points(&[
            Point::new(cx - h, cy - h),
            Point::new(cx + h, cy - h),
            Point::new(cx + h, cy + h),
            Point::new(cx - h, cy + h),
        ])
        .unwrap()
    }

    #[test]
    fn test_overlapping_squares_intersect() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        assert!(a.intersects(&b));
        assert!((a.intersection_area(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_separated_squares_do_not_intersect() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(2.0, 0.0, 1.0);
        assert!(!a.intersects(&b));
        assert!((a.distance(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_touching_squares_count_as_intersecting() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 0.0, 1.0);
        assert!(a.intersects(&b));
        assert_eq!(a.distance(&b), 0.0);
    }

    #[test]
    fn test_closing_vertex_is_optional() {
        let closed = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap();
        assert!(!closed.was_repaired());
        assert!((closed.area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_vertex_is_rejected() {
        let err = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap_err();
        assert_eq!(err, GeometryError::NonFinite { index: 1 });
    }

    #[test]
    fn test_too_few_vertices() {
        let err = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
        ])
        .unwrap_err();
        assert_eq!(err, GeometryError::TooFewVertices { count: 2 });
    }

    #[test]
    fn test_collinear_outline_is_degenerate() {
        let err = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));
    }

    #[test]
    fn test_bow_tie_is_repaired() {
        // Edges 0 and 2 cross at (1, 1)
        let bow_tie = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ])
        .unwrap();
        assert!(bow_tie.was_repaired());
        assert!(bow_tie.area() > 0.0);
        assert!(bow_tie.intersects(&square(1.6, 1.0, 0.2)));
        assert!(!bow_tie.intersects(&square(1.0, 0.2, 0.2)));
    }

    #[test]
    fn test_distance_between_diagonal_corners() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(2.0, 2.0, 1.0);
        assert!((a.distance(&b) - std::f64::consts::SQRT_2).abs() < 1e-9);
        assert!((b.distance(&a) - a.distance(&b)).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_repaired_outline_uses_nearest_part() {
        let bow_tie = Footprint::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ])
        .unwrap();
        // Right lobe reaches x = 2 at y = 1
        let gap = bow_tie.distance(&square(3.0, 1.0, 1.0));
        assert!((gap - 0.5).abs() < 1e-6);
    }
}
