//! Planar helpers in `(row, col)` pixel coordinates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub r: f64,
    pub c: f64,
}

impl Point {
    pub const fn new(r: f64, c: f64) -> Self {
        Self { r, c }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.r - other.r).hypot(self.c - other.c)
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.c.is_finite()
    }

    /// Angle of `self` about `center`; ascending order is clockwise on screen
    /// because rows grow downward.
    pub fn angle_about(&self, center: &Point) -> f64 {
        (self.r - center.r).atan2(self.c - center.c)
    }
}

pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::new(f64::NAN, f64::NAN);
    }
    let n = points.len() as f64;
    let (r, c) = points
        .iter()
        .fold((0.0, 0.0), |(r, c), p| (r + p.r, c + p.c));
    Point::new(r / n, c / n)
}

/// Returns `points` ordered clockwise about their own centroid.
pub fn sort_clockwise(points: &[Point]) -> Vec<Point> {
    let center = centroid(points);
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        a.angle_about(&center)
            .partial_cmp(&b.angle_about(&center))
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

/// Indices of `points` ordered by distance to `target`, nearest first.
/// Equal distances keep their input order.
pub fn indices_by_distance(points: &[Point], target: &Point) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..points.len()).collect();
    indices.sort_by(|&a, &b| {
        points[a]
            .distance(target)
            .partial_cmp(&points[b].distance(target))
            .unwrap_or(Ordering::Equal)
    });
    indices
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn centroid(&self) -> Point {
        centroid(&self.vertices)
    }

    /// Even-odd crossing test. Non-finite points are never inside.
    pub fn contains(&self, p: &Point) -> bool {
        if !p.is_finite() || self.vertices.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.r > p.r) != (b.r > p.r) {
                let c_cross = (b.c - a.c) * (p.r - a.r) / (b.r - a.r) + a.c;
                if p.c < c_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let cross = (b.c - a.c) * (c.r - b.r) - (b.r - a.r) * (c.c - b.c);
            if cross == 0.0 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        sign != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ])
    }

    #[test]
    fn containment_uses_even_odd_rule() {
        let poly = square();
        assert!(poly.contains(&Point::new(5.0, 5.0)));
        assert!(!poly.contains(&Point::new(15.0, 5.0)));
        assert!(!poly.contains(&Point::new(f64::NAN, 5.0)));
    }

    #[test]
    fn clockwise_sort_runs_top_right_bottom_left() {
        let points = [
            Point::new(10.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(0.0, 5.0),
            Point::new(5.0, 0.0),
        ];
        let sorted = sort_clockwise(&points);
        assert_eq!(
            sorted,
            vec![
                Point::new(0.0, 5.0),
                Point::new(5.0, 10.0),
                Point::new(10.0, 5.0),
                Point::new(5.0, 0.0),
            ]
        );
        assert!(Polygon::new(sorted).is_convex());
    }

    #[test]
    fn distance_ordering_is_stable() {
        let points = [Point::new(0.0, 2.0), Point::new(0.0, -2.0), Point::new(0.0, 1.0)];
        let order = indices_by_distance(&points, &Point::new(0.0, 0.0));
        assert_eq!(order, vec![2, 0, 1]);
    }
}
