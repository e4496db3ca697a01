//! Geometry values carried by features
//!
//! The store treats geometry as opaque apart from two capabilities:
//! cloning and computing an axis-aligned bounding envelope. Malformed
//! shapes are rejected by the constructors here, never by the engine.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Envelope that contains nothing and intersects nothing
    pub const EMPTY: Envelope = Envelope {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    /// Whole-globe envelope in degrees
    pub const WORLD: Envelope = Envelope {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    /// Inclusive intersection test. Empty envelopes never intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// True if `other` lies entirely inside this envelope
    pub fn contains(&self, other: &Envelope) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn expand(&mut self, p: &Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    points: Vec<Point>,
}

impl LineString {
    /// Create a line string; at least two points are required
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() < 2 {
            return Err(StoreError::InvalidArg(format!(
                "line string needs at least 2 points, got {}",
                points.len()
            )));
        }
        Self::check_finite(&points)?;
        Ok(LineString { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.points.first() == self.points.last()
    }

    fn check_finite(points: &[Point]) -> Result<()> {
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(StoreError::InvalidArg(
                "coordinates must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: LineString,
    interiors: Vec<LineString>,
}

impl Polygon {
    /// Create a polygon; every ring must be closed with at least 4 points
    pub fn new(exterior: LineString, interiors: Vec<LineString>) -> Result<Self> {
        for ring in std::iter::once(&exterior).chain(interiors.iter()) {
            if ring.points.len() < 4 || !ring.is_closed() {
                return Err(StoreError::InvalidArg(
                    "polygon rings must be closed and have at least 4 points".to_string(),
                ));
            }
        }
        Ok(Polygon {
            exterior,
            interiors,
        })
    }

    pub fn exterior(&self) -> &LineString {
        &self.exterior
    }

    pub fn interiors(&self) -> &[LineString] {
        &self.interiors
    }
}

/// Discriminant used by geometry-type query filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    Collection(Vec<Geometry>),
}

impl Geometry {
    /// Point geometry; non-finite coordinates are rejected
    pub fn point(x: f64, y: f64) -> Result<Self> {
        LineString::check_finite(&[Point::new(x, y)])?;
        Ok(Geometry::Point(Point::new(x, y)))
    }

    /// Closed rectangular polygon covering `env`
    pub fn rectangle(env: Envelope) -> Result<Self> {
        if env.is_empty() {
            return Err(StoreError::InvalidArg("empty rectangle".to_string()));
        }
        let ring = LineString::new(vec![
            Point::new(env.min_x, env.min_y),
            Point::new(env.max_x, env.min_y),
            Point::new(env.max_x, env.max_y),
            Point::new(env.min_x, env.max_y),
            Point::new(env.min_x, env.min_y),
        ])?;
        Ok(Geometry::Polygon(Polygon::new(ring, Vec::new())?))
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::Collection(_) => GeometryType::Collection,
        }
    }

    /// Bounding envelope; an empty collection yields [`Envelope::EMPTY`]
    pub fn envelope(&self) -> Envelope {
        let mut env = Envelope::EMPTY;
        match self {
            Geometry::Point(p) => env.expand(p),
            Geometry::LineString(ls) => ls.points.iter().for_each(|p| env.expand(p)),
            // interior rings lie inside the exterior
            Geometry::Polygon(poly) => poly.exterior.points.iter().for_each(|p| env.expand(p)),
            Geometry::Collection(children) => {
                for child in children {
                    env = env.union(&child.envelope());
                }
            }
        }
        env
    }
}
