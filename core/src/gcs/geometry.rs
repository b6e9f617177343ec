//! Solver-side geometry records.
//!
//! A [`Geometry`] only holds parameter addresses; the values live in the
//! solver's parameter array.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses of a point's `x` and `y` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointAddr {
    pub x: usize,
    pub y: usize,
}

impl PointAddr {
    /// A point whose parameters are stored at `base` and `base + 1`.
    pub fn at(base: usize) -> Self {
        Self { x: base, y: base + 1 }
    }
}

/// Arc-like trailing parameters shared by every arc geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcBounds {
    pub start: PointAddr,
    pub end: PointAddr,
    pub start_angle: usize,
    pub end_angle: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    Point(PointAddr),
    Line {
        p1: PointAddr,
        p2: PointAddr,
    },
    Circle {
        center: PointAddr,
        radius: usize,
    },
    Arc {
        center: PointAddr,
        bounds: ArcBounds,
        radius: usize,
    },
    Ellipse {
        center: PointAddr,
        focus1: PointAddr,
        radmin: usize,
    },
    ArcOfEllipse {
        center: PointAddr,
        focus1: PointAddr,
        bounds: ArcBounds,
        radmin: usize,
    },
    Hyperbola {
        center: PointAddr,
        focus1: PointAddr,
        radmin: usize,
    },
    ArcOfHyperbola {
        center: PointAddr,
        focus1: PointAddr,
        bounds: ArcBounds,
        radmin: usize,
    },
    Parabola {
        vertex: PointAddr,
        focus1: PointAddr,
    },
    ArcOfParabola {
        vertex: PointAddr,
        focus1: PointAddr,
        bounds: ArcBounds,
    },
}

impl Geometry {
    pub fn class(&self) -> GeometryClass {
        match self {
            Self::Point(_) => GeometryClass::Point,
            Self::Line { .. } => GeometryClass::Line,
            Self::Circle { .. } => GeometryClass::Circle,
            Self::Arc { .. } => GeometryClass::Arc,
            Self::Ellipse { .. } => GeometryClass::Ellipse,
            Self::ArcOfEllipse { .. } => GeometryClass::ArcOfEllipse,
            Self::Hyperbola { .. } => GeometryClass::Hyperbola,
            Self::ArcOfHyperbola { .. } => GeometryClass::ArcOfHyperbola,
            Self::Parabola { .. } => GeometryClass::Parabola,
            Self::ArcOfParabola { .. } => GeometryClass::ArcOfParabola,
        }
    }

    /// Every parameter address this geometry refers to.
    pub fn addresses(&self) -> Vec<usize> {
        fn point(p: &PointAddr, out: &mut Vec<usize>) {
            out.push(p.x);
            out.push(p.y);
        }
        fn bounds(b: &ArcBounds, out: &mut Vec<usize>) {
            point(&b.start, out);
            point(&b.end, out);
            out.push(b.start_angle);
            out.push(b.end_angle);
        }

        let mut out = Vec::new();
        match self {
            Self::Point(p) => point(p, &mut out),
            Self::Line { p1, p2 } => {
                point(p1, &mut out);
                point(p2, &mut out);
            }
            Self::Circle { center, radius } => {
                point(center, &mut out);
                out.push(*radius);
            }
            Self::Arc { center, bounds: b, radius } => {
                point(center, &mut out);
                bounds(b, &mut out);
                out.push(*radius);
            }
            Self::Ellipse { center, focus1, radmin } | Self::Hyperbola { center, focus1, radmin } => {
                point(center, &mut out);
                point(focus1, &mut out);
                out.push(*radmin);
            }
            Self::ArcOfEllipse { center, focus1, bounds: b, radmin }
            | Self::ArcOfHyperbola { center, focus1, bounds: b, radmin } => {
                point(center, &mut out);
                point(focus1, &mut out);
                bounds(b, &mut out);
                out.push(*radmin);
            }
            Self::Parabola { vertex, focus1 } => {
                point(vertex, &mut out);
                point(focus1, &mut out);
            }
            Self::ArcOfParabola { vertex, focus1, bounds: b } => {
                point(vertex, &mut out);
                point(focus1, &mut out);
                bounds(b, &mut out);
            }
        }
        out
    }
}

/// Geometry class hierarchy of the solver.
///
/// Arcs are circles, arcs of conics are conics, and every non-point class is
/// a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryClass {
    Point,
    Line,
    Circle,
    Arc,
    Ellipse,
    ArcOfEllipse,
    Hyperbola,
    ArcOfHyperbola,
    Parabola,
    ArcOfParabola,
    Curve,
}

impl GeometryClass {
    /// Whether a geometry of class `found` may be passed where `self` is
    /// expected.
    pub fn accepts(self, found: GeometryClass) -> bool {
        use GeometryClass::*;
        match self {
            Curve => found != Point && found != Curve,
            Circle => matches!(found, Circle | Arc),
            Ellipse => matches!(found, Ellipse | ArcOfEllipse),
            Hyperbola => matches!(found, Hyperbola | ArcOfHyperbola),
            Parabola => matches!(found, Parabola | ArcOfParabola),
            exact => exact == found,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Circle => "circle",
            Self::Arc => "arc",
            Self::Ellipse => "ellipse",
            Self::ArcOfEllipse => "arc_of_ellipse",
            Self::Hyperbola => "hyperbola",
            Self::ArcOfHyperbola => "arc_of_hyperbola",
            Self::Parabola => "parabola",
            Self::ArcOfParabola => "arc_of_parabola",
            Self::Curve => "curve",
        }
    }
}

impl fmt::Display for GeometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
