//! Constraint equations of the reference solver.
//!
//! A [`ConstraintCall`] is checked against its kind's argument layout and
//! turned into an [`Equation`] holding plain parameter addresses. Geometry
//! handles are resolved at this point, so equations stay valid after the
//! caller releases them.

use std::collections::HashMap;

use crate::gcs::{
    ArcBounds, ConstraintCall, GeomHandle, Geometry, GeometryClass, PointAddr, SolverArg,
    SolverError,
};
use crate::geometry::utils_2d::{
    angle_between, arc_point, cross_2d, distance, dot_2d, length_2d, midpoint, normalize_2d,
    perpendicular_ccw, signed_distance_point_to_line, sub_2d, wrap_angle,
};
use crate::schema::{ConstraintKind, InternalAlignment};

#[inline]
fn pt(x: &[f64], p: PointAddr) -> [f64; 2] {
    [x[p.x], x[p.y]]
}

/// Two points spanning a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Segment {
    pub p1: PointAddr,
    pub p2: PointAddr,
}

impl Segment {
    fn ends(&self, x: &[f64]) -> ([f64; 2], [f64; 2]) {
        (pt(x, self.p1), pt(x, self.p2))
    }

    fn direction(&self, x: &[f64]) -> [f64; 2] {
        sub_2d(pt(x, self.p2), pt(x, self.p1))
    }
}

/// Curves whose tangent at a point is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Tangent {
    Line(Segment),
    Circular { center: PointAddr },
}

impl Tangent {
    fn at(&self, x: &[f64], p: [f64; 2]) -> [f64; 2] {
        match self {
            Tangent::Line(line) => line.direction(x),
            Tangent::Circular { center } => perpendicular_ccw(sub_2d(p, pt(x, *center))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Equation {
    Equal { a: usize, b: usize },
    Difference { a: usize, b: usize, d: usize },
    Proportional { a: usize, b: usize, ratio: usize },
    CoordinateX { p: PointAddr, x: usize },
    CoordinateY { p: PointAddr, y: usize },
    Coincident { p1: PointAddr, p2: PointAddr },
    P2PDistance { p1: PointAddr, p2: PointAddr, d: usize },
    P2PAngle { p1: PointAddr, p2: PointAddr, angle: usize, incr: f64 },
    P2LDistance { p: PointAddr, line: Segment, d: usize },
    PointOnLine { p: PointAddr, a: PointAddr, b: PointAddr },
    PointOnPerpBisector { p: PointAddr, line: Segment },
    Parallel { l1: Segment, l2: Segment },
    Perpendicular { l1: Segment, l2: Segment },
    L2LAngle { l1: Segment, l2: Segment, angle: usize },
    MidpointOnLine { l1: Segment, l2: Segment },
    Horizontal { p1: PointAddr, p2: PointAddr },
    Vertical { p1: PointAddr, p2: PointAddr },
    TangentLineCircle { line: Segment, center: PointAddr, radius: usize },
    ArcRules { center: PointAddr, bounds: ArcBounds, radius: usize },
    PointOnCircle { p: PointAddr, center: PointAddr, radius: usize },
    PointOnEllipse { p: PointAddr, center: PointAddr, focus1: PointAddr, radmin: usize },
    Radius { radius: usize, value: usize },
    Diameter { radius: usize, value: usize },
    EqualLength { l1: Segment, l2: Segment },
    EqualRadius { r1: usize, r2: usize },
    SymmetricPpl { p1: PointAddr, p2: PointAddr, line: Segment },
    SymmetricPpp { p1: PointAddr, p2: PointAddr, p: PointAddr },
    AngleViaPoint { crv1: Tangent, crv2: Tangent, p: PointAddr, angle: usize },
    PerpendicularArcs { c1: PointAddr, p1: PointAddr, c2: PointAddr, p2: PointAddr },
}

impl Equation {
    /// Number of scalar residuals this equation contributes.
    pub fn rows(&self) -> usize {
        match self {
            Equation::Coincident { .. } | Equation::SymmetricPpl { .. } | Equation::SymmetricPpp { .. } => 2,
            Equation::PerpendicularArcs { .. } => 3,
            Equation::ArcRules { .. } => 4,
            _ => 1,
        }
    }

    /// Append this equation's residuals, evaluated on the full parameter
    /// vector `x`, to `out`.
    pub fn residuals(&self, x: &[f64], out: &mut Vec<f64>) {
        match *self {
            Equation::Equal { a, b } => out.push(x[a] - x[b]),
            Equation::Difference { a, b, d } => out.push(x[b] - x[a] - x[d]),
            Equation::Proportional { a, b, ratio } => out.push(x[b] - x[ratio] * x[a]),
            Equation::CoordinateX { p, x: value } => out.push(x[p.x] - x[value]),
            Equation::CoordinateY { p, y: value } => out.push(x[p.y] - x[value]),
            Equation::Coincident { p1, p2 } => {
                out.push(x[p1.x] - x[p2.x]);
                out.push(x[p1.y] - x[p2.y]);
            }
            Equation::P2PDistance { p1, p2, d } => {
                out.push(distance(pt(x, p1), pt(x, p2)) - x[d]);
            }
            Equation::P2PAngle { p1, p2, angle, incr } => {
                let dir = sub_2d(pt(x, p2), pt(x, p1));
                out.push(wrap_angle(dir[1].atan2(dir[0]) - (x[angle] + incr)));
            }
            Equation::P2LDistance { p, line, d } => {
                let (a, b) = line.ends(x);
                out.push(signed_distance_point_to_line(a, b, pt(x, p)).abs() - x[d]);
            }
            Equation::PointOnLine { p, a, b } => {
                out.push(signed_distance_point_to_line(pt(x, a), pt(x, b), pt(x, p)));
            }
            Equation::PointOnPerpBisector { p, line } => {
                let (a, b) = line.ends(x);
                let dir = normalize_2d(sub_2d(b, a));
                out.push(dot_2d(sub_2d(pt(x, p), midpoint(a, b)), dir));
            }
            Equation::Parallel { l1, l2 } => {
                let d1 = normalize_2d(l1.direction(x));
                let d2 = normalize_2d(l2.direction(x));
                out.push(cross_2d(d1, d2));
            }
            Equation::Perpendicular { l1, l2 } => {
                let d1 = normalize_2d(l1.direction(x));
                let d2 = normalize_2d(l2.direction(x));
                out.push(dot_2d(d1, d2));
            }
            Equation::L2LAngle { l1, l2, angle } => {
                let measured = angle_between(l1.direction(x), l2.direction(x));
                out.push(wrap_angle(measured - x[angle]));
            }
            Equation::MidpointOnLine { l1, l2 } => {
                let (a1, b1) = l1.ends(x);
                let (a2, b2) = l2.ends(x);
                out.push(signed_distance_point_to_line(a2, b2, midpoint(a1, b1)));
            }
            Equation::Horizontal { p1, p2 } => out.push(x[p2.y] - x[p1.y]),
            Equation::Vertical { p1, p2 } => out.push(x[p2.x] - x[p1.x]),
            Equation::TangentLineCircle { line, center, radius } => {
                let (a, b) = line.ends(x);
                let d = signed_distance_point_to_line(a, b, pt(x, center)).abs();
                out.push(d - x[radius]);
            }
            Equation::ArcRules { center, bounds, radius } => {
                let c = pt(x, center);
                let r = x[radius];
                let start = arc_point(c, r, x[bounds.start_angle]);
                let end = arc_point(c, r, x[bounds.end_angle]);
                out.push(x[bounds.start.x] - start[0]);
                out.push(x[bounds.start.y] - start[1]);
                out.push(x[bounds.end.x] - end[0]);
                out.push(x[bounds.end.y] - end[1]);
            }
            Equation::PointOnCircle { p, center, radius } => {
                out.push(distance(pt(x, p), pt(x, center)) - x[radius]);
            }
            Equation::PointOnEllipse { p, center, focus1, radmin } => {
                let c = pt(x, center);
                let f1 = pt(x, focus1);
                let f2 = [2.0 * c[0] - f1[0], 2.0 * c[1] - f1[1]];
                let focal = distance(c, f1);
                let radmaj = (x[radmin] * x[radmin] + focal * focal).sqrt();
                let q = pt(x, p);
                out.push(distance(q, f1) + distance(q, f2) - 2.0 * radmaj);
            }
            Equation::Radius { radius, value } => out.push(x[radius] - x[value]),
            Equation::Diameter { radius, value } => out.push(2.0 * x[radius] - x[value]),
            Equation::EqualLength { l1, l2 } => {
                out.push(length_2d(l1.direction(x)) - length_2d(l2.direction(x)));
            }
            Equation::EqualRadius { r1, r2 } => out.push(x[r1] - x[r2]),
            Equation::SymmetricPpl { p1, p2, line } => {
                let (a, b) = line.ends(x);
                let q1 = pt(x, p1);
                let q2 = pt(x, p2);
                out.push(signed_distance_point_to_line(a, b, midpoint(q1, q2)));
                out.push(dot_2d(sub_2d(q2, q1), normalize_2d(sub_2d(b, a))));
            }
            Equation::SymmetricPpp { p1, p2, p } => {
                let mid = midpoint(pt(x, p1), pt(x, p2));
                let q = pt(x, p);
                out.push(mid[0] - q[0]);
                out.push(mid[1] - q[1]);
            }
            Equation::AngleViaPoint { crv1, crv2, p, angle } => {
                let q = pt(x, p);
                let measured = angle_between(crv1.at(x, q), crv2.at(x, q));
                out.push(wrap_angle(measured - x[angle]));
            }
            Equation::PerpendicularArcs { c1, p1, c2, p2 } => {
                let q1 = pt(x, p1);
                let q2 = pt(x, p2);
                out.push(q1[0] - q2[0]);
                out.push(q1[1] - q2[1]);
                let r1 = normalize_2d(sub_2d(q1, pt(x, c1)));
                let r2 = normalize_2d(sub_2d(q2, pt(x, c2)));
                out.push(dot_2d(r1, r2));
            }
        }
    }
}

/// A constraint call after argument checking.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BuiltConstraint {
    pub equation: Equation,
    pub tag: i32,
    pub driving: bool,
    pub scale: f64,
    /// Addresses passed as [`SolverArg::Datum`].
    pub datums: Vec<usize>,
}

/// Walks a call's positional arguments, checking each against the type the
/// kind expects at that position.
struct ArgCursor<'a> {
    kind: ConstraintKind,
    args: &'a [SolverArg],
    index: usize,
    geometries: &'a HashMap<GeomHandle, Geometry>,
    params_size: usize,
    datums: Vec<usize>,
}

impl<'a> ArgCursor<'a> {
    fn new(
        call: &'a ConstraintCall,
        geometries: &'a HashMap<GeomHandle, Geometry>,
        params_size: usize,
    ) -> Result<Self, SolverError> {
        let expected = call.kind.arity(true);
        let found = call.args.len();
        if found != expected && found != call.kind.arity(false) {
            return Err(SolverError::ArityMismatch { kind: call.kind, expected, found });
        }
        Ok(Self {
            kind: call.kind,
            args: &call.args,
            index: 0,
            geometries,
            params_size,
            datums: Vec::new(),
        })
    }

    fn type_error(&self, index: usize, expected: &str) -> SolverError {
        SolverError::ArgumentType {
            kind: self.kind,
            index,
            expected: expected.to_string(),
        }
    }

    fn unsupported(&self, geometry: &Geometry) -> SolverError {
        SolverError::UnsupportedGeometry {
            kind: self.kind,
            geometry: geometry.class(),
        }
    }

    fn next(&mut self, expected: &str) -> Result<(usize, SolverArg), SolverError> {
        let index = self.index;
        let arg = *self
            .args
            .get(index)
            .ok_or_else(|| self.type_error(index, expected))?;
        self.index += 1;
        Ok((index, arg))
    }

    fn address(&self, addr: usize) -> Result<usize, SolverError> {
        if addr < self.params_size {
            Ok(addr)
        } else {
            Err(SolverError::AddressOutOfRange(addr))
        }
    }

    fn value(&mut self) -> Result<usize, SolverError> {
        match self.next("a parameter address")? {
            (_, SolverArg::Param(addr)) => self.address(addr),
            (_, SolverArg::Datum(addr)) => {
                let addr = self.address(addr)?;
                self.datums.push(addr);
                Ok(addr)
            }
            (index, _) => Err(self.type_error(index, "a parameter address")),
        }
    }

    fn geometry(&mut self, expected: GeometryClass) -> Result<Geometry, SolverError> {
        match self.next("a geometry handle")? {
            (_, SolverArg::Geometry(handle)) => {
                let geometry = *self
                    .geometries
                    .get(&handle)
                    .ok_or(SolverError::UnknownHandle(handle.0))?;
                if expected.accepts(geometry.class()) {
                    Ok(geometry)
                } else {
                    Err(self.unsupported(&geometry))
                }
            }
            (index, _) => Err(self.type_error(index, "a geometry handle")),
        }
    }

    fn point(&mut self) -> Result<PointAddr, SolverError> {
        match self.geometry(GeometryClass::Point)? {
            Geometry::Point(p) => Ok(p),
            other => Err(self.unsupported(&other)),
        }
    }

    fn line(&mut self) -> Result<Segment, SolverError> {
        match self.geometry(GeometryClass::Line)? {
            Geometry::Line { p1, p2 } => Ok(Segment { p1, p2 }),
            other => Err(self.unsupported(&other)),
        }
    }

    /// Center and radius of a circle or arc.
    fn circular(&mut self) -> Result<(PointAddr, usize), SolverError> {
        match self.geometry(GeometryClass::Circle)? {
            Geometry::Circle { center, radius } | Geometry::Arc { center, radius, .. } => {
                Ok((center, radius))
            }
            other => Err(self.unsupported(&other)),
        }
    }

    fn arc(&mut self) -> Result<(PointAddr, ArcBounds, usize), SolverError> {
        match self.geometry(GeometryClass::Arc)? {
            Geometry::Arc { center, bounds, radius } => Ok((center, bounds, radius)),
            other => Err(self.unsupported(&other)),
        }
    }

    fn ellipse(&mut self) -> Result<(PointAddr, PointAddr, usize), SolverError> {
        match self.geometry(GeometryClass::Ellipse)? {
            Geometry::Ellipse { center, focus1, radmin }
            | Geometry::ArcOfEllipse { center, focus1, radmin, .. } => Ok((center, focus1, radmin)),
            other => Err(self.unsupported(&other)),
        }
    }

    fn tangent(&mut self) -> Result<Tangent, SolverError> {
        match self.geometry(GeometryClass::Curve)? {
            Geometry::Line { p1, p2 } => Ok(Tangent::Line(Segment { p1, p2 })),
            Geometry::Circle { center, .. } | Geometry::Arc { center, .. } => {
                Ok(Tangent::Circular { center })
            }
            other => Err(self.unsupported(&other)),
        }
    }

    fn number(&mut self) -> Result<f64, SolverError> {
        match self.next("a number")? {
            (_, SolverArg::Number(n)) => Ok(n),
            (index, _) => Err(self.type_error(index, "a number")),
        }
    }

    fn flag(&mut self) -> Result<bool, SolverError> {
        match self.next("a boolean")? {
            (_, SolverArg::Bool(b)) => Ok(b),
            (_, SolverArg::Number(n)) => Ok(n != 0.0),
            (index, _) => Err(self.type_error(index, "a boolean")),
        }
    }

    fn tag(&mut self) -> Result<i32, SolverError> {
        match self.next("a tag")? {
            (_, SolverArg::Tag(tag)) => Ok(tag),
            (index, _) => Err(self.type_error(index, "a tag")),
        }
    }

    fn driving(&mut self) -> Result<bool, SolverError> {
        match self.next("the driving flag")? {
            (_, SolverArg::Bool(b)) => Ok(b),
            (index, _) => Err(self.type_error(index, "the driving flag")),
        }
    }

    fn alignment(&mut self) -> Result<InternalAlignment, SolverError> {
        match self.next("an internal alignment")? {
            (_, SolverArg::Alignment(a)) => Ok(a),
            (index, _) => Err(self.type_error(index, "an internal alignment")),
        }
    }

    /// Consume the optional trailing scale.
    fn finish(mut self) -> Result<(f64, Vec<usize>), SolverError> {
        let scale = if self.index < self.args.len() {
            match self.next("a scale")? {
                (_, SolverArg::Scale(s)) => s,
                (index, _) => return Err(self.type_error(index, "a scale")),
            }
        } else {
            1.0
        };
        Ok((scale, self.datums))
    }
}

/// Check `call` and build its equation.
pub(crate) fn build(
    call: &ConstraintCall,
    geometries: &HashMap<GeomHandle, Geometry>,
    params_size: usize,
) -> Result<BuiltConstraint, SolverError> {
    use ConstraintKind::*;

    let mut c = ArgCursor::new(call, geometries, params_size)?;
    let equation = match call.kind {
        Equal => Equation::Equal { a: c.value()?, b: c.value()? },
        Difference => Equation::Difference { a: c.value()?, b: c.value()?, d: c.value()? },
        Proportional => Equation::Proportional { a: c.value()?, b: c.value()?, ratio: c.value()? },
        CoordinateX => Equation::CoordinateX { p: c.point()?, x: c.value()? },
        CoordinateY => Equation::CoordinateY { p: c.point()?, y: c.value()? },
        P2PCoincident => Equation::Coincident { p1: c.point()?, p2: c.point()? },
        P2PDistance => Equation::P2PDistance { p1: c.point()?, p2: c.point()?, d: c.value()? },
        P2PAngle => Equation::P2PAngle {
            p1: c.point()?,
            p2: c.point()?,
            angle: c.value()?,
            incr: 0.0,
        },
        P2PAngleIncrAngle => Equation::P2PAngle {
            p1: c.point()?,
            p2: c.point()?,
            angle: c.value()?,
            incr: c.number()?,
        },
        P2LDistance => Equation::P2LDistance { p: c.point()?, line: c.line()?, d: c.value()? },
        PointOnLinePl => {
            let p = c.point()?;
            let line = c.line()?;
            Equation::PointOnLine { p, a: line.p1, b: line.p2 }
        }
        PointOnLinePpp => Equation::PointOnLine { p: c.point()?, a: c.point()?, b: c.point()? },
        PointOnPerpBisectorPl => Equation::PointOnPerpBisector { p: c.point()?, line: c.line()? },
        Parallel => Equation::Parallel { l1: c.line()?, l2: c.line()? },
        PerpendicularLl => Equation::Perpendicular { l1: c.line()?, l2: c.line()? },
        L2LAngleLl => Equation::L2LAngle { l1: c.line()?, l2: c.line()?, angle: c.value()? },
        MidpointOnLineLl => Equation::MidpointOnLine { l1: c.line()?, l2: c.line()? },
        HorizontalL => {
            let line = c.line()?;
            Equation::Horizontal { p1: line.p1, p2: line.p2 }
        }
        HorizontalPp => Equation::Horizontal { p1: c.point()?, p2: c.point()? },
        VerticalL => {
            let line = c.line()?;
            Equation::Vertical { p1: line.p1, p2: line.p2 }
        }
        VerticalPp => Equation::Vertical { p1: c.point()?, p2: c.point()? },
        TangentLc => {
            let line = c.line()?;
            let (center, radius) = c.circular()?;
            Equation::TangentLineCircle { line, center, radius }
        }
        ArcRules => {
            let (center, bounds, radius) = c.arc()?;
            Equation::ArcRules { center, bounds, radius }
        }
        PointOnCircle => {
            let p = c.point()?;
            let (center, radius) = c.circular()?;
            Equation::PointOnCircle { p, center, radius }
        }
        PointOnArc => {
            let p = c.point()?;
            let (center, _, radius) = c.arc()?;
            Equation::PointOnCircle { p, center, radius }
        }
        PointOnEllipse => {
            let p = c.point()?;
            let (center, focus1, radmin) = c.ellipse()?;
            Equation::PointOnEllipse { p, center, focus1, radmin }
        }
        CircleRadius => {
            let (_, radius) = c.circular()?;
            Equation::Radius { radius, value: c.value()? }
        }
        ArcRadius => {
            let (_, _, radius) = c.arc()?;
            Equation::Radius { radius, value: c.value()? }
        }
        CircleDiameter => {
            let (_, radius) = c.circular()?;
            Equation::Diameter { radius, value: c.value()? }
        }
        ArcDiameter => {
            let (_, _, radius) = c.arc()?;
            Equation::Diameter { radius, value: c.value()? }
        }
        EqualLength => Equation::EqualLength { l1: c.line()?, l2: c.line()? },
        EqualRadiusCc => {
            let (_, r1) = c.circular()?;
            let (_, r2) = c.circular()?;
            Equation::EqualRadius { r1, r2 }
        }
        P2PSymmetricPpl => Equation::SymmetricPpl { p1: c.point()?, p2: c.point()?, line: c.line()? },
        P2PSymmetricPpp => Equation::SymmetricPpp { p1: c.point()?, p2: c.point()?, p: c.point()? },
        AngleViaPoint => Equation::AngleViaPoint {
            crv1: c.tangent()?,
            crv2: c.tangent()?,
            p: c.point()?,
            angle: c.value()?,
        },
        PerpendicularArc2Arc => {
            let (c1, b1, _) = c.arc()?;
            let reverse1 = c.flag()?;
            let (c2, b2, _) = c.arc()?;
            let reverse2 = c.flag()?;
            let p1 = if reverse1 { b1.start } else { b1.end };
            let p2 = if reverse2 { b2.end } else { b2.start };
            Equation::PerpendicularArcs { c1, p1, c2, p2 }
        }
    };

    let tag = c.tag()?;
    let driving = c.driving()?;
    if call.kind == Equal {
        c.alignment()?;
    }
    let (scale, datums) = c.finish()?;

    Ok(BuiltConstraint { equation, tag, driving, scale, datums })
}
