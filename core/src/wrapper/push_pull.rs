//! Moving primitive values into and out of the solver's parameter array.

use std::f64::consts::TAU;

use tracing::trace;

use super::allocator::ParamAllocator;
use crate::error::{SketchError, SketchResult};
use crate::gcs::{ArcBounds, Geometry, PointAddr, Solver};
use crate::sketch::geom_params::{own_properties, property_offset};
use crate::sketch::{GeometryProperty, Oid, SketchGeometry, SketchIndex};

/// Angles this close below zero are snapped to zero instead of wrapping to
/// just under a full turn.
pub const ANGLE_EPSILON: f64 = 1e-8;

/// Bring a solved angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let r = angle % TAU;
    if r < 0.0 && r > -ANGLE_EPSILON {
        0.0
    } else if r < 0.0 {
        r + TAU
    } else if r >= TAU {
        r - TAU
    } else {
        r
    }
}

/// Allocate the parameters of `geometry`, first making sure every point it is
/// built on has its own block. Already allocated blocks are left alone.
pub(crate) fn push_geometry<S: Solver + ?Sized>(
    solver: &mut S,
    index: &SketchIndex,
    allocator: &mut ParamAllocator,
    geometry: &SketchGeometry,
) -> SketchResult<()> {
    for point_id in geometry.referenced_points() {
        if allocator.has(point_id) {
            continue;
        }
        let point = index.get_point(point_id)?;
        allocator.push(solver, point.id, &[point.x, point.y], point.fixed);
    }

    let id = geometry.id();
    if allocator.has(id) {
        return Ok(());
    }
    match geometry {
        SketchGeometry::Point(p) => {
            allocator.push(solver, id, &[p.x, p.y], p.fixed);
        }
        other => {
            let values: Vec<f64> = own_properties(other.class())
                .iter()
                .filter_map(|property| other.property(*property))
                .collect();
            if !values.is_empty() {
                allocator.push(solver, id, &values, false);
            }
        }
    }
    Ok(())
}

/// Overwrite the own scalars of `geometry` with the solver's current values.
/// Geometry that was never allocated is left untouched.
pub(crate) fn pull_geometry<S: Solver + ?Sized>(
    solver: &S,
    allocator: &ParamAllocator,
    geometry: &mut SketchGeometry,
) -> SketchResult<()> {
    let id = geometry.id();
    if !allocator.has(id) {
        return Ok(());
    }
    let base = allocator.address_of(id)?;
    let class = geometry.class();
    for (offset, property) in own_properties(class).iter().enumerate() {
        let mut value = solver.get_param(base + offset)?;
        if property.is_angle() {
            value = normalize_angle(value);
        }
        if let Some(slot) = geometry.property_mut(*property) {
            *slot = value;
        }
    }
    trace!(%id, %class, "pulled geometry");
    Ok(())
}

/// Address of `property` of the already allocated primitive `geometry`.
pub(crate) fn property_address(
    allocator: &ParamAllocator,
    geometry: &SketchGeometry,
    property: GeometryProperty,
) -> SketchResult<usize> {
    let offset = property_offset(geometry.class(), property).ok_or_else(|| {
        SketchError::UnknownProperty {
            kind: geometry.class().to_string(),
            property: property.to_string(),
        }
    })?;
    Ok(allocator.address_of(geometry.id())? + offset)
}

fn point_addr(allocator: &ParamAllocator, id: Oid) -> SketchResult<PointAddr> {
    Ok(PointAddr::at(allocator.address_of(id)?))
}

fn arc_bounds(
    allocator: &ParamAllocator,
    geometry: &SketchGeometry,
    start_id: Oid,
    end_id: Oid,
) -> SketchResult<ArcBounds> {
    Ok(ArcBounds {
        start: point_addr(allocator, start_id)?,
        end: point_addr(allocator, end_id)?,
        start_angle: property_address(allocator, geometry, GeometryProperty::StartAngle)?,
        end_angle: property_address(allocator, geometry, GeometryProperty::EndAngle)?,
    })
}

/// Address record the solver needs to build a handle for `geometry`.
pub(crate) fn geometry_record(
    allocator: &ParamAllocator,
    geometry: &SketchGeometry,
) -> SketchResult<Geometry> {
    use GeometryProperty::{Radius, Radmin};

    let record = match geometry {
        SketchGeometry::Point(p) => Geometry::Point(point_addr(allocator, p.id)?),
        SketchGeometry::Line(l) => Geometry::Line {
            p1: point_addr(allocator, l.p1_id)?,
            p2: point_addr(allocator, l.p2_id)?,
        },
        SketchGeometry::Circle(c) => Geometry::Circle {
            center: point_addr(allocator, c.c_id)?,
            radius: property_address(allocator, geometry, Radius)?,
        },
        SketchGeometry::Arc(a) => Geometry::Arc {
            center: point_addr(allocator, a.c_id)?,
            bounds: arc_bounds(allocator, geometry, a.start_id, a.end_id)?,
            radius: property_address(allocator, geometry, Radius)?,
        },
        SketchGeometry::Ellipse(e) => Geometry::Ellipse {
            center: point_addr(allocator, e.c_id)?,
            focus1: point_addr(allocator, e.focus1_id)?,
            radmin: property_address(allocator, geometry, Radmin)?,
        },
        SketchGeometry::ArcOfEllipse(a) => Geometry::ArcOfEllipse {
            center: point_addr(allocator, a.c_id)?,
            focus1: point_addr(allocator, a.focus1_id)?,
            bounds: arc_bounds(allocator, geometry, a.start_id, a.end_id)?,
            radmin: property_address(allocator, geometry, Radmin)?,
        },
        SketchGeometry::Hyperbola(h) => Geometry::Hyperbola {
            center: point_addr(allocator, h.c_id)?,
            focus1: point_addr(allocator, h.focus1_id)?,
            radmin: property_address(allocator, geometry, Radmin)?,
        },
        SketchGeometry::ArcOfHyperbola(a) => Geometry::ArcOfHyperbola {
            center: point_addr(allocator, a.c_id)?,
            focus1: point_addr(allocator, a.focus1_id)?,
            bounds: arc_bounds(allocator, geometry, a.start_id, a.end_id)?,
            radmin: property_address(allocator, geometry, Radmin)?,
        },
        SketchGeometry::Parabola(p) => Geometry::Parabola {
            vertex: point_addr(allocator, p.vertex_id)?,
            focus1: point_addr(allocator, p.focus1_id)?,
        },
        SketchGeometry::ArcOfParabola(a) => Geometry::ArcOfParabola {
            vertex: point_addr(allocator, a.vertex_id)?,
            focus1: point_addr(allocator, a.focus1_id)?,
            bounds: arc_bounds(allocator, geometry, a.start_id, a.end_id)?,
        },
    };
    Ok(record)
}
