//! Layout of each geometry kind's own parameter block.

use super::primitive::GeometryProperty;
use crate::gcs::GeometryClass;

/// Offset of `property` within the parameter block of a `class` primitive,
/// or `None` when that kind has no such scalar.
pub fn property_offset(class: GeometryClass, property: GeometryProperty) -> Option<usize> {
    use GeometryClass::*;
    use GeometryProperty::*;

    match (class, property) {
        (Point, X) => Some(0),
        (Point, Y) => Some(1),
        (Circle, Radius) => Some(0),
        (Arc, StartAngle) => Some(0),
        (Arc, EndAngle) => Some(1),
        (Arc, Radius) => Some(2),
        (Ellipse | Hyperbola, Radmin) => Some(0),
        (ArcOfEllipse | ArcOfHyperbola, StartAngle) => Some(0),
        (ArcOfEllipse | ArcOfHyperbola, EndAngle) => Some(1),
        (ArcOfEllipse | ArcOfHyperbola, Radmin) => Some(2),
        (ArcOfParabola, StartAngle) => Some(0),
        (ArcOfParabola, EndAngle) => Some(1),
        _ => None,
    }
}

/// Properties stored in a kind's own block, in push order.
pub fn own_properties(class: GeometryClass) -> &'static [GeometryProperty] {
    use GeometryProperty::*;

    match class {
        GeometryClass::Point => &[X, Y],
        GeometryClass::Circle => &[Radius],
        GeometryClass::Arc => &[StartAngle, EndAngle, Radius],
        GeometryClass::Ellipse | GeometryClass::Hyperbola => &[Radmin],
        GeometryClass::ArcOfEllipse | GeometryClass::ArcOfHyperbola => &[StartAngle, EndAngle, Radmin],
        GeometryClass::ArcOfParabola => &[StartAngle, EndAngle],
        GeometryClass::Line | GeometryClass::Parabola | GeometryClass::Curve => &[],
    }
}

/// Number of scalars a kind contributes on top of its referenced points.
pub fn own_scalar_count(class: GeometryClass) -> usize {
    own_properties(class).len()
}
