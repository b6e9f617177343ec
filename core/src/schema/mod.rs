//! Constraint schema table.
//!
//! Every constraint kind the solver understands is listed here together with
//! the ordered parameter list of its solver entry point. The dispatcher walks
//! this list to build positional solver arguments, so the order below is the
//! order the solver receives.

use crate::error::SketchError;
use crate::gcs::GeometryClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;


/// How a schema parameter is resolved into a solver argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Filled in by the dispatcher (tag, driving flag, internal alignment).
    Fixed(FixedParam),
    /// A literal number, a named sketch parameter or a property of another
    /// primitive.
    ObjectParamOrNumber,
    /// The id of a geometry primitive, passed to the solver as a handle.
    ObjectId(GeometryClass),
    /// A raw number or boolean passed through verbatim.
    Primitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedParam {
    Tag,
    Driving,
    InternalAlignment,
}

/// One entry of a constraint's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Internal alignment flag of the `equal` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InternalAlignment {
    #[default]
    NoInternalAlignment,
    InternalAlignment,
}

impl TryFrom<u8> for InternalAlignment {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoInternalAlignment),
            1 => Ok(Self::InternalAlignment),
            other => Err(format!("invalid internal alignment value {}", other)),
        }
    }
}

impl From<InternalAlignment> for u8 {
    fn from(value: InternalAlignment) -> Self {
        match value {
            InternalAlignment::NoInternalAlignment => 0,
            InternalAlignment::InternalAlignment => 1,
        }
    }
}

macro_rules! constraint_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Closed set of constraint kinds understood by the solver.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum ConstraintKind {
            $($variant),*
        }

        impl ConstraintKind {
            pub const ALL: &'static [ConstraintKind] = &[$(ConstraintKind::$variant),*];

            /// Snake-case name, as used in sketch documents.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }

        impl FromStr for ConstraintKind {
            type Err = SketchError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    other => Err(SketchError::UnknownKind(other.to_string())),
                }
            }
        }
    };
}

constraint_kinds! {
    Equal => "equal",
    Difference => "difference",
    Proportional => "proportional",
    CoordinateX => "coordinate_x",
    CoordinateY => "coordinate_y",
    P2PCoincident => "p2p_coincident",
    P2PDistance => "p2p_distance",
    P2PAngle => "p2p_angle",
    P2PAngleIncrAngle => "p2p_angle_incr_angle",
    P2LDistance => "p2l_distance",
    PointOnLinePl => "point_on_line_pl",
    PointOnLinePpp => "point_on_line_ppp",
    PointOnPerpBisectorPl => "point_on_perp_bisector_pl",
    Parallel => "parallel",
    PerpendicularLl => "perpendicular_ll",
    L2LAngleLl => "l2l_angle_ll",
    MidpointOnLineLl => "midpoint_on_line_ll",
    HorizontalL => "horizontal_l",
    HorizontalPp => "horizontal_pp",
    VerticalL => "vertical_l",
    VerticalPp => "vertical_pp",
    TangentLc => "tangent_lc",
    ArcRules => "arc_rules",
    PointOnCircle => "point_on_circle",
    PointOnArc => "point_on_arc",
    PointOnEllipse => "point_on_ellipse",
    CircleRadius => "circle_radius",
    ArcRadius => "arc_radius",
    CircleDiameter => "circle_diameter",
    ArcDiameter => "arc_diameter",
    EqualLength => "equal_length",
    EqualRadiusCc => "equal_radius_cc",
    P2PSymmetricPpl => "p2p_symmetric_ppl",
    P2PSymmetricPpp => "p2p_symmetric_ppp",
    AngleViaPoint => "angle_via_point",
    PerpendicularArc2Arc => "perpendicular_arc2arc",
}

impl TryFrom<String> for ConstraintKind {
    type Error = SketchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConstraintKind> for &'static str {
    fn from(kind: ConstraintKind) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const POINT: ParamKind = ParamKind::ObjectId(GeometryClass::Point);
const LINE: ParamKind = ParamKind::ObjectId(GeometryClass::Line);
const CIRCLE: ParamKind = ParamKind::ObjectId(GeometryClass::Circle);
const ARC: ParamKind = ParamKind::ObjectId(GeometryClass::Arc);
const ELLIPSE: ParamKind = ParamKind::ObjectId(GeometryClass::Ellipse);
const CURVE: ParamKind = ParamKind::ObjectId(GeometryClass::Curve);
const VALUE: ParamKind = ParamKind::ObjectParamOrNumber;
const RAW: ParamKind = ParamKind::Primitive;

macro_rules! schema {
    ($($name:literal : $kind:expr),* $(,)?) => {
        &[
            $(ParamSpec { name: $name, kind: $kind },)*
            ParamSpec { name: "tagId", kind: ParamKind::Fixed(FixedParam::Tag) },
            ParamSpec { name: "driving", kind: ParamKind::Fixed(FixedParam::Driving) },
        ]
    };
}

impl ConstraintKind {
    /// Ordered parameter list of this kind's solver entry point.
    pub fn schema(self) -> &'static [ParamSpec] {
        use ConstraintKind::*;
        match self {
            Equal => &[
                ParamSpec { name: "param1", kind: VALUE },
                ParamSpec { name: "param2", kind: VALUE },
                ParamSpec { name: "tagId", kind: ParamKind::Fixed(FixedParam::Tag) },
                ParamSpec { name: "driving", kind: ParamKind::Fixed(FixedParam::Driving) },
                ParamSpec {
                    name: "internalalignment",
                    kind: ParamKind::Fixed(FixedParam::InternalAlignment),
                },
            ],
            Difference => schema!("param1": VALUE, "param2": VALUE, "difference": VALUE),
            Proportional => schema!("param1": VALUE, "param2": VALUE, "ratio": VALUE),
            CoordinateX => schema!("p_id": POINT, "x": VALUE),
            CoordinateY => schema!("p_id": POINT, "y": VALUE),
            P2PCoincident => schema!("p1_id": POINT, "p2_id": POINT),
            P2PDistance => schema!("p1_id": POINT, "p2_id": POINT, "distance": VALUE),
            P2PAngle => schema!("p1_id": POINT, "p2_id": POINT, "angle": VALUE),
            P2PAngleIncrAngle => schema!(
                "p1_id": POINT,
                "p2_id": POINT,
                "angle": VALUE,
                "incr_angle": RAW,
            ),
            P2LDistance => schema!("p_id": POINT, "l_id": LINE, "distance": VALUE),
            PointOnLinePl => schema!("p_id": POINT, "l_id": LINE),
            PointOnLinePpp => schema!("p_id": POINT, "lp1_id": POINT, "lp2_id": POINT),
            PointOnPerpBisectorPl => schema!("p_id": POINT, "l_id": LINE),
            Parallel => schema!("l1_id": LINE, "l2_id": LINE),
            PerpendicularLl => schema!("l1_id": LINE, "l2_id": LINE),
            L2LAngleLl => schema!("l1_id": LINE, "l2_id": LINE, "angle": VALUE),
            MidpointOnLineLl => schema!("l1_id": LINE, "l2_id": LINE),
            HorizontalL => schema!("l_id": LINE),
            HorizontalPp => schema!("p1_id": POINT, "p2_id": POINT),
            VerticalL => schema!("l_id": LINE),
            VerticalPp => schema!("p1_id": POINT, "p2_id": POINT),
            TangentLc => schema!("l_id": LINE, "c_id": CIRCLE),
            ArcRules => schema!("a_id": ARC),
            PointOnCircle => schema!("p_id": POINT, "c_id": CIRCLE),
            PointOnArc => schema!("p_id": POINT, "a_id": ARC),
            PointOnEllipse => schema!("p_id": POINT, "e_id": ELLIPSE),
            CircleRadius => schema!("c_id": CIRCLE, "radius": VALUE),
            ArcRadius => schema!("a_id": ARC, "radius": VALUE),
            CircleDiameter => schema!("c_id": CIRCLE, "diameter": VALUE),
            ArcDiameter => schema!("a_id": ARC, "diameter": VALUE),
            EqualLength => schema!("l1_id": LINE, "l2_id": LINE),
            EqualRadiusCc => schema!("c1_id": CIRCLE, "c2_id": CIRCLE),
            P2PSymmetricPpl => schema!("p1_id": POINT, "p2_id": POINT, "l_id": LINE),
            P2PSymmetricPpp => schema!("p1_id": POINT, "p2_id": POINT, "p_id": POINT),
            AngleViaPoint => schema!(
                "crv1_id": CURVE,
                "crv2_id": CURVE,
                "p_id": POINT,
                "angle": VALUE,
            ),
            PerpendicularArc2Arc => schema!(
                "a1_id": ARC,
                "reverse1": RAW,
                "a2_id": ARC,
                "reverse2": RAW,
            ),
        }
    }

    /// Number of positional solver arguments, optionally with the trailing
    /// scale argument.
    pub fn arity(self, with_scale: bool) -> usize {
        self.schema().len() + usize::from(with_scale)
    }

    /// Names of the parameters that carry user data (everything except the
    /// dispatcher-filled fixed parameters).
    pub fn value_params(self) -> impl Iterator<Item = &'static ParamSpec> {
        self.schema()
            .iter()
            .filter(|spec| !matches!(spec.kind, ParamKind::Fixed(_)))
    }
}
