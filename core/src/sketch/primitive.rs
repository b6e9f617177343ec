//! The declarative sketch object model.

use crate::gcs::GeometryClass;
use crate::schema::{ConstraintKind, InternalAlignment, ParamKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a sketch primitive, unique within one sketch index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(pub u32);

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for Oid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchPoint {
    pub id: Oid,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchLine {
    pub id: Oid,
    pub p1_id: Oid,
    pub p2_id: Oid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchCircle {
    pub id: Oid,
    pub c_id: Oid,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchArc {
    pub id: Oid,
    pub c_id: Oid,
    pub start_id: Oid,
    pub end_id: Oid,
    pub start_angle: f64,
    pub end_angle: f64,
    pub radius: f64,
}

/// Ellipse given by its center, first focus and minor radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchEllipse {
    pub id: Oid,
    pub c_id: Oid,
    pub focus1_id: Oid,
    pub radmin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchArcOfEllipse {
    pub id: Oid,
    pub c_id: Oid,
    pub focus1_id: Oid,
    pub start_id: Oid,
    pub end_id: Oid,
    pub start_angle: f64,
    pub end_angle: f64,
    pub radmin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchHyperbola {
    pub id: Oid,
    pub c_id: Oid,
    pub focus1_id: Oid,
    pub radmin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchArcOfHyperbola {
    pub id: Oid,
    pub c_id: Oid,
    pub focus1_id: Oid,
    pub start_id: Oid,
    pub end_id: Oid,
    pub start_angle: f64,
    pub end_angle: f64,
    pub radmin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchParabola {
    pub id: Oid,
    pub vertex_id: Oid,
    pub focus1_id: Oid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchArcOfParabola {
    pub id: Oid,
    pub vertex_id: Oid,
    pub focus1_id: Oid,
    pub start_id: Oid,
    pub end_id: Oid,
    pub start_angle: f64,
    pub end_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SketchGeometry {
    Point(SketchPoint),
    Line(SketchLine),
    Circle(SketchCircle),
    Arc(SketchArc),
    Ellipse(SketchEllipse),
    ArcOfEllipse(SketchArcOfEllipse),
    Hyperbola(SketchHyperbola),
    ArcOfHyperbola(SketchArcOfHyperbola),
    Parabola(SketchParabola),
    ArcOfParabola(SketchArcOfParabola),
}

impl SketchGeometry {
    pub fn id(&self) -> Oid {
        match self {
            Self::Point(g) => g.id,
            Self::Line(g) => g.id,
            Self::Circle(g) => g.id,
            Self::Arc(g) => g.id,
            Self::Ellipse(g) => g.id,
            Self::ArcOfEllipse(g) => g.id,
            Self::Hyperbola(g) => g.id,
            Self::ArcOfHyperbola(g) => g.id,
            Self::Parabola(g) => g.id,
            Self::ArcOfParabola(g) => g.id,
        }
    }

    pub fn class(&self) -> GeometryClass {
        match self {
            Self::Point(_) => GeometryClass::Point,
            Self::Line(_) => GeometryClass::Line,
            Self::Circle(_) => GeometryClass::Circle,
            Self::Arc(_) => GeometryClass::Arc,
            Self::Ellipse(_) => GeometryClass::Ellipse,
            Self::ArcOfEllipse(_) => GeometryClass::ArcOfEllipse,
            Self::Hyperbola(_) => GeometryClass::Hyperbola,
            Self::ArcOfHyperbola(_) => GeometryClass::ArcOfHyperbola,
            Self::Parabola(_) => GeometryClass::Parabola,
            Self::ArcOfParabola(_) => GeometryClass::ArcOfParabola,
        }
    }

    /// Value of one of this geometry's own scalars.
    pub fn property(&self, property: GeometryProperty) -> Option<f64> {
        use GeometryProperty::*;
        match (self, property) {
            (Self::Point(p), X) => Some(p.x),
            (Self::Point(p), Y) => Some(p.y),
            (Self::Circle(c), Radius) => Some(c.radius),
            (Self::Arc(a), StartAngle) => Some(a.start_angle),
            (Self::Arc(a), EndAngle) => Some(a.end_angle),
            (Self::Arc(a), Radius) => Some(a.radius),
            (Self::Ellipse(e), Radmin) => Some(e.radmin),
            (Self::Hyperbola(h), Radmin) => Some(h.radmin),
            (Self::ArcOfEllipse(a), StartAngle) => Some(a.start_angle),
            (Self::ArcOfEllipse(a), EndAngle) => Some(a.end_angle),
            (Self::ArcOfEllipse(a), Radmin) => Some(a.radmin),
            (Self::ArcOfHyperbola(a), StartAngle) => Some(a.start_angle),
            (Self::ArcOfHyperbola(a), EndAngle) => Some(a.end_angle),
            (Self::ArcOfHyperbola(a), Radmin) => Some(a.radmin),
            (Self::ArcOfParabola(a), StartAngle) => Some(a.start_angle),
            (Self::ArcOfParabola(a), EndAngle) => Some(a.end_angle),
            _ => None,
        }
    }

    pub fn property_mut(&mut self, property: GeometryProperty) -> Option<&mut f64> {
        use GeometryProperty::*;
        match (self, property) {
            (Self::Point(p), X) => Some(&mut p.x),
            (Self::Point(p), Y) => Some(&mut p.y),
            (Self::Circle(c), Radius) => Some(&mut c.radius),
            (Self::Arc(a), StartAngle) => Some(&mut a.start_angle),
            (Self::Arc(a), EndAngle) => Some(&mut a.end_angle),
            (Self::Arc(a), Radius) => Some(&mut a.radius),
            (Self::Ellipse(e), Radmin) => Some(&mut e.radmin),
            (Self::Hyperbola(h), Radmin) => Some(&mut h.radmin),
            (Self::ArcOfEllipse(a), StartAngle) => Some(&mut a.start_angle),
            (Self::ArcOfEllipse(a), EndAngle) => Some(&mut a.end_angle),
            (Self::ArcOfEllipse(a), Radmin) => Some(&mut a.radmin),
            (Self::ArcOfHyperbola(a), StartAngle) => Some(&mut a.start_angle),
            (Self::ArcOfHyperbola(a), EndAngle) => Some(&mut a.end_angle),
            (Self::ArcOfHyperbola(a), Radmin) => Some(&mut a.radmin),
            (Self::ArcOfParabola(a), StartAngle) => Some(&mut a.start_angle),
            (Self::ArcOfParabola(a), EndAngle) => Some(&mut a.end_angle),
            _ => None,
        }
    }

    /// Ids of the points this geometry is built on, in push order.
    pub fn referenced_points(&self) -> Vec<Oid> {
        match self {
            Self::Point(_) => vec![],
            Self::Line(l) => vec![l.p1_id, l.p2_id],
            Self::Circle(c) => vec![c.c_id],
            Self::Arc(a) => vec![a.c_id, a.start_id, a.end_id],
            Self::Ellipse(e) => vec![e.c_id, e.focus1_id],
            Self::ArcOfEllipse(a) => vec![a.c_id, a.focus1_id, a.start_id, a.end_id],
            Self::Hyperbola(h) => vec![h.c_id, h.focus1_id],
            Self::ArcOfHyperbola(a) => vec![a.c_id, a.focus1_id, a.start_id, a.end_id],
            Self::Parabola(p) => vec![p.vertex_id, p.focus1_id],
            Self::ArcOfParabola(a) => vec![a.vertex_id, a.focus1_id, a.start_id, a.end_id],
        }
    }
}

/// Scalar property of a geometry primitive that constraints may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryProperty {
    X,
    Y,
    Radius,
    StartAngle,
    EndAngle,
    Radmin,
}

impl GeometryProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Radius => "radius",
            Self::StartAngle => "start_angle",
            Self::EndAngle => "end_angle",
            Self::Radmin => "radmin",
        }
    }

    pub fn is_angle(self) -> bool {
        matches!(self, Self::StartAngle | Self::EndAngle)
    }
}

impl fmt::Display for GeometryProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a property of another primitive, e.g. `{ "o_id": 1, "param": "x" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectParamRef {
    pub o_id: Oid,
    #[serde(alias = "prop")]
    pub param: GeometryProperty,
}

/// Runtime value of a constraint parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    /// Name of a sketch parameter.
    Name(String),
    Ref(ObjectParamRef),
}

impl ParamValue {
    /// Interpret a numeric value as a primitive id.
    pub fn as_oid(&self) -> Option<Oid> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
                Some(Oid(*n as u32))
            }
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Name(_) => "string",
            Self::Ref(_) => "object reference",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<Oid> for ParamValue {
    fn from(value: Oid) -> Self {
        Self::Number(f64::from(value.0))
    }
}

impl From<ObjectParamRef> for ParamValue {
    fn from(value: ObjectParamRef) -> Self {
        Self::Ref(value)
    }
}

/// A constraint between sketch primitives.
///
/// Schema parameters are stored by name; the order the solver sees them in
/// comes from [`ConstraintKind::schema`], not from this map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: Oid,
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internalalignment: Option<InternalAlignment>,
    #[serde(flatten)]
    pub params: BTreeMap<String, ParamValue>,
}

impl Constraint {
    pub fn new(id: Oid, kind: ConstraintKind) -> Self {
        Self {
            id,
            kind,
            driving: None,
            scale: None,
            internalalignment: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_driving(mut self, driving: bool) -> Self {
        self.driving = Some(driving);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_internal_alignment(mut self, alignment: InternalAlignment) -> Self {
        self.internalalignment = Some(alignment);
        self
    }

    pub fn is_driving(&self) -> bool {
        self.driving.unwrap_or(true)
    }

    pub fn scale_or_default(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Names of the sketch parameters this constraint reads.
    pub fn referenced_sketch_params(&self) -> Vec<&str> {
        self.kind
            .value_params()
            .filter_map(|spec| match self.params.get(spec.name) {
                Some(ParamValue::Name(name)) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of every primitive this constraint refers to, in schema order.
    pub fn referenced_ids(&self) -> Vec<Oid> {
        let mut ids = Vec::new();
        for spec in self.kind.value_params() {
            match (spec.kind, self.params.get(spec.name)) {
                (ParamKind::ObjectId(_), Some(value)) => ids.extend(value.as_oid()),
                (_, Some(ParamValue::Ref(r))) => ids.push(r.o_id),
                _ => {}
            }
        }
        ids
    }

    /// Rewrite referenced ids; `f` returns `None` to keep an id unchanged.
    pub fn remap_referenced_ids(&mut self, mut f: impl FnMut(Oid) -> Option<Oid>) {
        for spec in self.kind.value_params() {
            let Some(value) = self.params.get_mut(spec.name) else {
                continue;
            };
            match (spec.kind, value) {
                (ParamKind::ObjectId(_), value) => {
                    if let Some(new_id) = value.as_oid().and_then(&mut f) {
                        *value = new_id.into();
                    }
                }
                (_, ParamValue::Ref(r)) => {
                    if let Some(new_id) = f(r.o_id) {
                        r.o_id = new_id;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Anything stored in the sketch index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SketchPrimitive {
    Geometry(SketchGeometry),
    Constraint(Constraint),
}

impl SketchPrimitive {
    pub fn id(&self) -> Oid {
        match self {
            Self::Geometry(g) => g.id(),
            Self::Constraint(c) => c.id,
        }
    }

    /// Kind name, e.g. `"point"` or `"p2p_distance"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Geometry(g) => g.class().as_str(),
            Self::Constraint(c) => c.kind.as_str(),
        }
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::Geometry(_))
    }

    pub fn as_geometry(&self) -> Option<&SketchGeometry> {
        match self {
            Self::Geometry(g) => Some(g),
            Self::Constraint(_) => None,
        }
    }

    pub fn as_constraint(&self) -> Option<&Constraint> {
        match self {
            Self::Constraint(c) => Some(c),
            Self::Geometry(_) => None,
        }
    }
}

impl From<SketchGeometry> for SketchPrimitive {
    fn from(geometry: SketchGeometry) -> Self {
        Self::Geometry(geometry)
    }
}

impl From<Constraint> for SketchPrimitive {
    fn from(constraint: Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

impl From<SketchPoint> for SketchPrimitive {
    fn from(point: SketchPoint) -> Self {
        Self::Geometry(SketchGeometry::Point(point))
    }
}

/// A named free-standing scalar shared between constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchParam {
    pub name: String,
    pub value: f64,
}

/// A sketch parameter written as `{ "type": "param", name, value }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamObject {
    Param(SketchParam),
}

impl ParamObject {
    pub fn as_param(&self) -> &SketchParam {
        match self {
            Self::Param(param) => param,
        }
    }
}

/// One entry of a flat object list: a named parameter or a primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SketchObject {
    Param(ParamObject),
    Primitive(SketchPrimitive),
}

impl From<SketchParam> for SketchObject {
    fn from(param: SketchParam) -> Self {
        Self::Param(ParamObject::Param(param))
    }
}

impl From<SketchPrimitive> for SketchObject {
    fn from(primitive: SketchPrimitive) -> Self {
        Self::Primitive(primitive)
    }
}

/// Sketch parameters plus primitives, in push order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchDocument {
    #[serde(default)]
    pub params: Vec<SketchParam>,
    pub primitives: Vec<SketchPrimitive>,
}
