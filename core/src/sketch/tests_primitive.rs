use crate::schema::{ConstraintKind, InternalAlignment};
use crate::sketch::{
    Constraint, GeometryProperty, ObjectParamRef, Oid, ParamValue, SketchDocument, SketchGeometry,
    SketchObject, SketchParam, SketchPrimitive,
};

#[test]
fn test_parse_geometry() {
    let json = r#"{ "id": 1, "type": "point", "x": 1, "y": 2.5, "fixed": true }"#;
    let primitive: SketchPrimitive = serde_json::from_str(json).unwrap();
    match primitive {
        SketchPrimitive::Geometry(SketchGeometry::Point(p)) => {
            assert_eq!(p.id, Oid(1));
            assert!((p.y - 2.5).abs() < 1e-12);
            assert!(p.fixed);
        }
        other => panic!("expected point, got {:?}", other),
    }

    let json = r#"{ "id": 7, "type": "arc_of_ellipse", "c_id": 1, "focus1_id": 2, "start_id": 3,
        "end_id": 4, "start_angle": 0, "end_angle": 1.5, "radmin": 2 }"#;
    let primitive: SketchPrimitive = serde_json::from_str(json).unwrap();
    assert_eq!(primitive.type_name(), "arc_of_ellipse");
    assert_eq!(
        primitive.as_geometry().unwrap().referenced_points(),
        vec![Oid(1), Oid(2), Oid(3), Oid(4)]
    );
}

#[test]
fn test_point_fixed_defaults_to_false() {
    let primitive: SketchPrimitive =
        serde_json::from_str(r#"{ "id": 1, "type": "point", "x": 0, "y": 0 }"#).unwrap();
    match primitive {
        SketchPrimitive::Geometry(SketchGeometry::Point(p)) => assert!(!p.fixed),
        other => panic!("expected point, got {:?}", other),
    }
}

#[test]
fn test_parse_constraint_params() {
    let json = r#"{ "id": 3, "type": "equal", "param1": { "o_id": 1, "prop": "x" }, "param2": 5 }"#;
    let primitive: SketchPrimitive = serde_json::from_str(json).unwrap();
    let c = primitive.as_constraint().unwrap();
    assert_eq!(c.kind, ConstraintKind::Equal);
    assert!(c.is_driving());
    assert_eq!(c.scale_or_default(), 1.0);
    assert_eq!(
        c.param("param1"),
        Some(&ParamValue::Ref(ObjectParamRef { o_id: Oid(1), param: GeometryProperty::X }))
    );
    assert_eq!(c.param("param2"), Some(&ParamValue::Number(5.0)));

    let json = r#"{ "id": 4, "type": "p2p_distance", "p1_id": 1, "p2_id": 2,
        "distance": "width", "driving": false, "scale": 2 }"#;
    let c: Constraint = serde_json::from_str(json).unwrap();
    assert!(!c.is_driving());
    assert_eq!(c.scale_or_default(), 2.0);
    assert_eq!(c.param("distance"), Some(&ParamValue::Name("width".into())));
    assert!(!c.params.contains_key("driving"));
}

#[test]
fn test_internal_alignment_field() {
    let json = r#"{ "id": 3, "type": "equal", "param1": 1, "param2": 2, "internalalignment": 1 }"#;
    let c: Constraint = serde_json::from_str(json).unwrap();
    assert_eq!(c.internalalignment, Some(InternalAlignment::InternalAlignment));

    let json = r#"{ "id": 3, "type": "equal", "param1": 1, "param2": 2, "internalalignment": 4 }"#;
    assert!(serde_json::from_str::<Constraint>(json).is_err());
}

#[test]
fn test_unknown_kind_rejected() {
    let json = r#"{ "id": 3, "type": "no_such_constraint", "p_id": 1 }"#;
    assert!(serde_json::from_str::<SketchPrimitive>(json).is_err());
}

#[test]
fn test_constraint_json_round_trip() {
    let c = Constraint::new(Oid(9), ConstraintKind::P2PAngleIncrAngle)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("angle", 0.5)
        .with_param("incr_angle", 0.0)
        .with_driving(false);
    let json = serde_json::to_string(&SketchPrimitive::from(c.clone())).unwrap();
    assert!(json.contains(r#""type":"p2p_angle_incr_angle""#));
    let back: SketchPrimitive = serde_json::from_str(&json).unwrap();
    assert_eq!(back, SketchPrimitive::Constraint(c));
}

#[test]
fn test_referenced_ids_and_params() {
    let c = Constraint::new(Oid(10), ConstraintKind::P2PDistance)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("distance", "width");
    assert_eq!(c.referenced_ids(), vec![Oid(1), Oid(2)]);
    assert_eq!(c.referenced_sketch_params(), vec!["width"]);

    let c = Constraint::new(Oid(11), ConstraintKind::Equal)
        .with_param("param1", ObjectParamRef { o_id: Oid(4), param: GeometryProperty::Radius })
        .with_param("param2", "r");
    assert_eq!(c.referenced_ids(), vec![Oid(4)]);
    assert_eq!(c.referenced_sketch_params(), vec!["r"]);
}

#[test]
fn test_remap_referenced_ids() {
    let mut c = Constraint::new(Oid(10), ConstraintKind::Difference)
        .with_param("param1", ObjectParamRef { o_id: Oid(1), param: GeometryProperty::X })
        .with_param("param2", ObjectParamRef { o_id: Oid(2), param: GeometryProperty::X })
        .with_param("difference", 3.0);
    c.remap_referenced_ids(|id| (id == Oid(1)).then_some(Oid(100)));
    assert_eq!(c.referenced_ids(), vec![Oid(100), Oid(2)]);
    // literal numbers are values, not ids
    assert_eq!(c.param("difference"), Some(&ParamValue::Number(3.0)));

    let mut c = Constraint::new(Oid(12), ConstraintKind::HorizontalPp)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2));
    c.remap_referenced_ids(|id| Some(Oid(id.0 + 10)));
    assert_eq!(c.referenced_ids(), vec![Oid(11), Oid(12)]);
}

#[test]
fn test_param_value_as_oid() {
    assert_eq!(ParamValue::Number(3.0).as_oid(), Some(Oid(3)));
    assert_eq!(ParamValue::Number(3.5).as_oid(), None);
    assert_eq!(ParamValue::Number(-1.0).as_oid(), None);
    assert_eq!(ParamValue::Bool(true).as_oid(), None);
}

#[test]
fn test_parse_document() {
    let json = r#"{
        "params": [ { "name": "r", "value": 3 } ],
        "primitives": [
            { "id": 1, "type": "point", "x": 0, "y": 0, "fixed": true },
            { "id": 2, "type": "circle", "c_id": 1, "radius": 1 },
            { "id": 3, "type": "circle_radius", "c_id": 2, "radius": "r" }
        ]
    }"#;
    let doc: SketchDocument = serde_json::from_str(json).unwrap();
    assert_eq!(doc.params.len(), 1);
    assert_eq!(doc.primitives.len(), 3);
    assert!(doc.primitives[1].is_geometry());
    assert_eq!(doc.primitives[2].type_name(), "circle_radius");
}

#[test]
fn test_param_object_shape() {
    let object = SketchObject::from(SketchParam { name: "width".into(), value: 10.0 });
    let json = serde_json::to_string(&object).unwrap();
    assert_eq!(json, r#"{"type":"param","name":"width","value":10.0}"#);
    assert_eq!(serde_json::from_str::<SketchObject>(&json).unwrap(), object);

    // a param without its tag is not a primitive either
    assert!(serde_json::from_str::<SketchObject>(r#"{"name":"width","value":1}"#).is_err());
}
