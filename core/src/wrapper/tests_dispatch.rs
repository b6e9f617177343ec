use super::GcsWrapper;
use crate::error::SketchError;
use crate::gcs::recording::RecordingSolver;
use crate::gcs::{GeomHandle, Geometry, PointAddr, Solver, SolverArg, SolverError};
use crate::schema::{ConstraintKind, InternalAlignment};
use crate::sketch::{
    Constraint, GeometryProperty, ObjectParamRef, Oid, ParamValue, SketchCircle, SketchGeometry,
    SketchLine, SketchPoint, SketchPrimitive,
};

/// Fixed point #1, free point #2, line #3 between them and circle #4 around
/// #1. Addresses: #1 -> 0, #2 -> 2, #4 -> 4.
fn base_sketch(solver: RecordingSolver) -> GcsWrapper<RecordingSolver> {
    let mut wrapper = GcsWrapper::new(solver);
    let primitives: [SketchPrimitive; 4] = [
        SketchPoint { id: Oid(1), x: 0.0, y: 0.0, fixed: true }.into(),
        SketchPoint { id: Oid(2), x: 3.0, y: 4.0, fixed: false }.into(),
        SketchGeometry::Line(SketchLine { id: Oid(3), p1_id: Oid(1), p2_id: Oid(2) }).into(),
        SketchGeometry::Circle(SketchCircle { id: Oid(4), c_id: Oid(1), radius: 2.0 }).into(),
    ];
    wrapper.push_primitives(&primitives).unwrap();
    wrapper
}

fn distance(id: u32) -> Constraint {
    Constraint::new(Oid(id), ConstraintKind::P2PDistance)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("distance", 5.0)
}

#[test]
fn test_arguments_follow_schema_order() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_primitive(&distance(10).into()).unwrap();

    let solver = wrapper.gcs();
    assert_eq!(solver.calls.len(), 1);
    assert_eq!(solver.calls[0].kind, ConstraintKind::P2PDistance);
    assert_eq!(
        solver.calls[0].args,
        vec![
            SolverArg::Geometry(GeomHandle(0)),
            SolverArg::Geometry(GeomHandle(1)),
            SolverArg::Datum(5),
            SolverArg::Tag(10),
            SolverArg::Bool(true),
        ]
    );
    assert_eq!(solver.made[0].1, Geometry::Point(PointAddr::at(0)));
    assert_eq!(solver.made[1].1, Geometry::Point(PointAddr::at(2)));

    // driving datums are pushed fixed
    assert_eq!(solver.params[5].value, 5.0);
    assert!(solver.params[5].fixed);
    assert!(wrapper.sketch_index().has(Oid(10)));
}

#[test]
fn test_handles_released_after_success() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_primitive(&distance(10).into()).unwrap();

    let solver = wrapper.gcs();
    assert_eq!(solver.released, vec![GeomHandle(0), GeomHandle(1)]);
    assert_eq!(solver.live_handles(), 0);
}

#[test]
fn test_handles_released_after_solver_error() {
    let error = SolverError::ArityMismatch {
        kind: ConstraintKind::P2PDistance,
        expected: 5,
        found: 4,
    };
    let mut wrapper = base_sketch(RecordingSolver::failing(error.clone()));

    let result = wrapper.push_primitive(&distance(10).into());
    assert_eq!(result, Err(SketchError::Solver(error)));
    assert_eq!(wrapper.gcs().made.len(), 2);
    assert_eq!(wrapper.gcs().live_handles(), 0);
    assert!(!wrapper.sketch_index().has(Oid(10)));
}

#[test]
fn test_handles_released_after_resolution_error() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::P2PDistance)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("distance", "width");

    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::UnknownNamedParameter("width".into()))
    );
    assert_eq!(wrapper.gcs().made.len(), 2);
    assert_eq!(wrapper.gcs().live_handles(), 0);
    assert!(wrapper.gcs().calls.is_empty());
    assert!(!wrapper.sketch_index().has(Oid(10)));
}

#[test]
fn test_scale_appended_when_supported() {
    let mut wrapper = base_sketch(RecordingSolver::scaled());
    wrapper.push_primitive(&distance(10).with_scale(2.0).into()).unwrap();
    wrapper
        .push_primitive(
            &Constraint::new(Oid(11), ConstraintKind::HorizontalL)
                .with_param("l_id", Oid(3))
                .into(),
        )
        .unwrap();

    let calls = &wrapper.gcs().calls;
    assert_eq!(calls[0].args.len(), ConstraintKind::P2PDistance.arity(true));
    assert_eq!(calls[0].args.last(), Some(&SolverArg::Scale(2.0)));
    assert_eq!(calls[1].args.last(), Some(&SolverArg::Scale(1.0)));
}

#[test]
fn test_equal_alignment_and_object_refs() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::Equal)
        .with_param("param1", ObjectParamRef { o_id: Oid(2), param: GeometryProperty::Y })
        .with_param("param2", ObjectParamRef { o_id: Oid(4), param: GeometryProperty::Radius });
    wrapper.push_primitive(&c.into()).unwrap();

    let c = Constraint::new(Oid(11), ConstraintKind::Equal)
        .with_param("param1", ObjectParamRef { o_id: Oid(2), param: GeometryProperty::X })
        .with_param("param2", 1.0)
        .with_internal_alignment(InternalAlignment::InternalAlignment);
    wrapper.push_primitive(&c.into()).unwrap();

    let calls = &wrapper.gcs().calls;
    assert_eq!(
        calls[0].args,
        vec![
            SolverArg::Param(3),
            SolverArg::Param(4),
            SolverArg::Tag(10),
            SolverArg::Bool(true),
            SolverArg::Alignment(InternalAlignment::NoInternalAlignment),
        ]
    );
    assert_eq!(calls[1].args[0], SolverArg::Param(2));
    assert_eq!(
        calls[1].args[4],
        SolverArg::Alignment(InternalAlignment::InternalAlignment)
    );
    // no handles for pure value constraints
    assert!(wrapper.gcs().made.is_empty());
}

#[test]
fn test_named_sketch_param() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let addr = wrapper.push_sketch_param("r", 3.0);
    let c = Constraint::new(Oid(10), ConstraintKind::CircleRadius)
        .with_param("c_id", Oid(4))
        .with_param("radius", "r");
    wrapper.push_primitive(&c.into()).unwrap();

    assert_eq!(addr, 5);
    assert_eq!(wrapper.gcs().calls[0].args[1], SolverArg::Param(5));
    assert_eq!(
        wrapper.gcs().made[0].1,
        Geometry::Circle { center: PointAddr::at(0), radius: 4 }
    );

    wrapper.set_sketch_param("r", 4.5).unwrap();
    assert_eq!(wrapper.get_sketch_param_value("r"), Ok(4.5));
    assert!(wrapper.set_sketch_param("missing", 1.0).is_err());
}

#[test]
fn test_non_driving_datum_is_free_and_written_back() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::CircleRadius)
        .with_param("c_id", Oid(4))
        .with_param("radius", 1.0)
        .with_driving(false);
    wrapper.push_primitive(&c.into()).unwrap();

    let args = &wrapper.gcs().calls[0].args;
    assert_eq!(args[1], SolverArg::Datum(5));
    assert_eq!(args[3], SolverArg::Bool(false));
    assert!(!wrapper.gcs().params[5].fixed);

    // stand in for the solver measuring the radius
    wrapper.gcs_mut().set_param(5, 2.0, false).unwrap();
    wrapper.solve();
    wrapper.apply_solution().unwrap();

    let stored = wrapper.sketch_index().get_constraint(Oid(10)).unwrap();
    assert_eq!(stored.param("radius"), Some(&ParamValue::Number(2.0)));
}

#[test]
fn test_p2p_angle_without_increment() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::P2PAngle)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("angle", 0.5);
    wrapper.push_primitive(&c.into()).unwrap();

    let call = &wrapper.gcs().calls[0];
    assert_eq!(call.kind, ConstraintKind::P2PAngle);
    assert_eq!(call.args.len(), 5);
    assert_eq!(call.args[2], SolverArg::Datum(5));
    assert_eq!(call.args[3], SolverArg::Tag(10));
}

#[test]
fn test_raw_params_pass_through() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::P2PAngleIncrAngle)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("angle", 0.5)
        .with_param("incr_angle", 0.25);
    wrapper.push_primitive(&c.into()).unwrap();
    assert_eq!(wrapper.gcs().calls[0].args[3], SolverArg::Number(0.25));

    let c = Constraint::new(Oid(11), ConstraintKind::P2PAngleIncrAngle)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("angle", 0.5)
        .with_param("incr_angle", "a");
    assert!(matches!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::MalformedParameter { .. })
    ));
}

#[test]
fn test_failed_measurement_pins_its_datum() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::P2PAngleIncrAngle)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2))
        .with_param("angle", 0.5)
        .with_driving(false);
    assert!(matches!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::MissingParameter { .. })
    ));

    // the angle datum was pushed free, then pinned when incr_angle was missing
    let solver = wrapper.gcs();
    assert_eq!(solver.params.len(), 6);
    assert_eq!(solver.params[5].value, 0.5);
    assert!(solver.params[5].fixed);
    assert!(solver.calls.is_empty());
}

#[test]
fn test_resolution_errors() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_primitive(&distance(10).into()).unwrap();

    // missing parameter
    let c = Constraint::new(Oid(20), ConstraintKind::P2PDistance)
        .with_param("p1_id", Oid(1))
        .with_param("p2_id", Oid(2));
    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::MissingParameter {
            kind: "p2p_distance".into(),
            name: "distance".into(),
        })
    );

    // unknown id
    let c = Constraint::new(Oid(21), ConstraintKind::HorizontalL).with_param("l_id", Oid(99));
    assert_eq!(wrapper.push_primitive(&c.into()), Err(SketchError::NotFound(Oid(99))));

    // constraint used as geometry
    let c = Constraint::new(Oid(22), ConstraintKind::HorizontalL).with_param("l_id", Oid(10));
    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::UnsupportedReference(Oid(10)))
    );
    let c = Constraint::new(Oid(23), ConstraintKind::Equal)
        .with_param("param1", ObjectParamRef { o_id: Oid(10), param: GeometryProperty::X })
        .with_param("param2", 1.0);
    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::UnsupportedReference(Oid(10)))
    );

    // wrong geometry class
    let c = Constraint::new(Oid(24), ConstraintKind::HorizontalL).with_param("l_id", Oid(4));
    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::TypeMismatch {
            id: Oid(4),
            expected: "line".into(),
            found: "circle".into(),
        })
    );

    // property the primitive does not have
    let c = Constraint::new(Oid(25), ConstraintKind::Equal)
        .with_param("param1", ObjectParamRef { o_id: Oid(1), param: GeometryProperty::Radius })
        .with_param("param2", 1.0);
    assert_eq!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::UnknownProperty { kind: "point".into(), property: "radius".into() })
    );

    // object id that is not an id
    let c = Constraint::new(Oid(26), ConstraintKind::HorizontalL).with_param("l_id", "three");
    assert!(matches!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::MalformedParameter { .. })
    ));

    assert_eq!(wrapper.gcs().calls.len(), 1);
    assert_eq!(wrapper.gcs().live_handles(), 0);
    assert_eq!(wrapper.sketch_index().constraints().count(), 1);
}

#[test]
fn test_curve_accepts_any_curve() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let c = Constraint::new(Oid(10), ConstraintKind::AngleViaPoint)
        .with_param("crv1_id", Oid(3))
        .with_param("crv2_id", Oid(4))
        .with_param("p_id", Oid(2))
        .with_param("angle", 1.0);
    wrapper.push_primitive(&c.into()).unwrap();
    assert_eq!(wrapper.gcs().made.len(), 3);

    let c = Constraint::new(Oid(11), ConstraintKind::AngleViaPoint)
        .with_param("crv1_id", Oid(1))
        .with_param("crv2_id", Oid(4))
        .with_param("p_id", Oid(2))
        .with_param("angle", 1.0);
    assert!(matches!(
        wrapper.push_primitive(&c.into()),
        Err(SketchError::TypeMismatch { .. })
    ));
}

#[test]
fn test_duplicate_id_rejected_before_push() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let before = wrapper.gcs().params.len();
    assert_eq!(
        wrapper.push_primitive(&distance(3).into()),
        Err(SketchError::DuplicateId(Oid(3)))
    );
    assert_eq!(wrapper.gcs().params.len(), before);
    assert!(wrapper.gcs().calls.is_empty());
}

#[test]
fn test_extra_constraint_uses_extra_tag() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_extra_constraint(&distance(50)).unwrap();

    assert_eq!(wrapper.gcs().calls[0].args[3], SolverArg::Tag(-1));
    assert!(!wrapper.sketch_index().has(Oid(50)));

    wrapper.clear_extra_constraints();
    assert_eq!(wrapper.gcs().cleared_tags, vec![-1]);
}

#[test]
fn test_tag_out_of_range() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    let id = Oid(i32::MAX as u32 + 1);
    let c = Constraint::new(id, ConstraintKind::HorizontalL).with_param("l_id", Oid(3));
    assert_eq!(wrapper.push_primitive(&c.into()), Err(SketchError::TagOutOfRange(id)));
}

#[test]
fn test_delete_constraint_by_id() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_primitive(&distance(10).into()).unwrap();

    assert_eq!(wrapper.delete_constraint_by_id(Oid(10)), Ok(true));
    assert_eq!(wrapper.gcs().cleared_tags, vec![10]);
    assert!(!wrapper.sketch_index().has(Oid(10)));
    assert_eq!(wrapper.sketch_index().constraints().count(), 0);
    assert_eq!(wrapper.delete_constraint_by_id(Oid(10)), Ok(false));

    assert!(matches!(
        wrapper.delete_constraint_by_id(Oid(3)),
        Err(SketchError::TypeMismatch { .. })
    ));
    assert!(wrapper.sketch_index().has(Oid(3)));
}

#[test]
fn test_translated_diagnostics() {
    let mut wrapper = base_sketch(RecordingSolver::new());
    wrapper.push_primitive(&distance(10).into()).unwrap();
    wrapper.push_primitive(&distance(11).into()).unwrap();
    {
        let solver = wrapper.gcs_mut();
        solver.conflicting = vec![10, 11, -1];
        solver.redundant = vec![11, 77];
        solver.partially_redundant = vec![3];
    }

    assert_eq!(wrapper.get_gcs_conflicts(), vec![10, 11, -1]);
    assert_eq!(wrapper.get_conflicting_constraints(), vec![Oid(10), Oid(11)]);
    assert_eq!(wrapper.get_redundant_constraints(), vec![Oid(11)]);
    // #3 is geometry, not a constraint
    assert!(wrapper.get_partially_redundant_constraints().is_empty());
    assert!(wrapper.has_gcs_conflicts());
    assert!(wrapper.has_gcs_partially_redundant());
}
